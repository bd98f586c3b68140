//! Typed IIIF Image API parameters
//!
//! Each type renders its wire form through `Display` and parses the same
//! grammar back through `FromStr`:
//!
//! | Parameter | Wire forms |
//! |-----------|------------|
//! | region | `full`, `square`, `x,y,w,h`, `pct:x,y,w,h` |
//! | size | `full`, `max`, `w,`, `,h`, `pct:n`, `w,h`, `!w,h` |
//! | rotation | `n`, `!n` (mirror then rotate) |
//! | quality | `default`, `color`, `gray`, `bitonal` |
//! | format | `jpg`, `tif`, `png`, `gif`, `jp2`, `pdf`, `webp` |
//!
//! No range checks are made: zero-sized regions or percentages over 100 are
//! passed through and left for the image server to reject.

use crate::iiif::ParamError;
use std::fmt;
use std::str::FromStr;

/// The rectangular portion of the source image to return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Region {
    /// The whole image
    #[default]
    Full,
    /// The largest centered square the server can cut
    Square,
    /// A pixel rectangle
    Pixels { x: u64, y: u64, w: u64, h: u64 },
    /// A rectangle in percent of the full image dimensions
    Percent { x: u64, y: u64, w: u64, h: u64 },
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Square => write!(f, "square"),
            Self::Pixels { x, y, w, h } => write!(f, "{},{},{},{}", x, y, w, h),
            Self::Percent { x, y, w, h } => write!(f, "pct:{},{},{},{}", x, y, w, h),
        }
    }
}

impl FromStr for Region {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParamError::InvalidRegion(s.to_string());

        match s {
            "full" => return Ok(Self::Full),
            "square" => return Ok(Self::Square),
            _ => {}
        }

        let (percent, rect) = match s.strip_prefix("pct:") {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let values = parse_u64_list(rect).ok_or_else(invalid)?;
        let [x, y, w, h] = <[u64; 4]>::try_from(values).map_err(|_| invalid())?;

        Ok(if percent {
            Self::Percent { x, y, w, h }
        } else {
            Self::Pixels { x, y, w, h }
        })
    }
}

/// The dimensions the extracted region is scaled to
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Size {
    /// Unscaled (IIIF 2.x spelling)
    #[default]
    Full,
    /// The largest size the server allows
    Max,
    /// Exact width, height scaled to keep the aspect ratio
    Width(u64),
    /// Exact height, width scaled to keep the aspect ratio
    Height(u64),
    /// Both dimensions scaled by a percentage
    Percent(f64),
    /// Exact width and height, possibly distorting the image
    Exact { w: u64, h: u64 },
    /// Best fit with each dimension at most the given bound, aspect ratio kept
    BestFit { w: u64, h: u64 },
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Max => write!(f, "max"),
            Self::Width(w) => write!(f, "{},", w),
            Self::Height(h) => write!(f, ",{}", h),
            Self::Percent(n) => write!(f, "pct:{}", n),
            Self::Exact { w, h } => write!(f, "{},{}", w, h),
            Self::BestFit { w, h } => write!(f, "!{},{}", w, h),
        }
    }
}

impl FromStr for Size {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParamError::InvalidSize(s.to_string());

        match s {
            "full" => return Ok(Self::Full),
            "max" => return Ok(Self::Max),
            _ => {}
        }

        if let Some(pct) = s.strip_prefix("pct:") {
            let n: f64 = pct.parse().map_err(|_| invalid())?;
            if !n.is_finite() {
                return Err(invalid());
            }
            return Ok(Self::Percent(n));
        }

        let (best_fit, dims) = match s.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (w, h) = dims.split_once(',').ok_or_else(invalid)?;
        let parse = |v: &str| v.parse::<u64>().map_err(|_| invalid());

        match (w.is_empty(), h.is_empty(), best_fit) {
            (false, true, false) => Ok(Self::Width(parse(w)?)),
            (true, false, false) => Ok(Self::Height(parse(h)?)),
            (false, false, false) => Ok(Self::Exact {
                w: parse(w)?,
                h: parse(h)?,
            }),
            (false, false, true) => Ok(Self::BestFit {
                w: parse(w)?,
                h: parse(h)?,
            }),
            _ => Err(invalid()),
        }
    }
}

/// Clockwise rotation in degrees, optionally mirrored first
///
/// Degrees are reduced with a truncating remainder, so the stored value
/// keeps the sign of the input and its magnitude stays below 360.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rotation {
    degrees: f64,
    mirrored: bool,
}

impl Rotation {
    /// A plain rotation
    pub fn new(degrees: f64) -> Self {
        Self {
            degrees: normalize_degrees(degrees),
            mirrored: false,
        }
    }

    /// A rotation applied after mirroring the image horizontally
    pub fn mirrored(degrees: f64) -> Self {
        Self {
            degrees: normalize_degrees(degrees),
            mirrored: true,
        }
    }

    /// The normalized rotation in degrees
    pub fn degrees(&self) -> f64 {
        self.degrees
    }

    /// Whether the image is mirrored before rotating
    pub fn is_mirrored(&self) -> bool {
        self.mirrored
    }
}

fn normalize_degrees(degrees: f64) -> f64 {
    let reduced = degrees % 360.0;
    // -0.0 would render as "-0.000000"
    if reduced == 0.0 {
        0.0
    } else {
        reduced
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mirrored {
            write!(f, "!")?;
        }
        write!(f, "{:.6}", self.degrees)
    }
}

impl FromStr for Rotation {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (mirrored, number) = match s.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let degrees: f64 = number
            .parse()
            .map_err(|_| ParamError::InvalidRotation(s.to_string()))?;
        if !degrees.is_finite() {
            return Err(ParamError::InvalidRotation(s.to_string()));
        }

        Ok(if mirrored {
            Self::mirrored(degrees)
        } else {
            Self::new(degrees)
        })
    }
}

/// Color treatment of the returned image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Quality {
    #[default]
    Default,
    Color,
    Gray,
    Bitonal,
}

impl Quality {
    /// Every quality, in declaration order
    pub const ALL: [Quality; 4] = [Self::Default, Self::Color, Self::Gray, Self::Bitonal];

    /// The lowercase wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Color => "color",
            Self::Gray => "gray",
            Self::Bitonal => "bitonal",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = ParamError;

    /// Case-insensitive inverse of [`Quality::as_str`]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|q| q.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParamError::UnrecognizedEnumValue {
                kind: "quality",
                value: s.to_string(),
            })
    }
}

/// Encoding of the returned image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    #[default]
    Jpg,
    Tif,
    Png,
    Gif,
    Jp2,
    Pdf,
    Webp,
}

impl Format {
    /// Every format, in declaration order
    pub const ALL: [Format; 7] = [
        Self::Jpg,
        Self::Tif,
        Self::Png,
        Self::Gif,
        Self::Jp2,
        Self::Pdf,
        Self::Webp,
    ];

    /// The lowercase wire representation, also used as the file extension
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Tif => "tif",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Jp2 => "jp2",
            Self::Pdf => "pdf",
            Self::Webp => "webp",
        }
    }

    /// File extension for saved images
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    /// The media type a server is expected to answer with
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpg => "image/jpeg",
            Self::Tif => "image/tiff",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Jp2 => "image/jp2",
            Self::Pdf => "application/pdf",
            Self::Webp => "image/webp",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = ParamError;

    /// Case-insensitive inverse of [`Format::as_str`]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParamError::UnrecognizedEnumValue {
                kind: "format",
                value: s.to_string(),
            })
    }
}

/// Parses a comma-separated list of unsigned integers
fn parse_u64_list(s: &str) -> Option<Vec<u64>> {
    s.split(',').map(|v| v.parse().ok()).collect()
}
