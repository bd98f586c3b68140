//! IIIF image request builder
//!
//! An [`ImageRequest`] is an owned value: each setter consumes the request and
//! returns the updated one, so there is no shared mutable state between
//! requests built from the same client. Setters in one family (region, size,
//! rotation, quality, format) replace each other; the last call wins.

use crate::context::Context;
use crate::iiif::resolver::{resolve_url, ImageResponse};
use crate::iiif::{Format, IiifClient, Quality, Region, ResolveError, Rotation, Size};
use crate::UrlError;
use tracing::Instrument;
use url::Url;

/// One IIIF Image API request
#[derive(Debug, Clone)]
#[must_use = "an image request does nothing until it is resolved"]
pub struct ImageRequest {
    client: IiifClient,
    identifier: String,
    region: Region,
    size: Size,
    rotation: Rotation,
    quality: Quality,
    format: Format,
}

impl ImageRequest {
    pub(crate) fn new(client: IiifClient, identifier: String) -> Self {
        Self {
            client,
            identifier,
            region: Region::default(),
            size: Size::default(),
            rotation: Rotation::default(),
            quality: Quality::default(),
            format: Format::default(),
        }
    }

    // ===== Region =====

    /// Sets any region
    pub fn region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    /// Requests the whole image
    pub fn full_region(self) -> Self {
        self.region(Region::Full)
    }

    /// Requests the largest centered square
    pub fn square(self) -> Self {
        self.region(Region::Square)
    }

    /// Requests a pixel rectangle
    pub fn region_xywh(self, x: u64, y: u64, w: u64, h: u64) -> Self {
        self.region(Region::Pixels { x, y, w, h })
    }

    /// Requests a rectangle given in percent of the full image
    pub fn region_percent_xywh(self, x: u64, y: u64, w: u64, h: u64) -> Self {
        self.region(Region::Percent { x, y, w, h })
    }

    // ===== Size =====

    /// Sets any size
    pub fn size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    pub fn size_full(self) -> Self {
        self.size(Size::Full)
    }

    pub fn size_max(self) -> Self {
        self.size(Size::Max)
    }

    pub fn size_fixed_width_scale_height(self, w: u64) -> Self {
        self.size(Size::Width(w))
    }

    pub fn size_fixed_height_scale_width(self, h: u64) -> Self {
        self.size(Size::Height(h))
    }

    pub fn size_percentage(self, n: f64) -> Self {
        self.size(Size::Percent(n))
    }

    pub fn size_width_height(self, w: u64, h: u64) -> Self {
        self.size(Size::Exact { w, h })
    }

    /// Scales for the best fit within `w` x `h`
    ///
    /// The returned width and height are each at most the requested bound and
    /// the aspect ratio of the extracted region is kept. The exact scale is
    /// chosen by the server.
    pub fn size_best_scale_under(self, w: u64, h: u64) -> Self {
        self.size(Size::BestFit { w, h })
    }

    // ===== Rotation =====

    /// Sets any rotation
    pub fn rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Rotates clockwise by `degrees`, reduced modulo 360 keeping the sign
    pub fn rotate(self, degrees: f64) -> Self {
        self.rotation(Rotation::new(degrees))
    }

    /// Mirrors horizontally, then rotates clockwise by `degrees`
    pub fn mirror_rotate(self, degrees: f64) -> Self {
        self.rotation(Rotation::mirrored(degrees))
    }

    // ===== Quality =====

    /// Sets any quality
    pub fn quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub fn default_quality(self) -> Self {
        self.quality(Quality::Default)
    }

    pub fn color(self) -> Self {
        self.quality(Quality::Color)
    }

    pub fn gray(self) -> Self {
        self.quality(Quality::Gray)
    }

    pub fn bitonal(self) -> Self {
        self.quality(Quality::Bitonal)
    }

    // ===== Format =====

    /// Sets any format
    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn jpg(self) -> Self {
        self.format(Format::Jpg)
    }

    pub fn tif(self) -> Self {
        self.format(Format::Tif)
    }

    pub fn png(self) -> Self {
        self.format(Format::Png)
    }

    pub fn gif(self) -> Self {
        self.format(Format::Gif)
    }

    pub fn jp2(self) -> Self {
        self.format(Format::Jp2)
    }

    pub fn pdf(self) -> Self {
        self.format(Format::Pdf)
    }

    pub fn webp(self) -> Self {
        self.format(Format::Webp)
    }

    // ===== Accessors =====

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn get_region(&self) -> Region {
        self.region
    }

    pub fn get_size(&self) -> Size {
        self.size
    }

    pub fn get_rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn get_quality(&self) -> Quality {
        self.quality
    }

    pub fn get_format(&self) -> Format {
        self.format
    }

    /// Builds the request URL
    ///
    /// Every segment is always present; unset parameters render their
    /// defaults (`full`, `full`, `0.000000`, `default`, `jpg`).
    pub fn url(&self) -> Result<Url, ResolveError> {
        if self.identifier.is_empty() {
            return Err(ResolveError::EmptyIdentifier);
        }

        let mut url = self.client.base_url().clone();
        let image = format!("{}.{}", self.quality, self.format);

        url.path_segments_mut()
            .map_err(|_| UrlError::CannotBeABase(self.client.base_url().to_string()))?
            .pop_if_empty()
            .push(&self.identifier)
            .push(&self.region.to_string())
            .push(&self.size.to_string())
            .push(&self.rotation.to_string())
            .push(&image);

        Ok(url)
    }

    /// Sends the request and classifies the response
    ///
    /// | Outcome | Result |
    /// |---------|--------|
    /// | 2xx | `Ok(ImageResponse)` with the body unread |
    /// | 400, 401, 403, 404, 500, 501, 503 | `ResolveError::Protocol` with the error body |
    /// | any other status | `ResolveError::UnexpectedStatus` |
    /// | connection, DNS, timeout | `ResolveError::Transport` |
    /// | `ctx` cancelled or past its deadline | `ResolveError::Cancelled` |
    ///
    /// Nothing is retried.
    pub async fn resolve(self, ctx: &Context) -> Result<ImageResponse, ResolveError> {
        let url = self.url()?;
        let span = tracing::info_span!(
            "iiif_resolve",
            identifier = %self.identifier,
            url = %url,
        );

        resolve_url(self.client.http(), url, ctx)
            .instrument(span)
            .await
    }
}
