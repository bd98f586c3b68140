//! IIIF Image API client
//!
//! Requests are assembled from typed parameters into the protocol's URL
//! grammar and resolved with one HTTP GET:
//!
//! ```text
//! {base-url}/{identifier}/{region}/{size}/{rotation}/{quality}.{format}
//! ```
//!
//! # Example
//!
//! ```no_run
//! use imgscrape::context::Context;
//! use imgscrape::iiif::IiifClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = IiifClient::new(reqwest::Client::new(), "https://api.nga.gov/iiif")?;
//! let response = client
//!     .image("abc123")
//!     .square()
//!     .size_best_scale_under(800, 800)
//!     .png()
//!     .resolve(&Context::background())
//!     .await?;
//! let bytes = response.bytes().await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod params;
mod request;
mod resolver;

pub use client::IiifClient;
pub use params::{Format, Quality, Region, Rotation, Size};
pub use request::ImageRequest;
pub use resolver::{classify_status, ImageResponse, ResponseClass, PROTOCOL_ERROR_STATUSES};

use crate::context::ContextError;
use crate::UrlError;
use thiserror::Error;

/// Errors parsing IIIF parameters from text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("unrecognized {kind} value: {value:?}")]
    UnrecognizedEnumValue { kind: &'static str, value: String },

    #[error("invalid region {0:?}: expected full, square, x,y,w,h or pct:x,y,w,h")]
    InvalidRegion(String),

    #[error("invalid size {0:?}: expected full, max, w,, ,h, pct:n, w,h or !w,h")]
    InvalidSize(String),

    #[error("invalid rotation {0:?}: expected degrees, optionally prefixed with '!'")]
    InvalidRotation(String),
}

/// Errors resolving an image request
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("image identifier cannot be empty")]
    EmptyIdentifier,

    #[error("cannot build request URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("HTTP request to {url} failed: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("IIIF server answered {status} for {url}: {body}")]
    Protocol {
        url: String,
        status: u16,
        body: String,
    },

    #[error("unexpected HTTP status {status} for {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("failed writing image data: {0}")]
    Io(#[from] std::io::Error),

    #[error("request abandoned: {0}")]
    Cancelled(ContextError),
}

impl ResolveError {
    /// True when the request was rejected before anything was sent
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::EmptyIdentifier | Self::InvalidUrl(_))
    }

    /// True when the caller's context ended the request
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// The HTTP status that produced this error, if a response was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Protocol { status, .. } | Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
