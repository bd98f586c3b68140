//! imgscrape: image link discovery and IIIF image retrieval
//!
//! This crate provides two cooperating pieces:
//! - a concurrent crawler that fetches seed pages and extracts every `<img src>`
//! - a request builder and resolver for the IIIF Image API

pub mod config;
pub mod context;
pub mod crawler;
pub mod iiif;
pub mod url;

use thiserror::Error;

pub use context::ContextError;
pub use iiif::{ParamError, ResolveError};

/// Main error type for imgscrape operations
#[derive(Debug, Error)]
pub enum ImgscrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Registration error: {0}")]
    Register(#[from] RegisterError),

    #[error("Crawl error: {0}")]
    Crawl(#[from] CrawlError),

    #[error("IIIF resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("IIIF parameter error: {0}")]
    Param(#[from] ParamError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(#[from] ::url::ParseError),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("URL cannot be used as a base: {0}")]
    CannotBeABase(String),
}

/// A seed URL that could not be registered
///
/// Registration is atomic per call, so nothing from the batch was added.
#[derive(Debug, Error)]
#[error("invalid URL at index {index}: {raw}; {cause}")]
pub struct RegisterError {
    /// Position of the bad entry within the batch
    pub index: usize,
    /// The entry exactly as supplied
    pub raw: String,
    #[source]
    pub cause: UrlError,
}

/// Failure of a single fetch worker
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request to {url} failed: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("document at {url} is not parseable as HTML: {message}")]
    ParseDocument { url: String, message: String },

    #[error("fetch of {url} abandoned: {reason}")]
    Cancelled { url: String, reason: ContextError },

    #[error("worker for {url} did not complete: {message}")]
    Worker { url: String, message: String },
}

impl FetchError {
    /// The URL the failing worker was fetching
    pub fn url(&self) -> &str {
        match self {
            Self::Transport { url, .. }
            | Self::Status { url, .. }
            | Self::ParseDocument { url, .. }
            | Self::Cancelled { url, .. }
            | Self::Worker { url, .. } => url,
        }
    }
}

/// Failure of a whole crawl run
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("worker {index} failed: {source}")]
    Fetch {
        index: usize,
        #[source]
        source: FetchError,
    },

    #[error("crawl cancelled: {0}")]
    Cancelled(ContextError),
}

impl ImgscrapeError {
    /// True when the error was raised before any network attempt was made
    ///
    /// These are fixed by correcting input, not by retrying.
    pub fn is_input_error(&self) -> bool {
        match self {
            Self::Config(_) | Self::Url(_) | Self::Register(_) | Self::Param(_) => true,
            Self::Resolve(e) => e.is_input_error(),
            _ => false,
        }
    }

    /// True when a network attempt was made and failed
    pub fn is_network_error(&self) -> bool {
        match self {
            Self::Crawl(CrawlError::Fetch { .. }) | Self::Reqwest(_) => true,
            Self::Resolve(e) => !e.is_input_error() && !e.is_cancelled(),
            _ => false,
        }
    }
}

/// Result type alias for imgscrape operations
pub type Result<T> = std::result::Result<T, ImgscrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use context::Context;
pub use crawler::{Crawler, FailurePolicy};
pub use iiif::{Format, IiifClient, ImageRequest, ImageResponse, Quality, Region, Rotation, Size};
