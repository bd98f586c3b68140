use crate::config::IiifConfig;
use crate::iiif::ImageRequest;
use crate::url::parse_base_url;
use crate::UrlError;
use reqwest::Client;
use url::Url;

/// Entry point for IIIF image requests against one service
///
/// Cloning is cheap: the HTTP client is a handle onto a shared connection
/// pool and the base URL is immutable, so one client can serve any number of
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct IiifClient {
    http: Client,
    base_url: Url,
}

impl IiifClient {
    /// Creates a client for the service rooted at `base_url`
    ///
    /// The base must be an absolute http(s) URL without query or fragment.
    /// A trailing slash is allowed and ignored.
    pub fn new(http: Client, base_url: &str) -> Result<Self, UrlError> {
        Ok(Self {
            http,
            base_url: parse_base_url(base_url)?,
        })
    }

    /// Creates a client from the `[iiif]` configuration section
    pub fn from_config(http: Client, config: &IiifConfig) -> Result<Self, UrlError> {
        Self::new(http, &config.base_url)
    }

    /// The service base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    /// Starts a request for one image
    ///
    /// The identifier is given unencoded; it is percent-encoded as a single
    /// path segment when the URL is built.
    pub fn image(&self, identifier: impl Into<String>) -> ImageRequest {
        ImageRequest::new(self.clone(), identifier.into())
    }
}
