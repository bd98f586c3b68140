//! Image resolver: one request, one network call, one classified outcome
//!
//! The resolver holds no state between calls. Any number of requests built
//! from one [`IiifClient`](crate::iiif::IiifClient) may resolve concurrently.

use crate::context::Context;
use crate::iiif::ResolveError;
use bytes::Bytes;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use url::Url;

/// Statuses an IIIF server uses to report a failed request
pub const PROTOCOL_ERROR_STATUSES: [u16; 7] = [400, 401, 403, 404, 500, 501, 503];

/// How a response status is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// 2xx: the body is the image
    Success,
    /// A documented IIIF failure status; the body explains the failure
    ProtocolError,
    /// Anything else
    Unexpected,
}

/// Classifies a response status code
pub fn classify_status(status: u16) -> ResponseClass {
    if (200..300).contains(&status) {
        ResponseClass::Success
    } else if PROTOCOL_ERROR_STATUSES.contains(&status) {
        ResponseClass::ProtocolError
    } else {
        ResponseClass::Unexpected
    }
}

/// A successful image response with its body not yet read
///
/// The body is read on demand with [`chunk`](Self::chunk),
/// [`bytes`](Self::bytes) or [`copy_to`](Self::copy_to). Reads stay bound to
/// the context the request was resolved with, so a cancelled or expired
/// context stops them with [`ResolveError::Cancelled`]. Dropping the response
/// closes the connection's body stream.
#[derive(Debug)]
pub struct ImageResponse {
    url: Url,
    status: StatusCode,
    inner: Response,
    ctx: Context,
}

impl ImageResponse {
    fn new(inner: Response, ctx: Context) -> Self {
        Self {
            url: inner.url().clone(),
            status: inner.status(),
            inner,
            ctx,
        }
    }

    /// The HTTP status that produced this response
    pub fn status(&self) -> u16 {
        self.status.as_u16()
    }

    /// The final URL after redirects
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The Content-Type header, if present
    pub fn content_type(&self) -> Option<&str> {
        self.inner
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// The Content-Length header, if present
    pub fn content_length(&self) -> Option<u64> {
        self.inner
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }

    /// Reads the next chunk of the body, or `None` at the end
    pub async fn chunk(&mut self) -> Result<Option<Bytes>, ResolveError> {
        self.ctx
            .run(self.inner.chunk())
            .await
            .map_err(ResolveError::Cancelled)?
            .map_err(|source| ResolveError::Transport {
                url: self.url.to_string(),
                source,
            })
    }

    /// Reads the whole body into memory
    pub async fn bytes(self) -> Result<Bytes, ResolveError> {
        let url = self.url;
        self.ctx
            .run(self.inner.bytes())
            .await
            .map_err(ResolveError::Cancelled)?
            .map_err(|source| ResolveError::Transport {
                url: url.to_string(),
                source,
            })
    }

    /// Streams the body into `writer`, returning the number of bytes written
    pub async fn copy_to<W>(mut self, writer: &mut W) -> Result<u64, ResolveError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut written = 0u64;
        while let Some(chunk) = self.chunk().await? {
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;

        tracing::debug!(url = %self.url, bytes = written, "image body copied");
        Ok(written)
    }
}

/// Performs the GET for an already-built request URL and classifies it
pub(crate) async fn resolve_url(
    client: &Client,
    url: Url,
    ctx: &Context,
) -> Result<ImageResponse, ResolveError> {
    let transport = |source| ResolveError::Transport {
        url: url.to_string(),
        source,
    };

    tracing::debug!("performing HTTP GET");
    let response = ctx
        .run(client.get(url.clone()).send())
        .await
        .map_err(ResolveError::Cancelled)?
        .map_err(|e| {
            tracing::error!("failed HTTP request: {}", e);
            transport(e)
        })?;

    let status = response.status().as_u16();
    match classify_status(status) {
        ResponseClass::Success => {
            tracing::debug!(status, "image response received");
            Ok(ImageResponse::new(response, ctx.clone()))
        }
        ResponseClass::ProtocolError => {
            let body = ctx
                .run(response.text())
                .await
                .map_err(ResolveError::Cancelled)?
                .map_err(|e| {
                    tracing::error!("failed reading error response body: {}", e);
                    transport(e)
                })?;

            tracing::error!(status, response = %body, "bad response received");
            Err(ResolveError::Protocol {
                url: url.to_string(),
                status,
                body,
            })
        }
        ResponseClass::Unexpected => {
            tracing::error!(status, "bad response code");
            Err(ResolveError::UnexpectedStatus {
                url: url.to_string(),
                status,
            })
        }
    }
}
