//! Attachment downloads.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchResult;

/// Downloads attachment bytes from a URL.
#[async_trait]
pub trait AttachmentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchResult<Bytes>;
}

#[cfg(feature = "http-fetch")]
pub use http::HttpFetcher;

#[cfg(feature = "http-fetch")]
mod http {
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;
    use reqwest::{Client, ClientBuilder};
    use tracing::debug;

    use super::AttachmentFetcher;
    use crate::error::{FetchError, FetchResult};

    /// Fetches attachments over HTTP with `reqwest`.
    #[derive(Debug, Clone)]
    pub struct HttpFetcher {
        client: Client,
    }

    impl HttpFetcher {
        /// Default request timeout.
        pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

        /// Creates a fetcher with the default timeout.
        pub fn new() -> FetchResult<Self> {
            Self::with_timeout(Self::DEFAULT_TIMEOUT)
        }

        pub fn with_timeout(timeout: Duration) -> FetchResult<Self> {
            let client = ClientBuilder::new()
                .timeout(timeout)
                .build()
                .map_err(|e| FetchError::Request {
                    url: String::new(),
                    message: e.to_string(),
                })?;
            Ok(Self { client })
        }

        /// Wraps an existing client.
        pub fn from_client(client: Client) -> Self {
            Self { client }
        }
    }

    #[async_trait]
    impl AttachmentFetcher for HttpFetcher {
        async fn fetch(&self, url: &str) -> FetchResult<Bytes> {
            let request_error = |e: reqwest::Error| FetchError::Request {
                url: url.to_string(),
                message: e.to_string(),
            };

            let resp = self.client.get(url).send().await.map_err(request_error)?;
            let status = resp.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let body = resp.bytes().await.map_err(request_error)?;
            debug!(url, bytes = body.len(), "Fetched attachment");
            Ok(body)
        }
    }
}
