//! Retrieval of text sources and annotation resources.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;

use crate::error::TextLayerError;
use crate::settings::FetchSettings;

/// A fetched document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedResource {
    /// Decoded body text.
    pub body: String,
    /// The media type the server declared, if any (parameters included).
    pub media_type: Option<String>,
}

impl FetchedResource {
    pub fn new(body: impl Into<String>, media_type: Option<&str>) -> Self {
        Self {
            body: body.into(),
            media_type: media_type.map(str::to_string),
        }
    }
}

/// Fetches a URI and returns its body.
///
/// Implementations must report every failure (including non-success
/// statuses) as [`TextLayerError::Transport`].
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, uri: &str) -> Result<FetchedResource, TextLayerError>;
}

/// [`Fetcher`] over HTTP(S).
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds a client with the configured timeout and user agent.
    pub fn new(settings: &FetchSettings) -> Result<Self, TextLayerError> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|source| {
                TextLayerError::transport("<client>", format!("failed to build HTTP client: {source}"))
            })?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, uri: &str) -> Result<FetchedResource, TextLayerError> {
        debug!(uri, "GET");
        let response = self
            .client
            .get(uri)
            .send()
            .await
            .map_err(|source| TextLayerError::transport(uri, source.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TextLayerError::transport(uri, format!("HTTP {status}")));
        }

        let media_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = response
            .text()
            .await
            .map_err(|source| TextLayerError::transport(uri, format!("failed to read body: {source}")))?;

        Ok(FetchedResource { body, media_type })
    }
}
