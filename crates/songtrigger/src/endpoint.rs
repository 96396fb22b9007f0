//! The generation endpoint.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;

use crate::error::GenerationError;

/// Longest server error body kept as diagnostic detail.
const MAX_ERROR_DETAIL: usize = 512;

/// Something that produces the bytes of a freshly generated song.
#[async_trait]
pub trait MidiEndpoint: Send + Sync {
    async fn fetch(&self) -> Result<Bytes, GenerationError>;
}

/// `GET`s a fixed URL once per fetch. No retry and no timeout beyond what
/// the connection itself imposes.
pub struct HttpEndpoint {
    url: String,
    client: Client,
}

impl HttpEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: Client::new(),
        }
    }

    pub fn from_config(config: &songconf::ClientConfig) -> Self {
        Self::new(config.endpoint_url())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn error_detail(body: String) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    let mut end = body.len().min(MAX_ERROR_DETAIL);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    Some(body[..end].to_string())
}

#[async_trait]
impl MidiEndpoint for HttpEndpoint {
    #[tracing::instrument(skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<Bytes, GenerationError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| GenerationError::transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.ok().and_then(error_detail);
            return Err(GenerationError::status(status.as_u16(), detail));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GenerationError::body(e.to_string()))?;
        tracing::debug!(bytes = bytes.len(), "song received");
        Ok(bytes)
    }
}
