use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Addressed request for one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTarget {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

/// Raw response as seen by an adapter's classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("upstream responded with status {0}")]
    Status(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("rejected response: {0}")]
    Rejected(String),

    #[error("cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Network(err.to_string())
    }
}

/// Network seam between the resolver and the stream sources. Deadlines are
/// applied by the caller.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    async fn fetch(&self, target: &SourceTarget) -> Result<SourceResponse, TransportError>;

    /// Lightweight reachability check (HEAD); returns the status code.
    async fn probe(&self, target: &SourceTarget) -> Result<u16, TransportError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestStreamTransport {
    http: reqwest::Client,
}

impl ReqwestStreamTransport {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    fn request(&self, method: reqwest::Method, target: &SourceTarget) -> reqwest::RequestBuilder {
        target
            .headers
            .iter()
            .fold(self.http.request(method, &target.url), |req, (name, value)| {
                req.header(name.as_str(), value.as_str())
            })
    }
}

#[async_trait]
impl StreamTransport for ReqwestStreamTransport {
    async fn fetch(&self, target: &SourceTarget) -> Result<SourceResponse, TransportError> {
        let response = self.request(reqwest::Method::GET, target).send().await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        Ok(SourceResponse {
            status,
            content_type,
            body,
        })
    }

    async fn probe(&self, target: &SourceTarget) -> Result<u16, TransportError> {
        let response = self.request(reqwest::Method::HEAD, target).send().await?;
        Ok(response.status().as_u16())
    }
}
