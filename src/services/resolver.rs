use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::models::job::CadastralJob;
use crate::models::resolution::{ResolveRequest, ResolveResponse};

/// The external resolver may take up to 60 seconds; leave a 5 second margin.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(65);

/// Outcome of a successful resolver call.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub matched: bool,
    pub elapsed: Duration,
}

/// Something that can answer a cadastral lookup.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Make exactly one attempt at resolving `job`.
    async fn resolve(&self, job: &CadastralJob) -> Result<Resolution, ResolverError>;
}

/// HTTP client for the external resolver.
pub struct HttpResolver {
    http: Client,
    endpoint: String,
}

impl HttpResolver {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ResolverError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ResolverError::Transport)?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn classify(err: reqwest::Error) -> ResolverError {
    if err.is_timeout() {
        ResolverError::Timeout
    } else if err.is_connect() {
        ResolverError::Connect(err)
    } else {
        ResolverError::Transport(err)
    }
}

#[async_trait]
impl Resolver for HttpResolver {
    async fn resolve(&self, job: &CadastralJob) -> Result<Resolution, ResolverError> {
        let request_body = ResolveRequest {
            cadastral_number: job.identifier.clone(),
            latitude: job.location.latitude,
            longitude: job.location.longitude,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request_body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolverError::Status(status.as_u16()));
        }

        // The body is read separately so a stalled body still hits the timeout.
        let body = response.bytes().await.map_err(classify)?;
        let parsed: ResolveResponse = serde_json::from_slice(&body)?;

        let elapsed = Duration::try_from_secs_f64(parsed.delay)
            .map_err(|_| ResolverError::Malformed(format!("invalid delay {}", parsed.delay)))?;

        Ok(Resolution {
            matched: parsed.result,
            elapsed,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("resolver did not answer in time")]
    Timeout,

    #[error("resolver unreachable: {0}")]
    Connect(#[source] reqwest::Error),

    #[error("resolver returned status {0}")]
    Status(u16),

    #[error("failed to parse resolver response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("resolver response is malformed: {0}")]
    Malformed(String),

    #[error("resolver request failed: {0}")]
    Transport(#[source] reqwest::Error),
}

impl ResolverError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ResolverError::Timeout => "timeout",
            ResolverError::Connect(_) => "connect",
            ResolverError::Status(_) => "status",
            ResolverError::Decode(_) | ResolverError::Malformed(_) => "decode",
            ResolverError::Transport(_) => "transport",
        }
    }

    /// True when the resolver answered but refused or garbled the request.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ResolverError::Status(_) | ResolverError::Decode(_) | ResolverError::Malformed(_)
        )
    }
}
