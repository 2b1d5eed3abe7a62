//! Backend gateway to the knowledge base runtime service
//!
//! The dispatcher only sees the [`KnowledgeBase`] trait. [`BedrockGateway`]
//! is the production implementation; tests plug in stubs.

mod bedrock;
mod signing;
#[cfg(test)]
pub mod stub;

pub use bedrock::BedrockGateway;

use async_trait::async_trait;
use kbgate_protocol::{GenerationResult, RetrievalResult};

/// Errors from the knowledge base service
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Request could not be delivered (DNS, TLS, connection reset)
    #[error("request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    /// Service answered with a non-2xx status
    #[error("{code}: {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    /// Response body did not match the expected shape
    #[error("invalid response from knowledge base service: {0}")]
    Decode(String),

    /// No signing credentials available
    #[error("credentials unavailable: {0}")]
    Credentials(String),

    /// Request could not be built or signed
    #[error("failed to prepare request: {0}")]
    Request(String),
}

impl BackendError {
    /// Build a service error from a failed response
    ///
    /// The exception name comes from the `x-amzn-ErrorType` header when
    /// present, else the body's `__type`; the message from the body's
    /// `message`/`Message` field, else the raw body.
    pub fn from_service_response(status: u16, error_type: Option<&str>, body: &str) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
        let field = |name: &str| {
            parsed
                .as_ref()
                .and_then(|v| v.get(name))
                .and_then(|v| v.as_str())
                .map(String::from)
        };

        let code = error_type
            .map(String::from)
            .or_else(|| field("__type"))
            .map(|raw| clean_error_code(&raw))
            .filter(|code| !code.is_empty())
            .unwrap_or_else(|| format!("HttpError{}", status));

        let message = field("message")
            .or_else(|| field("Message"))
            .unwrap_or_else(|| body.trim().to_string());

        Self::Service {
            status,
            code,
            message,
        }
    }
}

/// `ThrottlingException:http://...` and `com.amazon#ThrottlingException`
/// both reduce to `ThrottlingException`
fn clean_error_code(raw: &str) -> String {
    let before_colon = raw.split(':').next().unwrap_or(raw);
    before_colon
        .rsplit('#')
        .next()
        .unwrap_or(before_colon)
        .trim()
        .to_string()
}

/// Input of a retrieve call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrieveInput {
    pub query: String,
    /// Raw continuation token passed to the service as-is
    pub next_token: Option<String>,
    /// Overrides the configured result-count limit
    pub max_results: Option<u32>,
}

/// Input of a retrieve-and-generate call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateInput {
    pub query: String,
    /// Continuation token resolved by the dispatcher
    pub session_token: Option<String>,
    /// Prompt template for generation
    pub system_prompt: Option<String>,
}

/// The two operations of the knowledge base runtime service
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Ranked results in the order the service returned them
    async fn retrieve(&self, input: &RetrieveInput) -> Result<Vec<RetrievalResult>, BackendError>;

    /// Generated answer with citations and continuation token
    async fn retrieve_and_generate(
        &self,
        input: &GenerateInput,
    ) -> Result<GenerationResult, BackendError>;
}
