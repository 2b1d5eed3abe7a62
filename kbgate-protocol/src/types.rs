//! Normalized knowledge base results
//!
//! These are produced only by the gateway and never mutated afterwards.

use serde::{Deserialize, Serialize};

/// Opaque key/value bag attached to retrieved content
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// One ranked item returned by a retrieve call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Retrieved text
    pub content: String,
    /// Relevance score, range defined by the service
    pub score: f64,
    /// Where the content came from (e.g. an `s3://` URI)
    pub source: Option<String>,
    /// Service-provided metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl RetrievalResult {
    /// Convenience constructor with empty metadata and no source
    pub fn new(content: impl Into<String>, score: f64) -> Self {
        Self {
            content: content.into(),
            score,
            source: None,
            metadata: Metadata::new(),
        }
    }

    /// Builder-style source locator
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Start/end character offsets into the generated text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSpan {
    pub start: u32,
    pub end: u32,
}

/// Content a citation points at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedReference {
    pub content: String,
    pub source: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Links a span of generated text to the references backing it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// The cited part of the generated response
    pub text: String,
    pub span: TextSpan,
    pub references: Vec<RetrievedReference>,
}

/// Output of a retrieve-and-generate call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Generated answer
    pub text: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    /// Continuation token issued by the service, if any
    pub session_token: Option<String>,
}

impl GenerationResult {
    /// The continuation token, treating an empty string as absent
    pub fn continuation(&self) -> Option<&str> {
        self.session_token.as_deref().filter(|t| !t.is_empty())
    }
}
