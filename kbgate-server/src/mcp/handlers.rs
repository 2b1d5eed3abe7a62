//! MCP tool handlers
//!
//! Implements the business logic for each MCP tool. Handlers receive
//! already-validated input and return the shaped JSON output.

use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::debug;

use kbgate_protocol::{Citation, RetrievalResult, RetrievedReference};

use crate::backend::{BackendError, GenerateInput, KnowledgeBase, RetrieveInput};
use crate::session::SessionRegistry;

use super::error::McpError;
use super::tools::{RETRIEVE_AND_GENERATE, RETRIEVE_KNOWLEDGE};

/// Shown in place of a missing source locator
const UNKNOWN_SOURCE: &str = "Unknown";

/// Tool handler context
///
/// Borrows the backend and the session registry from the dispatcher.
pub struct ToolContext<'a> {
    pub backend: &'a dyn KnowledgeBase,
    pub sessions: &'a Mutex<SessionRegistry>,
}

impl<'a> ToolContext<'a> {
    /// Create a new tool context
    pub fn new(backend: &'a dyn KnowledgeBase, sessions: &'a Mutex<SessionRegistry>) -> Self {
        Self { backend, sessions }
    }

    /// Rank knowledge base passages for a query
    ///
    /// `session_id` is sent as a raw continuation token; retrieval does not
    /// go through the session registry.
    pub async fn retrieve_knowledge(
        &self,
        query: String,
        session_id: Option<String>,
        max_results: Option<u32>,
    ) -> Result<Value, McpError> {
        let input = RetrieveInput {
            query,
            next_token: session_id,
            max_results,
        };

        let results = self
            .backend
            .retrieve(&input)
            .await
            .map_err(|e| backend_failure(RETRIEVE_KNOWLEDGE, "retrieve from", e))?;

        let shaped: Vec<Value> = results
            .iter()
            .enumerate()
            .map(|(i, result)| shape_result(i + 1, result))
            .collect();

        Ok(json!({
            "query": input.query,
            "results": shaped,
            "totalResults": results.len(),
        }))
    }

    /// Generate an answer, continuing the session when one is given
    pub async fn retrieve_and_generate(
        &self,
        query: String,
        session_id: Option<String>,
        system_prompt: Option<String>,
    ) -> Result<Value, McpError> {
        let session_token = session_id
            .as_deref()
            .and_then(|handle| self.sessions.lock().resolve(handle).continuation(handle));

        let input = GenerateInput {
            query,
            session_token,
            system_prompt,
        };

        let result = self
            .backend
            .retrieve_and_generate(&input)
            .await
            .map_err(|e| backend_failure(RETRIEVE_AND_GENERATE, "retrieve and generate from", e))?;

        if let Some(token) = result.continuation() {
            let mut sessions = self.sessions.lock();
            // Without a caller handle the token is stored under a generated
            // one that is not part of the response.
            let handle = match session_id {
                Some(handle) => handle,
                None => sessions.generate_handle(),
            };
            sessions.update(handle, token);
        }

        let citations: Vec<Value> = result
            .citations
            .iter()
            .enumerate()
            .map(|(i, citation)| shape_citation(i + 1, citation))
            .collect();

        Ok(json!({
            "query": input.query,
            "response": result.text,
            "sessionId": result.session_token,
            "citations": citations,
        }))
    }

    /// Register a session with no continuation yet
    pub fn create_session(&self, session_name: Option<String>) -> Result<Value, McpError> {
        let mut sessions = self.sessions.lock();
        let handle = match session_name {
            Some(name) => name,
            None => sessions.generate_handle(),
        };
        sessions.create(handle.clone());

        Ok(json!({
            "sessionId": handle,
            "message": "Session created successfully",
        }))
    }

    /// Every registered session in creation order
    pub fn list_sessions(&self) -> Result<Value, McpError> {
        let entries = self.sessions.lock().list();
        debug!(count = entries.len(), "Listing sessions");

        let sessions: Vec<Value> = entries
            .iter()
            .map(|entry| {
                json!({
                    "sessionId": entry.handle,
                    "backendSessionId": entry.token,
                    "active": entry.is_active(),
                })
            })
            .collect();

        Ok(json!({
            "sessions": sessions,
            "count": entries.len(),
        }))
    }
}

fn backend_failure(tool: &str, action: &str, err: BackendError) -> McpError {
    McpError::Internal(format!(
        "Error in {}: Failed to {} knowledge base: {}",
        tool, action, err
    ))
}

fn shape_result(rank: usize, result: &RetrievalResult) -> Value {
    json!({
        "rank": rank,
        "content": result.content,
        "score": result.score,
        "source": result.source.as_deref().unwrap_or(UNKNOWN_SOURCE),
        "metadata": result.metadata,
    })
}

fn shape_reference(reference: &RetrievedReference) -> Value {
    json!({
        "content": reference.content,
        "source": reference.source.as_deref().unwrap_or(UNKNOWN_SOURCE),
        "metadata": reference.metadata,
    })
}

fn shape_citation(id: usize, citation: &Citation) -> Value {
    json!({
        "id": id,
        "text": citation.text,
        "span": {
            "start": citation.span.start,
            "end": citation.span.end,
        },
        "sources": citation.references.iter().map(shape_reference).collect::<Vec<_>>(),
    })
}
