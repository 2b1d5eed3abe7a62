//! MCP tool definitions for kbgate
//!
//! Defines the tools exposed to MCP clients. The names double as the
//! dispatch keys in [`super::dispatcher::ToolCall::parse`].

use super::protocol::Tool;
use crate::config::defaults::{MAX_RESULTS, MIN_RESULTS};

pub const RETRIEVE_KNOWLEDGE: &str = "retrieve_knowledge";
pub const RETRIEVE_AND_GENERATE: &str = "retrieve_and_generate";
pub const CREATE_SESSION: &str = "create_session";
pub const LIST_SESSIONS: &str = "list_sessions";

/// Get all tool definitions for the kbgate MCP server
pub fn get_tool_definitions() -> Vec<Tool> {
    vec![
        Tool {
            name: RETRIEVE_KNOWLEDGE.into(),
            description: "Search the knowledge base and return the most relevant passages with scores and sources".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query"
                    },
                    "sessionId": {
                        "type": "string",
                        "description": "Continuation token from a previous retrieval"
                    },
                    "maxResults": {
                        "type": "integer",
                        "description": "Maximum number of results to return (default from configuration)",
                        "minimum": MIN_RESULTS,
                        "maximum": MAX_RESULTS
                    }
                },
                "required": ["query"]
            }),
        },
        Tool {
            name: RETRIEVE_AND_GENERATE.into(),
            description: "Answer a question from the knowledge base, with citations. Pass sessionId to continue a conversation".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Question to answer"
                    },
                    "sessionId": {
                        "type": "string",
                        "description": "Session to continue (from create_session or list_sessions)"
                    },
                    "systemPrompt": {
                        "type": "string",
                        "description": "Prompt template for generation; may reference $search_results$"
                    }
                },
                "required": ["query"]
            }),
        },
        Tool {
            name: CREATE_SESSION.into(),
            description: "Create a conversation session for retrieve_and_generate".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "sessionName": {
                        "type": "string",
                        "description": "Session name. Generated if omitted; an existing name is reset"
                    }
                }
            }),
        },
        Tool {
            name: LIST_SESSIONS.into(),
            description: "List all sessions with their continuation state".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        },
    ]
}
