//! Tool call routing
//!
//! A call is validated into a [`ToolCall`] in one step before any handler
//! runs. Handlers only ever see typed, bounds-checked input.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::backend::KnowledgeBase;
use crate::config::defaults::{MAX_RESULTS, MIN_RESULTS};
use crate::session::SessionRegistry;

use super::error::McpError;
use super::handlers::ToolContext;
use super::protocol::{Tool, ToolResult};
use super::tools::{
    get_tool_definitions, CREATE_SESSION, LIST_SESSIONS, RETRIEVE_AND_GENERATE,
    RETRIEVE_KNOWLEDGE,
};

/// Parsed and validated tool parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    RetrieveKnowledge {
        query: String,
        session_id: Option<String>,
        max_results: Option<u32>,
    },
    RetrieveAndGenerate {
        query: String,
        session_id: Option<String>,
        system_prompt: Option<String>,
    },
    CreateSession {
        session_name: Option<String>,
    },
    ListSessions,
}

impl ToolCall {
    /// Validate `arguments` for the tool called `name`
    ///
    /// A null argument value counts as absent.
    pub fn parse(name: &str, arguments: &Value) -> Result<Self, McpError> {
        let empty = Map::new();
        let args = match arguments {
            Value::Null => &empty,
            Value::Object(map) => map,
            _ => {
                return Err(McpError::InvalidParams(
                    "Tool arguments must be an object".into(),
                ))
            }
        };

        match name {
            RETRIEVE_KNOWLEDGE => Ok(ToolCall::RetrieveKnowledge {
                query: required_query(args)?,
                session_id: optional_handle(args, "sessionId")?,
                max_results: optional_result_limit(args, "maxResults")?,
            }),
            RETRIEVE_AND_GENERATE => Ok(ToolCall::RetrieveAndGenerate {
                query: required_query(args)?,
                session_id: optional_handle(args, "sessionId")?,
                system_prompt: optional_string(args, "systemPrompt")?,
            }),
            CREATE_SESSION => Ok(ToolCall::CreateSession {
                session_name: optional_handle(args, "sessionName")?,
            }),
            LIST_SESSIONS => Ok(ToolCall::ListSessions),
            _ => Err(McpError::UnknownTool(name.into())),
        }
    }

    /// Catalog name of this call
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::RetrieveKnowledge { .. } => RETRIEVE_KNOWLEDGE,
            ToolCall::RetrieveAndGenerate { .. } => RETRIEVE_AND_GENERATE,
            ToolCall::CreateSession { .. } => CREATE_SESSION,
            ToolCall::ListSessions => LIST_SESSIONS,
        }
    }
}

fn required_query(args: &Map<String, Value>) -> Result<String, McpError> {
    match args.get("query") {
        Some(Value::String(query)) if !query.trim().is_empty() => Ok(query.clone()),
        Some(Value::String(_)) => Err(McpError::InvalidParams(
            "'query' must not be empty".into(),
        )),
        None | Some(Value::Null) => Err(McpError::InvalidParams(
            "Missing 'query' parameter".into(),
        )),
        Some(_) => Err(McpError::InvalidParams("'query' must be a string".into())),
    }
}

fn optional_string(args: &Map<String, Value>, field: &str) -> Result<Option<String>, McpError> {
    match args.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(McpError::InvalidParams(format!(
            "'{}' must be a string",
            field
        ))),
    }
}

/// An empty handle counts as absent
fn optional_handle(args: &Map<String, Value>, field: &str) -> Result<Option<String>, McpError> {
    Ok(optional_string(args, field)?.filter(|s| !s.is_empty()))
}

fn optional_result_limit(
    args: &Map<String, Value>,
    field: &str,
) -> Result<Option<u32>, McpError> {
    let value = match args.get(field) {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => value,
    };

    let n = value.as_i64().ok_or_else(|| {
        McpError::InvalidParams(format!("'{}' must be an integer", field))
    })?;

    if n < i64::from(MIN_RESULTS) || n > i64::from(MAX_RESULTS) {
        return Err(McpError::InvalidParams(format!(
            "'{}' must be between {} and {}, got {}",
            field, MIN_RESULTS, MAX_RESULTS, n
        )));
    }

    // In range, so the conversion cannot fail
    Ok(u32::try_from(n).ok())
}

/// Routes tool calls to their handlers
///
/// Owns the session registry; clones share it.
#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn KnowledgeBase>,
    sessions: Arc<Mutex<SessionRegistry>>,
}

impl Dispatcher {
    /// Create a dispatcher with an empty session registry
    pub fn new(backend: Arc<dyn KnowledgeBase>) -> Self {
        Self {
            backend,
            sessions: Arc::new(Mutex::new(SessionRegistry::new())),
        }
    }

    /// The catalog of callable tools
    pub fn list_capabilities(&self) -> Vec<Tool> {
        get_tool_definitions()
    }

    /// Shared session registry
    pub fn sessions(&self) -> &Arc<Mutex<SessionRegistry>> {
        &self.sessions
    }

    /// Validate and execute one tool call
    ///
    /// Errors are always one of the three caller-facing kinds; anything
    /// unexpected is reported as `Internal` naming the tool.
    pub async fn call(&self, name: &str, arguments: &Value) -> Result<ToolResult, McpError> {
        let call = ToolCall::parse(name, arguments).map_err(|e| {
            warn!(tool = name, error = %e, "Rejected tool call");
            e
        })?;
        let tool = call.name();
        debug!(tool, "Dispatching tool call");

        let ctx = ToolContext::new(self.backend.as_ref(), &self.sessions);
        let output = match call {
            ToolCall::RetrieveKnowledge {
                query,
                session_id,
                max_results,
            } => ctx.retrieve_knowledge(query, session_id, max_results).await,
            ToolCall::RetrieveAndGenerate {
                query,
                session_id,
                system_prompt,
            } => {
                ctx.retrieve_and_generate(query, session_id, system_prompt)
                    .await
            }
            ToolCall::CreateSession { session_name } => ctx.create_session(session_name),
            ToolCall::ListSessions => ctx.list_sessions(),
        }
        .map_err(|e| contain(tool, e))?;

        ToolResult::json(&output).map_err(|e| contain(tool, e.into()))
    }
}

/// Pass typed errors through, fold anything else into `Internal`
fn contain(tool: &str, err: McpError) -> McpError {
    match err {
        McpError::InvalidParams(_)
        | McpError::MethodNotFound(_)
        | McpError::UnknownTool(_)
        | McpError::Internal(_) => err,
        other => McpError::Internal(format!("Error in {}: {}", tool, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::stub::StubKnowledgeBase;
    use crate::mcp::error::ErrorKind;
    use kbgate_protocol::{GenerationResult, RetrievalResult};
    use serde_json::json;

    fn dispatcher(backend: StubKnowledgeBase) -> (Dispatcher, Arc<StubKnowledgeBase>) {
        let backend = Arc::new(backend);
        (Dispatcher::new(backend.clone()), backend)
    }

    fn output(result: &ToolResult) -> Value {
        serde_json::from_str(result.first_text().unwrap()).unwrap()
    }

    fn minimal_args(tool: &Tool) -> Value {
        let required = tool.input_schema["required"].as_array().cloned().unwrap_or_default();
        let mut args = Map::new();
        for field in required {
            if let Some(field) = field.as_str() {
                args.insert(field.to_string(), json!("x"));
            }
        }
        Value::Object(args)
    }

    // ==================== Parsing ====================

    #[test]
    fn test_parse_retrieve_knowledge() {
        let call = ToolCall::parse(
            RETRIEVE_KNOWLEDGE,
            &json!({"query": "solar", "sessionId": "tok", "maxResults": 50}),
        )
        .unwrap();

        assert_eq!(
            call,
            ToolCall::RetrieveKnowledge {
                query: "solar".into(),
                session_id: Some("tok".into()),
                max_results: Some(50),
            }
        );
    }

    #[test]
    fn test_parse_null_arguments_and_fields() {
        assert_eq!(
            ToolCall::parse(LIST_SESSIONS, &Value::Null).unwrap(),
            ToolCall::ListSessions
        );
        assert_eq!(
            ToolCall::parse(
                RETRIEVE_AND_GENERATE,
                &json!({"query": "q", "sessionId": null, "systemPrompt": null})
            )
            .unwrap(),
            ToolCall::RetrieveAndGenerate {
                query: "q".into(),
                session_id: None,
                system_prompt: None,
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_query() {
        for args in [
            json!({}),
            json!({"query": ""}),
            json!({"query": "   "}),
            json!({"query": 42}),
            json!({"query": null}),
        ] {
            let err = ToolCall::parse(RETRIEVE_KNOWLEDGE, &args).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParams, "args {}", args);
        }
    }

    #[test]
    fn test_parse_rejects_wrong_types() {
        let err = ToolCall::parse(RETRIEVE_AND_GENERATE, &json!({"query": "q", "sessionId": 7}))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParams);

        let err = ToolCall::parse(CREATE_SESSION, &json!({"sessionName": ["a"]})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParams);

        let err = ToolCall::parse(LIST_SESSIONS, &json!("not an object")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParams);
    }

    #[test]
    fn test_parse_max_results_bounds() {
        for bad in [json!(0), json!(101), json!(-1), json!(2.5), json!("10")] {
            let err = ToolCall::parse(RETRIEVE_KNOWLEDGE, &json!({"query": "x", "maxResults": bad}))
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParams, "maxResults {}", bad);
        }
        for good in [1, 50, 100] {
            assert!(
                ToolCall::parse(RETRIEVE_KNOWLEDGE, &json!({"query": "x", "maxResults": good}))
                    .is_ok()
            );
        }
    }

    #[test]
    fn test_parse_empty_session_name_means_generated() {
        assert_eq!(
            ToolCall::parse(CREATE_SESSION, &json!({"sessionName": ""})).unwrap(),
            ToolCall::CreateSession { session_name: None }
        );
    }

    #[test]
    fn test_parse_empty_session_id_means_absent() {
        assert_eq!(
            ToolCall::parse(RETRIEVE_KNOWLEDGE, &json!({"query": "q", "sessionId": ""})).unwrap(),
            ToolCall::RetrieveKnowledge {
                query: "q".into(),
                session_id: None,
                max_results: None,
            }
        );
        assert_eq!(
            ToolCall::parse(RETRIEVE_AND_GENERATE, &json!({"query": "q", "sessionId": ""}))
                .unwrap(),
            ToolCall::RetrieveAndGenerate {
                query: "q".into(),
                session_id: None,
                system_prompt: None,
            }
        );
    }

    #[test]
    fn test_call_name_matches_catalog() {
        let names: Vec<String> = get_tool_definitions().into_iter().map(|t| t.name).collect();
        for call in [
            ToolCall::RetrieveKnowledge {
                query: "q".into(),
                session_id: None,
                max_results: None,
            },
            ToolCall::RetrieveAndGenerate {
                query: "q".into(),
                session_id: None,
                system_prompt: None,
            },
            ToolCall::CreateSession { session_name: None },
            ToolCall::ListSessions,
        ] {
            assert!(names.iter().any(|n| n == call.name()));
        }
    }

    // ==================== Catalog ====================

    #[tokio::test]
    async fn test_catalog_dispatch_parity() {
        let (dispatcher, _) = dispatcher(StubKnowledgeBase::default());

        for tool in dispatcher.list_capabilities() {
            let result = dispatcher.call(&tool.name, &minimal_args(&tool)).await;
            if let Err(e) = result {
                assert_ne!(e.kind(), ErrorKind::MethodNotFound, "tool {}", tool.name);
            }
        }
    }

    #[test]
    fn test_list_capabilities_is_stable() {
        let (dispatcher, _) = dispatcher(StubKnowledgeBase::default());
        assert_eq!(dispatcher.list_capabilities(), dispatcher.list_capabilities());
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (dispatcher, _) = dispatcher(StubKnowledgeBase::default());

        let err = dispatcher
            .call("delete_everything", &json!({}))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MethodNotFound);
        assert!(err.to_string().contains("delete_everything"));
    }

    // ==================== Validation ====================

    #[tokio::test]
    async fn test_validation_runs_before_backend() {
        let (dispatcher, backend) = dispatcher(StubKnowledgeBase::default());

        for args in [
            json!({}),
            json!({"query": "x", "maxResults": 0}),
            json!({"query": "x", "maxResults": 101}),
        ] {
            let err = dispatcher.call(RETRIEVE_KNOWLEDGE, &args).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParams);
        }
        assert!(backend.retrieve_calls.lock().is_empty());

        let ok = dispatcher
            .call(RETRIEVE_KNOWLEDGE, &json!({"query": "x", "maxResults": 50}))
            .await;
        assert!(ok.is_ok());
        assert_eq!(backend.retrieve_calls.lock()[0].max_results, Some(50));
    }

    // ==================== Tools ====================

    #[tokio::test]
    async fn test_rank_assignment() {
        let (dispatcher, _) = dispatcher(StubKnowledgeBase::with_results(vec![
            RetrievalResult::new("A", 0.95),
            RetrievalResult::new("B", 0.88),
        ]));

        let result = dispatcher
            .call(RETRIEVE_KNOWLEDGE, &json!({"query": "solar"}))
            .await
            .unwrap();
        let output = output(&result);

        assert_eq!(output["results"][0]["rank"], 1);
        assert_eq!(output["results"][0]["content"], "A");
        assert_eq!(output["results"][1]["rank"], 2);
        assert_eq!(output["totalResults"], 2);
    }

    #[tokio::test]
    async fn test_session_echo() {
        let (dispatcher, _) = dispatcher(StubKnowledgeBase::default());

        let created = dispatcher
            .call(CREATE_SESSION, &json!({"sessionName": "energy"}))
            .await
            .unwrap();
        assert_eq!(
            output(&created),
            json!({"sessionId": "energy", "message": "Session created successfully"})
        );

        let listed = dispatcher.call(LIST_SESSIONS, &json!({})).await.unwrap();
        let listed = output(&listed);
        assert_eq!(listed["count"], 1);
        assert_eq!(listed["sessions"][0]["sessionId"], "energy");
        assert_eq!(listed["sessions"][0]["active"], false);
    }

    #[tokio::test]
    async fn test_session_update_and_resume() {
        let (dispatcher, backend) = dispatcher(StubKnowledgeBase::with_generation(GenerationResult {
            text: "r".into(),
            citations: vec![],
            session_token: Some("tok-1".into()),
        }));

        dispatcher
            .call(CREATE_SESSION, &json!({"sessionName": "energy"}))
            .await
            .unwrap();

        let first = dispatcher
            .call(RETRIEVE_AND_GENERATE, &json!({"query": "q", "sessionId": "energy"}))
            .await
            .unwrap();
        assert_eq!(output(&first)["sessionId"], "tok-1");
        assert_eq!(
            dispatcher.sessions().lock().resolve("energy"),
            crate::session::Resolution::Registered(Some("tok-1".into()))
        );

        dispatcher
            .call(RETRIEVE_AND_GENERATE, &json!({"query": "q", "sessionId": "energy"}))
            .await
            .unwrap();

        let calls = backend.generate_calls.lock();
        assert_eq!(calls[0].session_token, None);
        assert_eq!(calls[1].session_token.as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn test_empty_session_id_is_not_sent_or_stored() {
        let (dispatcher, backend) = dispatcher(StubKnowledgeBase::with_generation(GenerationResult {
            text: "r".into(),
            citations: vec![],
            session_token: Some("tok-1".into()),
        }));

        dispatcher
            .call(RETRIEVE_AND_GENERATE, &json!({"query": "q", "sessionId": ""}))
            .await
            .unwrap();
        dispatcher
            .call(RETRIEVE_KNOWLEDGE, &json!({"query": "q", "sessionId": ""}))
            .await
            .unwrap();

        assert_eq!(backend.generate_calls.lock()[0].session_token, None);
        assert_eq!(backend.retrieve_calls.lock()[0].next_token, None);

        let sessions = dispatcher.sessions().lock();
        assert!(!sessions.contains(""));
        assert_eq!(sessions.len(), 1);
        assert!(sessions.list()[0].handle.starts_with("session_"));
    }

    #[tokio::test]
    async fn test_create_session_overwrite_resets() {
        let (dispatcher, _) = dispatcher(StubKnowledgeBase::with_generation(GenerationResult {
            text: "r".into(),
            citations: vec![],
            session_token: Some("tok-1".into()),
        }));

        dispatcher
            .call(RETRIEVE_AND_GENERATE, &json!({"query": "q", "sessionId": "energy"}))
            .await
            .unwrap();
        dispatcher
            .call(CREATE_SESSION, &json!({"sessionName": "energy"}))
            .await
            .unwrap();

        let listed = dispatcher.call(LIST_SESSIONS, &Value::Null).await.unwrap();
        let listed = output(&listed);
        assert_eq!(listed["count"], 1);
        assert_eq!(listed["sessions"][0]["active"], false);
    }

    #[tokio::test]
    async fn test_backend_failure_propagation() {
        let (dispatcher, _) = dispatcher(StubKnowledgeBase::failing("ThrottlingException"));

        let err = dispatcher
            .call(RETRIEVE_KNOWLEDGE, &json!({"query": "q"}))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.to_string().contains("ThrottlingException"));
        assert!(err.to_string().contains("retrieve_knowledge"));
    }

    #[test]
    fn test_contain_wraps_transport_errors() {
        let io = McpError::Io(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        let contained = contain(LIST_SESSIONS, io);

        assert_eq!(contained.kind(), ErrorKind::Internal);
        assert!(contained.to_string().contains("Error in list_sessions"));

        let typed = contain(LIST_SESSIONS, McpError::InvalidParams("bad".into()));
        assert!(matches!(typed, McpError::InvalidParams(msg) if msg == "bad"));
    }
}
