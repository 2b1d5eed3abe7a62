//! Configuration schema structs

use serde::{Deserialize, Serialize};

use super::defaults;

/// Raw configuration as read from file and environment
///
/// Nothing here is validated; see [`super::ConfigLoader::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Service region
    pub region: String,
    /// Knowledge base to query (required)
    pub knowledge_base_id: Option<String>,
    /// Generation model, ARN or bare model id
    pub model_arn: Option<String>,
    /// Default result-count limit
    pub max_results: u32,
    /// Reranking model, ARN or bare model id
    pub reranking_model_arn: Option<String>,
    /// Override for the service endpoint
    pub endpoint: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            region: defaults::DEFAULT_REGION.into(),
            knowledge_base_id: None,
            model_arn: None,
            max_results: defaults::DEFAULT_MAX_RESULTS,
            reranking_model_arn: None,
            endpoint: None,
        }
    }
}

/// Validated settings the gateway runs with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeBaseSettings {
    pub region: String,
    pub knowledge_base_id: String,
    /// Fully-qualified generation model ARN
    pub model_arn: String,
    pub max_results: u32,
    /// Fully-qualified reranking model ARN
    pub reranking_model_arn: Option<String>,
    /// Base URL of the runtime service, without trailing slash
    pub endpoint: String,
}

#[cfg(test)]
impl KnowledgeBaseSettings {
    /// Settings pointing at a local stub endpoint
    pub fn for_endpoint(endpoint: impl Into<String>, knowledge_base_id: impl Into<String>) -> Self {
        let region = defaults::DEFAULT_REGION.to_string();
        Self {
            model_arn: defaults::foundation_model_arn(&region, defaults::DEFAULT_MODEL_ID),
            region,
            knowledge_base_id: knowledge_base_id.into(),
            max_results: defaults::DEFAULT_MAX_RESULTS,
            reranking_model_arn: None,
            endpoint: endpoint.into(),
        }
    }
}
