//! Request and response bodies of the knowledge base runtime service
//!
//! Field names follow the service's camelCase JSON. Responses are
//! deserialized leniently: every field the service may omit is an
//! `Option` or `#[serde(default)]`, and the `From` conversions into
//! [`crate::types`] fill in the defaults.

use serde::{Deserialize, Serialize};

use crate::types::{
    Citation, GenerationResult, Metadata, RetrievalResult, RetrievedReference, TextSpan,
};

/// Reranking configuration type understood by the service
pub const RERANKING_TYPE_BEDROCK: &str = "BEDROCK_RERANKING_MODEL";

/// Retrieve-and-generate configuration type for knowledge bases
pub const RAG_TYPE_KNOWLEDGE_BASE: &str = "KNOWLEDGE_BASE";

// ==================== Requests ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextInput {
    pub text: String,
}

/// Body of `POST /knowledgebases/{id}/retrieve`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveRequest {
    pub retrieval_query: TextInput,
    pub retrieval_configuration: RetrievalConfiguration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalConfiguration {
    pub vector_search_configuration: VectorSearchConfiguration,
}

impl RetrievalConfiguration {
    /// Vector search returning `number_of_results` items, optionally reranked
    pub fn new(number_of_results: u32, reranking_model_arn: Option<&str>) -> Self {
        Self {
            vector_search_configuration: VectorSearchConfiguration {
                number_of_results,
                reranking_configuration: reranking_model_arn.map(RerankingConfiguration::bedrock),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorSearchConfiguration {
    pub number_of_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reranking_configuration: Option<RerankingConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RerankingConfiguration {
    #[serde(rename = "type")]
    pub kind: String,
    pub bedrock_reranking_configuration: BedrockRerankingConfiguration,
}

impl RerankingConfiguration {
    pub fn bedrock(model_arn: &str) -> Self {
        Self {
            kind: RERANKING_TYPE_BEDROCK.into(),
            bedrock_reranking_configuration: BedrockRerankingConfiguration {
                model_configuration: ModelConfiguration {
                    model_arn: model_arn.into(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedrockRerankingConfiguration {
    pub model_configuration: ModelConfiguration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfiguration {
    pub model_arn: String,
}

/// Body of `POST /retrieveAndGenerate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub input: TextInput,
    pub retrieve_and_generate_configuration: RetrieveAndGenerateConfiguration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveAndGenerateConfiguration {
    #[serde(rename = "type")]
    pub kind: String,
    pub knowledge_base_configuration: KnowledgeBaseConfiguration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseConfiguration {
    pub knowledge_base_id: String,
    pub model_arn: String,
    pub retrieval_configuration: RetrievalConfiguration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_configuration: Option<GenerationConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfiguration {
    pub prompt_template: PromptTemplate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptTemplate {
    pub text_prompt_template: String,
}

impl GenerationConfiguration {
    pub fn with_prompt(template: impl Into<String>) -> Self {
        Self {
            prompt_template: PromptTemplate {
                text_prompt_template: template.into(),
            },
        }
    }
}

// ==================== Responses ====================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WireContent {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UriLocation {
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UrlLocation {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IdLocation {
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SqlLocation {
    pub query: Option<String>,
}

/// Source location of retrieved content; the service fills one variant
/// matching `type`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireLocation {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub s3_location: Option<UriLocation>,
    pub web_location: Option<UrlLocation>,
    pub confluence_location: Option<UrlLocation>,
    pub salesforce_location: Option<UrlLocation>,
    pub share_point_location: Option<UrlLocation>,
    pub kendra_document_location: Option<UriLocation>,
    pub custom_document_location: Option<IdLocation>,
    pub sql_location: Option<SqlLocation>,
}

impl WireLocation {
    /// First populated locator, in the order the service documents them
    pub fn locator(&self) -> Option<String> {
        let uri = |l: &Option<UriLocation>| l.as_ref().and_then(|l| l.uri.clone());
        let url = |l: &Option<UrlLocation>| l.as_ref().and_then(|l| l.url.clone());

        uri(&self.s3_location)
            .or_else(|| url(&self.web_location))
            .or_else(|| url(&self.confluence_location))
            .or_else(|| url(&self.salesforce_location))
            .or_else(|| url(&self.share_point_location))
            .or_else(|| uri(&self.kendra_document_location))
            .or_else(|| self.custom_document_location.as_ref().and_then(|l| l.id.clone()))
            .or_else(|| self.sql_location.as_ref().and_then(|l| l.query.clone()))
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WireRetrievalResult {
    pub content: Option<WireContent>,
    pub score: Option<f64>,
    pub location: Option<WireLocation>,
    pub metadata: Option<Metadata>,
}

/// Response of the retrieve call
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveResponse {
    #[serde(default)]
    pub retrieval_results: Vec<WireRetrievalResult>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WireSpan {
    pub start: Option<u32>,
    pub end: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TextResponsePart {
    pub text: Option<String>,
    pub span: Option<WireSpan>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedResponsePart {
    pub text_response_part: Option<TextResponsePart>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WireReference {
    pub content: Option<WireContent>,
    pub location: Option<WireLocation>,
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCitation {
    pub generated_response_part: Option<GeneratedResponsePart>,
    pub retrieved_references: Option<Vec<WireReference>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WireOutput {
    pub text: Option<String>,
}

/// Response of the retrieve-and-generate call
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub output: Option<WireOutput>,
    pub session_id: Option<String>,
    pub citations: Option<Vec<WireCitation>>,
}

// ==================== Normalization ====================

fn content_text(content: Option<WireContent>) -> String {
    content.and_then(|c| c.text).unwrap_or_default()
}

impl From<WireRetrievalResult> for RetrievalResult {
    fn from(wire: WireRetrievalResult) -> Self {
        Self {
            source: wire.location.as_ref().and_then(WireLocation::locator),
            content: content_text(wire.content),
            score: wire.score.unwrap_or(0.0),
            metadata: wire.metadata.unwrap_or_default(),
        }
    }
}

impl From<WireReference> for RetrievedReference {
    fn from(wire: WireReference) -> Self {
        Self {
            source: wire.location.as_ref().and_then(WireLocation::locator),
            content: content_text(wire.content),
            metadata: wire.metadata.unwrap_or_default(),
        }
    }
}

impl From<WireCitation> for Citation {
    fn from(wire: WireCitation) -> Self {
        let part = wire
            .generated_response_part
            .and_then(|p| p.text_response_part)
            .unwrap_or_default();
        let span = part.span.unwrap_or_default();

        Self {
            text: part.text.unwrap_or_default(),
            span: TextSpan {
                start: span.start.unwrap_or(0),
                end: span.end.unwrap_or(0),
            },
            references: wire
                .retrieved_references
                .unwrap_or_default()
                .into_iter()
                .map(RetrievedReference::from)
                .collect(),
        }
    }
}

impl From<RetrieveResponse> for Vec<RetrievalResult> {
    fn from(response: RetrieveResponse) -> Self {
        response
            .retrieval_results
            .into_iter()
            .map(RetrievalResult::from)
            .collect()
    }
}

impl From<GenerateResponse> for GenerationResult {
    fn from(response: GenerateResponse) -> Self {
        Self {
            text: response.output.and_then(|o| o.text).unwrap_or_default(),
            citations: response
                .citations
                .unwrap_or_default()
                .into_iter()
                .map(Citation::from)
                .collect(),
            session_token: response.session_id,
        }
    }
}
