//! HTTPS gateway to the knowledge base runtime service
//!
//! Sends signed JSON requests with `reqwest`. No retry and no backoff:
//! a failure is returned to the dispatcher immediately.

use std::time::Duration;

use async_trait::async_trait;
use aws_credential_types::provider::SharedCredentialsProvider;
use kbgate_protocol::wire::{
    GenerateRequest, GenerateResponse, GenerationConfiguration, KnowledgeBaseConfiguration,
    RetrievalConfiguration, RetrieveAndGenerateConfiguration, RetrieveRequest, RetrieveResponse,
    TextInput, RAG_TYPE_KNOWLEDGE_BASE,
};
use kbgate_protocol::{GenerationResult, RetrievalResult};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as HttpClient, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::KnowledgeBaseSettings;

use super::signing::RequestSigner;
use super::{BackendError, GenerateInput, KnowledgeBase, RetrieveInput};

/// Signing name of the runtime service
const SIGNING_SERVICE: &str = "bedrock";

/// TCP connection timeout; requests themselves have no deadline
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Knowledge base gateway over the service's REST API
pub struct BedrockGateway {
    http: HttpClient,
    settings: KnowledgeBaseSettings,
    signer: RequestSigner,
}

impl BedrockGateway {
    /// Create a gateway; missing credentials surface on the first call
    pub fn new(
        settings: KnowledgeBaseSettings,
        credentials: Option<SharedCredentialsProvider>,
    ) -> Result<Self, BackendError> {
        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| BackendError::Request(format!("failed to build HTTP client: {}", e)))?;

        let signer = RequestSigner::new(credentials, settings.region.clone(), SIGNING_SERVICE);
        if !signer.has_provider() {
            warn!("No AWS credentials provider; knowledge base calls will fail");
        }

        Ok(Self {
            http,
            settings,
            signer,
        })
    }

    fn retrieval_configuration(&self, max_results: Option<u32>) -> RetrievalConfiguration {
        RetrievalConfiguration::new(
            max_results.unwrap_or(self.settings.max_results),
            self.settings.reranking_model_arn.as_deref(),
        )
    }

    /// Build the retrieve request body
    pub fn retrieve_request(&self, input: &RetrieveInput) -> RetrieveRequest {
        RetrieveRequest {
            retrieval_query: TextInput {
                text: input.query.clone(),
            },
            retrieval_configuration: self.retrieval_configuration(input.max_results),
            next_token: input.next_token.clone(),
        }
    }

    /// Build the retrieve-and-generate request body
    pub fn generate_request(&self, input: &GenerateInput) -> GenerateRequest {
        GenerateRequest {
            input: TextInput {
                text: input.query.clone(),
            },
            retrieve_and_generate_configuration: RetrieveAndGenerateConfiguration {
                kind: RAG_TYPE_KNOWLEDGE_BASE.into(),
                knowledge_base_configuration: KnowledgeBaseConfiguration {
                    knowledge_base_id: self.settings.knowledge_base_id.clone(),
                    model_arn: self.settings.model_arn.clone(),
                    retrieval_configuration: self.retrieval_configuration(None),
                    generation_configuration: input
                        .system_prompt
                        .as_deref()
                        .map(GenerationConfiguration::with_prompt),
                },
            },
            session_id: input.session_token.clone(),
        }
    }

    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, BackendError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let url = Url::parse(&format!("{}{}", self.settings.endpoint, path))
            .map_err(|e| BackendError::Request(format!("invalid endpoint URL: {}", e)))?;
        let payload =
            serde_json::to_vec(body).map_err(|e| BackendError::Request(e.to_string()))?;

        let signed = self
            .signer
            .sign("POST", url.as_str(), &[("content-type", "application/json")], &payload)
            .await?;

        let mut request = self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(payload);
        for (name, value) in &signed {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|e| BackendError::Transport {
            endpoint: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_type = response
                .headers()
                .get("x-amzn-errortype")
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            let body_text = response.text().await.unwrap_or_default();
            return Err(BackendError::from_service_response(
                status.as_u16(),
                error_type.as_deref(),
                &body_text,
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BackendError::Decode(format!("failed to read response body: {}", e)))?;
        debug!(path, bytes = bytes.len(), "Knowledge base response received");

        serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[async_trait]
impl KnowledgeBase for BedrockGateway {
    async fn retrieve(&self, input: &RetrieveInput) -> Result<Vec<RetrievalResult>, BackendError> {
        let path = format!("/knowledgebases/{}/retrieve", self.settings.knowledge_base_id);
        let response: RetrieveResponse =
            self.post_json(&path, &self.retrieve_request(input)).await?;

        let results: Vec<RetrievalResult> = response.into();
        info!(
            knowledge_base_id = %self.settings.knowledge_base_id,
            results = results.len(),
            "Retrieve completed"
        );
        Ok(results)
    }

    async fn retrieve_and_generate(
        &self,
        input: &GenerateInput,
    ) -> Result<GenerationResult, BackendError> {
        let response: GenerateResponse = self
            .post_json("/retrieveAndGenerate", &self.generate_request(input))
            .await?;

        let result: GenerationResult = response.into();
        info!(
            knowledge_base_id = %self.settings.knowledge_base_id,
            citations = result.citations.len(),
            continued = input.session_token.is_some(),
            "Retrieve and generate completed"
        );
        Ok(result)
    }
}
