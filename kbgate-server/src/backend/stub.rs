//! In-process knowledge base for dispatcher and server tests

use async_trait::async_trait;
use kbgate_protocol::{GenerationResult, RetrievalResult};
use parking_lot::Mutex;

use super::{BackendError, GenerateInput, KnowledgeBase, RetrieveInput};

/// Returns canned results and records every input it receives
#[derive(Default)]
pub struct StubKnowledgeBase {
    pub results: Vec<RetrievalResult>,
    pub generation: GenerationResult,
    /// Exception name to fail every call with
    pub failure: Option<String>,
    pub retrieve_calls: Mutex<Vec<RetrieveInput>>,
    pub generate_calls: Mutex<Vec<GenerateInput>>,
}

impl StubKnowledgeBase {
    pub fn with_results(results: Vec<RetrievalResult>) -> Self {
        Self {
            results,
            ..Default::default()
        }
    }

    pub fn with_generation(generation: GenerationResult) -> Self {
        Self {
            generation,
            ..Default::default()
        }
    }

    pub fn failing(code: &str) -> Self {
        Self {
            failure: Some(code.to_string()),
            ..Default::default()
        }
    }

    fn check_failure(&self) -> Result<(), BackendError> {
        match &self.failure {
            Some(code) => Err(BackendError::Service {
                status: 400,
                code: code.clone(),
                message: "Rate exceeded".into(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl KnowledgeBase for StubKnowledgeBase {
    async fn retrieve(&self, input: &RetrieveInput) -> Result<Vec<RetrievalResult>, BackendError> {
        self.retrieve_calls.lock().push(input.clone());
        self.check_failure()?;
        Ok(self.results.clone())
    }

    async fn retrieve_and_generate(
        &self,
        input: &GenerateInput,
    ) -> Result<GenerationResult, BackendError> {
        self.generate_calls.lock().push(input.clone());
        self.check_failure()?;
        Ok(self.generation.clone())
    }
}
