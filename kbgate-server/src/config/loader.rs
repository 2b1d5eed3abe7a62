//! Configuration loader
//!
//! Defaults, then the optional TOML file, then environment overrides,
//! then validation into [`KnowledgeBaseSettings`].

use std::path::{Path, PathBuf};

use kbgate_utils::{config_file, KbgateError, Result};
use tracing::{debug, info};

use super::defaults::{self, *};
use super::{AppConfig, KnowledgeBaseSettings};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the process environment
    pub fn load() -> Result<AppConfig> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load configuration using an injectable env lookup
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<AppConfig> {
        let config = match Self::config_path(&lookup) {
            Some(path) => {
                debug!(path = %path.display(), "Loading config file");
                Self::load_from_path(&path)?
            }
            None => AppConfig::default(),
        };

        Self::apply_env(config, &lookup)
    }

    /// Explicit `KBGATE_CONFIG` path, else the XDG file when it exists
    fn config_path(lookup: &impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
        if let Some(path) = lookup(ENV_CONFIG_PATH).filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(path));
        }
        let path = config_file();
        path.exists().then_some(path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<AppConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| KbgateError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    /// Parse configuration from string
    pub fn parse(content: &str, path: &Path) -> Result<AppConfig> {
        toml::from_str(content).map_err(|e| KbgateError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Overlay environment variables; empty values are ignored
    pub fn apply_env(
        mut config: AppConfig,
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Result<AppConfig> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(region) = var(ENV_REGION) {
            config.region = region;
        }
        if let Some(id) = var(ENV_KNOWLEDGE_BASE_ID) {
            config.knowledge_base_id = Some(id);
        }
        if let Some(model) = var(ENV_MODEL_ARN) {
            config.model_arn = Some(model);
        }
        if let Some(raw) = var(ENV_MAX_RESULTS) {
            config.max_results = raw.parse().map_err(|_| {
                KbgateError::config(format!("{} must be an integer, got '{}'", ENV_MAX_RESULTS, raw))
            })?;
        }
        if let Some(model) = var(ENV_RERANKING_MODEL_ARN) {
            config.reranking_model_arn = Some(model);
        }
        if let Some(endpoint) = var(ENV_ENDPOINT) {
            config.endpoint = Some(endpoint);
        }

        Ok(config)
    }

    /// Validate configuration and resolve model references
    pub fn validate(config: &AppConfig) -> Result<KnowledgeBaseSettings> {
        let region = config.region.trim();
        if region.is_empty() {
            return Err(KbgateError::config("region must not be empty"));
        }

        let knowledge_base_id = config
            .knowledge_base_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| KbgateError::MissingSetting(ENV_KNOWLEDGE_BASE_ID.into()))?;

        if !knowledge_base_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(KbgateError::config(format!(
                "knowledge base id must be alphanumeric, got '{}'",
                knowledge_base_id
            )));
        }

        if !(MIN_RESULTS..=MAX_RESULTS).contains(&config.max_results) {
            return Err(KbgateError::config(format!(
                "max_results must be between {} and {}, got {}",
                MIN_RESULTS, MAX_RESULTS, config.max_results
            )));
        }

        let model_arn = resolve_model_arn(
            region,
            config.model_arn.as_deref().unwrap_or(DEFAULT_MODEL_ID),
        );
        let reranking_model_arn = config
            .reranking_model_arn
            .as_deref()
            .map(|model| resolve_model_arn(region, model));

        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| defaults::endpoint_for_region(region));
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(KbgateError::config(format!(
                "endpoint must be an http(s) URL, got '{}'",
                endpoint
            )));
        }

        Ok(KnowledgeBaseSettings {
            region: region.to_string(),
            knowledge_base_id: knowledge_base_id.to_string(),
            model_arn,
            max_results: config.max_results,
            reranking_model_arn,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Load and validate
    pub fn load_and_validate() -> Result<KnowledgeBaseSettings> {
        let config = Self::load()?;
        let settings = Self::validate(&config)?;
        info!(
            region = %settings.region,
            knowledge_base_id = %settings.knowledge_base_id,
            max_results = settings.max_results,
            reranking = settings.reranking_model_arn.is_some(),
            "Configuration loaded"
        );
        Ok(settings)
    }
}

/// Bare model ids become foundation-model ARNs in `region`
fn resolve_model_arn(region: &str, model: &str) -> String {
    if model.starts_with("arn:") {
        model.to_string()
    } else {
        defaults::foundation_model_arn(region, model)
    }
}
