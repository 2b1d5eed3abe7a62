//! Default configuration values
//!
//! Used when neither the config file nor the environment sets a value.

pub const DEFAULT_REGION: &str = "us-east-1";

pub const DEFAULT_MAX_RESULTS: u32 = 10;

/// Bounds for any result-count limit, per call or configured
pub const MIN_RESULTS: u32 = 1;
pub const MAX_RESULTS: u32 = 100;

/// Generation model used when none is configured
pub const DEFAULT_MODEL_ID: &str = "anthropic.claude-3-5-sonnet-20240620-v1:0";

/// Environment variable names
pub const ENV_CONFIG_PATH: &str = "KBGATE_CONFIG";
pub const ENV_REGION: &str = "AWS_REGION";
pub const ENV_KNOWLEDGE_BASE_ID: &str = "BEDROCK_KNOWLEDGE_BASE_ID";
pub const ENV_MODEL_ARN: &str = "BEDROCK_MODEL_ARN";
pub const ENV_MAX_RESULTS: &str = "BEDROCK_MAX_RESULTS";
pub const ENV_RERANKING_MODEL_ARN: &str = "BEDROCK_RERANKING_MODEL_ARN";
pub const ENV_ENDPOINT: &str = "BEDROCK_ENDPOINT";

/// Runtime endpoint for a region
pub fn endpoint_for_region(region: &str) -> String {
    format!("https://bedrock-agent-runtime.{}.amazonaws.com", region)
}

/// ARN of a foundation model in a region
pub fn foundation_model_arn(region: &str, model_id: &str) -> String {
    format!("arn:aws:bedrock:{}::foundation-model/{}", region, model_id)
}

/// Sample configuration file, printed by `--print-config`
pub const DEFAULT_CONFIG_TOML: &str = r##"
# kbgate configuration
# Every key can also be set through the environment; env wins.

region = "us-east-1"                 # AWS_REGION
# knowledge_base_id = "ABCDEFGHIJ"   # BEDROCK_KNOWLEDGE_BASE_ID (required)
# model_arn = "anthropic.claude-3-5-sonnet-20240620-v1:0"   # BEDROCK_MODEL_ARN
max_results = 10                     # BEDROCK_MAX_RESULTS (1-100)
# reranking_model_arn = "amazon.rerank-v1:0"                # BEDROCK_RERANKING_MODEL_ARN
# endpoint = "http://localhost:4566" # BEDROCK_ENDPOINT
"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_for_region() {
        assert_eq!(
            endpoint_for_region("eu-west-1"),
            "https://bedrock-agent-runtime.eu-west-1.amazonaws.com"
        );
    }

    #[test]
    fn test_foundation_model_arn() {
        assert_eq!(
            foundation_model_arn("us-east-1", "amazon.rerank-v1:0"),
            "arn:aws:bedrock:us-east-1::foundation-model/amazon.rerank-v1:0"
        );
    }

    #[test]
    fn test_sample_config_parses() {
        let config: crate::config::AppConfig = toml::from_str(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(config.region, DEFAULT_REGION);
        assert_eq!(config.max_results, DEFAULT_MAX_RESULTS);
    }
}
