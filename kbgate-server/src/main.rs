//! kbgate - MCP server for a managed knowledge base
//!
//! Reads JSON-RPC from stdin and answers on stdout. Logs go to a file
//! unless `KBGATE_LOG_STDERR` is set.

use std::sync::Arc;

use aws_config::{BehaviorVersion, Region};
use tracing::{error, info};

use kbgate_utils::{KbgateError, LogConfig, Result};

mod backend;
mod config;
mod mcp;
mod session;

use backend::BedrockGateway;
use config::{defaults::DEFAULT_CONFIG_TOML, ConfigLoader};
use mcp::{Dispatcher, McpServer};

const USAGE: &str = "\
kbgate - MCP server for a managed knowledge base

USAGE:
    kbgate [--verbose]
    kbgate --print-config

OPTIONS:
    -v, --verbose         Log at debug level to stderr
        --print-config    Print a sample config file and exit
    -V, --version         Print version and exit
    -h, --help            Print this help and exit

ENVIRONMENT:
    BEDROCK_KNOWLEDGE_BASE_ID      Knowledge base to query (required)
    AWS_REGION                     Service region (default us-east-1)
    BEDROCK_MODEL_ARN              Generation model ARN or id
    BEDROCK_MAX_RESULTS            Default result limit, 1-100 (default 10)
    BEDROCK_RERANKING_MODEL_ARN    Reranking model ARN or id
    BEDROCK_ENDPOINT               Override the service endpoint
    KBGATE_CONFIG                  Path to a TOML config file
    KBGATE_LOG                     Log filter (default info)

AWS credentials are resolved through the standard provider chain
(environment, AWS_PROFILE, SSO, web identity, container, instance role)
and refreshed before they expire.
";

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut verbose = false;
    for arg in &args {
        match arg.as_str() {
            "-V" | "--version" => {
                println!("kbgate {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "-h" | "--help" => {
                print!("{}", USAGE);
                return Ok(());
            }
            "--print-config" => {
                print!("{}", DEFAULT_CONFIG_TOML.trim_start());
                return Ok(());
            }
            "-v" | "--verbose" => verbose = true,
            other => {
                eprint!("unknown argument: {}\n\n{}", other, USAGE);
                return Err(KbgateError::config(format!("unknown argument: {}", other)));
            }
        }
    }

    kbgate_utils::init_logging_with_config(if verbose {
        LogConfig::development()
    } else {
        LogConfig::server()
    })?;

    if let Err(e) = run().await {
        error!(error = %e, "kbgate exiting with error");
        eprintln!("kbgate: {}", e);
        return Err(e);
    }
    Ok(())
}

async fn run() -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "kbgate starting");

    let settings = ConfigLoader::load_and_validate()?;
    let aws = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(settings.region.clone()))
        .load()
        .await;
    let gateway = BedrockGateway::new(settings, aws.credentials_provider())
        .map_err(|e| KbgateError::internal(e.to_string()))?;

    let mut server = McpServer::new(Dispatcher::new(Arc::new(gateway)));
    server
        .run()
        .await
        .map_err(|e| KbgateError::internal(e.to_string()))
}
