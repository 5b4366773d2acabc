//! Content lake MCP Server
//!
//! # Usage
//!
//! ```bash
//! lake-mcp [--config <file>] [--project-id <id>] [--dataset <name>]
//! ```
//!
//! # Environment Variables
//!
//! - `LAKE_PROJECT_ID`, `LAKE_DATASET`, `LAKE_API_TOKEN`, `LAKE_API_VERSION`,
//!   `LAKE_API_HOST`: connection settings, overriding the config file
//! - `RUST_LOG`: Control log verbosity (default: `lake_mcp=info`)
//!
//! # Protocol
//!
//! The server communicates via JSON-RPC 2.0 over stdio:
//! - Requests/responses go through stdout
//! - Logs go to stderr (to avoid interfering with the protocol)

use std::path::PathBuf;

use clap::Parser;
use lake_mcp::LakeMcpServer;
use lake_store::{StoreConfig, StoreOverrides};

/// MCP server for a content lake dataset
#[derive(Parser)]
#[command(name = "lake-mcp")]
#[command(about = "MCP server for content lake documents and releases")]
#[command(version)]
struct Args {
    /// TOML file with a [store] table
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Project id
    #[arg(long, env = "LAKE_PROJECT_ID")]
    project_id: Option<String>,

    /// Dataset name
    #[arg(long, env = "LAKE_DATASET")]
    dataset: Option<String>,

    /// API token
    #[arg(long, env = "LAKE_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// API version (default 2025-02-19)
    #[arg(long, env = "LAKE_API_VERSION")]
    api_version: Option<String>,

    /// API host (default api.sanity.io)
    #[arg(long, env = "LAKE_API_HOST")]
    api_host: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl Args {
    fn store_config(self) -> lake_store::Result<StoreConfig> {
        let base = match &self.config {
            Some(path) => StoreConfig::load(path)?,
            None => StoreConfig::default(),
        };
        Ok(base.with_overrides(StoreOverrides {
            project_id: self.project_id,
            dataset: self.dataset,
            token: self.token,
            api_version: self.api_version,
            api_host: self.api_host,
            timeout_secs: self.timeout_secs,
        }))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging to stderr (stdout is reserved for MCP protocol)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lake_mcp=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Args::parse().store_config()?;

    tracing::info!(
        project = %config.project_id,
        dataset = %config.dataset,
        api_version = %config.api_version,
        "Starting lake-mcp server"
    );

    let server = LakeMcpServer::from_config(config)?;
    server.run().await?;

    Ok(())
}
