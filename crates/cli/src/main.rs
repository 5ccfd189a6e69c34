//! # Metrics Relay CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - 指标事件的扇出投递
//! - 投递结果统计输出

mod cli;
mod commands;
mod error;
mod stats;

use anyhow::Result;
use clap::Parser;
use observability::{ObservabilityConfig, Verbosity};
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_info, run_post, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging based on CLI options
    init_logging(&cli)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Metrics Relay CLI starting"
    );

    let result = match &cli.command {
        Commands::Post(args) => run_post(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    observability::init_with_config(ObservabilityConfig {
        log_format: cli.log_format.clone().into(),
        verbosity: Verbosity::from_flags(cli.quiet, cli.verbose),
        metrics_port: None,
    })
}
