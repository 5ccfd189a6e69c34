//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use contracts::RelayConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Parameter keys whose values are never printed
const REDACTED_KEYS: &[&str] = &["password", "token"];

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    dispatch: DispatchInfo,
    backends: Vec<BackendInfo>,
}

#[derive(Serialize)]
struct DispatchInfo {
    fan_out: String,
    queue_capacity: usize,
}

#[derive(Serialize)]
struct BackendInfo {
    name: String,
    backend_type: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&config);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(config: &RelayConfig) -> ConfigInfo {
    let backends = config
        .backends
        .iter()
        .map(|b| BackendInfo {
            name: b.name.clone(),
            backend_type: b.backend_type.as_str().to_string(),
            params: b
                .params
                .iter()
                .map(|(k, v)| {
                    let shown = if REDACTED_KEYS.contains(&k.as_str()) {
                        "********".to_string()
                    } else {
                        v.clone()
                    };
                    (k.clone(), shown)
                })
                .collect(),
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", config.version),
        dispatch: DispatchInfo {
            fan_out: format!("{:?}", config.dispatch.fan_out),
            queue_capacity: config.dispatch.queue_capacity,
        },
        backends,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Metrics Relay Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("⚙️  Dispatch");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Fan-out: {}", info.dispatch.fan_out);
    println!("   └─ Queue capacity: {}", info.dispatch.queue_capacity);

    println!("\n📤 Backends ({})", info.backends.len());
    for (i, backend) in info.backends.iter().enumerate() {
        let is_last = i == info.backends.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!("   {} {} ({})", prefix, backend.name, backend.backend_type);
        for (j, (key, value)) in backend.params.iter().enumerate() {
            let param_prefix = if j == backend.params.len() - 1 {
                "└─"
            } else {
                "├─"
            };
            println!("   {}  {} {} = {}", child_prefix, param_prefix, key, value);
        }
    }

    println!();
}
