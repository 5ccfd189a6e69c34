//! 配置校验模块
//!
//! 校验规则：
//! - backend 名称非空且唯一
//! - dispatch.queue_capacity > 0
//! - influx backend 必填参数齐全 (host / database)
//! - port / tls / queue_capacity 参数格式合法 (queue_capacity > 0)

use std::collections::HashSet;

use contracts::{BackendConfig, BackendType, ContractError, RelayConfig};

/// 校验 RelayConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &RelayConfig) -> Result<(), ContractError> {
    validate_dispatch(config)?;
    validate_backend_names(config)?;
    validate_backend_params(config)?;
    Ok(())
}

/// 校验分发配置
fn validate_dispatch(config: &RelayConfig) -> Result<(), ContractError> {
    if config.dispatch.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "dispatch.queue_capacity",
            "queue_capacity must be > 0",
        ));
    }
    Ok(())
}

/// 校验 backend 名称
fn validate_backend_names(config: &RelayConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, backend) in config.backends.iter().enumerate() {
        if backend.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("backends[{}].name", idx),
                "backend name cannot be empty",
            ));
        }
        if !seen.insert(&backend.name) {
            return Err(ContractError::config_validation(
                format!("backends[name={}]", backend.name),
                "duplicate backend name",
            ));
        }
    }
    Ok(())
}

/// 校验类型特定参数
fn validate_backend_params(config: &RelayConfig) -> Result<(), ContractError> {
    for backend in &config.backends {
        if backend.backend_type == BackendType::Influx {
            validate_influx_params(backend)?;
        }
    }
    Ok(())
}

fn validate_influx_params(backend: &BackendConfig) -> Result<(), ContractError> {
    for key in ["host", "database"] {
        let present = backend
            .params
            .get(key)
            .is_some_and(|v| !v.trim().is_empty());
        if !present {
            return Err(ContractError::config_validation(
                format!("backends[{}].params.{}", backend.name, key),
                format!("influx backend requires '{key}'"),
            ));
        }
    }

    if let Some(port) = backend.params.get("port") {
        if port.parse::<u16>().is_err() {
            return Err(ContractError::config_validation(
                format!("backends[{}].params.port", backend.name),
                format!("invalid port '{port}'"),
            ));
        }
    }

    if let Some(tls) = backend.params.get("tls") {
        if tls.parse::<bool>().is_err() {
            return Err(ContractError::config_validation(
                format!("backends[{}].params.tls", backend.name),
                format!("tls must be 'true' or 'false', got '{tls}'"),
            ));
        }
    }

    if let Some(capacity) = backend.params.get("queue_capacity") {
        if !capacity.parse::<usize>().is_ok_and(|n| n > 0) {
            return Err(ContractError::config_validation(
                format!("backends[{}].params.queue_capacity", backend.name),
                format!("queue_capacity must be a positive integer, got '{capacity}'"),
            ));
        }
    }

    Ok(())
}
