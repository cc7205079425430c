//! 配置校验模块
//!
//! 校验规则：
//! - 字段取值范围（`validator` derive 规则）
//! - sink 名称唯一且非空
//! - 应答超时不短于单次读取超时
//! - 单次读取大小不超过分帧上限

use std::collections::HashSet;

use contracts::{ContractError, RadarBlueprint};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// 校验 RadarBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &RadarBlueprint) -> Result<(), ContractError> {
    validate_field_rules(blueprint)?;
    validate_sinks(blueprint)?;
    validate_timeouts(blueprint)?;
    validate_read_chunk(blueprint)?;
    Ok(())
}

/// derive 规则 (range / length)
fn validate_field_rules(blueprint: &RadarBlueprint) -> Result<(), ContractError> {
    blueprint.validate().map_err(|errors| {
        let (field, message) =
            first_error(&errors, "").unwrap_or_else(|| (String::new(), errors.to_string()));
        ContractError::config_validation(field, message)
    })
}

/// 取字典序最小的错误路径，保证报错稳定
fn first_error(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    fields.into_iter().find_map(|(field, kind)| {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => list.first().map(|e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("failed '{}' rule", e.code));
                (path, message)
            }),
            ValidationErrorsKind::Struct(inner) => first_error(inner, &path),
            ValidationErrorsKind::List(items) => items
                .iter()
                .find_map(|(idx, inner)| first_error(inner, &format!("{path}[{idx}]"))),
        }
    })
}

/// 校验 sink 配置
fn validate_sinks(blueprint: &RadarBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
    }
    Ok(())
}

/// 应答等待至少要覆盖一次读取
fn validate_timeouts(blueprint: &RadarBlueprint) -> Result<(), ContractError> {
    let read = blueprint.link.read_timeout_ms;
    let ack = blueprint.control.ack_timeout_ms;
    if ack < read {
        return Err(ContractError::config_validation(
            "control.ack_timeout_ms / link.read_timeout_ms",
            format!("ack_timeout_ms ({ack}) must be >= read_timeout_ms ({read})"),
        ));
    }
    Ok(())
}

fn validate_read_chunk(blueprint: &RadarBlueprint) -> Result<(), ContractError> {
    let chunk = blueprint.link.read_chunk;
    let max = blueprint.pipeline.max_frame_len;
    if chunk > max {
        return Err(ContractError::config_validation(
            "link.read_chunk / pipeline.max_frame_len",
            format!("read_chunk ({chunk}) must be <= max_frame_len ({max})"),
        ));
    }
    Ok(())
}
