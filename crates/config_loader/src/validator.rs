//! 配置校验模块
//!
//! 校验规则：
//! - 字段规则 (email / url / timeout_ms > 0 / 路径) 由 `Validate` derive 负责
//! - account_id / email / app_secret_token 唯一
//! - destination id 唯一，且引用的 account 存在
//! - http_method 属于 GET/POST/PUT/PATCH/DELETE
//! - url 为 http(s) 绝对地址
//! - header 名称与值均为合法 HTTP header 内容
//! - ingest_path 不得占用管理 API 的 `/api` 前缀，不得包含路由参数

use std::collections::HashSet;

use ::validator::Validate;
use contracts::{ContractError, HttpMethod, RelayBlueprint};

/// 校验 RelayBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    validate_fields(blueprint)?;
    validate_ingest_path(blueprint)?;
    validate_accounts(blueprint)?;
    validate_destination_ids(blueprint)?;
    validate_destination_refs(blueprint)?;
    validate_destination_targets(blueprint)?;
    validate_destination_headers(blueprint)?;
    Ok(())
}

/// 字段级规则
fn validate_fields(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|e| ContractError::config_validation("blueprint", e.to_string()))
}

/// ingest_path 与管理 API 路由互不重叠
fn validate_ingest_path(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let path = blueprint.server.ingest_path.as_str();
    if path == "/api" || path.starts_with("/api/") {
        return Err(ContractError::config_validation(
            "server.ingest_path",
            format!("'{path}' overlaps the management API"),
        ));
    }
    if path.contains(['{', '}', '*']) {
        return Err(ContractError::config_validation(
            "server.ingest_path",
            format!("'{path}' must be a literal path"),
        ));
    }
    Ok(())
}

/// 校验 account 唯一性
fn validate_accounts(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let mut ids = HashSet::new();
    let mut emails = HashSet::new();
    let mut tokens = HashSet::new();

    for (idx, account) in blueprint.accounts.iter().enumerate() {
        if let Some(id) = &account.account_id {
            if !ids.insert(id.as_str()) {
                return Err(ContractError::config_validation(
                    format!("accounts[{idx}].account_id"),
                    format!("duplicate account_id '{id}'"),
                ));
            }
        }
        if !emails.insert(account.email.as_str()) {
            return Err(ContractError::config_validation(
                format!("accounts[{idx}].email"),
                format!("duplicate email '{}'", account.email),
            ));
        }
        if let Some(token) = &account.app_secret_token {
            if !tokens.insert(token.as_str()) {
                // never echo the token itself
                return Err(ContractError::config_validation(
                    format!("accounts[{idx}].app_secret_token"),
                    "duplicate app_secret_token",
                ));
            }
        }
    }
    Ok(())
}

/// 校验显式 destination id 唯一
fn validate_destination_ids(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, dest) in blueprint.destinations.iter().enumerate() {
        if let Some(id) = dest.id {
            if !seen.insert(id) {
                return Err(ContractError::config_validation(
                    format!("destinations[{idx}].id"),
                    format!("duplicate destination id {id}"),
                ));
            }
        }
    }
    Ok(())
}

/// 校验 destination -> account 引用
///
/// 只能引用显式声明了 account_id 的 account。
fn validate_destination_refs(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    let known: HashSet<&str> = blueprint
        .accounts
        .iter()
        .filter_map(|a| a.account_id.as_deref())
        .collect();

    for (idx, dest) in blueprint.destinations.iter().enumerate() {
        if !known.contains(dest.account_id.as_str()) {
            return Err(ContractError::config_validation(
                format!("destinations[{idx}].account_id"),
                format!("account '{}' not found", dest.account_id),
            ));
        }
    }
    Ok(())
}

/// 校验 url 与 http_method
fn validate_destination_targets(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    for (idx, dest) in blueprint.destinations.iter().enumerate() {
        if dest.http_method.parse::<HttpMethod>().is_err() {
            return Err(ContractError::config_validation(
                format!("destinations[{idx}].http_method"),
                format!(
                    "unsupported http method '{}', expected one of GET, POST, PUT, PATCH, DELETE",
                    dest.http_method
                ),
            ));
        }

        let url = url::Url::parse(&dest.url).map_err(|e| {
            ContractError::config_validation(
                format!("destinations[{idx}].url"),
                format!("invalid url '{}': {e}", dest.url),
            )
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ContractError::config_validation(
                format!("destinations[{idx}].url"),
                format!("url scheme must be http or https, got '{}'", url.scheme()),
            ));
        }
    }
    Ok(())
}

/// 校验 header 内容
fn validate_destination_headers(blueprint: &RelayBlueprint) -> Result<(), ContractError> {
    for (idx, dest) in blueprint.destinations.iter().enumerate() {
        for (name, value) in &dest.headers {
            if http::HeaderName::from_bytes(name.as_bytes()).is_err() {
                return Err(ContractError::config_validation(
                    format!("destinations[{idx}].headers"),
                    format!("invalid header name '{name}'"),
                ));
            }
            if http::HeaderValue::from_str(value).is_err() {
                return Err(ContractError::config_validation(
                    format!("destinations[{idx}].headers[{name}]"),
                    "invalid header value",
                ));
            }
        }
    }
    Ok(())
}
