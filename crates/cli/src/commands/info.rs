//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{RelayBlueprint, StatusPolicy};

use crate::cli::InfoArgs;

/// Configuration info for JSON output
///
/// Tokens and header values are never printed.
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    server: ServerInfo,
    dispatch: DispatchInfo,
    accounts: Vec<AccountInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    destinations: Vec<DestinationInfo>,
}

#[derive(Serialize)]
struct ServerInfo {
    bind_addr: String,
    ingest_path: String,
    token_header: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics_port: Option<u16>,
}

#[derive(Serialize)]
struct DispatchInfo {
    timeout_ms: u64,
    status_policy: StatusPolicy,
    user_agent: String,
}

#[derive(Serialize)]
struct AccountInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    account_id: Option<String>,
    account_name: String,
    email: String,
    token_configured: bool,
    destination_count: usize,
}

#[derive(Serialize)]
struct DestinationInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    account_id: String,
    http_method: String,
    url: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    header_names: Vec<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&blueprint, args);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &RelayBlueprint, args: &InfoArgs) -> ConfigInfo {
    let mut per_account: BTreeMap<&str, usize> = BTreeMap::new();
    for d in &blueprint.destinations {
        *per_account.entry(d.account_id.as_str()).or_default() += 1;
    }

    let accounts = blueprint
        .accounts
        .iter()
        .map(|a| AccountInfo {
            account_id: a.account_id.clone(),
            account_name: a.account_name.clone(),
            email: a.email.clone(),
            token_configured: a.app_secret_token.is_some(),
            destination_count: a
                .account_id
                .as_deref()
                .and_then(|id| per_account.get(id).copied())
                .unwrap_or(0),
        })
        .collect();

    let destinations = if args.destinations {
        blueprint
            .destinations
            .iter()
            .map(|d| DestinationInfo {
                id: d.id,
                account_id: d.account_id.clone(),
                http_method: d.http_method.to_ascii_uppercase(),
                url: d.url.clone(),
                header_names: d.headers.keys().cloned().collect(),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        server: ServerInfo {
            bind_addr: blueprint.server.bind_addr.to_string(),
            ingest_path: blueprint.server.ingest_path.clone(),
            token_header: blueprint.server.token_header.clone(),
            metrics_port: blueprint.server.metrics_port,
        },
        dispatch: DispatchInfo {
            timeout_ms: blueprint.dispatch.timeout_ms,
            status_policy: blueprint.dispatch.status_policy,
            user_agent: blueprint.dispatch.user_agent.clone(),
        },
        accounts,
        destinations,
    }
}

fn tree_prefix(index: usize, len: usize) -> &'static str {
    if index + 1 == len {
        "└─"
    } else {
        "├─"
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Fan-out Relay Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("🌐 Server");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Listen: {}", info.server.bind_addr);
    println!("   ├─ Ingest path: {}", info.server.ingest_path);
    println!("   ├─ Token header: {}", info.server.token_header);
    match info.server.metrics_port {
        Some(port) => println!("   └─ Metrics port: {}", port),
        None => println!("   └─ Metrics: disabled"),
    }

    println!("\n⚙️  Dispatch");
    println!("   ├─ Timeout: {} ms", info.dispatch.timeout_ms);
    println!("   ├─ Status policy: {:?}", info.dispatch.status_policy);
    println!("   └─ User-Agent: {}", info.dispatch.user_agent);

    println!("\n👤 Accounts ({})", info.accounts.len());
    for (i, account) in info.accounts.iter().enumerate() {
        let id = account.account_id.as_deref().unwrap_or("(generated)");
        let token = if account.token_configured {
            "token set"
        } else {
            "token generated"
        };
        println!(
            "   {} {} - {} <{}> ({}, {} destinations)",
            tree_prefix(i, info.accounts.len()),
            id,
            account.account_name,
            account.email,
            token,
            account.destination_count
        );
    }

    if !info.destinations.is_empty() {
        println!("\n📤 Destinations ({})", info.destinations.len());
        for (i, d) in info.destinations.iter().enumerate() {
            let id = d
                .id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "(auto)".to_string());
            println!(
                "   {} #{} [{}] {} {} {:?}",
                tree_prefix(i, info.destinations.len()),
                id,
                d.account_id,
                d.http_method,
                d.url,
                d.header_names
            );
        }
    }

    println!();
}
