//! `rulewire fetch` – download the execution workload and print a summary.

use anyhow::{Context, Result};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use rulewire_core::config::ConnectionConfig;
use rulewire_core::workload::request_workload;

pub async fn run_fetch(config: ConnectionConfig, activation_instance_id: &str) -> Result<()> {
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });

    let bundle = request_workload(&config, activation_instance_id, &cancel)
        .await
        .context("workload download failed")?;
    tracing::info!(
        "workload downloaded: {} ruleset(s), project data: {}",
        bundle.rulesets.len(),
        bundle.project_data_file.is_some()
    );

    let ruleset_names: Vec<&str> = bundle.rulesets.iter().map(|rs| rs.name.as_str()).collect();
    let variable_keys: Vec<String> = bundle
        .variables
        .keys()
        .filter_map(|k| k.as_str().map(str::to_string))
        .collect();
    let files = bundle
        .variables
        .get("eda")
        .and_then(|eda| eda.get("filename"))
        .map(|v| serde_json::to_value(v))
        .transpose()?
        .unwrap_or(serde_json::Value::Null);

    let summary = json!({
        "rulesets": ruleset_names,
        "check_vault": bundle.check_vault,
        "vault_passwords": bundle.vault.passwords.len(),
        "project_data_file": bundle.project_data_file,
        "files": files,
        "variable_keys": variable_keys,
        "controller_url": bundle.controller.url,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
