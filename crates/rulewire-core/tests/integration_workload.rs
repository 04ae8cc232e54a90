//! Integration test: workload download over a live local WebSocket.
//!
//! Starts a scripted server, drives the full handshake + download protocol,
//! and asserts the assembled bundle.

mod common;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use common::ws_server;
use rulewire_core::config::ConnectionConfig;
use rulewire_core::connect::ClientError;
use rulewire_core::token::TokenError;
use rulewire_core::workload::request_workload;

fn b64(data: &str) -> String {
    STANDARD.encode(data)
}

const RULEBOOK: &str = "- name: Demo rules\n  hosts:\n    - all\n  rules:\n    - name: r1\n      condition: event.i == 1\n      action:\n        debug:\n";

#[tokio::test]
async fn full_workload_download_assembles_the_bundle() {
    let url = ws_server::start(move |_, mut ws| async move {
        let hello = ws.next().await.expect("handshake").expect("frame");
        let hello: Value = serde_json::from_str(hello.to_text().unwrap()).unwrap();
        assert_eq!(hello["type"], "Worker");
        assert_eq!(hello["activation_id"], "act-1");
        assert_eq!(hello["activation_instance_id"], "act-1");

        ws_server::send_json(&mut ws, json!({"type": "VaultCollection", "data": ["pw1"]})).await;
        ws_server::send_json(
            &mut ws,
            json!({"type": "ProjectData", "data": b64("project-"), "more": true}),
        )
        .await;
        ws_server::send_json(
            &mut ws,
            json!({"type": "ProjectData", "data": b64("archive"), "more": true}),
        )
        .await;
        ws_server::send_json(
            &mut ws,
            json!({"type": "ProjectData", "data": null, "more": false}),
        )
        .await;
        ws_server::send_json(
            &mut ws,
            json!({"type": "FileContents", "template_key": "template", "data": b64("ssh key bytes")}),
        )
        .await;
        ws_server::send_json(&mut ws, json!({"type": "Rulebook", "data": b64(RULEBOOK)})).await;
        ws_server::send_json(
            &mut ws,
            json!({"type": "ExtraVars", "data": b64("region: eu\nlimit: 5\n")}),
        )
        .await;
        ws_server::send_json(
            &mut ws,
            json!({"type": "EnvVars", "data": b64("region: us\n")}),
        )
        .await;
        ws_server::send_json(
            &mut ws,
            json!({
                "type": "ControllerInfo",
                "url": "https://controller.example",
                "token": "ctl-token",
                "ssl_verify": "no",
                "username": "svc",
                "password": "secret"
            }),
        )
        .await;
        ws_server::send_json(&mut ws, json!({"type": "EndOfResponse"})).await;
        let _ = ws.close(None).await;
    })
    .await;

    let config = ConnectionConfig::new(url);
    let cancel = CancellationToken::new();
    let bundle = request_workload(&config, "act-1", &cancel).await.expect("workload");

    let project = bundle.project_data_file.clone().expect("project file");
    assert_eq!(std::fs::read(&project).unwrap(), b"project-archive");
    std::fs::remove_file(&project).unwrap();

    assert_eq!(bundle.rulesets.len(), 1);
    assert_eq!(bundle.rulesets[0].name, "Demo rules");
    assert!(!bundle.check_vault);
    assert_eq!(bundle.vault.passwords, vec!["pw1"]);

    // bare `template` key collapses to a single path string
    let eda = bundle.variables.get("eda").unwrap().as_mapping().unwrap();
    let filename = eda.get("filename").unwrap();
    let file_path = filename.as_str().expect("single path");
    assert_eq!(std::fs::read(file_path).unwrap(), b"ssh key bytes");
    std::fs::remove_file(file_path).unwrap();

    // env vars win on collision
    assert_eq!(bundle.variables.get("region").unwrap().as_str(), Some("us"));
    assert_eq!(bundle.variables.get("limit").unwrap().as_u64(), Some(5));

    assert_eq!(bundle.controller.url, "https://controller.example");
    assert_eq!(bundle.controller.token, "ctl-token");
    assert_eq!(bundle.controller.ssl_verify, "no");
    assert_eq!(bundle.controller.username, "svc");
    assert_eq!(bundle.controller.password, "secret");
}

#[tokio::test]
async fn rulebook_and_extra_vars_without_env_vars() {
    let url = ws_server::start(move |_, mut ws| async move {
        let _hello = ws.next().await.expect("handshake").expect("frame");
        ws_server::send_json(&mut ws, json!({"type": "Rulebook", "data": b64(RULEBOOK)})).await;
        ws_server::send_json(
            &mut ws,
            json!({"type": "ExtraVars", "data": b64("region: eu\n")}),
        )
        .await;
        ws_server::send_json(&mut ws, json!({"type": "EndOfResponse"})).await;
        let _ = ws.close(None).await;
    })
    .await;

    let config = ConnectionConfig::new(url);
    let cancel = CancellationToken::new();
    let bundle = request_workload(&config, "act-2", &cancel).await.expect("workload");

    // no EnvVars: the overlay is a no-op
    assert!(bundle.env_vars.is_empty());
    assert_eq!(bundle.variables.get("region").unwrap().as_str(), Some("eu"));
    assert_eq!(bundle.rulesets.len(), 1);
    assert_eq!(bundle.rulesets[0].rules.len(), 1);
    assert!(bundle.project_data_file.is_none());
}

#[tokio::test]
async fn unknown_records_are_skipped() {
    let url = ws_server::start(move |_, mut ws| async move {
        let _hello = ws.next().await.expect("handshake").expect("frame");
        ws_server::send_json(&mut ws, json!({"type": "Heartbeat"})).await;
        ws_server::send_json(&mut ws, json!({"type": "EndOfResponse"})).await;
        let _ = ws.close(None).await;
    })
    .await;

    let config = ConnectionConfig::new(url);
    let cancel = CancellationToken::new();
    assert!(request_workload(&config, "act-3", &cancel).await.is_ok());
}

#[tokio::test]
async fn upgrade_403_without_renewal_config_aborts() {
    let url = ws_server::start_rejecting(403).await;
    let mut config = ConnectionConfig::new(url);
    config.access_token = Some("stale".into());
    let cancel = CancellationToken::new();

    let err = request_workload(&config, "act-4", &cancel).await.unwrap_err();
    assert!(
        matches!(err, ClientError::Token(TokenError::NotConfigured)),
        "unexpected: {err:?}"
    );
}

#[tokio::test]
async fn invalid_url_fails_fast() {
    let config = ConnectionConfig::new("https://controller.example/api/ws");
    let cancel = CancellationToken::new();
    let err = request_workload(&config, "act-5", &cancel).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidUrl(_)));
}
