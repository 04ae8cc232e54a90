//! Workload download: handshake, typed receive loop, bundle assembly.
//!
//! One [`WorkloadReceiver`] invocation owns the accumulator exclusively; the
//! finished [`WorkloadBundle`] is released only when the `EndOfResponse`
//! sentinel arrives.

mod files;
mod messages;
mod project;

pub use messages::{decode_payload, InboundRecord, WorkerHandshake};

use std::collections::HashMap;
use std::path::PathBuf;

use futures_util::{SinkExt, StreamExt};
use serde_yaml::{Mapping, Value};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::config::ConnectionConfig;
use crate::connect::{connect_with_retry, ClientError, Handler, WsLink};
use crate::rules::{parse_rule_sets, RuleSet};
use crate::vault::{has_vaulted_str, VaultMaterial};
use files::{derive_file_key, write_private_file};
use project::ProjectArchive;

/// Controller connection metadata delivered with the workload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerInfo {
    pub url: String,
    pub token: String,
    pub ssl_verify: String,
    pub username: String,
    pub password: String,
}

/// Everything a worker session downloads before rule execution starts.
#[derive(Debug, Default)]
pub struct WorkloadBundle {
    /// Reassembled project archive, if the controller shipped one.
    pub project_data_file: Option<PathBuf>,
    pub rulesets: Vec<RuleSet>,
    /// True when the rulebook contains vault-encrypted strings.
    pub check_vault: bool,
    /// Vault passwords delivered by `VaultCollection`.
    pub vault: VaultMaterial,
    /// Extra variables, including the `eda` sub-mapping with file paths.
    pub variables: Mapping,
    pub env_vars: Mapping,
    pub controller: ControllerInfo,
}

/// Download a workload: connect (no tolerance for remote closes), send the
/// worker handshake, and receive until `EndOfResponse`.
pub async fn request_workload(
    config: &ConnectionConfig,
    activation_instance_id: &str,
    cancel: &CancellationToken,
) -> Result<WorkloadBundle, ClientError> {
    let mut receiver = WorkloadReceiver::new(activation_instance_id);
    connect_with_retry(config, &mut receiver, false, cancel).await
}

/// Handler that performs the workload download on a live connection.
pub struct WorkloadReceiver {
    activation_id: String,
    activation_instance_id: String,
}

impl WorkloadReceiver {
    /// The controller keys both handshake fields off the activation
    /// instance id.
    pub fn new(activation_instance_id: impl Into<String>) -> Self {
        let id = activation_instance_id.into();
        Self {
            activation_id: id.clone(),
            activation_instance_id: id,
        }
    }
}

impl Handler for WorkloadReceiver {
    type Output = WorkloadBundle;

    async fn on_connection<L: WsLink>(
        &mut self,
        link: &mut L,
    ) -> Result<WorkloadBundle, ClientError> {
        tracing::info!("workload websocket connected");
        let hello = WorkerHandshake {
            activation_id: self.activation_id.clone(),
            activation_instance_id: self.activation_instance_id.clone(),
        };
        let text = serde_json::to_string(&hello)
            .map_err(|e| ClientError::Decode(format!("handshake: {e}")))?;
        link.send(Message::Text(text))
            .await
            .map_err(ClientError::from_ws)?;

        let mut assembly = Assembly::default();
        loop {
            let message = match link.next().await {
                None => {
                    return Err(ClientError::Closed {
                        code: None,
                        reason: String::new(),
                    })
                }
                Some(Ok(message)) => message,
                Some(Err(err)) => return Err(ClientError::from_ws(err)),
            };
            let text = match message {
                Message::Text(text) => text,
                Message::Close(frame) => return Err(ClientError::from_close(frame)),
                _ => continue,
            };
            let record: InboundRecord = serde_json::from_str(&text)
                .map_err(|e| ClientError::Decode(format!("inbound record: {e}")))?;
            if let Step::Done = assembly.apply(record)? {
                break;
            }
        }
        Ok(assembly.finish())
    }
}

enum Step {
    Continue,
    Done,
}

/// Mutable accumulator threaded through the receive loop, finalized into the
/// immutable bundle on completion.
#[derive(Default)]
struct Assembly {
    bundle: WorkloadBundle,
    project: Option<ProjectArchive>,
    non_fq_key: bool,
    file_vars: HashMap<String, PathBuf>,
}

impl Assembly {
    fn apply(&mut self, record: InboundRecord) -> Result<Step, ClientError> {
        match record {
            InboundRecord::EndOfResponse => return Ok(Step::Done),
            InboundRecord::VaultCollection { data } => {
                self.bundle.vault = VaultMaterial { passwords: data };
            }
            InboundRecord::ProjectData { data, more } => {
                if self.project.is_none() {
                    let archive = ProjectArchive::create()?;
                    self.bundle.project_data_file = Some(archive.path().to_path_buf());
                    self.project = Some(archive);
                }
                if let Some(archive) = self.project.as_mut() {
                    match (data, more) {
                        (Some(payload), true) => archive.append(&decode_payload(&payload)?)?,
                        (None, false) => archive.close(),
                        // a chunk that is neither payload nor sentinel
                        // carries nothing to write
                        _ => {}
                    }
                }
            }
            InboundRecord::FileContents { template_key, data } => {
                let bytes = decode_payload(&data)?;
                let (key, non_fq) = derive_file_key(&template_key)?;
                if non_fq {
                    self.non_fq_key = true;
                }
                let path = write_private_file(&bytes)?;
                tracing::debug!("file content eda.filename.{} : {}", key, path.display());
                self.file_vars.insert(key, path);
            }
            InboundRecord::Rulebook { data } => {
                let bytes = decode_payload(&data)?;
                self.bundle.check_vault = has_vaulted_str(&bytes);
                self.bundle.rulesets = parse_rule_sets(&bytes)
                    .map_err(|e| ClientError::Decode(format!("rulebook: {e}")))?;
            }
            InboundRecord::ExtraVars { data } => {
                self.bundle.variables = decode_mapping(&data, "extra vars")?;
            }
            InboundRecord::EnvVars { data } => {
                self.bundle.env_vars = decode_mapping(&data, "env vars")?;
            }
            InboundRecord::ControllerInfo {
                url,
                token,
                ssl_verify,
                username,
                password,
            } => {
                self.bundle.controller = ControllerInfo {
                    url,
                    token,
                    ssl_verify,
                    username,
                    password,
                };
            }
            InboundRecord::Unknown => {
                tracing::debug!("ignoring unrecognized record");
            }
        }
        Ok(Step::Continue)
    }

    /// Fold the collected file paths into `variables.eda.filename` and
    /// overlay the environment variables (environment wins on collision).
    fn finish(mut self) -> WorkloadBundle {
        let filename_value = match self.file_vars.get("filename") {
            Some(path) if self.non_fq_key => Value::String(path.display().to_string()),
            _ => {
                let mut files = Mapping::new();
                for (key, path) in &self.file_vars {
                    files.insert(
                        Value::String(key.clone()),
                        Value::String(path.display().to_string()),
                    );
                }
                Value::Mapping(files)
            }
        };
        let mut eda = Mapping::new();
        eda.insert(Value::String("filename".into()), filename_value);
        self.bundle
            .variables
            .insert(Value::String("eda".into()), Value::Mapping(eda));

        for (key, value) in self.bundle.env_vars.clone() {
            self.bundle.variables.insert(key, value);
        }
        self.bundle
    }
}

/// Decode a base64 YAML payload into a mapping.
fn decode_mapping(data: &str, what: &str) -> Result<Mapping, ClientError> {
    let bytes = decode_payload(data)?;
    serde_yaml::from_slice(&bytes).map_err(|e| ClientError::Decode(format!("{what}: {e}")))
}
