//! Typed wire records for the workload download flow.
//!
//! Every frame is a JSON object with a `type` discriminator; binary payloads
//! arrive base64-encoded in a `data` field.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::connect::ClientError;

/// Client→server handshake identifying this process as a worker.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename = "Worker")]
pub struct WorkerHandshake {
    pub activation_id: String,
    pub activation_instance_id: String,
}

/// Server→client records. Record types this client does not know are
/// tolerated and skipped, not treated as protocol errors.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum InboundRecord {
    /// Terminal sentinel for the whole download.
    EndOfResponse,
    VaultCollection {
        data: Vec<String>,
    },
    /// One chunk of the project archive. A chunk with no payload and
    /// `more=false` ends the sub-transfer.
    ProjectData {
        #[serde(default)]
        data: Option<String>,
        #[serde(default)]
        more: bool,
    },
    FileContents {
        template_key: String,
        data: String,
    },
    Rulebook {
        data: String,
    },
    ExtraVars {
        data: String,
    },
    EnvVars {
        data: String,
    },
    ControllerInfo {
        #[serde(default)]
        url: String,
        #[serde(default)]
        token: String,
        #[serde(default)]
        ssl_verify: String,
        #[serde(default)]
        username: String,
        #[serde(default)]
        password: String,
    },
    #[serde(other)]
    Unknown,
}

/// Decode an inline base64 payload.
pub fn decode_payload(data: &str) -> Result<Vec<u8>, ClientError> {
    STANDARD
        .decode(data)
        .map_err(|e| ClientError::Decode(format!("base64 payload: {e}")))
}
