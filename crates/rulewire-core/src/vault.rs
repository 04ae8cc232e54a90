//! Vault material handed over by the controller.

/// Envelope header that opens every vault-encrypted string.
const VAULT_HEADER: &[u8] = b"$ANSIBLE_VAULT;";

/// Password material delivered by a `VaultCollection` record. Carried on the
/// workload bundle rather than installed globally so callers decide where it
/// lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaultMaterial {
    pub passwords: Vec<String>,
}

impl VaultMaterial {
    pub fn is_empty(&self) -> bool {
        self.passwords.is_empty()
    }
}

/// True if the payload contains at least one vault-encrypted string.
/// The envelope header is ASCII, so a plain byte scan suffices.
pub fn has_vaulted_str(data: &[u8]) -> bool {
    data.windows(VAULT_HEADER.len()).any(|w| w == VAULT_HEADER)
}
