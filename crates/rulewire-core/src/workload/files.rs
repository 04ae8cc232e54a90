//! File-template payloads: key derivation and private temp files.

use std::io::Write;
use std::path::PathBuf;

use crate::connect::ClientError;

/// Derive the variable key for a `FileContents` record.
///
/// The bare single-segment identifier `template` maps to the key `filename`
/// and marks the mapping as non-fully-qualified (the second tuple field);
/// any dotted identifier contributes its second segment as the key.
pub fn derive_file_key(template_key: &str) -> Result<(String, bool), ClientError> {
    let mut segments = template_key.split('.');
    let first = segments.next().unwrap_or_default();
    match segments.next() {
        None if first == "template" => Ok(("filename".to_string(), true)),
        None => Err(ClientError::Decode(format!(
            "unrecognized template key: {template_key:?}"
        ))),
        Some(second) => Ok((second.to_string(), false)),
    }
}

/// Write a decoded payload to a fresh temp file readable only by its owner.
pub fn write_private_file(bytes: &[u8]) -> Result<PathBuf, ClientError> {
    let (mut file, path) = tempfile::NamedTempFile::new()
        .map_err(ClientError::Io)?
        .keep()
        .map_err(|e| ClientError::Io(e.error))?;
    file.write_all(bytes).map_err(ClientError::Io)?;
    drop(file);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o400))
            .map_err(ClientError::Io)?;
    }
    Ok(path)
}
