//! Reassembly of the chunked project-data archive into a kept temp file.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::connect::ClientError;

/// Accumulates `ProjectData` chunks. The backing file is created on the
/// first chunk and kept on disk; closing it is the end-of-stream sentinel
/// for this sub-transfer.
#[derive(Debug)]
pub struct ProjectArchive {
    file: Option<File>,
    path: PathBuf,
}

impl ProjectArchive {
    pub fn create() -> Result<Self, ClientError> {
        let (file, path) = tempfile::NamedTempFile::new()
            .map_err(ClientError::Io)?
            .keep()
            .map_err(|e| ClientError::Io(e.error))?;
        Ok(Self {
            file: Some(file),
            path,
        })
    }

    /// Append one decoded chunk. Ignored once the archive is closed.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), ClientError> {
        if let Some(file) = self.file.as_mut() {
            file.write_all(bytes).map_err(ClientError::Io)?;
        }
        Ok(())
    }

    /// Close the backing file, flushing it to disk.
    pub fn close(&mut self) {
        if self.file.take().is_some() {
            tracing::debug!("wrote {}", self.path.display());
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
