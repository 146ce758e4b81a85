use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::error::EngineError;

/// Append-only writer for a headerless PCM file.
///
/// The target must already exist; opening truncates it so each pass starts
/// from an empty file. A running SHA-256 of everything written is kept so the
/// checksum is available without re-reading the file.
pub struct PcmFileWriter {
    file_path: PathBuf,
    file: Option<File>,
    hasher: Sha256,
    total_bytes_written: u64,
}

impl PcmFileWriter {
    pub fn new(file_path: PathBuf) -> Self {
        Self {
            file_path,
            file: None,
            hasher: Sha256::new(),
            total_bytes_written: 0,
        }
    }

    /// Open an existing file for writing, truncating it.
    pub fn open(&mut self) -> Result<(), EngineError> {
        if self.file.is_some() {
            return Ok(());
        }
        if !self.file_path.exists() {
            return Err(EngineError::target_not_found(&self.file_path));
        }

        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.file_path)
            .map_err(|e| EngineError::io("failed to open target", e))?;

        self.file = Some(file);
        self.hasher = Sha256::new();
        self.total_bytes_written = 0;
        Ok(())
    }

    /// Append `data` verbatim.
    pub fn write(&mut self, data: &[u8]) -> Result<(), EngineError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| EngineError::InvalidState("file is not open for writing".into()))?;
        file.write_all(data).map_err(|e| EngineError::io("write failed", e))?;
        self.hasher.update(data);
        self.total_bytes_written += data.len() as u64;
        Ok(())
    }

    /// Flush and close the file, returning the SHA-256 hex digest of its contents.
    pub fn finish(&mut self) -> Result<String, EngineError> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| EngineError::InvalidState("file is not open".into()))?;
        file.flush().map_err(|e| EngineError::io("flush failed", e))?;
        let digest = std::mem::take(&mut self.hasher).finalize();
        Ok(hex_encode(&digest))
    }

    pub fn bytes_written(&self) -> u64 {
        self.total_bytes_written
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// SHA-256 hex digest of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex_encode(&Sha256::digest(data))
}
