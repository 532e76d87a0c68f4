use super::csv::{decode_ledger, encode_ledger};
use super::{ChannelRecord, LedgerError};
use crate::shared::fs_atomic::atomic_write_file;
use std::fs;
use std::path::{Path, PathBuf};

/// Boundary for ledger persistence. Hosted-spreadsheet backends implement the
/// same contract elsewhere; only the CSV backend ships here.
pub trait LedgerStore {
    fn read(&self) -> Result<Vec<ChannelRecord>, LedgerError>;
    fn write(&self, records: &[ChannelRecord]) -> Result<(), LedgerError>;
}

#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Best-effort copy to `<path>.bak` before a destructive run.
    pub fn backup(&self) -> Option<PathBuf> {
        if !self.path.exists() {
            return None;
        }
        let backup_path = self.path.with_extension("csv.bak");
        match fs::copy(&self.path, &backup_path) {
            Ok(_) => Some(backup_path),
            Err(_) => None,
        }
    }
}

impl LedgerStore for CsvStore {
    fn read(&self) -> Result<Vec<ChannelRecord>, LedgerError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| LedgerError::Read {
            path: self.path.display().to_string(),
            source,
        })?;
        decode_ledger(&self.path.display().to_string(), &raw)
    }

    fn write(&self, records: &[ChannelRecord]) -> Result<(), LedgerError> {
        let body = encode_ledger(records);
        atomic_write_file(&self.path, body.as_bytes()).map_err(|source| LedgerError::Write {
            path: self.path.display().to_string(),
            source,
        })
    }
}
