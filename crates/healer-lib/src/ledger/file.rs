//! File-backed ledger
//!
//! Records are stored as JSON lines in an append-only file. Each append is
//! written and synced before it becomes visible to readers; a torn trailing
//! line left by an interrupted write is dropped on open.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::{newest_first, next_stamp, HealingLedger};
use crate::error::{HealError, HealResult};
use crate::models::{HealingRecord, NewHealingRecord};

/// Ledger persisted to a JSON-lines file
pub struct FileLedger {
    path: PathBuf,
    state: RwLock<LedgerFile>,
}

struct LedgerFile {
    records: Vec<HealingRecord>,
    file: File,
    /// Length of the file up to the last complete record
    len: u64,
}

impl FileLedger {
    /// Open (or create) the ledger file and load existing records
    pub async fn open(path: impl Into<PathBuf>) -> HealResult<Self> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                HealError::persistence(format!("failed to create directory {:?}: {}", parent, e))
            })?;
        }

        let (records, len) = match fs::read(&path).await {
            Ok(data) => parse_records(&path, &data)?,
            Err(e) if e.kind() == ErrorKind::NotFound => (Vec::new(), 0),
            Err(e) => {
                return Err(HealError::persistence(format!(
                    "failed to read ledger {:?}: {}",
                    path, e
                )))
            }
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| HealError::persistence(format!("failed to open ledger {:?}: {}", path, e)))?;

        let on_disk = file
            .metadata()
            .await
            .map_err(|e| HealError::persistence(format!("failed to stat ledger {:?}: {}", path, e)))?
            .len();
        if on_disk > len {
            warn!(path = %path.display(), dropped_bytes = on_disk - len, "Dropping torn ledger tail");
            file.set_len(len)
                .await
                .map_err(|e| HealError::persistence(format!("failed to truncate ledger: {}", e)))?;
        }

        info!(path = %path.display(), records = records.len(), "Loaded healing ledger");

        Ok(Self {
            path,
            state: RwLock::new(LedgerFile { records, file, len }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl HealingLedger for FileLedger {
    async fn append(&self, record: NewHealingRecord) -> HealResult<HealingRecord> {
        let mut state = self.state.write().await;
        let (id, timestamp) = next_stamp(&state.records);
        let record = record.into_record(id, timestamp);

        let mut line = serde_json::to_vec(&record)
            .map_err(|e| HealError::persistence(format!("failed to serialize record: {}", e)))?;
        line.push(b'\n');

        if let Err(e) = write_synced(&mut state.file, &line).await {
            // Roll back a partial write so the next append starts on a clean line
            let len = state.len;
            if let Err(truncate_err) = state.file.set_len(len).await {
                warn!(error = %truncate_err, "Failed to roll back partial ledger write");
            }
            return Err(HealError::persistence(format!(
                "failed to append to ledger {:?}: {}",
                self.path, e
            )));
        }

        state.len += line.len() as u64;
        state.records.push(record.clone());
        Ok(record)
    }

    async fn recent(&self, limit: usize) -> HealResult<Vec<HealingRecord>> {
        Ok(newest_first(&self.state.read().await.records, limit))
    }

    async fn all(&self) -> HealResult<Vec<HealingRecord>> {
        Ok(self.state.read().await.records.clone())
    }
}

async fn write_synced(file: &mut File, line: &[u8]) -> std::io::Result<()> {
    file.write_all(line).await?;
    file.flush().await?;
    file.sync_data().await
}

/// Parse complete lines; returns the records and the byte length they span
fn parse_records(path: &Path, data: &[u8]) -> HealResult<(Vec<HealingRecord>, u64)> {
    let mut records = Vec::new();
    let mut offset = 0usize;
    let mut line_number = 0usize;

    while let Some(newline) = data[offset..].iter().position(|b| *b == b'\n') {
        line_number += 1;
        let line = &data[offset..offset + newline];
        offset += newline + 1;

        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let record: HealingRecord = serde_json::from_slice(line).map_err(|e| {
            HealError::persistence(format!(
                "corrupt ledger record at {:?} line {}: {}",
                path, line_number, e
            ))
        })?;
        records.push(record);
    }

    Ok((records, offset as u64))
}
