//! Append-only healing ledger
//!
//! Every executed action is recorded exactly once. Appends are serialized
//! through a single writer lock, so readers always observe whole records.

mod file;
mod memory;

pub use file::FileLedger;
pub use memory::MemoryLedger;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::HealResult;
use crate::models::{HealingRecord, NewHealingRecord};

/// Storage port for healing records
#[async_trait]
pub trait HealingLedger: Send + Sync {
    /// Append a record, assigning its id and timestamp
    async fn append(&self, record: NewHealingRecord) -> HealResult<HealingRecord>;

    /// Up to `limit` records, most recent first
    async fn recent(&self, limit: usize) -> HealResult<Vec<HealingRecord>>;

    /// All records in append (timestamp ascending) order
    async fn all(&self) -> HealResult<Vec<HealingRecord>>;
}

/// Next id and a timestamp that never goes backwards
fn next_stamp(records: &[HealingRecord]) -> (u64, DateTime<Utc>) {
    let now = Utc::now();
    match records.last() {
        Some(last) => (last.id + 1, now.max(last.timestamp)),
        None => (1, now),
    }
}

fn newest_first(records: &[HealingRecord], limit: usize) -> Vec<HealingRecord> {
    records.iter().rev().take(limit).cloned().collect()
}
