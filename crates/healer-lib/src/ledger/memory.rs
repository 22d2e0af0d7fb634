//! In-process ledger

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{newest_first, next_stamp, HealingLedger};
use crate::error::HealResult;
use crate::models::{HealingRecord, NewHealingRecord};

/// Ledger held in memory; lost on restart
#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: RwLock<Vec<HealingRecord>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl HealingLedger for MemoryLedger {
    async fn append(&self, record: NewHealingRecord) -> HealResult<HealingRecord> {
        let mut records = self.records.write().await;
        let (id, timestamp) = next_stamp(&records);
        let record = record.into_record(id, timestamp);
        records.push(record.clone());
        Ok(record)
    }

    async fn recent(&self, limit: usize) -> HealResult<Vec<HealingRecord>> {
        Ok(newest_first(&self.records.read().await, limit))
    }

    async fn all(&self) -> HealResult<Vec<HealingRecord>> {
        Ok(self.records.read().await.clone())
    }
}
