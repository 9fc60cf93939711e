use serde::Serialize;

use crate::models::{ScanHistoryEntry, ScanStats};
use crate::store::{StoreError, TicketStore};

pub const HISTORY_LIMIT: i64 = 50;

#[derive(Debug, Clone, Serialize)]
pub struct ScanHistory {
    pub scans: Vec<ScanHistoryEntry>,
    pub stats: ScanStats,
}

pub async fn scan_history<S: TicketStore + ?Sized>(
    store: &S,
    event_id: i64,
) -> Result<ScanHistory, StoreError> {
    let scans = store.recent_scans(event_id, HISTORY_LIMIT).await?;
    let stats = store.scan_stats(event_id).await?;
    Ok(ScanHistory { scans, stats })
}
