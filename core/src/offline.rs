use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ticket::TicketStatus;

/// How long a downloaded snapshot is trusted before it is fetched again.
pub const SNAPSHOT_TTL_SECS: i64 = 5 * 60;

pub fn snapshot_ttl() -> Duration {
    Duration::seconds(SNAPSHOT_TTL_SECS)
}

pub fn is_fresh(generated_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    generated_at > now - snapshot_ttl()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateRequest {
    pub qr_code: String,
    pub event_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportEvent {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportTicket {
    pub id: i64,
    pub uuid: Uuid,
    pub qr_code: String,
    pub status: TicketStatus,
    pub scanned_at: Option<DateTime<Utc>>,
    pub category_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportCategory {
    pub id: i64,
    pub name: String,
}

/// Admissible tickets of one event, as handed to scanning devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineExport {
    pub event: ExportEvent,
    pub tickets: Vec<ExportTicket>,
    pub categories: Vec<ExportCategory>,
    pub generated_at: DateTime<Utc>,
}

impl OfflineExport {
    pub fn category_name(&self, category_id: i64) -> Option<&str> {
        self.categories
            .iter()
            .find(|category| category.id == category_id)
            .map(|category| category.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineScan {
    pub ticket_id: i64,
    pub scanned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub scans: Vec<OfflineScan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResponse {
    pub synced: u64,
    pub message: String,
}
