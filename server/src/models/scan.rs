use chrono::{DateTime, Utc};
use gatepass_core::ScanResult;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Append-only audit row written for every identified scan attempt.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Scan {
    pub id: i64,
    pub ticket_id: i64,
    pub event_id: i64,
    pub staff_id: Option<i64>,
    pub scanned_by: Option<i64>,
    pub result: String,
    pub is_offline: bool,
    pub scanned_at: DateTime<Utc>,
    pub synced_at: Option<DateTime<Utc>>,
    pub synced_from_offline: bool,
    pub created_at: DateTime<Utc>,
}

/// Who performed a scan, as recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanActor {
    pub scanned_by: Option<i64>,
    pub staff_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewScan {
    pub ticket_id: i64,
    pub event_id: i64,
    pub actor: ScanActor,
    pub result: ScanResult,
    pub scanned_at: DateTime<Utc>,
    pub is_offline: bool,
    pub synced_from_offline: bool,
    pub synced_at: Option<DateTime<Utc>>,
}

impl NewScan {
    pub fn online(
        ticket_id: i64,
        event_id: i64,
        actor: ScanActor,
        result: ScanResult,
        scanned_at: DateTime<Utc>,
    ) -> Self {
        Self {
            ticket_id,
            event_id,
            actor,
            result,
            scanned_at,
            is_offline: false,
            synced_from_offline: false,
            synced_at: None,
        }
    }

    /// A success replayed from a device, keeping the time it was admitted at.
    pub fn replayed(
        ticket_id: i64,
        event_id: i64,
        actor: ScanActor,
        scanned_at: DateTime<Utc>,
        synced_at: DateTime<Utc>,
    ) -> Self {
        Self {
            ticket_id,
            event_id,
            actor,
            result: ScanResult::Success,
            scanned_at,
            is_offline: true,
            synced_from_offline: true,
            synced_at: Some(synced_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScanHistoryEntry {
    pub id: i64,
    pub scanned_at: DateTime<Utc>,
    pub result: String,
    pub category: String,
    pub holder: String,
    pub synced_from_offline: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub total_scanned: i64,
    pub total_tickets: i64,
}
