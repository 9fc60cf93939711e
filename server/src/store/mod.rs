use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gatepass_core::{Transition, TransitionError};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Event, EventAccess, NewScan, NewTicket, Scan, ScanHistoryEntry, ScanStats, Ticket,
    TicketCategory, TicketDetails,
};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("inconsistent row: {0}")]
    Inconsistent(String),

    #[error("{entity} {id} does not exist")]
    Missing { entity: &'static str, id: i64 },
}

impl From<TransitionError> for StoreError {
    fn from(err: TransitionError) -> Self {
        StoreError::Inconsistent(err.to_string())
    }
}

/// Authoritative ticket and scan storage.
///
/// Ticket status only ever changes through [`TicketStore::transition`] and
/// [`TicketStore::admit`], both of which are compare-and-swap updates keyed
/// on the current status.
#[async_trait]
pub trait TicketStore: Send + Sync + 'static {
    async fn find_event(&self, event_id: i64) -> Result<Option<Event>, StoreError>;

    /// `None` when the user neither organizes the event nor works it as
    /// accepted staff.
    async fn event_access(
        &self,
        user_id: i64,
        event_id: i64,
    ) -> Result<Option<EventAccess>, StoreError>;

    async fn find_ticket_by_uuid(&self, uuid: Uuid) -> Result<Option<TicketDetails>, StoreError>;

    async fn find_ticket(&self, ticket_id: i64) -> Result<Option<TicketDetails>, StoreError>;

    async fn insert_ticket(&self, ticket: NewTicket) -> Result<Ticket, StoreError>;

    /// Applies `transition` if the ticket currently sits in one of its
    /// source states. Returns whether this call moved the ticket.
    async fn transition(
        &self,
        ticket_id: i64,
        transition: Transition,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Moves a valid ticket to used at `scan.scanned_at` and appends the
    /// success scan in the same unit of work. `None` means another caller
    /// got there first and nothing was written.
    async fn admit(&self, scan: NewScan) -> Result<Option<Scan>, StoreError>;

    async fn record_scan(&self, scan: NewScan) -> Result<Scan, StoreError>;

    /// Valid and used tickets of paid orders for the event.
    async fn export_tickets(&self, event_id: i64) -> Result<Vec<Ticket>, StoreError>;

    async fn event_categories(&self, event_id: i64) -> Result<Vec<TicketCategory>, StoreError>;

    /// Newest first.
    async fn recent_scans(
        &self,
        event_id: i64,
        limit: i64,
    ) -> Result<Vec<ScanHistoryEntry>, StoreError>;

    async fn scan_stats(&self, event_id: i64) -> Result<ScanStats, StoreError>;
}
