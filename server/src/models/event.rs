use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub status: String,
    pub starts_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TicketCategory {
    pub id: i64,
    pub event_id: i64,
    pub name: String,
}

/// A user invited to work the gates of one event.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Staff {
    pub id: i64,
    pub user_id: i64,
    pub event_id: i64,
    pub role: String,
    pub invited_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

impl Staff {
    pub fn has_accepted(&self) -> bool {
        self.accepted_at.is_some()
    }
}

/// How an actor is allowed to scan for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAccess {
    Organizer,
    Staff { staff_id: i64 },
}
