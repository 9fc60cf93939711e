use chrono::{DateTime, Utc};
use gatepass_core::{TicketDisplay, TicketState, TicketStatus, TransitionError};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

const UNKNOWN_HOLDER: &str = "Not specified";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: i64,
    pub uuid: Uuid,
    pub order_id: i64,
    pub ticket_category_id: i64,
    pub qr_code: String,
    pub holder_name: Option<String>,
    pub status: String,
    pub scanned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub fn status(&self) -> Result<TicketStatus, TransitionError> {
        self.status.parse()
    }

    pub fn state(&self) -> Result<TicketState, TransitionError> {
        TicketState::new(self.status()?, self.scanned_at)
    }
}

/// A ticket joined with the order, event and category it belongs to.
#[derive(Debug, Clone, FromRow)]
pub struct TicketDetails {
    pub id: i64,
    pub uuid: Uuid,
    pub order_id: i64,
    pub ticket_category_id: i64,
    pub holder_name: Option<String>,
    pub status: String,
    pub scanned_at: Option<DateTime<Utc>>,
    pub event_id: i64,
    pub event_title: String,
    pub category_name: String,
    pub purchaser_name: Option<String>,
}

impl TicketDetails {
    pub fn status(&self) -> Result<TicketStatus, TransitionError> {
        self.status.parse()
    }

    pub fn holder(&self) -> &str {
        self.holder_name
            .as_deref()
            .or(self.purchaser_name.as_deref())
            .unwrap_or(UNKNOWN_HOLDER)
    }

    pub fn display(&self) -> TicketDisplay {
        TicketDisplay {
            uuid: self.uuid,
            category: self.category_name.clone(),
            event: self.event_title.clone(),
            holder: self.holder().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub uuid: Uuid,
    pub order_id: i64,
    pub ticket_category_id: i64,
    pub qr_code: String,
    pub holder_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(holder: Option<&str>, purchaser: Option<&str>) -> TicketDetails {
        TicketDetails {
            id: 1,
            uuid: Uuid::new_v4(),
            order_id: 1,
            ticket_category_id: 1,
            holder_name: holder.map(str::to_string),
            status: "valid".to_string(),
            scanned_at: None,
            event_id: 1,
            event_title: "Concert Rock".to_string(),
            category_name: "Standard".to_string(),
            purchaser_name: purchaser.map(str::to_string),
        }
    }

    #[test]
    fn test_holder_prefers_ticket_name() {
        assert_eq!(details(Some("Ada"), Some("Bob")).holder(), "Ada");
        assert_eq!(details(None, Some("Bob")).holder(), "Bob");
        assert_eq!(details(None, None).holder(), UNKNOWN_HOLDER);
    }

    #[test]
    fn test_display_uses_joined_names() {
        let display = details(None, Some("Bob")).display();
        assert_eq!(display.event, "Concert Rock");
        assert_eq!(display.category, "Standard");
    }
}
