use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gatepass_core::{TicketState, Transition};
use uuid::Uuid;

use super::{StoreError, TicketStore};
use crate::models::{
    order::ORDER_PAID, Event, EventAccess, NewScan, NewTicket, Order, Scan, ScanHistoryEntry,
    ScanStats, Staff, Ticket, TicketCategory, TicketDetails, User,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    events: Vec<Event>,
    categories: Vec<TicketCategory>,
    orders: Vec<Order>,
    staff: Vec<Staff>,
    tickets: Vec<Ticket>,
    scans: Vec<Scan>,
}

/// In-process store behind one lock, so each trait call is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Inconsistent("memory store lock poisoned".to_string()))
    }

    pub fn add_user(&self, name: &str) -> i64 {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.users.len() as i64 + 1;
        let now = Utc::now();
        tables.users.push(User {
            id,
            name: name.to_string(),
            email: format!("{}@example.test", name.to_lowercase().replace(' ', ".")),
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn add_event(&self, organizer_id: i64, title: &str) -> i64 {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.events.len() as i64 + 1;
        let now = Utc::now();
        tables.events.push(Event {
            id,
            user_id: organizer_id,
            title: title.to_string(),
            status: "published".to_string(),
            starts_at: now,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn add_category(&self, event_id: i64, name: &str) -> i64 {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.categories.len() as i64 + 1;
        tables.categories.push(TicketCategory {
            id,
            event_id,
            name: name.to_string(),
        });
        id
    }

    pub fn add_order(&self, user_id: i64, event_id: i64, status: &str) -> i64 {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.orders.len() as i64 + 1;
        let now = Utc::now();
        tables.orders.push(Order {
            id,
            user_id,
            event_id,
            status: status.to_string(),
            paid_at: (status == ORDER_PAID).then_some(now),
            created_at: now,
        });
        id
    }

    pub fn add_staff(&self, user_id: i64, event_id: i64, accepted: bool) -> i64 {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.staff.len() as i64 + 1;
        let now = Utc::now();
        tables.staff.push(Staff {
            id,
            user_id,
            event_id,
            role: "scanner".to_string(),
            invited_at: now,
            accepted_at: accepted.then_some(now),
        });
        id
    }

    pub fn ticket(&self, ticket_id: i64) -> Ticket {
        let tables = self.tables.lock().unwrap();
        tables
            .tickets
            .iter()
            .find(|ticket| ticket.id == ticket_id)
            .cloned()
            .unwrap()
    }

    pub fn scans_for(&self, ticket_id: i64) -> Vec<Scan> {
        let tables = self.tables.lock().unwrap();
        tables
            .scans
            .iter()
            .filter(|scan| scan.ticket_id == ticket_id)
            .cloned()
            .collect()
    }
}

impl Tables {
    fn details(&self, ticket: &Ticket) -> Result<TicketDetails, StoreError> {
        let order = self
            .orders
            .iter()
            .find(|order| order.id == ticket.order_id)
            .ok_or(StoreError::Missing {
                entity: "order",
                id: ticket.order_id,
            })?;
        let event = self
            .events
            .iter()
            .find(|event| event.id == order.event_id)
            .ok_or(StoreError::Missing {
                entity: "event",
                id: order.event_id,
            })?;
        let category = self
            .categories
            .iter()
            .find(|category| category.id == ticket.ticket_category_id)
            .ok_or(StoreError::Missing {
                entity: "category",
                id: ticket.ticket_category_id,
            })?;
        let purchaser = self.users.iter().find(|user| user.id == order.user_id);

        Ok(TicketDetails {
            id: ticket.id,
            uuid: ticket.uuid,
            order_id: ticket.order_id,
            ticket_category_id: ticket.ticket_category_id,
            holder_name: ticket.holder_name.clone(),
            status: ticket.status.clone(),
            scanned_at: ticket.scanned_at,
            event_id: event.id,
            event_title: event.title.clone(),
            category_name: category.name.clone(),
            purchaser_name: purchaser.map(|user| user.name.clone()),
        })
    }

    fn event_of(&self, ticket: &Ticket) -> Option<i64> {
        self.orders
            .iter()
            .find(|order| order.id == ticket.order_id)
            .map(|order| order.event_id)
    }

    fn apply(
        &mut self,
        ticket_id: i64,
        transition: Transition,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let Some(ticket) = self.tickets.iter_mut().find(|ticket| ticket.id == ticket_id) else {
            return Ok(false);
        };
        let current = ticket.state()?;
        match current.apply(transition, at) {
            Ok(next) => {
                ticket.status = next.status().as_str().to_string();
                ticket.scanned_at = next.scanned_at();
                ticket.updated_at = Utc::now();
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    fn push_scan(&mut self, scan: &NewScan) -> Scan {
        let row = Scan {
            id: self.scans.len() as i64 + 1,
            ticket_id: scan.ticket_id,
            event_id: scan.event_id,
            staff_id: scan.actor.staff_id,
            scanned_by: scan.actor.scanned_by,
            result: scan.result.as_str().to_string(),
            is_offline: scan.is_offline,
            scanned_at: scan.scanned_at,
            synced_at: scan.synced_at,
            synced_from_offline: scan.synced_from_offline,
            created_at: Utc::now(),
        };
        self.scans.push(row.clone());
        row
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn find_event(&self, event_id: i64) -> Result<Option<Event>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.events.iter().find(|event| event.id == event_id).cloned())
    }

    async fn event_access(
        &self,
        user_id: i64,
        event_id: i64,
    ) -> Result<Option<EventAccess>, StoreError> {
        let tables = self.lock()?;
        let Some(event) = tables.events.iter().find(|event| event.id == event_id) else {
            return Ok(None);
        };
        if event.user_id == user_id {
            return Ok(Some(EventAccess::Organizer));
        }
        Ok(tables
            .staff
            .iter()
            .find(|staff| {
                staff.user_id == user_id && staff.event_id == event_id && staff.has_accepted()
            })
            .map(|staff| EventAccess::Staff { staff_id: staff.id }))
    }

    async fn find_ticket_by_uuid(&self, uuid: Uuid) -> Result<Option<TicketDetails>, StoreError> {
        let tables = self.lock()?;
        tables
            .tickets
            .iter()
            .find(|ticket| ticket.uuid == uuid)
            .map(|ticket| tables.details(ticket))
            .transpose()
    }

    async fn find_ticket(&self, ticket_id: i64) -> Result<Option<TicketDetails>, StoreError> {
        let tables = self.lock()?;
        tables
            .tickets
            .iter()
            .find(|ticket| ticket.id == ticket_id)
            .map(|ticket| tables.details(ticket))
            .transpose()
    }

    async fn insert_ticket(&self, ticket: NewTicket) -> Result<Ticket, StoreError> {
        let mut tables = self.lock()?;
        let now = Utc::now();
        let issued = TicketState::issued();
        let row = Ticket {
            id: tables.tickets.len() as i64 + 1,
            uuid: ticket.uuid,
            order_id: ticket.order_id,
            ticket_category_id: ticket.ticket_category_id,
            qr_code: ticket.qr_code,
            holder_name: ticket.holder_name,
            status: issued.status().as_str().to_string(),
            scanned_at: issued.scanned_at(),
            created_at: now,
            updated_at: now,
        };
        tables.tickets.push(row.clone());
        Ok(row)
    }

    async fn transition(
        &self,
        ticket_id: i64,
        transition: Transition,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tables = self.lock()?;
        tables.apply(ticket_id, transition, at)
    }

    async fn admit(&self, scan: NewScan) -> Result<Option<Scan>, StoreError> {
        let mut tables = self.lock()?;
        if !tables.apply(scan.ticket_id, Transition::Admit, scan.scanned_at)? {
            return Ok(None);
        }
        Ok(Some(tables.push_scan(&scan)))
    }

    async fn record_scan(&self, scan: NewScan) -> Result<Scan, StoreError> {
        let mut tables = self.lock()?;
        Ok(tables.push_scan(&scan))
    }

    async fn export_tickets(&self, event_id: i64) -> Result<Vec<Ticket>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .tickets
            .iter()
            .filter(|ticket| {
                tables.orders.iter().any(|order| {
                    order.id == ticket.order_id
                        && order.event_id == event_id
                        && order.status == ORDER_PAID
                })
            })
            .filter(|ticket| ticket.status == "valid" || ticket.status == "used")
            .cloned()
            .collect())
    }

    async fn event_categories(&self, event_id: i64) -> Result<Vec<TicketCategory>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .categories
            .iter()
            .filter(|category| category.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn recent_scans(
        &self,
        event_id: i64,
        limit: i64,
    ) -> Result<Vec<ScanHistoryEntry>, StoreError> {
        let tables = self.lock()?;
        let mut entries = Vec::new();
        for scan in tables.scans.iter().filter(|scan| scan.event_id == event_id) {
            let ticket = tables
                .tickets
                .iter()
                .find(|ticket| ticket.id == scan.ticket_id)
                .ok_or(StoreError::Missing {
                    entity: "ticket",
                    id: scan.ticket_id,
                })?;
            let details = tables.details(ticket)?;
            let email = tables
                .orders
                .iter()
                .find(|order| order.id == ticket.order_id)
                .and_then(|order| tables.users.iter().find(|user| user.id == order.user_id))
                .map(|user| user.email.clone());
            entries.push(ScanHistoryEntry {
                id: scan.id,
                scanned_at: scan.scanned_at,
                result: scan.result.clone(),
                category: details.category_name,
                holder: email.unwrap_or_else(|| "Guest".to_string()),
                synced_from_offline: scan.synced_from_offline,
            });
        }
        entries.sort_by(|a, b| b.scanned_at.cmp(&a.scanned_at).then(b.id.cmp(&a.id)));
        entries.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(entries)
    }

    async fn scan_stats(&self, event_id: i64) -> Result<ScanStats, StoreError> {
        let tables = self.lock()?;
        let total_scanned = tables
            .scans
            .iter()
            .filter(|scan| scan.event_id == event_id)
            .count() as i64;
        let total_tickets = tables
            .tickets
            .iter()
            .filter(|ticket| tables.event_of(ticket) == Some(event_id))
            .count() as i64;
        Ok(ScanStats {
            total_scanned,
            total_tickets,
        })
    }
}
