use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gatepass_core::{TicketStatus, Transition};
use sqlx::postgres::PgPool;
use sqlx::PgExecutor;
use uuid::Uuid;

use super::{StoreError, TicketStore};
use crate::models::{
    Event, EventAccess, NewScan, NewTicket, Scan, ScanHistoryEntry, ScanStats, Ticket,
    TicketCategory, TicketDetails,
};

const TICKET_COLUMNS: &str = "id, uuid, order_id, ticket_category_id, qr_code, holder_name, \
     status, scanned_at, created_at, updated_at";

const TICKET_DETAILS_SELECT: &str = "SELECT t.id, t.uuid, t.order_id, t.ticket_category_id, \
     t.holder_name, t.status, t.scanned_at, o.event_id, e.title AS event_title, \
     c.name AS category_name, u.name AS purchaser_name \
     FROM tickets t \
     JOIN orders o ON o.id = t.order_id \
     JOIN events e ON e.id = o.event_id \
     JOIN ticket_categories c ON c.id = t.ticket_category_id \
     LEFT JOIN users u ON u.id = o.user_id";

const SCAN_COLUMNS: &str = "id, ticket_id, event_id, staff_id, scanned_by, result, is_offline, \
     scanned_at, synced_at, synced_from_offline, created_at";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// The single conditional UPDATE every status change goes through.
async fn apply_transition<'e, E>(
    executor: E,
    ticket_id: i64,
    transition: Transition,
    at: DateTime<Utc>,
) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let from: Vec<String> = transition
        .from_states()
        .iter()
        .map(|status| status.as_str().to_string())
        .collect();

    let result = sqlx::query(
        "UPDATE tickets SET status = $2, scanned_at = $3, updated_at = now() \
         WHERE id = $1 AND status = ANY($4)",
    )
    .bind(ticket_id)
    .bind(transition.target().as_str())
    .bind(transition.scanned_at_after(at))
    .bind(from)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

async fn insert_scan<'e, E>(executor: E, scan: &NewScan) -> Result<Scan, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Scan>(&format!(
        "INSERT INTO scans (ticket_id, event_id, staff_id, scanned_by, result, is_offline, \
         scanned_at, synced_at, synced_from_offline) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {SCAN_COLUMNS}"
    ))
    .bind(scan.ticket_id)
    .bind(scan.event_id)
    .bind(scan.actor.staff_id)
    .bind(scan.actor.scanned_by)
    .bind(scan.result.as_str())
    .bind(scan.is_offline)
    .bind(scan.scanned_at)
    .bind(scan.synced_at)
    .bind(scan.synced_from_offline)
    .fetch_one(executor)
    .await
}

#[async_trait]
impl TicketStore for PgStore {
    async fn find_event(&self, event_id: i64) -> Result<Option<Event>, StoreError> {
        let event = sqlx::query_as::<_, Event>(
            "SELECT id, user_id, title, status, starts_at, created_at, updated_at \
             FROM events WHERE id = $1",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    async fn event_access(
        &self,
        user_id: i64,
        event_id: i64,
    ) -> Result<Option<EventAccess>, StoreError> {
        let row: Option<(i64, Option<i64>)> = sqlx::query_as(
            "SELECT e.user_id, s.id FROM events e \
             LEFT JOIN staff s ON s.event_id = e.id AND s.user_id = $1 \
                 AND s.accepted_at IS NOT NULL \
             WHERE e.id = $2",
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some((organizer_id, _)) if organizer_id == user_id => Some(EventAccess::Organizer),
            Some((_, Some(staff_id))) => Some(EventAccess::Staff { staff_id }),
            _ => None,
        })
    }

    async fn find_ticket_by_uuid(&self, uuid: Uuid) -> Result<Option<TicketDetails>, StoreError> {
        let ticket = sqlx::query_as::<_, TicketDetails>(&format!(
            "{TICKET_DETAILS_SELECT} WHERE t.uuid = $1"
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn find_ticket(&self, ticket_id: i64) -> Result<Option<TicketDetails>, StoreError> {
        let ticket = sqlx::query_as::<_, TicketDetails>(&format!(
            "{TICKET_DETAILS_SELECT} WHERE t.id = $1"
        ))
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn insert_ticket(&self, ticket: NewTicket) -> Result<Ticket, StoreError> {
        let row = sqlx::query_as::<_, Ticket>(&format!(
            "INSERT INTO tickets (uuid, order_id, ticket_category_id, qr_code, holder_name, status) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {TICKET_COLUMNS}"
        ))
        .bind(ticket.uuid)
        .bind(ticket.order_id)
        .bind(ticket.ticket_category_id)
        .bind(&ticket.qr_code)
        .bind(&ticket.holder_name)
        .bind(TicketStatus::Valid.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn transition(
        &self,
        ticket_id: i64,
        transition: Transition,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        Ok(apply_transition(&self.pool, ticket_id, transition, at).await?)
    }

    async fn admit(&self, scan: NewScan) -> Result<Option<Scan>, StoreError> {
        let mut tx = self.pool.begin().await?;

        if !apply_transition(&mut *tx, scan.ticket_id, Transition::Admit, scan.scanned_at).await? {
            tx.rollback().await?;
            return Ok(None);
        }

        let row = insert_scan(&mut *tx, &scan).await?;
        tx.commit().await?;
        Ok(Some(row))
    }

    async fn record_scan(&self, scan: NewScan) -> Result<Scan, StoreError> {
        Ok(insert_scan(&self.pool, &scan).await?)
    }

    async fn export_tickets(&self, event_id: i64) -> Result<Vec<Ticket>, StoreError> {
        let tickets = sqlx::query_as::<_, Ticket>(
            "SELECT t.id, t.uuid, t.order_id, t.ticket_category_id, t.qr_code, t.holder_name, \
             t.status, t.scanned_at, t.created_at, t.updated_at \
             FROM tickets t JOIN orders o ON o.id = t.order_id \
             WHERE o.event_id = $1 AND o.status = 'paid' AND t.status IN ('valid', 'used') \
             ORDER BY t.id",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tickets)
    }

    async fn event_categories(&self, event_id: i64) -> Result<Vec<TicketCategory>, StoreError> {
        let categories = sqlx::query_as::<_, TicketCategory>(
            "SELECT id, event_id, name FROM ticket_categories WHERE event_id = $1 ORDER BY id",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn recent_scans(
        &self,
        event_id: i64,
        limit: i64,
    ) -> Result<Vec<ScanHistoryEntry>, StoreError> {
        let scans = sqlx::query_as::<_, ScanHistoryEntry>(
            "SELECT s.id, s.scanned_at, s.result, c.name AS category, \
             COALESCE(u.email, 'Guest') AS holder, s.synced_from_offline \
             FROM scans s \
             JOIN tickets t ON t.id = s.ticket_id \
             JOIN ticket_categories c ON c.id = t.ticket_category_id \
             JOIN orders o ON o.id = t.order_id \
             LEFT JOIN users u ON u.id = o.user_id \
             WHERE s.event_id = $1 \
             ORDER BY s.scanned_at DESC, s.id DESC \
             LIMIT $2",
        )
        .bind(event_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(scans)
    }

    async fn scan_stats(&self, event_id: i64) -> Result<ScanStats, StoreError> {
        let (total_scanned, total_tickets): (i64, i64) = sqlx::query_as(
            "SELECT \
             (SELECT COUNT(*) FROM scans WHERE event_id = $1), \
             (SELECT COUNT(*) FROM tickets t JOIN orders o ON o.id = t.order_id \
              WHERE o.event_id = $1)",
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(ScanStats {
            total_scanned,
            total_tickets,
        })
    }
}
