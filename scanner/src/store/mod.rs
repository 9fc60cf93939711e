//! Device-local snapshot and pending-scan queue.
//!
//! One SQLite file per device, holding the last downloaded snapshot of a
//! single event plus the admissions recorded while offline. WAL mode and
//! foreign keys are always on; the schema version lives in
//! `PRAGMA user_version`.

pub mod migrations;
pub mod schema;

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use gatepass_core::{OfflineExport, TicketStatus};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::error::{Result, ScannerError};

pub const SCHEMA_VERSION: u32 = 1;

const UNKNOWN_CATEGORY: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEvent {
    pub id: i64,
    pub title: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedTicket {
    pub id: i64,
    pub event_id: i64,
    pub uuid: Uuid,
    pub qr_code: String,
    pub status: TicketStatus,
    pub scanned_at: Option<DateTime<Utc>>,
    pub category_id: i64,
    pub category_name: String,
}

/// An admission made on the device and not yet confirmed by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingScan {
    pub id: String,
    pub event_id: i64,
    pub ticket_id: i64,
    pub scanned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreCounts {
    pub tickets: i64,
    pub pending_scans: i64,
}

pub struct DeviceStore {
    conn: Connection,
}

impl DeviceStore {
    /// Opens or creates the device database and applies pending migrations.
    pub fn open(path: &Path) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA synchronous = NORMAL;",
        )?;
        migrations::run(&conn)?;
        Ok(Self { conn })
    }

    /// Drops whatever snapshot is cached and stores `export` in its place.
    ///
    /// Pending scans are left alone, and any ticket they admitted is marked
    /// used again so an unsynced admission cannot be repeated on this device.
    pub fn replace_snapshot(&mut self, export: &OfflineExport) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM tickets", [])?;
        tx.execute("DELETE FROM events", [])?;
        tx.execute(
            "INSERT INTO events (id, title, generated_at) VALUES (?1, ?2, ?3)",
            params![
                export.event.id,
                export.event.title,
                to_millis(export.generated_at)
            ],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO tickets
                     (id, event_id, uuid, qr_code, status, scanned_at, category_id, category_name)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for ticket in &export.tickets {
                stmt.execute(params![
                    ticket.id,
                    export.event.id,
                    ticket.uuid.to_string(),
                    ticket.qr_code,
                    ticket.status.as_str(),
                    ticket.scanned_at.map(to_millis),
                    ticket.category_id,
                    export
                        .category_name(ticket.category_id)
                        .unwrap_or(UNKNOWN_CATEGORY),
                ])?;
            }
        }
        let reapplied = tx.execute(
            "UPDATE tickets SET
                 status = 'used',
                 scanned_at = (SELECT MIN(p.scanned_at) FROM pending_scans p
                               WHERE p.ticket_id = tickets.id AND p.synced = 0)
             WHERE status = 'valid'
               AND id IN (SELECT ticket_id FROM pending_scans
                          WHERE event_id = ?1 AND synced = 0)",
            [export.event.id],
        )?;
        tx.commit()?;

        tracing::info!(
            event_id = export.event.id,
            tickets = export.tickets.len(),
            reapplied,
            "Stored offline snapshot"
        );
        Ok(())
    }

    pub fn event(&self, event_id: i64) -> Result<Option<CachedEvent>> {
        self.conn
            .query_row(
                "SELECT id, title, generated_at FROM events WHERE id = ?1",
                [event_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?
            .map(|(id, title, generated_at)| {
                Ok(CachedEvent {
                    id,
                    title,
                    generated_at: from_millis(generated_at)?,
                })
            })
            .transpose()
    }

    /// Whether a snapshot for `event_id` exists and is younger than `ttl`.
    pub fn is_fresh(&self, event_id: i64, now: DateTime<Utc>, ttl: Duration) -> Result<bool> {
        Ok(self
            .event(event_id)?
            .map(|event| event.generated_at > now - ttl)
            .unwrap_or(false))
    }

    pub fn ticket_by_uuid(&self, uuid: &Uuid) -> Result<Option<CachedTicket>> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, event_id, uuid, qr_code, status, scanned_at, category_id, category_name
                 FROM tickets WHERE uuid = ?1",
                [uuid.to_string()],
                RawTicket::from_row,
            )
            .optional()?;
        raw.map(RawTicket::into_cached).transpose()
    }

    /// Marks a cached ticket used and queues the admission for sync, as one
    /// unit. Returns `false` when the ticket was not valid any more.
    pub fn admit_locally(&mut self, ticket: &CachedTicket, at: DateTime<Utc>) -> Result<bool> {
        let tx = self.conn.transaction()?;
        let changed = tx.execute(
            "UPDATE tickets SET status = 'used', scanned_at = ?1
             WHERE id = ?2 AND status = 'valid'",
            params![to_millis(at), ticket.id],
        )?;
        if changed == 0 {
            return Ok(false);
        }
        tx.execute(
            "INSERT INTO pending_scans (id, event_id, ticket_id, scanned_at, synced)
             VALUES (?1, ?2, ?3, ?4, 0)",
            params![
                Uuid::new_v4().to_string(),
                ticket.event_id,
                ticket.id,
                to_millis(at)
            ],
        )?;
        tx.commit()?;
        Ok(true)
    }

    /// Unsynced scans for one event, oldest first.
    pub fn pending_scans(&self, event_id: i64) -> Result<Vec<PendingScan>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, event_id, ticket_id, scanned_at FROM pending_scans
             WHERE event_id = ?1 AND synced = 0
             ORDER BY scanned_at, id",
        )?;
        let rows = stmt.query_map([event_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut scans = Vec::new();
        for row in rows {
            let (id, event_id, ticket_id, scanned_at) = row?;
            scans.push(PendingScan {
                id,
                event_id,
                ticket_id,
                scanned_at: from_millis(scanned_at)?,
            });
        }
        Ok(scans)
    }

    pub fn mark_synced(&mut self, ids: &[String]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut marked = 0;
        {
            let mut stmt = tx.prepare("UPDATE pending_scans SET synced = 1 WHERE id = ?1")?;
            for id in ids {
                marked += stmt.execute([id])?;
            }
        }
        tx.commit()?;
        Ok(marked)
    }

    pub fn purge_synced(&self) -> Result<usize> {
        Ok(self
            .conn
            .execute("DELETE FROM pending_scans WHERE synced = 1", [])?)
    }

    pub fn counts(&self) -> Result<StoreCounts> {
        let tickets = self
            .conn
            .query_row("SELECT COUNT(*) FROM tickets", [], |row| row.get(0))?;
        let pending_scans = self.conn.query_row(
            "SELECT COUNT(*) FROM pending_scans WHERE synced = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(StoreCounts {
            tickets,
            pending_scans,
        })
    }
}

struct RawTicket {
    id: i64,
    event_id: i64,
    uuid: String,
    qr_code: String,
    status: String,
    scanned_at: Option<i64>,
    category_id: i64,
    category_name: String,
}

impl RawTicket {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            event_id: row.get(1)?,
            uuid: row.get(2)?,
            qr_code: row.get(3)?,
            status: row.get(4)?,
            scanned_at: row.get(5)?,
            category_id: row.get(6)?,
            category_name: row.get(7)?,
        })
    }

    fn into_cached(self) -> Result<CachedTicket> {
        let uuid = Uuid::try_parse(&self.uuid)
            .map_err(|e| ScannerError::Corrupt(format!("ticket {} uuid: {e}", self.id)))?;
        let status = self
            .status
            .parse()
            .map_err(|e| ScannerError::Corrupt(format!("ticket {}: {e}", self.id)))?;
        Ok(CachedTicket {
            id: self.id,
            event_id: self.event_id,
            uuid,
            qr_code: self.qr_code,
            status,
            scanned_at: self.scanned_at.map(from_millis).transpose()?,
            category_id: self.category_id,
            category_name: self.category_name,
        })
    }
}

fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| ScannerError::Corrupt(format!("timestamp {millis} out of range")))
}
