//! Device database schema.
//!
//! Timestamps are Unix epoch milliseconds.

pub const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    generated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS tickets (
    id INTEGER PRIMARY KEY,
    event_id INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
    uuid TEXT NOT NULL UNIQUE,
    qr_code TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('valid', 'used', 'cancelled', 'refunded')),
    scanned_at INTEGER,
    category_id INTEGER NOT NULL,
    category_name TEXT NOT NULL
);

-- Outlives snapshot replacement, so no foreign key to tickets.
CREATE TABLE IF NOT EXISTS pending_scans (
    id TEXT PRIMARY KEY,
    event_id INTEGER NOT NULL,
    ticket_id INTEGER NOT NULL,
    scanned_at INTEGER NOT NULL,
    synced INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_pending_scans_synced ON pending_scans(event_id, synced);
"#;
