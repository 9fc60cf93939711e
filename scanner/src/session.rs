use chrono::{Duration, Utc};
use gatepass_core::{OfflineScan, ScanOutcome, SyncRequest, ValidateRequest};
use tracing::{debug, info, warn};

use crate::client::{GateApi, HttpGateClient};
use crate::config::ScannerConfig;
use crate::error::{Result, ScannerError};
use crate::store::{DeviceStore, StoreCounts};
use crate::validator::validate_offline;

/// How often and how long [`ScanSession::sync_with_retry`] keeps trying
/// while the gate server is unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncRetry {
    pub interval: std::time::Duration,
    pub max_attempts: u32,
}

impl Default for SyncRetry {
    fn default() -> Self {
        Self {
            interval: std::time::Duration::from_secs(30),
            max_attempts: 10,
        }
    }
}

/// One device scanning for one event.
///
/// Online scans go to the server; when the server cannot be reached the same
/// scan is decided from the cached snapshot. Admissions made that way are
/// replayed to the server by [`ScanSession::sync`].
pub struct ScanSession<A> {
    api: A,
    store: DeviceStore,
    event_id: i64,
    snapshot_ttl: Duration,
    online: bool,
}

impl ScanSession<HttpGateClient> {
    /// Opens the device database and an HTTP client from `config`.
    pub fn connect(config: &ScannerConfig, event_id: i64) -> Result<Self> {
        let store = DeviceStore::open(&config.db_path)?;
        let api = HttpGateClient::new(config)?;
        Ok(Self::new(api, store, event_id, config.snapshot_ttl))
    }
}

impl<A: GateApi> ScanSession<A> {
    pub fn new(api: A, store: DeviceStore, event_id: i64, snapshot_ttl: Duration) -> Self {
        Self {
            api,
            store,
            event_id,
            snapshot_ttl,
            online: true,
        }
    }

    pub fn event_id(&self) -> i64 {
        self.event_id
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Records the device's connectivity as reported by the platform.
    pub fn set_online(&mut self, online: bool) {
        if self.online != online {
            info!(event_id = self.event_id, online, "Connectivity changed");
        }
        self.online = online;
    }

    pub fn counts(&self) -> Result<StoreCounts> {
        self.store.counts()
    }

    /// Connectivity came back: replay the offline queue first, then pull a
    /// fresh snapshot that already reflects it. Returns the server's synced
    /// count. When the sync fails the snapshot is left as is.
    pub async fn go_online(&mut self) -> Result<u64> {
        self.set_online(true);
        let synced = self.sync().await?;
        self.ensure_fresh().await?;
        Ok(synced)
    }

    /// Runs [`ScanSession::sync`] until it succeeds, sleeping `retry.interval`
    /// between attempts that fail for lack of network. Any other error, or
    /// the last network failure, is returned.
    pub async fn sync_with_retry(&mut self, retry: SyncRetry) -> Result<u64> {
        let mut attempt = 1;
        loop {
            match self.sync().await {
                Err(ScannerError::NetworkUnavailable(reason)) if attempt < retry.max_attempts => {
                    warn!(
                        event_id = self.event_id,
                        attempt,
                        %reason,
                        "Offline sync failed, retrying"
                    );
                    tokio::time::sleep(retry.interval).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Downloads a new snapshot unless the cached one is still fresh.
    /// Returns whether a download happened.
    pub async fn ensure_fresh(&mut self) -> Result<bool> {
        if self
            .store
            .is_fresh(self.event_id, Utc::now(), self.snapshot_ttl)?
        {
            debug!(event_id = self.event_id, "Offline snapshot is fresh");
            return Ok(false);
        }

        let export = self.api.offline_data(self.event_id).await?;
        self.store.replace_snapshot(&export)?;
        Ok(true)
    }

    pub async fn scan(&mut self, raw_code: &str) -> Result<ScanOutcome> {
        if !self.online {
            return self.scan_offline(raw_code);
        }

        let request = ValidateRequest {
            qr_code: raw_code.to_string(),
            event_id: self.event_id,
        };
        match self.api.validate(&request).await {
            Ok(outcome) => Ok(outcome),
            Err(ScannerError::NetworkUnavailable(reason)) => {
                warn!(event_id = self.event_id, %reason, "Gate server unreachable, scanning offline");
                self.scan_offline(raw_code)
            }
            Err(err) => Err(err),
        }
    }

    fn scan_offline(&mut self, raw_code: &str) -> Result<ScanOutcome> {
        if self.store.event(self.event_id)?.is_none() {
            warn!(event_id = self.event_id, "No offline snapshot to scan against");
            return Err(ScannerError::NoSnapshot(self.event_id));
        }
        validate_offline(&mut self.store, raw_code, Utc::now())
    }

    /// Sends every unsynced offline admission for this event.
    ///
    /// On success the submitted entries are purged whether or not the server
    /// honored them, and the server's count is returned. On failure the queue
    /// is left for the next attempt.
    pub async fn sync(&mut self) -> Result<u64> {
        if !self.online {
            return Ok(0);
        }

        let pending = self.store.pending_scans(self.event_id)?;
        if pending.is_empty() {
            return Ok(0);
        }

        let request = SyncRequest {
            scans: pending
                .iter()
                .map(|scan| OfflineScan {
                    ticket_id: scan.ticket_id,
                    scanned_at: scan.scanned_at,
                })
                .collect(),
        };
        let response = self.api.sync(self.event_id, &request).await?;

        let ids: Vec<String> = pending.into_iter().map(|scan| scan.id).collect();
        self.store.mark_synced(&ids)?;
        let purged = self.store.purge_synced()?;

        info!(
            event_id = self.event_id,
            submitted = ids.len(),
            synced = response.synced,
            purged,
            "Offline scans synced"
        );
        Ok(response.synced)
    }
}
