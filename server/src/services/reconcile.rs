use chrono::Utc;
use gatepass_core::OfflineScan;
use tracing::{debug, info};

use crate::models::{NewScan, ScanActor};
use crate::store::{StoreError, TicketStore};

/// Replays admissions a device made while offline.
///
/// Each entry goes through the same valid-to-used transition as an online
/// scan, keeping the device's `scanned_at`. Entries for unknown tickets,
/// tickets of another event, or tickets that are no longer valid are dropped.
/// Returns how many tickets this call moved to used.
pub async fn sync_offline_scans<S: TicketStore + ?Sized>(
    store: &S,
    event_id: i64,
    actor: ScanActor,
    scans: &[OfflineScan],
) -> Result<u64, StoreError> {
    let synced_at = Utc::now();
    let mut synced = 0u64;

    for pending in scans {
        let Some(ticket) = store.find_ticket(pending.ticket_id).await? else {
            debug!(ticket_id = pending.ticket_id, "Dropped offline scan for unknown ticket");
            continue;
        };
        if ticket.event_id != event_id {
            debug!(
                ticket_id = ticket.id,
                event_id, "Dropped offline scan for another event"
            );
            continue;
        }

        let replay = NewScan::replayed(ticket.id, event_id, actor, pending.scanned_at, synced_at);
        match store.admit(replay).await? {
            Some(_) => synced += 1,
            None => debug!(ticket_id = ticket.id, "Offline scan conflicts with server state"),
        }
    }

    info!(event_id, submitted = scans.len(), synced, "Reconciled offline scans");
    Ok(synced)
}
