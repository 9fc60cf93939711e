use chrono::{DateTime, Utc};
use gatepass_core::codec::{codes_match, parse};
use gatepass_core::{Admission, ScanOutcome, ScanRejection, TicketDisplay, Verdict};
use tracing::{info, warn};

use crate::error::Result;
use crate::store::{CachedTicket, DeviceStore};

/// The snapshot carries no holder names.
const OFFLINE_HOLDER: &str = "Not specified";

/// Decides a scan from the cached snapshot alone.
///
/// The device holds no signing key, so a code is authentic only if it is
/// byte-for-byte the code the server exported for that uuid. Tickets missing
/// from the snapshot read as not found, which also covers cancelled and
/// refunded ones. Admissions are queued for the next sync.
pub fn validate_offline(
    store: &mut DeviceStore,
    raw_code: &str,
    now: DateTime<Utc>,
) -> Result<ScanOutcome> {
    let verdict = decide(store, raw_code.trim(), now)?;
    if let Verdict::Rejected(rejection) = &verdict {
        warn!(reason = ?rejection, "Offline scan rejected");
    }
    Ok(verdict.into_offline_outcome())
}

fn decide(store: &mut DeviceStore, code: &str, now: DateTime<Utc>) -> Result<Verdict> {
    let uuid = match parse(code) {
        Ok((uuid, _)) => uuid,
        Err(err) => return Ok(Verdict::Rejected(err.into())),
    };

    let Some(ticket) = store.ticket_by_uuid(&uuid)? else {
        return Ok(Verdict::Rejected(ScanRejection::TicketNotFound));
    };

    if !codes_match(&ticket.qr_code, code) {
        return Ok(Verdict::Rejected(ScanRejection::SignatureMismatch));
    }

    let event_title = store
        .event(ticket.event_id)?
        .map(|event| event.title)
        .unwrap_or_default();

    Ok(match ticket.status.admission() {
        Admission::Admit => {
            if store.admit_locally(&ticket, now)? {
                info!(ticket_id = ticket.id, "Ticket admitted offline");
                Verdict::Admitted {
                    ticket: display(&ticket, event_title),
                    scanned_at: now,
                }
            } else {
                // Only reachable if the row changed under us; report it as used.
                Verdict::AlreadyUsed {
                    ticket: display(&ticket, event_title),
                    scanned_at: None,
                }
            }
        }
        Admission::AlreadyUsed => Verdict::AlreadyUsed {
            scanned_at: ticket.scanned_at,
            ticket: display(&ticket, event_title),
        },
        Admission::Cancelled => Verdict::Rejected(ScanRejection::TicketCancelled),
        Admission::Refunded => Verdict::Rejected(ScanRejection::TicketRefunded),
    })
}

fn display(ticket: &CachedTicket, event_title: String) -> TicketDisplay {
    TicketDisplay {
        uuid: ticket.uuid,
        category: ticket.category_name.clone(),
        event: event_title,
        holder: OFFLINE_HOLDER.to_string(),
    }
}
