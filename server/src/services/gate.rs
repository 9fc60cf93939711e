use std::sync::Arc;

use chrono::{DateTime, Utc};
use gatepass_core::{Admission, ScanRejection, ScanResult, TicketCodec, Verdict};
use tracing::{debug, info, warn};

use crate::models::{NewScan, ScanActor, TicketDetails};
use crate::store::{StoreError, TicketStore};

/// Authoritative scan decision against the server store.
pub struct GateValidator<S> {
    store: Arc<S>,
    codec: TicketCodec,
}

impl<S> Clone for GateValidator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            codec: self.codec.clone(),
        }
    }
}

impl<S: TicketStore> GateValidator<S> {
    pub fn new(store: Arc<S>, codec: TicketCodec) -> Self {
        Self { store, codec }
    }

    pub fn codec(&self) -> &TicketCodec {
        &self.codec
    }

    /// Decides one scan for `event_id`.
    ///
    /// Business rejections come back as a [`Verdict`]; only storage failures
    /// are errors. Every attempt that identifies a ticket leaves a scan row.
    pub async fn validate(
        &self,
        raw_code: &str,
        event_id: i64,
        actor: ScanActor,
    ) -> Result<Verdict, StoreError> {
        let uuid = match self.codec.verify(raw_code) {
            Ok(uuid) => uuid,
            Err(err) => {
                warn!(event_id, error = %err, "Rejected unreadable ticket code");
                return Ok(Verdict::Rejected(err.into()));
            }
        };

        let Some(ticket) = self.store.find_ticket_by_uuid(uuid).await? else {
            warn!(event_id, %uuid, "Signed code for unknown ticket");
            return Ok(Verdict::Rejected(ScanRejection::TicketNotFound));
        };

        let now = Utc::now();

        if ticket.event_id != event_id {
            let verdict = Verdict::Rejected(ScanRejection::WrongEvent {
                expected_event: ticket.event_title.clone(),
            });
            self.audit(&ticket, event_id, actor, &verdict, now).await?;
            return Ok(verdict);
        }

        let verdict = match ticket.status()?.admission() {
            Admission::Admit => return self.admit(&ticket, event_id, actor, now).await,
            other => verdict_for(&ticket, other)?,
        };
        self.audit(&ticket, event_id, actor, &verdict, now).await?;
        Ok(verdict)
    }

    async fn admit(
        &self,
        ticket: &TicketDetails,
        event_id: i64,
        actor: ScanActor,
        now: DateTime<Utc>,
    ) -> Result<Verdict, StoreError> {
        let scan = NewScan::online(
            ticket.id,
            event_id,
            actor,
            ScanResult::Success,
            now,
        );

        if self.store.admit(scan).await?.is_some() {
            info!(ticket_id = ticket.id, event_id, "Ticket admitted");
            return Ok(Verdict::Admitted {
                ticket: ticket.display(),
                scanned_at: now,
            });
        }

        // Another scan moved the ticket between our read and the update.
        let current = self
            .store
            .find_ticket(ticket.id)
            .await?
            .ok_or(StoreError::Missing {
                entity: "ticket",
                id: ticket.id,
            })?;
        debug!(ticket_id = ticket.id, status = %current.status, "Lost admission race");

        let verdict = match current.status()?.admission() {
            Admission::Admit => {
                return Err(StoreError::Inconsistent(format!(
                    "ticket {} stayed valid after a failed admission",
                    ticket.id
                )))
            }
            other => verdict_for(&current, other)?,
        };
        self.audit(&current, event_id, actor, &verdict, now).await?;
        Ok(verdict)
    }

    async fn audit(
        &self,
        ticket: &TicketDetails,
        event_id: i64,
        actor: ScanActor,
        verdict: &Verdict,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if let Verdict::Rejected(rejection) = verdict {
            warn!(ticket_id = ticket.id, event_id, reason = ?rejection, "Ticket rejected");
        }
        self.store
            .record_scan(NewScan::online(
                ticket.id,
                event_id,
                actor,
                verdict.audit_result(),
                now,
            ))
            .await?;
        Ok(())
    }
}

fn verdict_for(ticket: &TicketDetails, admission: Admission) -> Result<Verdict, StoreError> {
    Ok(match admission {
        Admission::AlreadyUsed => Verdict::AlreadyUsed {
            ticket: ticket.display(),
            scanned_at: ticket.scanned_at,
        },
        Admission::Cancelled => Verdict::Rejected(ScanRejection::TicketCancelled),
        Admission::Refunded => Verdict::Rejected(ScanRejection::TicketRefunded),
        Admission::Admit => {
            return Err(StoreError::Inconsistent(format!(
                "ticket {} is admissible",
                ticket.id
            )))
        }
    })
}
