use gatepass_core::TicketCodec;
use tracing::info;
use uuid::Uuid;

use crate::models::{NewTicket, Ticket};
use crate::store::TicketStore;
use crate::utils::error::AppError;

#[derive(Debug, Clone)]
pub struct IssueTicket {
    pub order_id: i64,
    pub category_id: i64,
    pub holder_name: Option<String>,
}

/// Creates a valid ticket with a fresh uuid and its signed code.
///
/// Called by checkout once an order is paid.
pub async fn issue_ticket<S: TicketStore + ?Sized>(
    store: &S,
    codec: &TicketCodec,
    request: IssueTicket,
) -> Result<Ticket, AppError> {
    let uuid = Uuid::new_v4();
    let qr_code = codec.generate(&uuid)?;

    let ticket = store
        .insert_ticket(NewTicket {
            uuid,
            order_id: request.order_id,
            ticket_category_id: request.category_id,
            qr_code,
            holder_name: request.holder_name,
        })
        .await?;

    info!(ticket_id = ticket.id, order_id = ticket.order_id, "Issued ticket");
    Ok(ticket)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::Fixture;
    use gatepass_core::TicketStatus;

    #[tokio::test]
    async fn test_issued_ticket_is_valid_and_signed() {
        let fx = Fixture::new();
        let ticket = fx.issue().await;

        assert_eq!(ticket.status().unwrap(), TicketStatus::Valid);
        assert!(ticket.scanned_at.is_none());
        assert_eq!(fx.codec.verify(&ticket.qr_code), Ok(ticket.uuid));
    }

    #[tokio::test]
    async fn test_code_is_rederivable_from_uuid() {
        let fx = Fixture::new();
        let ticket = fx.issue().await;
        assert_eq!(fx.codec.generate(&ticket.uuid).unwrap(), ticket.qr_code);
    }

    #[tokio::test]
    async fn test_each_ticket_gets_its_own_uuid() {
        let fx = Fixture::new();
        let first = fx.issue().await;
        let second = fx.issue().await;
        assert_ne!(first.uuid, second.uuid);
        assert_ne!(first.qr_code, second.qr_code);
    }
}
