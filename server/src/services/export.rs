use chrono::{DateTime, Utc};
use gatepass_core::{ExportCategory, ExportEvent, ExportTicket, OfflineExport};
use tracing::info;

use crate::models::Event;
use crate::store::{StoreError, TicketStore};

/// Snapshot of everything a device needs to admit an event's holders
/// without the server.
pub async fn export_snapshot<S: TicketStore + ?Sized>(
    store: &S,
    event: &Event,
    generated_at: DateTime<Utc>,
) -> Result<OfflineExport, StoreError> {
    let tickets = store
        .export_tickets(event.id)
        .await?
        .into_iter()
        .map(|ticket| {
            Ok(ExportTicket {
                id: ticket.id,
                status: ticket.status()?,
                uuid: ticket.uuid,
                qr_code: ticket.qr_code,
                scanned_at: ticket.scanned_at,
                category_id: ticket.ticket_category_id,
            })
        })
        .collect::<Result<Vec<_>, StoreError>>()?;

    let categories = store
        .event_categories(event.id)
        .await?
        .into_iter()
        .map(|category| ExportCategory {
            id: category.id,
            name: category.name,
        })
        .collect();

    info!(event_id = event.id, tickets = tickets.len(), "Exported offline snapshot");

    Ok(OfflineExport {
        event: ExportEvent {
            id: event.id,
            title: event.title.clone(),
        },
        tickets,
        categories,
        generated_at,
    })
}
