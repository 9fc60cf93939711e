use tracing::warn;

use crate::models::{Event, EventAccess, ScanActor};
use crate::store::TicketStore;
use crate::utils::auth::ActorIdentity;
use crate::utils::error::AppError;

/// Resolves the event and checks the actor may scan for it.
///
/// Organizers scan as themselves; accepted staff are recorded with their
/// staff row as well.
pub async fn authorize_scanner<S: TicketStore + ?Sized>(
    store: &S,
    actor: ActorIdentity,
    event_id: i64,
) -> Result<(Event, ScanActor), AppError> {
    let event = store
        .find_event(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event {event_id} was not found")))?;

    let access = store.event_access(actor.user_id, event_id).await?;
    let staff_id = match access {
        Some(EventAccess::Organizer) => None,
        Some(EventAccess::Staff { staff_id }) => Some(staff_id),
        None => {
            warn!(user_id = actor.user_id, event_id, "Scan access denied");
            return Err(AppError::Forbidden(
                "You are not allowed to scan tickets for this event".to_string(),
            ));
        }
    };

    Ok((
        event,
        ScanActor {
            scanned_by: Some(actor.user_id),
            staff_id,
        },
    ))
}
