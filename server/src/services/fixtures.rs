use std::sync::Arc;

use gatepass_core::{SharedSecret, TicketCodec};

use crate::models::{order::ORDER_PAID, ScanActor, Ticket};
use crate::services::gate::GateValidator;
use crate::services::issue::{issue_ticket, IssueTicket};
use crate::store::memory::MemoryStore;
use crate::utils::auth::ActorIdentity;

pub const TEST_KEY: &str = "base64:test-application-key";

/// One organizer, one published event with a category, and a paid order.
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub codec: TicketCodec,
    pub organizer_id: i64,
    pub buyer_id: i64,
    pub event_id: i64,
    pub category_id: i64,
    pub order_id: i64,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let organizer_id = store.add_user("Olivia Organizer");
        let buyer_id = store.add_user("Bob Buyer");
        let event_id = store.add_event(organizer_id, "Concert Rock");
        let category_id = store.add_category(event_id, "Standard");
        let order_id = store.add_order(buyer_id, event_id, ORDER_PAID);

        Self {
            store,
            codec: TicketCodec::new(SharedSecret::from(TEST_KEY)),
            organizer_id,
            buyer_id,
            event_id,
            category_id,
            order_id,
        }
    }

    pub fn organizer(&self) -> ActorIdentity {
        ActorIdentity {
            user_id: self.organizer_id,
        }
    }

    pub fn scan_actor(&self) -> ScanActor {
        ScanActor {
            scanned_by: Some(self.organizer_id),
            staff_id: None,
        }
    }

    pub fn gate(&self) -> GateValidator<MemoryStore> {
        GateValidator::new(Arc::clone(&self.store), self.codec.clone())
    }

    pub async fn issue(&self) -> Ticket {
        self.issue_for(self.order_id, self.category_id).await
    }

    pub async fn issue_for(&self, order_id: i64, category_id: i64) -> Ticket {
        issue_ticket(
            &*self.store,
            &self.codec,
            IssueTicket {
                order_id,
                category_id,
                holder_name: None,
            },
        )
        .await
        .unwrap()
    }
}
