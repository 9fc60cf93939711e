use std::sync::Arc;

use gatepass_core::TicketCodec;

use crate::services::GateValidator;
use crate::store::TicketStore;

/// Shared handler state.
pub struct AppState<S> {
    pub store: Arc<S>,
    pub gate: GateValidator<S>,
}

impl<S: TicketStore> AppState<S> {
    pub fn new(store: Arc<S>, codec: TicketCodec) -> Self {
        let gate = GateValidator::new(Arc::clone(&store), codec);
        Self { store, gate }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            gate: self.gate.clone(),
        }
    }
}
