//! Ticket codes, admission states and the scan types shared by the gate
//! server and scanning devices.

pub mod codec;
pub mod offline;
pub mod scan;
pub mod ticket;

pub use codec::{CodeError, SharedSecret, TicketCodec};
pub use offline::{
    ExportCategory, ExportEvent, ExportTicket, OfflineExport, OfflineScan, SyncRequest,
    SyncResponse, ValidateRequest,
};
pub use scan::{
    OutcomeStatus, ScanOutcome, ScanRejection, ScanResult, TicketDisplay, Verdict,
};
pub use ticket::{Admission, TicketState, TicketStatus, Transition, TransitionError};
