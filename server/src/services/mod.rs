pub mod access;
pub mod export;
pub mod gate;
pub mod history;
pub mod issue;
pub mod reconcile;

#[cfg(test)]
pub mod fixtures;

pub use access::authorize_scanner;
pub use export::export_snapshot;
pub use gate::GateValidator;
pub use history::{scan_history, ScanHistory};
pub use issue::{issue_ticket, IssueTicket};
pub use reconcile::sync_offline_scans;
