pub mod event;
pub mod order;
pub mod scan;
pub mod ticket;
pub mod user;

pub use event::{Event, EventAccess, Staff, TicketCategory};
pub use order::Order;
pub use scan::{NewScan, Scan, ScanActor, ScanHistoryEntry, ScanStats};
pub use ticket::{NewTicket, Ticket, TicketDetails};
pub use user::User;
