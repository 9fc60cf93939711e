//! Scanning-device side of gate control: a cached offline snapshot, the
//! offline validator, and a session that falls back to it when the gate
//! server is unreachable.

pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod store;
pub mod validator;

pub use client::{GateApi, HttpGateClient};
pub use config::ScannerConfig;
pub use error::ScannerError;
pub use session::{ScanSession, SyncRetry};
pub use store::DeviceStore;
pub use validator::validate_offline;
