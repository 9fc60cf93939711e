use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::codec::CodeError;

const MSG_ADMITTED: &str = "Valid ticket, entry granted.";
const MSG_ADMITTED_OFFLINE: &str = "Valid ticket, entry granted (offline mode).";
const MSG_ALREADY_USED: &str = "This ticket has already been used.";
const MSG_INVALID_CODE: &str = "Invalid or corrupted ticket code.";
const MSG_NOT_FOUND: &str = "Ticket not found.";
const MSG_WRONG_EVENT: &str = "This ticket is not for this event.";
const MSG_CANCELLED: &str = "This ticket has been cancelled.";
const MSG_REFUNDED: &str = "This ticket has been refunded.";

/// Result column of a scan audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanResult {
    Success,
    AlreadyUsed,
    Invalid,
    Cancelled,
}

impl ScanResult {
    pub const fn as_str(self) -> &'static str {
        match self {
            ScanResult::Success => "success",
            ScanResult::AlreadyUsed => "already_used",
            ScanResult::Invalid => "invalid",
            ScanResult::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown scan result '{0}'")]
pub struct UnknownScanResult(pub String);

impl FromStr for ScanResult {
    type Err = UnknownScanResult;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(ScanResult::Success),
            "already_used" => Ok(ScanResult::AlreadyUsed),
            "invalid" => Ok(ScanResult::Invalid),
            "cancelled" => Ok(ScanResult::Cancelled),
            other => Err(UnknownScanResult(other.to_string())),
        }
    }
}

/// Why a scan was turned away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanRejection {
    MalformedCode,
    SignatureMismatch,
    TicketNotFound,
    WrongEvent { expected_event: String },
    TicketCancelled,
    TicketRefunded,
}

impl ScanRejection {
    /// Staff-facing text. Forged and malformed codes read the same.
    pub fn message(&self) -> &'static str {
        match self {
            ScanRejection::MalformedCode | ScanRejection::SignatureMismatch => MSG_INVALID_CODE,
            ScanRejection::TicketNotFound => MSG_NOT_FOUND,
            ScanRejection::WrongEvent { .. } => MSG_WRONG_EVENT,
            ScanRejection::TicketCancelled => MSG_CANCELLED,
            ScanRejection::TicketRefunded => MSG_REFUNDED,
        }
    }

    pub fn audit_result(&self) -> ScanResult {
        match self {
            ScanRejection::TicketCancelled => ScanResult::Cancelled,
            _ => ScanResult::Invalid,
        }
    }
}

impl From<CodeError> for ScanRejection {
    fn from(err: CodeError) -> Self {
        match err {
            CodeError::SignatureMismatch => ScanRejection::SignatureMismatch,
            CodeError::MalformedCode | CodeError::InvalidKey(_) => ScanRejection::MalformedCode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDisplay {
    pub uuid: Uuid,
    pub category: String,
    pub event: String,
    pub holder: String,
}

/// Decision reached for one scan, before it is rendered for staff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Admitted {
        ticket: TicketDisplay,
        scanned_at: DateTime<Utc>,
    },
    AlreadyUsed {
        ticket: TicketDisplay,
        scanned_at: Option<DateTime<Utc>>,
    },
    Rejected(ScanRejection),
}

impl Verdict {
    pub fn status(&self) -> OutcomeStatus {
        match self {
            Verdict::Admitted { .. } => OutcomeStatus::Valid,
            Verdict::AlreadyUsed { .. } => OutcomeStatus::AlreadyUsed,
            Verdict::Rejected(_) => OutcomeStatus::Invalid,
        }
    }

    pub fn audit_result(&self) -> ScanResult {
        match self {
            Verdict::Admitted { .. } => ScanResult::Success,
            Verdict::AlreadyUsed { .. } => ScanResult::AlreadyUsed,
            Verdict::Rejected(rejection) => rejection.audit_result(),
        }
    }

    pub fn into_outcome(self) -> ScanOutcome {
        match self {
            Verdict::Admitted { ticket, .. } => ScanOutcome {
                status: OutcomeStatus::Valid,
                message: MSG_ADMITTED.to_string(),
                ticket: Some(ticket),
                scanned_at: None,
                expected_event: None,
                offline: false,
            },
            Verdict::AlreadyUsed { ticket, scanned_at } => ScanOutcome {
                status: OutcomeStatus::AlreadyUsed,
                message: MSG_ALREADY_USED.to_string(),
                ticket: Some(ticket),
                scanned_at,
                expected_event: None,
                offline: false,
            },
            Verdict::Rejected(rejection) => {
                let message = rejection.message().to_string();
                let expected_event = match rejection {
                    ScanRejection::WrongEvent { expected_event } => Some(expected_event),
                    _ => None,
                };
                ScanOutcome {
                    status: OutcomeStatus::Invalid,
                    message,
                    ticket: None,
                    scanned_at: None,
                    expected_event,
                    offline: false,
                }
            }
        }
    }

    /// Same as [`Verdict::into_outcome`], flagged as decided on the device.
    pub fn into_offline_outcome(self) -> ScanOutcome {
        let admitted = matches!(self, Verdict::Admitted { .. });
        let mut outcome = self.into_outcome();
        if admitted {
            outcome.message = MSG_ADMITTED_OFFLINE.to_string();
        }
        outcome.offline = true;
        outcome
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Valid,
    AlreadyUsed,
    Invalid,
}

/// What gate staff see after a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub status: OutcomeStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket: Option<TicketDisplay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanned_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_event: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub offline: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display() -> TicketDisplay {
        TicketDisplay {
            uuid: Uuid::new_v4(),
            category: "VIP".to_string(),
            event: "Concert Rock".to_string(),
            holder: "Jane Doe".to_string(),
        }
    }

    #[test]
    fn test_forged_and_malformed_read_the_same() {
        assert_eq!(
            ScanRejection::MalformedCode.message(),
            ScanRejection::SignatureMismatch.message()
        );
    }

    #[test]
    fn test_wrong_event_outcome_carries_actual_title() {
        let outcome = Verdict::Rejected(ScanRejection::WrongEvent {
            expected_event: "Concert Rock".to_string(),
        })
        .into_outcome();
        assert_eq!(outcome.status, OutcomeStatus::Invalid);
        assert_eq!(outcome.expected_event.as_deref(), Some("Concert Rock"));
        assert!(outcome.ticket.is_none());
    }

    #[test]
    fn test_audit_results() {
        let now = Utc::now();
        assert_eq!(
            Verdict::Admitted { ticket: display(), scanned_at: now }.audit_result(),
            ScanResult::Success
        );
        assert_eq!(
            Verdict::AlreadyUsed { ticket: display(), scanned_at: Some(now) }.audit_result(),
            ScanResult::AlreadyUsed
        );
        assert_eq!(
            Verdict::Rejected(ScanRejection::TicketCancelled).audit_result(),
            ScanResult::Cancelled
        );
        assert_eq!(
            Verdict::Rejected(ScanRejection::TicketRefunded).audit_result(),
            ScanResult::Invalid
        );
    }

    #[test]
    fn test_outcome_json_shape() {
        let outcome = Verdict::Admitted {
            ticket: display(),
            scanned_at: Utc::now(),
        }
        .into_outcome();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "valid");
        assert_eq!(json["ticket"]["category"], "VIP");
        assert!(json.get("expected_event").is_none());
        assert!(json.get("offline").is_none());
    }

    #[test]
    fn test_offline_outcome_is_flagged() {
        let outcome = Verdict::Admitted {
            ticket: display(),
            scanned_at: Utc::now(),
        }
        .into_offline_outcome();
        assert!(outcome.offline);
        assert_eq!(outcome.message, MSG_ADMITTED_OFFLINE);

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["offline"], true);
    }

    #[test]
    fn test_outcome_deserializes_without_optional_fields() {
        let outcome: ScanOutcome =
            serde_json::from_str(r#"{"status":"invalid","message":"Ticket not found."}"#).unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Invalid);
        assert!(!outcome.offline);
    }

    #[test]
    fn test_scan_result_parse() {
        assert_eq!("already_used".parse::<ScanResult>(), Ok(ScanResult::AlreadyUsed));
        assert!("valid".parse::<ScanResult>().is_err());
    }
}
