use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Valid,
    Used,
    Cancelled,
    Refunded,
}

impl TicketStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Valid => "valid",
            TicketStatus::Used => "used",
            TicketStatus::Cancelled => "cancelled",
            TicketStatus::Refunded => "refunded",
        }
    }

    /// What the gate does with a ticket in this status.
    pub const fn admission(self) -> Admission {
        match self {
            TicketStatus::Valid => Admission::Admit,
            TicketStatus::Used => Admission::AlreadyUsed,
            TicketStatus::Cancelled => Admission::Cancelled,
            TicketStatus::Refunded => Admission::Refunded,
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "valid" => Ok(TicketStatus::Valid),
            "used" => Ok(TicketStatus::Used),
            "cancelled" => Ok(TicketStatus::Cancelled),
            "refunded" => Ok(TicketStatus::Refunded),
            other => Err(TransitionError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admit,
    AlreadyUsed,
    Cancelled,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Admit,
    Cancel,
    Refund,
}

impl Transition {
    pub const fn as_str(self) -> &'static str {
        match self {
            Transition::Admit => "admit",
            Transition::Cancel => "cancel",
            Transition::Refund => "refund",
        }
    }

    /// Statuses this transition may start from.
    ///
    /// Refunds are accepted after admission as well.
    pub const fn from_states(self) -> &'static [TicketStatus] {
        match self {
            Transition::Admit | Transition::Cancel => &[TicketStatus::Valid],
            Transition::Refund => &[TicketStatus::Valid, TicketStatus::Used],
        }
    }

    pub const fn target(self) -> TicketStatus {
        match self {
            Transition::Admit => TicketStatus::Used,
            Transition::Cancel => TicketStatus::Cancelled,
            Transition::Refund => TicketStatus::Refunded,
        }
    }

    pub fn allowed_from(self, status: TicketStatus) -> bool {
        self.from_states().contains(&status)
    }

    /// `scanned_at` after the transition lands. Only admission carries a time.
    pub const fn scanned_at_after(self, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Transition::Admit => Some(at),
            Transition::Cancel | Transition::Refund => None,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {transition} a {from} ticket")]
    NotAllowed {
        from: TicketStatus,
        transition: Transition,
    },

    #[error("ticket status {status} does not agree with scanned_at")]
    Inconsistent { status: TicketStatus },

    #[error("unknown ticket status '{0}'")]
    UnknownStatus(String),
}

/// Admission status of one ticket. `scanned_at` is set iff the status is `used`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketState {
    status: TicketStatus,
    scanned_at: Option<DateTime<Utc>>,
}

impl TicketState {
    pub const fn issued() -> Self {
        Self {
            status: TicketStatus::Valid,
            scanned_at: None,
        }
    }

    pub fn new(
        status: TicketStatus,
        scanned_at: Option<DateTime<Utc>>,
    ) -> Result<Self, TransitionError> {
        if (status == TicketStatus::Used) != scanned_at.is_some() {
            return Err(TransitionError::Inconsistent { status });
        }
        Ok(Self { status, scanned_at })
    }

    pub const fn status(&self) -> TicketStatus {
        self.status
    }

    pub const fn scanned_at(&self) -> Option<DateTime<Utc>> {
        self.scanned_at
    }

    pub fn apply(self, transition: Transition, at: DateTime<Utc>) -> Result<Self, TransitionError> {
        if !transition.allowed_from(self.status) {
            return Err(TransitionError::NotAllowed {
                from: self.status,
                transition,
            });
        }
        Ok(Self {
            status: transition.target(),
            scanned_at: transition.scanned_at_after(at),
        })
    }
}

impl Default for TicketState {
    fn default() -> Self {
        Self::issued()
    }
}
