// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use helpdesk_domain::DomainError;
use thiserror::Error;

use crate::bulk::BulkActionOutcome;

/// Why a single ticket failed pre-flight validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViolationReason {
    /// A status rule was violated.
    #[error("{0}")]
    Rule(#[from] DomainError),
    /// The caller's snapshot had no status for this ticket.
    #[error("Ticket is not in the current ticket list")]
    MissingFromSnapshot,
}

/// One ticket that would violate a rule if the batch were dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketViolation {
    pub ticket_id: String,
    pub reason: ViolationReason,
}

impl std::fmt::Display for TicketViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.ticket_id, self.reason)
    }
}

/// Errors surfaced by a bulk call.
///
/// None of these are fatal. `ValidationRejected` and `InvalidPayload` are
/// raised before any request is sent; `PartialFailure` and `TotalFailure`
/// carry the full outcome so the caller can retry just the failed ids.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BulkError {
    /// Nothing was selected. No request was sent.
    #[error("No tickets selected")]
    EmptySelection,

    /// The action payload is unusable for every ticket alike.
    #[error("Invalid {field}: {message}")]
    InvalidPayload {
        field: &'static str,
        message: String,
    },

    /// At least one ticket failed pre-flight validation. No request was sent.
    #[error("{} ticket(s) failed validation: {}", violations.len(), format_violations(violations))]
    ValidationRejected { violations: Vec<TicketViolation> },

    /// Some tickets were updated and some failed.
    #[error(
        "{} of {} tickets updated, {} failed",
        outcome.succeeded_count,
        outcome.total(),
        outcome.failed_count
    )]
    PartialFailure { outcome: BulkActionOutcome },

    /// Every request in the batch failed.
    #[error("All {} tickets failed", outcome.failed_count)]
    TotalFailure { outcome: BulkActionOutcome },
}

impl BulkError {
    /// Returns the dispatch outcome, if the batch got as far as dispatch.
    #[must_use]
    pub const fn outcome(&self) -> Option<&BulkActionOutcome> {
        match self {
            Self::PartialFailure { outcome } | Self::TotalFailure { outcome } => Some(outcome),
            Self::EmptySelection | Self::InvalidPayload { .. } | Self::ValidationRejected { .. } => {
                None
            }
        }
    }

    /// True if the batch was refused before any request was sent.
    #[must_use]
    pub const fn is_preflight(&self) -> bool {
        self.outcome().is_none()
    }
}

fn format_violations(violations: &[TicketViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
