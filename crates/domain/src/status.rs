// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Ticket status states and the transition table.
//!
//! The table is fixed at compile time. Every status has an entry, and the
//! exhaustive `match` in [`TicketStatus::allowed_transitions`] keeps it total
//! over the enum.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lifecycle status of a helpdesk ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    /// Ticket was just submitted and has not been triaged
    New,
    /// Ticket has been triaged and is waiting for an agent
    Open,
    /// An agent is actively working the ticket
    InProgress,
    /// Work is paused, usually waiting on the requester or a third party
    OnHold,
    /// A fix has been delivered and documented
    Resolved,
    /// Ticket is closed
    Closed,
    /// A resolved or closed ticket was reopened
    Reopened,
}

impl TicketStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::New,
        Self::Open,
        Self::InProgress,
        Self::OnHold,
        Self::Resolved,
        Self::Closed,
        Self::Reopened,
    ];

    /// Returns the wire representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Open => "OPEN",
            Self::InProgress => "IN_PROGRESS",
            Self::OnHold => "ON_HOLD",
            Self::Resolved => "RESOLVED",
            Self::Closed => "CLOSED",
            Self::Reopened => "REOPENED",
        }
    }

    /// Returns the human-readable form used in validation messages.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Open => "OPEN",
            Self::InProgress => "IN PROGRESS",
            Self::OnHold => "ON HOLD",
            Self::Resolved => "RESOLVED",
            Self::Closed => "CLOSED",
            Self::Reopened => "REOPENED",
        }
    }

    /// Returns the statuses this status may legally move to.
    ///
    /// Order carries no meaning; callers should treat the slice as a set.
    #[must_use]
    pub const fn allowed_transitions(&self) -> &'static [Self] {
        match self {
            Self::New => &[Self::Open, Self::Closed],
            Self::Open => &[Self::InProgress, Self::OnHold, Self::Closed],
            Self::InProgress => &[Self::OnHold, Self::Resolved, Self::Closed],
            Self::OnHold => &[Self::InProgress, Self::Closed],
            Self::Resolved => &[Self::Closed, Self::Reopened],
            Self::Closed => &[Self::Reopened],
            Self::Reopened => &[Self::Open, Self::InProgress, Self::Closed],
        }
    }

    /// Returns true if `next` is in this status's transition set.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Returns true if this status has no outgoing transitions.
    ///
    /// No status in the current table is terminal; `CLOSED` can always be
    /// reopened.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

/// Returns true iff `next` is a legal next status for `current`.
#[must_use]
pub fn is_valid_transition(current: TicketStatus, next: TicketStatus) -> bool {
    current.can_transition_to(next)
}

impl FromStr for TicketStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::InvalidStatus(s.to_string()))
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
