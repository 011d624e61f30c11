// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::status::TicketStatus;
use crate::types::Role;

/// Errors that can occur during domain validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The requested status is not reachable from the current status.
    InvalidTransition {
        /// The ticket's current status.
        from: TicketStatus,
        /// The requested status.
        to: TicketStatus,
    },
    /// The role is not permitted to make this status change.
    PermissionDenied {
        /// The role that attempted the change.
        role: Role,
        /// The ticket's current status.
        from: TicketStatus,
        /// The requested status.
        to: TicketStatus,
    },
    /// Resolving a ticket requires non-blank resolution text.
    ResolutionRequired,
    /// Status string is not one of the known statuses.
    InvalidStatus(String),
    /// Priority string is not one of the known priorities.
    InvalidPriority(String),
    /// Role string is not one of the known roles.
    InvalidRole(String),
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTransition { from, to } => {
                write!(
                    f,
                    "Cannot change status from {} to {}",
                    from.display_name(),
                    to.display_name()
                )
            }
            Self::PermissionDenied { role, from, to } => {
                write!(
                    f,
                    "Role {} may not change status from {} to {}; end users can only reopen closed tickets",
                    role.as_str(),
                    from.display_name(),
                    to.display_name()
                )
            }
            Self::ResolutionRequired => {
                write!(f, "Resolution is required when marking a ticket as resolved")
            }
            Self::InvalidStatus(value) => write!(f, "Invalid ticket status: {value}"),
            Self::InvalidPriority(value) => write!(f, "Invalid ticket priority: {value}"),
            Self::InvalidRole(value) => write!(f, "Invalid role: {value}"),
        }
    }
}

impl std::error::Error for DomainError {}
