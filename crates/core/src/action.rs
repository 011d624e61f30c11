// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use helpdesk_domain::{Priority, TicketStatus};
use serde::{Deserialize, Serialize};

/// A bulk action requested against the current selection.
///
/// Actions are data only; the coordinator decides how each one is
/// validated and dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BulkAction {
    /// Move every selected ticket to a new status.
    UpdateStatus {
        /// The target status.
        status: TicketStatus,
        /// Resolution text, required when the target is `RESOLVED`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resolution: Option<String>,
    },
    /// Set the priority of every selected ticket.
    UpdatePriority {
        /// The new priority.
        priority: Priority,
    },
    /// Assign every selected ticket to one agent.
    Assign {
        /// The agent receiving the tickets.
        assignee_id: String,
    },
    /// Delete every selected ticket.
    Delete,
    /// Send one notification covering every selected ticket.
    Notify {
        /// The notification body.
        message: String,
    },
}

/// Discriminant of a [`BulkAction`], for logging and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkActionKind {
    UpdateStatus,
    UpdatePriority,
    Assign,
    Delete,
    Notify,
}

impl BulkActionKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UpdateStatus => "update_status",
            Self::UpdatePriority => "update_priority",
            Self::Assign => "assign",
            Self::Delete => "delete",
            Self::Notify => "notify",
        }
    }
}

impl std::fmt::Display for BulkActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl BulkAction {
    #[must_use]
    pub const fn kind(&self) -> BulkActionKind {
        match self {
            Self::UpdateStatus { .. } => BulkActionKind::UpdateStatus,
            Self::UpdatePriority { .. } => BulkActionKind::UpdatePriority,
            Self::Assign { .. } => BulkActionKind::Assign,
            Self::Delete => BulkActionKind::Delete,
            Self::Notify { .. } => BulkActionKind::Notify,
        }
    }

    /// Whether the selection is cleared once the batch has been dispatched.
    ///
    /// Notifications leave the selection in place so the user can follow up
    /// with another action on the same tickets.
    #[must_use]
    pub const fn clears_selection(&self) -> bool {
        !matches!(self, Self::Notify { .. })
    }
}

/// Partial update sent through the generic ticket update endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}
