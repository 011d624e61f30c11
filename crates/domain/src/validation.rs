// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::DomainError;
use crate::status::{TicketStatus, is_valid_transition};
use crate::types::Role;

/// Validates a single proposed status change.
///
/// Checks run in a fixed order and the first failure is returned:
/// 1. the transition must be in the transition table
/// 2. an end user may only move a ticket from `CLOSED` to `REOPENED`
/// 3. moving to `RESOLVED` requires non-blank resolution text
///
/// Ticket ownership for end users is not checked here.
///
/// # Arguments
///
/// * `current` - The ticket's current status
/// * `next` - The requested status
/// * `resolution` - Resolution text accompanying the change, if any
/// * `role` - The role of the user making the change, if known
///
/// # Errors
///
/// Returns `DomainError::InvalidTransition`, `DomainError::PermissionDenied`
/// or `DomainError::ResolutionRequired`.
pub fn validate_status_update(
    current: TicketStatus,
    next: TicketStatus,
    resolution: Option<&str>,
    role: Option<Role>,
) -> Result<(), DomainError> {
    if !is_valid_transition(current, next) {
        return Err(DomainError::InvalidTransition {
            from: current,
            to: next,
        });
    }

    if role == Some(Role::EndUser)
        && !(current == TicketStatus::Closed && next == TicketStatus::Reopened)
    {
        return Err(DomainError::PermissionDenied {
            role: Role::EndUser,
            from: current,
            to: next,
        });
    }

    if next == TicketStatus::Resolved && resolution.is_none_or(|text| text.trim().is_empty()) {
        return Err(DomainError::ResolutionRequired);
    }

    Ok(())
}
