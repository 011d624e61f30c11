// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]

mod action;
mod bulk;
mod error;
mod ports;
mod selection;

#[cfg(test)]
mod tests;

pub use action::{BulkAction, BulkActionKind, TicketPatch};
pub use bulk::{
    BulkActionOutcome, BulkActionRequest, BulkOperationCoordinator, BulkPhase,
    validate_bulk_request,
};
pub use error::{BulkError, TicketViolation, ViolationReason};
pub use ports::{CacheInvalidator, NotificationApi, QueryKey, TicketMutationApi, TransportError};
pub use selection::{SelectionManager, SelectionState};
