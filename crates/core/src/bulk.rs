// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Bulk ticket operations.
//!
//! A bulk call moves through `Idle -> Validating -> {Rejected | Dispatching}
//! -> Aggregating -> Idle`. Rule violations reject the whole batch before any
//! request is sent. Once dispatch starts, every request runs to completion
//! and individual failures are recorded, never short-circuited.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::future::join_all;
use helpdesk_domain::{Role, TicketRef, TicketStatus, validate_status_update};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::action::{BulkAction, BulkActionKind, TicketPatch};
use crate::error::{BulkError, TicketViolation, ViolationReason};
use crate::ports::{
    CacheInvalidator, NotificationApi, QueryKey, TicketMutationApi, TransportError,
};
use crate::selection::SelectionManager;

/// Where a bulk call currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkPhase {
    Idle,
    Validating,
    Rejected,
    Dispatching,
    Aggregating,
}

impl BulkPhase {
    /// Selection controls should be disabled while this is true.
    #[must_use]
    pub const fn is_processing(&self) -> bool {
        matches!(self, Self::Dispatching | Self::Aggregating)
    }
}

/// One bulk action bound to the ids it targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkActionRequest {
    pub action: BulkAction,
    pub ticket_ids: Vec<String>,
}

impl BulkActionRequest {
    /// Builds a request targeting the current selection.
    #[must_use]
    pub fn from_selection(action: BulkAction, selection: &SelectionManager) -> Self {
        Self {
            action,
            ticket_ids: selection.selected_ids(),
        }
    }
}

/// Aggregated result of a dispatched batch.
///
/// Built from a map keyed by ticket id, so the result does not depend on
/// the order in which responses arrived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkActionOutcome {
    pub action: BulkActionKind,
    pub succeeded_count: usize,
    pub failed_count: usize,
    /// Sorted ids of the tickets whose request completed.
    pub succeeded_ids: Vec<String>,
    pub per_ticket_errors: BTreeMap<String, TransportError>,
}

impl BulkActionOutcome {
    fn from_results(
        action: BulkActionKind,
        results: Vec<(String, Result<(), TransportError>)>,
    ) -> Self {
        let mut succeeded_ids: Vec<String> = Vec::new();
        let mut per_ticket_errors: BTreeMap<String, TransportError> = BTreeMap::new();

        for (id, result) in results {
            match result {
                Ok(()) => succeeded_ids.push(id),
                Err(err) => {
                    per_ticket_errors.insert(id, err);
                }
            }
        }
        succeeded_ids.sort();

        Self {
            action,
            succeeded_count: succeeded_ids.len(),
            failed_count: per_ticket_errors.len(),
            succeeded_ids,
            per_ticket_errors,
        }
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.succeeded_count + self.failed_count
    }

    /// Ids to re-select for a retry.
    #[must_use]
    pub fn failed_ids(&self) -> Vec<String> {
        self.per_ticket_errors.keys().cloned().collect()
    }
}

/// Validates a bulk request without dispatching anything.
///
/// Non-status actions only have their payload checked. Status changes are
/// validated per ticket against `snapshot`, and every offending ticket is
/// reported, not just the first.
///
/// # Errors
///
/// Returns `BulkError::EmptySelection`, `BulkError::InvalidPayload` or
/// `BulkError::ValidationRejected`.
pub fn validate_bulk_request(
    request: &BulkActionRequest,
    snapshot: &[TicketRef],
    role: Option<Role>,
) -> Result<(), BulkError> {
    if request.ticket_ids.is_empty() {
        return Err(BulkError::EmptySelection);
    }

    match &request.action {
        BulkAction::UpdateStatus { status, resolution } => validate_status_batch(
            &request.ticket_ids,
            *status,
            resolution.as_deref(),
            snapshot,
            role,
        ),
        BulkAction::Assign { assignee_id } if assignee_id.trim().is_empty() => {
            Err(BulkError::InvalidPayload {
                field: "assignee_id",
                message: String::from("must not be blank"),
            })
        }
        BulkAction::Notify { message } if message.trim().is_empty() => {
            Err(BulkError::InvalidPayload {
                field: "message",
                message: String::from("must not be blank"),
            })
        }
        BulkAction::UpdatePriority { .. }
        | BulkAction::Assign { .. }
        | BulkAction::Delete
        | BulkAction::Notify { .. } => Ok(()),
    }
}

fn validate_status_batch(
    ticket_ids: &[String],
    next: TicketStatus,
    resolution: Option<&str>,
    snapshot: &[TicketRef],
    role: Option<Role>,
) -> Result<(), BulkError> {
    let known: HashMap<&str, TicketStatus> = snapshot
        .iter()
        .map(|ticket| (ticket.id.as_str(), ticket.status))
        .collect();

    let violations: Vec<TicketViolation> = ticket_ids
        .iter()
        .filter_map(|id| {
            let reason: ViolationReason = match known.get(id.as_str()) {
                None => ViolationReason::MissingFromSnapshot,
                Some(current) => validate_status_update(*current, next, resolution, role)
                    .err()?
                    .into(),
            };
            Some(TicketViolation {
                ticket_id: id.clone(),
                reason,
            })
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(BulkError::ValidationRejected { violations })
    }
}

/// The per-ticket request an action fans out to.
enum TicketRequest<'a> {
    Status {
        status: TicketStatus,
        resolution: Option<&'a str>,
    },
    Patch(TicketPatch),
    Assign(&'a str),
    Delete,
}

/// Resets the published phase to `Idle` when a call finishes or is dropped.
struct PhaseGuard<'a> {
    phase: &'a watch::Sender<BulkPhase>,
}

impl PhaseGuard<'_> {
    fn set(&self, phase: BulkPhase) {
        self.phase.send_replace(phase);
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.phase.send_replace(BulkPhase::Idle);
    }
}

/// Applies one action to many tickets.
///
/// One coordinator is shared by a list view. The current phase is published
/// on a watch channel so a rendering layer can subscribe to it.
pub struct BulkOperationCoordinator {
    tickets: Arc<dyn TicketMutationApi>,
    notifications: Arc<dyn NotificationApi>,
    cache: Arc<dyn CacheInvalidator>,
    phase: watch::Sender<BulkPhase>,
}

impl BulkOperationCoordinator {
    #[must_use]
    pub fn new(
        tickets: Arc<dyn TicketMutationApi>,
        notifications: Arc<dyn NotificationApi>,
        cache: Arc<dyn CacheInvalidator>,
    ) -> Self {
        let (phase, _rx) = watch::channel(BulkPhase::Idle);
        Self {
            tickets,
            notifications,
            cache,
            phase,
        }
    }

    /// Subscribes to phase changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<BulkPhase> {
        self.phase.subscribe()
    }

    #[must_use]
    pub fn phase(&self) -> BulkPhase {
        *self.phase.borrow()
    }

    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.phase().is_processing()
    }

    /// Runs `action` against every ticket in `selection`.
    ///
    /// `snapshot` holds the caller's last known status for the selected
    /// tickets and is only consulted for status changes. On any dispatched
    /// batch with at least one success, the list, paginated list, count and
    /// per-ticket detail views are invalidated. Unless the action is a
    /// notification, the selection is cleared after dispatch.
    ///
    /// # Errors
    ///
    /// Pre-flight errors (`EmptySelection`, `InvalidPayload`,
    /// `ValidationRejected`) leave the selection and cache untouched.
    /// `PartialFailure` and `TotalFailure` are returned after dispatch and
    /// carry the full outcome.
    pub async fn execute(
        &self,
        action: BulkAction,
        selection: &mut SelectionManager,
        snapshot: &[TicketRef],
        role: Option<Role>,
    ) -> Result<BulkActionOutcome, BulkError> {
        if selection.is_empty() {
            debug!(action = %action.kind(), "Bulk action skipped: empty selection");
            return Err(BulkError::EmptySelection);
        }

        let request: BulkActionRequest = BulkActionRequest::from_selection(action, selection);
        let kind: BulkActionKind = request.action.kind();
        let guard = PhaseGuard { phase: &self.phase };

        guard.set(BulkPhase::Validating);
        if let Err(err) = validate_bulk_request(&request, snapshot, role) {
            warn!(
                action = %kind,
                tickets = request.ticket_ids.len(),
                error = %err,
                "Bulk action rejected"
            );
            guard.set(BulkPhase::Rejected);
            return Err(err);
        }

        info!(action = %kind, tickets = request.ticket_ids.len(), "Dispatching bulk action");
        guard.set(BulkPhase::Dispatching);
        let results = self.dispatch(&request).await;

        guard.set(BulkPhase::Aggregating);
        let outcome: BulkActionOutcome = BulkActionOutcome::from_results(kind, results);
        for (id, err) in &outcome.per_ticket_errors {
            debug!(action = %kind, ticket_id = %id, error = %err, "Bulk request failed");
        }

        if outcome.succeeded_count > 0 {
            self.invalidate(&outcome.succeeded_ids);
        }
        if request.action.clears_selection() {
            selection.clear();
        }

        info!(
            action = %kind,
            succeeded = outcome.succeeded_count,
            failed = outcome.failed_count,
            "Bulk action finished"
        );
        drop(guard);

        if outcome.failed_count == 0 {
            Ok(outcome)
        } else if outcome.succeeded_count == 0 {
            Err(BulkError::TotalFailure { outcome })
        } else {
            Err(BulkError::PartialFailure { outcome })
        }
    }

    async fn dispatch(
        &self,
        request: &BulkActionRequest,
    ) -> Vec<(String, Result<(), TransportError>)> {
        let ticket_request: TicketRequest<'_> = match &request.action {
            BulkAction::Notify { message } => {
                let result = self
                    .notifications
                    .send_bulk_notification(&request.ticket_ids, message)
                    .await;
                return request
                    .ticket_ids
                    .iter()
                    .map(|id| (id.clone(), result.clone()))
                    .collect();
            }
            BulkAction::UpdateStatus { status, resolution } => TicketRequest::Status {
                status: *status,
                resolution: resolution.as_deref(),
            },
            BulkAction::UpdatePriority { priority } => TicketRequest::Patch(TicketPatch {
                priority: Some(*priority),
            }),
            BulkAction::Assign { assignee_id } => TicketRequest::Assign(assignee_id),
            BulkAction::Delete => TicketRequest::Delete,
        };

        let ticket_request: &TicketRequest<'_> = &ticket_request;
        join_all(request.ticket_ids.iter().map(|id| async move {
            (id.clone(), self.send(ticket_request, id).await)
        }))
        .await
    }

    async fn send(&self, request: &TicketRequest<'_>, id: &str) -> Result<(), TransportError> {
        match request {
            TicketRequest::Status { status, resolution } => {
                self.tickets.update_status(id, *status, *resolution).await
            }
            TicketRequest::Patch(patch) => self.tickets.update_ticket(id, patch).await,
            TicketRequest::Assign(assignee_id) => self.tickets.assign(id, assignee_id).await,
            TicketRequest::Delete => self.tickets.delete_ticket(id).await,
        }
    }

    fn invalidate(&self, succeeded_ids: &[String]) {
        let keys = [
            QueryKey::TicketList,
            QueryKey::PaginatedTicketList,
            QueryKey::TicketCounts,
        ]
        .into_iter()
        .chain(succeeded_ids.iter().cloned().map(QueryKey::TicketDetail));

        for key in keys {
            debug!(key = %key, "Invalidating cached view");
            self.cache.invalidate(&key);
        }
    }
}
