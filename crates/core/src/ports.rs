// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Collaborator contracts consumed by the bulk coordinator.
//!
//! The ticket API, the notification API and the query cache all live
//! outside this crate. The coordinator only needs success or failure plus a
//! message from each call.

use async_trait::async_trait;
use helpdesk_domain::TicketStatus;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::action::TicketPatch;

/// A request the transport layer could not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct TransportError {
    /// Message reported by the backend or the transport.
    pub message: String,
}

impl TransportError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Per-ticket mutation endpoints.
#[async_trait]
pub trait TicketMutationApi: Send + Sync {
    /// Changes the status of one ticket.
    async fn update_status(
        &self,
        id: &str,
        status: TicketStatus,
        resolution: Option<&str>,
    ) -> Result<(), TransportError>;

    /// Assigns one ticket to an agent.
    async fn assign(&self, id: &str, assignee_id: &str) -> Result<(), TransportError>;

    /// Applies a partial update to one ticket.
    async fn update_ticket(&self, id: &str, patch: &TicketPatch) -> Result<(), TransportError>;

    /// Deletes one ticket.
    async fn delete_ticket(&self, id: &str) -> Result<(), TransportError>;
}

/// Batch notification endpoint. One call covers every id.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    async fn send_bulk_notification(
        &self,
        ids: &[String],
        message: &str,
    ) -> Result<(), TransportError>;
}

/// Cached views that may hold stale ticket data after a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKey {
    /// Unpaginated ticket lists.
    TicketList,
    /// Paginated ticket lists.
    PaginatedTicketList,
    /// Aggregate counts (per status, per assignee, dashboard totals).
    TicketCounts,
    /// The detail view of one ticket.
    TicketDetail(String),
}

impl QueryKey {
    /// Returns the stable string form of the key.
    #[must_use]
    pub fn as_key(&self) -> String {
        match self {
            Self::TicketList => String::from("tickets"),
            Self::PaginatedTicketList => String::from("tickets/paginated"),
            Self::TicketCounts => String::from("tickets/counts"),
            Self::TicketDetail(id) => format!("tickets/detail/{id}"),
        }
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_key())
    }
}

/// Receives invalidation signals for cached views.
pub trait CacheInvalidator: Send + Sync {
    fn invalidate(&self, key: &QueryKey);
}
