// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! In-memory ticket backend.
//!
//! Stands in for the ticket and notification REST endpoints. The store is
//! authoritative: it re-checks status transitions against its own state, so
//! a bulk call built from a stale snapshot fails per ticket here instead of
//! silently applying.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use helpdesk::{NotificationApi, TicketMutationApi, TicketPatch, TransportError};
use helpdesk_domain::{Priority, TicketRef, TicketStatus, is_valid_transition};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// A ticket as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub id: String,
    pub status: TicketStatus,
    pub priority: Priority,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
}

impl TicketRecord {
    #[must_use]
    pub fn new(id: impl Into<String>, status: TicketStatus, priority: Priority) -> Self {
        Self {
            id: id.into(),
            status,
            priority,
            assignee_id: None,
            resolution: None,
        }
    }
}

/// A notification accepted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub ticket_ids: Vec<String>,
    pub message: String,
}

/// Errors loading a seed file.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse seed file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Default)]
pub struct InMemoryTicketStore {
    tickets: Mutex<BTreeMap<String, TicketRecord>>,
    notifications: Mutex<Vec<NotificationRecord>>,
}

impl InMemoryTicketStore {
    #[must_use]
    pub fn new(records: Vec<TicketRecord>) -> Self {
        let tickets: BTreeMap<String, TicketRecord> = records
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
        Self {
            tickets: Mutex::new(tickets),
            notifications: Mutex::new(Vec::new()),
        }
    }

    /// Loads tickets from a JSON array of [`TicketRecord`]s.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_seed_file(path: &Path) -> Result<Self, SeedError> {
        let contents: String = std::fs::read_to_string(path)?;
        let records: Vec<TicketRecord> = serde_json::from_str(&contents)?;
        info!(count = records.len(), path = %path.display(), "Loaded seed tickets");
        Ok(Self::new(records))
    }

    pub async fn list(&self) -> Vec<TicketRecord> {
        self.tickets.lock().await.values().cloned().collect()
    }

    pub async fn get(&self, id: &str) -> Option<TicketRecord> {
        self.tickets.lock().await.get(id).cloned()
    }

    /// Current status of each requested ticket the store knows about.
    pub async fn snapshot(&self, ids: &[String]) -> Vec<TicketRef> {
        let tickets = self.tickets.lock().await;
        ids.iter()
            .filter_map(|id| tickets.get(id))
            .map(|record| TicketRef::new(record.id.clone(), record.status))
            .collect()
    }

    pub async fn notifications(&self) -> Vec<NotificationRecord> {
        self.notifications.lock().await.clone()
    }

    async fn with_ticket<F>(&self, id: &str, update: F) -> Result<(), TransportError>
    where
        F: FnOnce(&mut TicketRecord) -> Result<(), TransportError> + Send,
    {
        let mut tickets = self.tickets.lock().await;
        let record = tickets
            .get_mut(id)
            .ok_or_else(|| TransportError::new(format!("Ticket {id} not found")))?;
        update(record)
    }
}

#[async_trait]
impl TicketMutationApi for InMemoryTicketStore {
    async fn update_status(
        &self,
        id: &str,
        status: TicketStatus,
        resolution: Option<&str>,
    ) -> Result<(), TransportError> {
        self.with_ticket(id, |record| {
            if !is_valid_transition(record.status, status) {
                return Err(TransportError::new(format!(
                    "Ticket {id} is {} and cannot move to {}",
                    record.status.display_name(),
                    status.display_name()
                )));
            }
            debug!(ticket_id = %id, from = %record.status, to = %status, "Updating status");
            record.status = status;
            if let Some(text) = resolution {
                record.resolution = Some(text.to_string());
            }
            Ok(())
        })
        .await
    }

    async fn assign(&self, id: &str, assignee_id: &str) -> Result<(), TransportError> {
        self.with_ticket(id, |record| {
            record.assignee_id = Some(assignee_id.to_string());
            Ok(())
        })
        .await
    }

    async fn update_ticket(&self, id: &str, patch: &TicketPatch) -> Result<(), TransportError> {
        self.with_ticket(id, |record| {
            if let Some(priority) = patch.priority {
                record.priority = priority;
            }
            Ok(())
        })
        .await
    }

    async fn delete_ticket(&self, id: &str) -> Result<(), TransportError> {
        self.tickets
            .lock()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| TransportError::new(format!("Ticket {id} not found")))
    }
}

#[async_trait]
impl NotificationApi for InMemoryTicketStore {
    async fn send_bulk_notification(
        &self,
        ids: &[String],
        message: &str,
    ) -> Result<(), TransportError> {
        let tickets = self.tickets.lock().await;
        if let Some(missing) = ids.iter().find(|id| !tickets.contains_key(*id)) {
            return Err(TransportError::new(format!(
                "Cannot notify: ticket {missing} not found"
            )));
        }
        drop(tickets);

        self.notifications.lock().await.push(NotificationRecord {
            ticket_ids: ids.to_vec(),
            message: message.to_string(),
        });
        Ok(())
    }
}
