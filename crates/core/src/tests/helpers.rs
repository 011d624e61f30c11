// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use helpdesk_domain::{TicketRef, TicketStatus};

use crate::{
    BulkOperationCoordinator, CacheInvalidator, NotificationApi, QueryKey, SelectionManager,
    TicketMutationApi, TicketPatch, TransportError,
};

/// A request the fake ticket API received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Status {
        id: String,
        status: TicketStatus,
        resolution: Option<String>,
    },
    Patch {
        id: String,
        patch: TicketPatch,
    },
    Assign {
        id: String,
        assignee_id: String,
    },
    Delete {
        id: String,
    },
}

/// Ticket API fake with injectable per-id failures and delays.
#[derive(Default)]
pub struct RecordingTicketApi {
    failures: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<RecordedCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingTicketApi {
    pub fn failing(mut self, id: &str, message: &str) -> Self {
        self.failures.insert(id.to_string(), message.to_string());
        self
    }

    pub fn delayed(mut self, id: &str, millis: u64) -> Self {
        self.delays.insert(id.to_string(), Duration::from_millis(millis));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn handle(&self, id: &str, call: RecordedCall) -> Result<(), TransportError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(id) {
            tokio::time::sleep(*delay).await;
        } else {
            tokio::task::yield_now().await;
        }

        self.calls.lock().unwrap().push(call);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.failures.get(id) {
            Some(message) => Err(TransportError::new(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TicketMutationApi for RecordingTicketApi {
    async fn update_status(
        &self,
        id: &str,
        status: TicketStatus,
        resolution: Option<&str>,
    ) -> Result<(), TransportError> {
        let call = RecordedCall::Status {
            id: id.to_string(),
            status,
            resolution: resolution.map(ToString::to_string),
        };
        self.handle(id, call).await
    }

    async fn assign(&self, id: &str, assignee_id: &str) -> Result<(), TransportError> {
        let call = RecordedCall::Assign {
            id: id.to_string(),
            assignee_id: assignee_id.to_string(),
        };
        self.handle(id, call).await
    }

    async fn update_ticket(&self, id: &str, patch: &TicketPatch) -> Result<(), TransportError> {
        let call = RecordedCall::Patch {
            id: id.to_string(),
            patch: patch.clone(),
        };
        self.handle(id, call).await
    }

    async fn delete_ticket(&self, id: &str) -> Result<(), TransportError> {
        let call = RecordedCall::Delete { id: id.to_string() };
        self.handle(id, call).await
    }
}

/// Notification fake returning a fixed result.
#[derive(Default)]
pub struct RecordingNotifier {
    failure: Option<String>,
    calls: Mutex<Vec<(Vec<String>, String)>>,
}

impl RecordingNotifier {
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(Vec<String>, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationApi for RecordingNotifier {
    async fn send_bulk_notification(
        &self,
        ids: &[String],
        message: &str,
    ) -> Result<(), TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push((ids.to_vec(), message.to_string()));
        match &self.failure {
            Some(message) => Err(TransportError::new(message.clone())),
            None => Ok(()),
        }
    }
}

/// Cache fake recording every invalidated key.
#[derive(Default)]
pub struct RecordingCache {
    keys: Mutex<Vec<QueryKey>>,
}

impl RecordingCache {
    pub fn keys(&self) -> Vec<QueryKey> {
        self.keys.lock().unwrap().clone()
    }

    pub fn detail_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .keys()
            .into_iter()
            .filter_map(|key| match key {
                QueryKey::TicketDetail(id) => Some(id),
                _ => None,
            })
            .collect();
        ids.sort();
        ids
    }
}

impl CacheInvalidator for RecordingCache {
    fn invalidate(&self, key: &QueryKey) {
        self.keys.lock().unwrap().push(key.clone());
    }
}

pub struct Harness {
    pub coordinator: BulkOperationCoordinator,
    pub tickets: Arc<RecordingTicketApi>,
    pub notifier: Arc<RecordingNotifier>,
    pub cache: Arc<RecordingCache>,
}

pub fn create_harness(tickets: RecordingTicketApi, notifier: RecordingNotifier) -> Harness {
    let tickets = Arc::new(tickets);
    let notifier = Arc::new(notifier);
    let cache = Arc::new(RecordingCache::default());
    let coordinator = BulkOperationCoordinator::new(
        Arc::clone(&tickets) as Arc<dyn TicketMutationApi>,
        Arc::clone(&notifier) as Arc<dyn NotificationApi>,
        Arc::clone(&cache) as Arc<dyn CacheInvalidator>,
    );
    Harness {
        coordinator,
        tickets,
        notifier,
        cache,
    }
}

pub fn create_default_harness() -> Harness {
    create_harness(RecordingTicketApi::default(), RecordingNotifier::default())
}

pub fn create_selection(ids: &[&str]) -> SelectionManager {
    let mut selection = SelectionManager::new();
    selection.select_all(ids.iter().copied());
    selection
}

pub fn create_snapshot(entries: &[(&str, TicketStatus)]) -> Vec<TicketRef> {
    entries
        .iter()
        .map(|(id, status)| TicketRef::new(*id, *status))
        .collect()
}

pub fn to_ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}
