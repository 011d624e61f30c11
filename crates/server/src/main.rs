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
    clippy::all
)]
#![allow(clippy::multiple_crate_versions)]

mod live;
mod store;

use axum::{
    Json, Router,
    extract::{Path, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::Parser;
use helpdesk::{
    BulkAction, BulkActionOutcome, BulkError, BulkOperationCoordinator, CacheInvalidator,
    NotificationApi, SelectionManager, TicketMutationApi, TicketViolation, ViolationReason,
};
use helpdesk_domain::{Role, TicketRef};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use live::{LiveEventBroadcaster, live_events_handler};
use store::{InMemoryTicketStore, TicketRecord};

/// Helpdesk Server - bulk ticket operations over HTTP
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind the server to
    #[arg(short, long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to bind the server to
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// JSON file of tickets to seed the in-memory store with
    #[arg(short, long)]
    tickets: Option<PathBuf>,
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The ticket backend.
    store: Arc<InMemoryTicketStore>,
    /// Invalidation fan-out to live clients.
    live: Arc<LiveEventBroadcaster>,
}

impl AppState {
    fn new(store: InMemoryTicketStore) -> Self {
        Self {
            store: Arc::new(store),
            live: Arc::new(LiveEventBroadcaster::new()),
        }
    }

    /// Builds a coordinator bound to this state.
    ///
    /// Each request gets its own coordinator so concurrent requests do not
    /// share a published phase.
    fn coordinator(&self) -> BulkOperationCoordinator {
        BulkOperationCoordinator::new(
            Arc::clone(&self.store) as Arc<dyn TicketMutationApi>,
            Arc::clone(&self.store) as Arc<dyn NotificationApi>,
            Arc::clone(&self.live) as Arc<dyn CacheInvalidator>,
        )
    }
}

/// API request for a bulk action.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct BulkApiRequest {
    /// The role of the caller, if known.
    #[serde(default)]
    actor_role: Option<String>,
    /// The selected ticket ids.
    ticket_ids: Vec<String>,
    /// The action to apply.
    action: BulkAction,
}

/// One ticket refused during pre-flight validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ViolationResponse {
    ticket_id: String,
    reason: String,
}

/// API response for a bulk action.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BulkApiResponse {
    /// True only if every ticket was updated.
    success: bool,
    /// Human-readable summary.
    message: String,
    /// Per-ticket results, absent when the batch was refused before dispatch.
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<BulkActionOutcome>,
    /// Offending tickets, when the batch failed validation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    violations: Vec<ViolationResponse>,
}

impl BulkApiResponse {
    fn from_result(result: Result<BulkActionOutcome, BulkError>) -> (StatusCode, Self) {
        match result {
            Ok(outcome) => (
                StatusCode::OK,
                Self {
                    success: true,
                    message: format!("{} tickets updated", outcome.succeeded_count),
                    outcome: Some(outcome),
                    violations: Vec::new(),
                },
            ),
            Err(err) => {
                let status: StatusCode = match &err {
                    BulkError::EmptySelection | BulkError::InvalidPayload { .. } => {
                        StatusCode::BAD_REQUEST
                    }
                    BulkError::ValidationRejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                    BulkError::PartialFailure { .. } => StatusCode::MULTI_STATUS,
                    BulkError::TotalFailure { .. } => StatusCode::BAD_GATEWAY,
                };
                let violations: Vec<ViolationResponse> = match &err {
                    BulkError::ValidationRejected { violations } => violations
                        .iter()
                        .map(|v| ViolationResponse {
                            ticket_id: v.ticket_id.clone(),
                            reason: v.reason.to_string(),
                        })
                        .collect(),
                    _ => Vec::new(),
                };
                (
                    status,
                    Self {
                        success: false,
                        message: err.to_string(),
                        outcome: err.outcome().cloned(),
                        violations,
                    },
                )
            }
        }
    }
}

/// Error response type.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ErrorResponse {
    /// Error indicator.
    error: bool,
    /// Error message.
    message: String,
}

/// HTTP error wrapper that implements `IntoResponse`.
struct HttpError {
    /// The HTTP status code.
    status: StatusCode,
    /// The error message.
    message: String,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body: Json<ErrorResponse> = Json(ErrorResponse {
            error: true,
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

/// Parses an optional role string.
fn parse_role(role: Option<&str>) -> Result<Option<Role>, HttpError> {
    role.map(str::parse::<Role>)
        .transpose()
        .map_err(|e| HttpError {
            status: StatusCode::BAD_REQUEST,
            message: e.to_string(),
        })
}

/// Handler for GET `/api/tickets`.
async fn handle_list_tickets(AxumState(app_state): AxumState<AppState>) -> Json<Vec<TicketRecord>> {
    Json(app_state.store.list().await)
}

/// Handler for GET `/api/tickets/{id}`.
async fn handle_get_ticket(
    AxumState(app_state): AxumState<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TicketRecord>, HttpError> {
    app_state.store.get(&id).await.map(Json).ok_or_else(|| HttpError {
        status: StatusCode::NOT_FOUND,
        message: format!("Ticket {id} not found"),
    })
}

/// Handler for POST `/api/tickets/bulk`.
///
/// The request's ids seed a fresh selection; the store supplies the status
/// snapshot used for pre-flight validation.
async fn handle_bulk_action(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<BulkApiRequest>,
) -> Result<(StatusCode, Json<BulkApiResponse>), HttpError> {
    info!(
        role = ?req.actor_role,
        action = %req.action.kind(),
        tickets = req.ticket_ids.len(),
        "Handling bulk action request"
    );

    let role: Option<Role> = parse_role(req.actor_role.as_deref())?;

    let mut selection: SelectionManager = SelectionManager::new();
    selection.select_all(req.ticket_ids.iter().cloned());
    let snapshot: Vec<TicketRef> = app_state.store.snapshot(&req.ticket_ids).await;

    let result = match reject_unknown_tickets(&req.action, &selection, &snapshot) {
        Err(err) => Err(err),
        Ok(()) => {
            app_state
                .coordinator()
                .execute(req.action, &mut selection, &snapshot, role)
                .await
        }
    };
    if let Err(err) = &result {
        warn!(error = %err, "Bulk action did not fully succeed");
    }

    let (status, body) = BulkApiResponse::from_result(result);
    Ok((status, Json(body)))
}

/// Refuses a batch naming tickets the store does not hold.
///
/// Status changes are left to the coordinator, which reports missing
/// tickets alongside rule violations.
fn reject_unknown_tickets(
    action: &BulkAction,
    selection: &SelectionManager,
    snapshot: &[TicketRef],
) -> Result<(), BulkError> {
    if matches!(action, BulkAction::UpdateStatus { .. }) {
        return Ok(());
    }

    let violations: Vec<TicketViolation> = selection
        .selected_ids()
        .into_iter()
        .filter(|id| !snapshot.iter().any(|ticket| ticket.id.as_str() == id.as_str()))
        .map(|ticket_id| TicketViolation {
            ticket_id,
            reason: ViolationReason::MissingFromSnapshot,
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(BulkError::ValidationRejected { violations })
    }
}

/// Builds the application router.
fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/tickets", get(handle_list_tickets))
        .route("/api/tickets/{id}", get(handle_get_ticket))
        .route("/api/tickets/bulk", post(handle_bulk_action))
        .route("/api/live", get(live_events_handler))
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Initializing Helpdesk Server");

    let store: InMemoryTicketStore = if let Some(path) = &args.tickets {
        InMemoryTicketStore::from_seed_file(path)?
    } else {
        info!("No seed file given, starting with an empty ticket store");
        InMemoryTicketStore::default()
    };

    let app: Router = build_router(AppState::new(store));

    let addr: std::net::SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode as HttpStatusCode},
    };
    use helpdesk_domain::{Priority, TicketStatus};
    use tower::ServiceExt;

    /// Helper to create test app state with a small seeded store.
    fn create_test_app_state() -> AppState {
        AppState::new(InMemoryTicketStore::new(vec![
            TicketRecord::new("T-1", TicketStatus::Open, Priority::Low),
            TicketRecord::new("T-2", TicketStatus::New, Priority::Medium),
            TicketRecord::new("T-3", TicketStatus::InProgress, Priority::High),
            TicketRecord::new("T-4", TicketStatus::Closed, Priority::Low),
        ]))
    }

    fn bulk_request(body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/tickets/bulk")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(body).unwrap()))
            .unwrap()
    }

    async fn read_bulk_response(response: Response) -> BulkApiResponse {
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body_bytes).unwrap()
    }

    #[tokio::test]
    async fn test_list_tickets() {
        let app: Router = build_router(create_test_app_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/tickets")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), HttpStatusCode::OK);
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let tickets: Vec<TicketRecord> = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(tickets.len(), 4);
    }

    #[tokio::test]
    async fn test_get_unknown_ticket_returns_not_found() {
        let app: Router = build_router(create_test_app_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/tickets/T-404")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), HttpStatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bulk_status_update_succeeds() {
        let app_state: AppState = create_test_app_state();
        let app: Router = build_router(app_state.clone());
        let mut live_rx = app_state.live.subscribe();

        let response = app
            .oneshot(bulk_request(&serde_json::json!({
                "actor_role": "agent",
                "ticket_ids": ["T-1", "T-3"],
                "action": { "kind": "update_status", "status": "ON_HOLD" }
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), HttpStatusCode::OK);
        let api_response: BulkApiResponse = read_bulk_response(response).await;
        assert!(api_response.success);
        let outcome: BulkActionOutcome = api_response.outcome.unwrap();
        assert_eq!(outcome.succeeded_count, 2);
        assert_eq!(outcome.failed_count, 0);

        for id in ["T-1", "T-3"] {
            let ticket: TicketRecord = app_state.store.get(id).await.unwrap();
            assert_eq!(ticket.status, TicketStatus::OnHold);
        }
        assert!(live_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_bulk_illegal_transition_is_unprocessable() {
        let app_state: AppState = create_test_app_state();
        let app: Router = build_router(app_state.clone());

        let response = app
            .oneshot(bulk_request(&serde_json::json!({
                "ticket_ids": ["T-3", "T-2"],
                "action": { "kind": "update_status", "status": "RESOLVED", "resolution": "fixed" }
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), HttpStatusCode::UNPROCESSABLE_ENTITY);
        let api_response: BulkApiResponse = read_bulk_response(response).await;
        assert!(!api_response.success);
        assert!(api_response.outcome.is_none());
        assert_eq!(api_response.violations.len(), 1);
        assert_eq!(api_response.violations[0].ticket_id, "T-2");

        let untouched: TicketRecord = app_state.store.get("T-3").await.unwrap();
        assert_eq!(untouched.status, TicketStatus::InProgress);
    }

    #[tokio::test]
    async fn test_bulk_unknown_ticket_is_unprocessable() {
        let app_state: AppState = create_test_app_state();
        let app: Router = build_router(app_state.clone());

        let response = app
            .oneshot(bulk_request(&serde_json::json!({
                "ticket_ids": ["T-1", "T-404"],
                "action": { "kind": "delete" }
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), HttpStatusCode::UNPROCESSABLE_ENTITY);
        let api_response: BulkApiResponse = read_bulk_response(response).await;
        assert!(api_response.outcome.is_none());
        assert_eq!(api_response.violations.len(), 1);
        assert_eq!(api_response.violations[0].ticket_id, "T-404");
        assert!(app_state.store.get("T-1").await.is_some());
    }

    #[tokio::test]
    async fn test_bulk_unknown_tickets_rejected_for_every_action() {
        let app_state: AppState = create_test_app_state();
        let app: Router = build_router(app_state.clone());

        let actions = [
            serde_json::json!({ "kind": "assign", "assignee_id": "agent-7" }),
            serde_json::json!({ "kind": "update_priority", "priority": "URGENT" }),
            serde_json::json!({ "kind": "notify", "message": "Heads up" }),
        ];
        for action in actions {
            let response = app
                .clone()
                .oneshot(bulk_request(&serde_json::json!({
                    "ticket_ids": ["T-404", "T-1", "T-405"],
                    "action": action
                })))
                .await
                .unwrap();

            assert_eq!(response.status(), HttpStatusCode::UNPROCESSABLE_ENTITY);
            let api_response: BulkApiResponse = read_bulk_response(response).await;
            let rejected: Vec<String> = api_response
                .violations
                .into_iter()
                .map(|v| v.ticket_id)
                .collect();
            assert_eq!(rejected, vec![String::from("T-404"), String::from("T-405")]);
        }

        let untouched: TicketRecord = app_state.store.get("T-1").await.unwrap();
        assert_eq!(untouched.assignee_id, None);
        assert_eq!(untouched.priority, Priority::Low);
        assert!(app_state.store.notifications().await.is_empty());
    }

    #[tokio::test]
    async fn test_live_route_requires_websocket_upgrade() {
        let app: Router = build_router(create_test_app_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/live")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_bulk_end_user_may_only_reopen() {
        let app: Router = build_router(create_test_app_state());

        let response = app
            .clone()
            .oneshot(bulk_request(&serde_json::json!({
                "actor_role": "end_user",
                "ticket_ids": ["T-1"],
                "action": { "kind": "update_status", "status": "CLOSED" }
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), HttpStatusCode::UNPROCESSABLE_ENTITY);

        let response = app
            .oneshot(bulk_request(&serde_json::json!({
                "actor_role": "end_user",
                "ticket_ids": ["T-4"],
                "action": { "kind": "update_status", "status": "REOPENED" }
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), HttpStatusCode::OK);
    }

    #[tokio::test]
    async fn test_bulk_empty_selection_is_bad_request() {
        let app: Router = build_router(create_test_app_state());

        let response = app
            .oneshot(bulk_request(&serde_json::json!({
                "ticket_ids": [],
                "action": { "kind": "delete" }
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), HttpStatusCode::BAD_REQUEST);
        let api_response: BulkApiResponse = read_bulk_response(response).await;
        assert_eq!(api_response.message, "No tickets selected");
    }

    #[tokio::test]
    async fn test_bulk_blank_assignee_is_bad_request() {
        let app: Router = build_router(create_test_app_state());

        let response = app
            .oneshot(bulk_request(&serde_json::json!({
                "ticket_ids": ["T-1"],
                "action": { "kind": "assign", "assignee_id": "  " }
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), HttpStatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bulk_invalid_role_is_bad_request() {
        let app: Router = build_router(create_test_app_state());

        let response = app
            .oneshot(bulk_request(&serde_json::json!({
                "actor_role": "superuser",
                "ticket_ids": ["T-1"],
                "action": { "kind": "delete" }
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), HttpStatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bulk_delete_removes_tickets() {
        let app_state: AppState = create_test_app_state();
        let app: Router = build_router(app_state.clone());

        let response = app
            .oneshot(bulk_request(&serde_json::json!({
                "actor_role": "admin",
                "ticket_ids": ["T-2", "T-4"],
                "action": { "kind": "delete" }
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), HttpStatusCode::OK);
        let remaining: Vec<String> = app_state
            .store
            .list()
            .await
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(remaining, vec![String::from("T-1"), String::from("T-3")]);
    }

    #[tokio::test]
    async fn test_bulk_notify_records_one_notification() {
        let app_state: AppState = create_test_app_state();
        let app: Router = build_router(app_state.clone());

        let response = app
            .oneshot(bulk_request(&serde_json::json!({
                "ticket_ids": ["T-1", "T-2", "T-3"],
                "action": { "kind": "notify", "message": "Maintenance tonight" }
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), HttpStatusCode::OK);
        let notifications = app_state.store.notifications().await;
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].ticket_ids.len(), 3);
        assert_eq!(notifications[0].message, "Maintenance tonight");
    }

    #[test]
    fn test_total_failure_maps_to_bad_gateway() {
        let outcome = BulkActionOutcome {
            action: helpdesk::BulkActionKind::Delete,
            succeeded_count: 0,
            failed_count: 1,
            succeeded_ids: Vec::new(),
            per_ticket_errors: std::iter::once((
                String::from("T-1"),
                helpdesk::TransportError::new("boom"),
            ))
            .collect(),
        };

        let (status, body) =
            BulkApiResponse::from_result(Err(BulkError::TotalFailure { outcome }));
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.message, "All 1 tickets failed");
    }

    #[test]
    fn test_partial_failure_maps_to_multi_status() {
        let outcome = BulkActionOutcome {
            action: helpdesk::BulkActionKind::Assign,
            succeeded_count: 1,
            failed_count: 1,
            succeeded_ids: vec![String::from("T-1")],
            per_ticket_errors: std::iter::once((
                String::from("T-2"),
                helpdesk::TransportError::new("timeout"),
            ))
            .collect(),
        };

        let (status, body) =
            BulkApiResponse::from_result(Err(BulkError::PartialFailure { outcome }));
        assert_eq!(status, StatusCode::MULTI_STATUS);
        assert_eq!(body.message, "1 of 2 tickets updated, 1 failed");
        assert!(body.outcome.is_some());
    }
}
