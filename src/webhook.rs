//! Inventory webhook listener
//!
//! NetBox posts an event for every object change. Device creations and
//! updates trigger a single-device pass; everything else is acknowledged
//! and ignored. Passes run one at a time on the blocking pool.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex, PoisonError};

use crate::engine::RunReport;

/// Webhook body, reduced to the fields that pick an action
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub event: String,
    pub model: String,
    #[serde(default)]
    pub data: Option<EventData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Run a device pass for this inventory id
    Reconcile(u64),
    Ignore(&'static str),
}

impl Event {
    pub fn action(&self) -> Action {
        if self.model != "device" {
            return Action::Ignore("not a device");
        }
        match self.event.as_str() {
            // "update" is what older NetBox releases send
            "created" | "updated" | "update" => match &self.data {
                Some(data) => Action::Reconcile(data.id),
                None => Action::Ignore("no device id"),
            },
            _ => Action::Ignore("event not handled"),
        }
    }
}

/// Something that can run a device pass from a blocking thread
pub trait DevicePass: Send + Sync + 'static {
    fn run_device(&self, id: u64) -> anyhow::Result<RunReport>;
}

pub struct AppState<P> {
    pass: P,
    /// One pass at a time
    run_lock: Mutex<()>,
}

impl<P: DevicePass> AppState<P> {
    pub fn new(pass: P) -> Arc<Self> {
        Arc::new(Self {
            pass,
            run_lock: Mutex::new(()),
        })
    }

    fn run_locked(&self, id: u64) -> anyhow::Result<RunReport> {
        let _guard = self.run_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.pass.run_device(id)
    }
}

/// Create the webhook router.
///
/// Provides:
/// - POST /webhook/ - NetBox event webhook
/// - GET /health - Liveness probe
pub fn router<P: DevicePass>(state: Arc<AppState<P>>) -> Router {
    Router::new()
        .route("/webhook/", post(webhook::<P>))
        .route("/webhook", post(webhook::<P>))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn webhook<P: DevicePass>(
    State(state): State<Arc<AppState<P>>>,
    Json(event): Json<Event>,
) -> (StatusCode, Json<Value>) {
    let id = match event.action() {
        Action::Reconcile(id) => id,
        Action::Ignore(reason) => {
            log::debug!("Ignoring {} {} event: {reason}", event.model, event.event);
            return (
                StatusCode::OK,
                Json(json!({ "status": "ignored", "reason": reason })),
            );
        }
    };

    log::info!("Device {id} {}, reconciling", event.event);
    let result = tokio::task::spawn_blocking(move || state.run_locked(id)).await;
    match result {
        Ok(Ok(report)) => (
            StatusCode::OK,
            Json(json!({
                "status": "reconciled",
                "device": id,
                "summary": report.summary,
                "changes": report.changes.len(),
                "issues": report.issues,
            })),
        ),
        Ok(Err(err)) => {
            log::error!("Device {id}: {err:#}");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "status": "failed", "device": id, "error": format!("{err:#}") })),
            )
        }
        Err(err) => {
            log::error!("Device {id}: pass panicked: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "failed", "device": id })),
            )
        }
    }
}
