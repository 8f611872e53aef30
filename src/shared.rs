use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::admission::AdmissionController;
use crate::config::AppConfig;
use crate::event::Broadcaster;
use crate::ids::IdGenerator;
use crate::lifecycle::LifecycleManager;
use crate::messages::MessageRelay;
use crate::room::RoomRegistry;
use crate::store::Store;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub registry: Arc<RoomRegistry>,
    pub admission: Arc<AdmissionController>,
    pub relay: Arc<MessageRelay>,
    pub lifecycle: LifecycleManager,
    pub broadcaster: Arc<dyn Broadcaster>,
}

impl AppState {
    /// Wires the core components on top of the injected store, broadcaster and id generator
    pub fn new(
        config: AppConfig,
        store: Arc<dyn Store>,
        broadcaster: Arc<dyn Broadcaster>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        let lifecycle = LifecycleManager::new(Arc::clone(&store), config.room_ttl);
        let registry = Arc::new(RoomRegistry::new(
            Arc::clone(&store),
            Arc::clone(&ids),
            lifecycle.clone(),
        ));
        let admission = Arc::new(AdmissionController::new(
            Arc::clone(&registry),
            Arc::clone(&ids),
        ));
        let relay = Arc::new(MessageRelay::new(
            store,
            Arc::clone(&registry),
            Arc::clone(&broadcaster),
            ids,
            lifecycle.clone(),
        ));

        Self {
            config: Arc::new(config),
            registry,
            admission,
            relay,
            lifecycle,
            broadcaster,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Room is full")]
    RoomFull,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Broadcast error: {0}")]
    Broadcast(String),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::RoomFull => (StatusCode::CONFLICT, "Room is full".to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            // Transport failures stay generic towards the client
            AppError::Store(_) | AppError::Broadcast(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable".to_string(),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
