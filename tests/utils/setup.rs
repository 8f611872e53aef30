use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

use ghostroom::{
    build_router, AppConfig, AppState, EventBus, InMemoryStore, RandomIdGenerator,
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

/// Full application wired over the in-memory store
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub router: Router,
}

/// What a participant got back from entering a room
pub struct Entry {
    pub status: StatusCode,
    /// `Location` header of a redirect
    pub location: Option<String>,
    /// Token from `Set-Cookie`, when one was issued
    pub token: Option<String>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let config = AppConfig {
            secure_cookies: false,
            ..AppConfig::default()
        };
        let state = AppState::new(
            config,
            store.clone(),
            Arc::new(EventBus::new()),
            Arc::new(RandomIdGenerator::new()),
        );
        let router = build_router(state.clone());

        Self {
            state,
            store,
            router,
        }
    }

    pub async fn call(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn create_room(&self) -> String {
        let request = Request::builder()
            .method("POST")
            .uri("/room/create")
            .body(Body::empty())
            .unwrap();
        let response = self.call(request).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        json["roomId"].as_str().unwrap().to_string()
    }

    pub async fn enter(&self, room_id: &str, token: Option<&str>) -> Entry {
        let mut builder = Request::builder().uri(format!("/room/{room_id}"));
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("x-auth-token={token}"));
        }
        let response = self.call(builder.body(Body::empty()).unwrap()).await;

        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let token = response.headers().get(header::SET_COOKIE).map(|v| {
            v.to_str()
                .unwrap()
                .trim_start_matches("x-auth-token=")
                .split(';')
                .next()
                .unwrap()
                .to_string()
        });

        Entry {
            status: response.status(),
            location,
            token,
        }
    }

    pub async fn send(&self, room_id: &str, token: &str, sender: &str, text: &str) -> Response {
        let body = serde_json::json!({ "sender": sender, "text": text }).to_string();
        let request = Request::builder()
            .method("POST")
            .uri(format!("/messages?roomId={room_id}"))
            .header("content-type", "application/json")
            .header(header::COOKIE, format!("x-auth-token={token}"))
            .body(Body::from(body))
            .unwrap();
        self.call(request).await
    }

    pub async fn connected(&self, room_id: &str) -> Vec<String> {
        self.state
            .registry
            .get_membership(room_id)
            .await
            .unwrap()
            .expect("room should exist")
            .connected
    }
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
