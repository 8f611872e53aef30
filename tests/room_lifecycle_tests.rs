mod utils;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use ghostroom::{KeyTtl, Message, RealtimeEvent, Store};
use std::sync::Arc;
use utils::{setup::body_json, TestApp};

#[tokio::test]
async fn full_room_scenario() {
    let app = TestApp::new();

    // Create room: registered with no members
    let room_id = app.create_room().await;
    assert!(app.connected(&room_id).await.is_empty());

    // First join: token A
    let first = app.enter(&room_id, None).await;
    assert_eq!(first.status, StatusCode::OK);
    let token_a = first.token.expect("first entrant should get a token");
    assert_eq!(app.connected(&room_id).await, vec![token_a.clone()]);

    // Second join from a different caller: token B
    let second = app.enter(&room_id, None).await;
    assert_eq!(second.status, StatusCode::OK);
    let token_b = second.token.expect("second entrant should get a token");
    assert_ne!(token_a, token_b);
    assert_eq!(
        app.connected(&room_id).await,
        vec![token_a.clone(), token_b.clone()]
    );

    // Third join with an unknown token: rejected as full
    let third = app.enter(&room_id, Some("token-c")).await;
    assert_eq!(third.status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(third.location.as_deref(), Some("/?error=room-full"));
    assert!(third.token.is_none());
    assert_eq!(app.connected(&room_id).await, vec![token_a.clone(), token_b]);

    // Token A sends a message: persisted, broadcast, TTLs coupled
    let mut listener = app.state.broadcaster.subscribe(&room_id).await;
    let response = app.send(&room_id, &token_a, "alice", "hi").await;
    assert_eq!(response.status(), StatusCode::OK);
    let sent: Message = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(sent.sender, "alice");
    assert_eq!(sent.text, "hi");
    assert_eq!(sent.room_id, room_id);

    let RealtimeEvent::ChatMessage(broadcast) = listener.recv().await.unwrap();
    assert_eq!(broadcast, sent);

    let log = app
        .store
        .lrange(&format!("messages:{room_id}"))
        .await
        .unwrap();
    assert_eq!(log.len(), 1);
    let stored: serde_json::Value = serde_json::from_str(&log[0]).unwrap();
    assert_eq!(stored["token"], token_a.as_str());
    assert_eq!(stored["id"], sent.id.as_str());

    let room_ttl = app.store.ttl(&format!("meta:{room_id}")).await.unwrap();
    let log_ttl = app
        .store
        .ttl(&format!("messages:{room_id}"))
        .await
        .unwrap();
    match (room_ttl, log_ttl) {
        (KeyTtl::Remaining(room), KeyTtl::Remaining(log)) => {
            let drift = if room > log { room - log } else { log - room };
            assert!(drift < std::time::Duration::from_millis(50));
        }
        other => panic!("expected both keys to expire, got {other:?}"),
    }
}

#[tokio::test]
async fn reentry_keeps_membership_unchanged() {
    let app = TestApp::new();
    let room_id = app.create_room().await;
    let token = app.enter(&room_id, None).await.token.unwrap();

    for _ in 0..3 {
        let entry = app.enter(&room_id, Some(&token)).await;
        assert_eq!(entry.status, StatusCode::OK);
        assert!(entry.token.is_none());
    }

    assert_eq!(app.connected(&room_id).await, vec![token]);
}

#[tokio::test]
async fn unknown_room_redirects_not_found() {
    let app = TestApp::new();

    let entry = app.enter("neverCreated", None).await;

    assert_eq!(entry.status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(entry.location.as_deref(), Some("/?error=room-not-found"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_entrants_respect_cap() {
    let app = Arc::new(TestApp::new());
    let room_id = app.create_room().await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let app = Arc::clone(&app);
            let room_id = room_id.clone();
            tokio::spawn(async move { app.enter(&room_id, None).await })
        })
        .collect();

    let mut admitted = 0;
    for handle in handles {
        let entry = handle.await.unwrap();
        match entry.status {
            StatusCode::OK => admitted += 1,
            StatusCode::TEMPORARY_REDIRECT => {
                assert_eq!(entry.location.as_deref(), Some("/?error=room-full"))
            }
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(admitted, 2);
    assert_eq!(app.connected(&room_id).await.len(), 2);
}

#[tokio::test]
async fn history_and_ttl_for_members() {
    let app = TestApp::new();
    let room_id = app.create_room().await;
    let token = app.enter(&room_id, None).await.token.unwrap();

    app.send(&room_id, &token, "alice", "one").await;
    app.send(&room_id, &token, "alice", "two").await;

    let request = Request::builder()
        .uri(format!("/messages?roomId={room_id}"))
        .header(header::COOKIE, format!("x-auth-token={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.call(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let texts: Vec<_> = json["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["text"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(texts, vec!["one", "two"]);
    assert!(json["messages"][0].get("token").is_none());

    let request = Request::builder()
        .uri(format!("/room/ttl?roomId={room_id}"))
        .header(header::COOKIE, format!("x-auth-token={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.call(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let ttl = body_json(response).await["ttl"].as_u64().unwrap();
    assert!(ttl > 590 && ttl <= 600);
}

#[tokio::test]
async fn outsider_cannot_send() {
    let app = TestApp::new();
    let room_id = app.create_room().await;
    app.enter(&room_id, None).await;

    let response = app.send(&room_id, "forged-token", "mallory", "hi").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app
        .store
        .lrange(&format!("messages:{room_id}"))
        .await
        .unwrap()
        .is_empty());
}
