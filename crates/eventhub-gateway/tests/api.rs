use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use eventhub_agent::UnconfiguredProvider;
use eventhub_core::config::EventHubConfig;
use eventhub_core::mail::MemoryMailer;
use eventhub_core::types::ConnId;
use eventhub_gateway::{build_router, AppState};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    mailer: Arc<MemoryMailer>,
}

fn app() -> TestApp {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    eventhub_users::db::init_db(&conn).unwrap();
    eventhub_events::db::init_db(&conn).unwrap();
    let mailer = Arc::new(MemoryMailer::default());
    let state = Arc::new(AppState::new(
        EventHubConfig::default(),
        Arc::new(Mutex::new(conn)),
        mailer.clone(),
        Arc::new(UnconfiguredProvider),
    ));
    TestApp {
        router: build_router(state.clone()),
        state,
        mailer,
    }
}

impl TestApp {
    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn signup(&self, email: &str, role: &str) -> (String, String) {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/signup",
                None,
                Some(json!({ "email": email, "password": "secret1", "role": role })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (
            body["id"].as_str().unwrap().to_string(),
            body["token"].as_str().unwrap().to_string(),
        )
    }

    /// Attach a fake push-channel client and return its queue.
    fn listen(&self) -> mpsc::Receiver<Arc<str>> {
        let (tx, rx) = mpsc::channel(64);
        self.state.registry.register(ConnId::new(), tx);
        rx
    }
}

fn kinds(rx: &mut mpsc::Receiver<Arc<str>>) -> Vec<String> {
    std::iter::from_fn(|| rx.try_recv().ok())
        .map(|t| {
            let v: Value = serde_json::from_str(&t).unwrap();
            v["type"].as_str().unwrap().to_string()
        })
        .collect()
}

fn meetup() -> Value {
    json!({
        "title": "Rust meetup",
        "description": "Talks and pizza",
        "date": "2099-06-01T18:30",
        "location": "Hall B"
    })
}

#[tokio::test]
async fn signup_and_login() {
    let app = app();
    let (status, body) = app
        .call(
            Method::POST,
            "/api/signup",
            None,
            Some(json!({ "email": "a@example.com", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "ATTENDEE");
    assert!(body.get("password").is_none());
    assert_eq!(app.mailer.sent().len(), 1);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/signup",
            None,
            Some(json!({ "email": "a@example.com", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "email": "a@example.com", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().is_some());

    let (status, body) = app
        .call(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "email": "a@example.com", "password": "nope-nope" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = app();
    let (status, body) = app.call(Method::GET, "/api/events", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing authorization token");

    let (status, _) = app.call(Method::GET, "/api/my-rsvps", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn lifecycle_over_http() {
    let app = app();
    let (_, org_a) = app.signup("a@example.com", "ORGANIZER").await;
    let (_, org_b) = app.signup("b@example.com", "ORGANIZER").await;
    let (_, admin) = app.signup("root@example.com", "ADMIN").await;
    let (_, user) = app.signup("u@example.com", "ATTENDEE").await;
    let mut rx = app.listen();

    let (status, event) = app.call(Method::POST, "/api/events", Some(&org_a), Some(meetup())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(event["approved"], false);
    assert_eq!(event["organizer"]["email"], "a@example.com");
    let id = event["id"].as_str().unwrap().to_string();

    let (status, approved) = app
        .call(Method::PUT, &format!("/api/events/{id}/approve"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["approved"], true);

    let rsvp_uri = format!("/api/events/{id}/rsvp");
    let (status, rsvp) = app
        .call(Method::POST, &rsvp_uri, Some(&user), Some(json!({ "status": "GOING" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(rsvp["user"]["email"], "u@example.com");

    let (status, rsvp) = app
        .call(Method::POST, &rsvp_uri, Some(&user), Some(json!({ "status": "MAYBE" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rsvp["status"], "MAYBE");

    let (_, mine) = app.call(Method::GET, "/api/my-rsvps", Some(&user), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["event"]["id"], id.as_str());

    let (status, body) = app
        .call(Method::DELETE, &format!("/api/events/{id}"), Some(&org_b), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Not authorized to delete this event");

    let (_, listed) = app.call(Method::GET, "/api/events", Some(&user), None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    assert_eq!(
        kinds(&mut rx),
        vec!["EVENT_CREATED", "EVENT_APPROVED", "RSVP_CREATED", "RSVP_UPDATED"]
    );

    let (status, body) = app
        .call(Method::DELETE, &format!("/api/events/{id}"), Some(&org_a), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "id": id }));
    assert_eq!(kinds(&mut rx), vec!["EVENT_DELETED"]);
}

#[tokio::test]
async fn gate_failures_map_to_statuses_without_broadcast() {
    let app = app();
    let (_, org) = app.signup("a@example.com", "ORGANIZER").await;
    let (_, admin) = app.signup("root@example.com", "ADMIN").await;
    let (_, user) = app.signup("u@example.com", "ATTENDEE").await;

    let (_, event) = app.call(Method::POST, "/api/events", Some(&org), Some(meetup())).await;
    let id = event["id"].as_str().unwrap().to_string();
    let mut rx = app.listen();

    let (status, _) = app.call(Method::POST, "/api/events", Some(&user), Some(meetup())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mut past = meetup();
    past["date"] = json!("2000-01-01");
    let (status, body) = app.call(Method::POST, "/api/events", Some(&org), Some(past)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Event date must be in the future");

    let (status, _) = app
        .call(Method::PUT, &format!("/api/events/{id}/approve"), Some(&org), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(Method::PUT, "/api/events/missing/approve", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/events/{id}/rsvp"),
            Some(&user),
            Some(json!({ "status": "GOING" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot RSVP to unapproved events");

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/events/{id}"),
            Some(&org),
            Some(json!({ "date": "yesterday" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(kinds(&mut rx).is_empty());

    app.call(Method::PUT, &format!("/api/events/{id}/approve"), Some(&admin), None)
        .await;
    let (status, body) = app
        .call(Method::PUT, &format!("/api/events/{id}/approve"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Event is already approved");
    assert_eq!(kinds(&mut rx), vec!["EVENT_APPROVED"]);
}

#[tokio::test]
async fn malformed_body_is_a_json_error() {
    let app = app();
    let (_, user) = app.signup("u@example.com", "ATTENDEE").await;
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/events/x/rsvp")
        .header(header::AUTHORIZATION, format!("Bearer {user}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn pending_listing_is_admin_only() {
    let app = app();
    let (_, org) = app.signup("a@example.com", "ORGANIZER").await;
    let (_, admin) = app.signup("root@example.com", "ADMIN").await;
    app.call(Method::POST, "/api/events", Some(&org), Some(meetup())).await;

    let (status, body) = app.call(Method::GET, "/api/events/pending", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = app.call(Method::GET, "/api/events/pending", Some(&org), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn ai_routes_fall_back_without_a_provider() {
    let app = app();
    let (_, user) = app.signup("u@example.com", "ATTENDEE").await;

    let (status, body) = app.call(Method::GET, "/api/ai/suggestions", Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggestions"], "No upcoming events available at the moment.");
    assert_eq!(body["eventsAnalyzed"], 0);
    assert_eq!(body["userHistory"], 0);

    let (status, body) = app
        .call(Method::POST, "/api/ai/chat", Some(&user), Some(json!({ "message": "  " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Message is required");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/ai/chat",
            Some(&user),
            Some(json!({ "message": "what's on?", "chatHistory": [{ "role": "user", "content": "hi" }] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["response"].as_str().unwrap().starts_with("I'm currently unavailable."));
    assert!(body["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn health_reports_ws_clients() {
    let app = app();
    let _rx = app.listen();
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["ws_clients"], 1);
}
