//! Shared helpers for HTTP integration tests.
//!
//! Tests drive the full production router (see [`build_app_router`]) backed
//! by an [`InMemoryStore`], so no database is required.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use obmin_api::auth::confirmation::ConfirmationConfig;
use obmin_api::auth::jwt::JwtConfig;
use obmin_api::auth::password::hash_password;
use obmin_api::config::ServerConfig;
use obmin_api::router::build_app_router;
use obmin_api::state::{AppState, Stores};
use obmin_core::roles::ROLE_USER;
use obmin_core::store::memory::InMemoryStore;
use obmin_core::store::{NewUser, UserRecord, UserStore};
use obmin_mail::{EmailType, MailError, MailPayload, MailSender};

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        store_timeout_secs: 2,
        revocation_reap_interval_secs: 3600,
        app_base_url: "http://localhost:3000".to_string(),
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
        confirmation: ConfirmationConfig::default(),
    }
}

/// Mailer that keeps every message it is asked to send.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, EmailType, MailPayload)>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<(String, EmailType, MailPayload)> {
        self.sent.lock().unwrap().clone()
    }

    /// Wait for the detached send task to deliver `count` messages.
    pub async fn wait_for(&self, count: usize) -> Vec<(String, EmailType, MailPayload)> {
        for _ in 0..100 {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.sent()
    }
}

#[async_trait]
impl MailSender for RecordingMailer {
    async fn send(
        &self,
        to: &str,
        email_type: EmailType,
        payload: &MailPayload,
    ) -> Result<(), MailError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), email_type, payload.clone()));
        Ok(())
    }
}

/// Everything a test needs to drive and inspect the app.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub mailer: Arc<RecordingMailer>,
}

/// Build the full application router with all middleware layers over a
/// fresh in-memory store.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let store = Arc::new(InMemoryStore::new());
    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState::new(
        config.clone(),
        Stores::shared(Arc::clone(&store)),
        mailer.clone(),
    );

    TestApp {
        router: build_app_router(state, &config),
        store,
        mailer,
    }
}

/// Create a user directly in the store with the given password and role.
pub async fn seed_user(
    store: &InMemoryStore,
    username: &str,
    password: &str,
    role: &str,
) -> UserRecord {
    store
        .create(&NewUser {
            username: username.to_string(),
            email: format!("{username}@test.com"),
            password_hash: Some(hash_password(password).expect("hashing should succeed")),
            role: role.to_string(),
            email_validated: true,
        })
        .await
        .expect("user creation should succeed")
}

pub async fn seed_regular_user(store: &InMemoryStore, username: &str, password: &str) -> UserRecord {
    seed_user(store, username, password, ROLE_USER).await
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

/// Authenticated POST with no body and no content type.
pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), None).await
}

pub async fn put(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::PUT, uri, None, None).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
