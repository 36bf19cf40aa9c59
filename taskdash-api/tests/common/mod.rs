//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - Test database setup (skipped when `DATABASE_URL` is unset)
//! - A recording mailer to read reset links from "sent" mail
//! - Account creation and login helpers
//! - Request helpers for the router

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::{Arc, Mutex};
use taskdash_api::{
    app::{build_router, AppState},
    config::Config,
    mail::{MailError, Mailer, OutgoingMail},
};
use taskdash_shared::{
    auth::password::hash_password,
    db::{
        migrations::run_migrations,
        pool::{create_pool, DatabaseConfig},
    },
    models::user::{CreateUser, User, UserRole},
};
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "secret1";
pub const RESET_URL_BASE: &str = "http://localhost:5173/reset-password";

/// Mailer that keeps every message in memory
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutgoingMail>>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }

    /// Raw reset token from the last message sent to `to`
    pub fn last_token_for(&self, to: &str) -> Option<String> {
        self.sent()
            .iter()
            .rev()
            .find(|mail| mail.to == to)
            .and_then(|mail| extract_token(&mail.body))
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Transport("relay refused connection".to_string()));
        }
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

fn extract_token(body: &str) -> Option<String> {
    let start = body.find(RESET_URL_BASE)? + RESET_URL_BASE.len() + 1;
    let token: String = body[start..]
        .chars()
        .take_while(|c| c.is_ascii_hexdigit())
        .collect();
    (!token.is_empty()).then_some(token)
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub app: Router,
    pub config: Config,
    pub mailer: RecordingMailer,
}

impl TestContext {
    /// Creates a test context, or `None` when no database is configured
    pub async fn try_new() -> Option<Self> {
        Self::with_mailer(RecordingMailer::default()).await
    }

    pub async fn with_mailer(mailer: RecordingMailer) -> Option<Self> {
        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping integration test");
            return None;
        };

        let config = test_config(&database_url);

        let db = create_pool(DatabaseConfig::from_url(database_url, 5))
            .await
            .expect("Failed to connect to test database");
        run_migrations(&db).await.expect("Migrations failed");

        let state = AppState::new(db.clone(), config.clone(), Arc::new(mailer.clone()));
        let app = build_router(state);

        Some(Self {
            db,
            app,
            config,
            mailer,
        })
    }

    /// Sends a request through the router
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Inserts an account directly, bypassing registration
    pub async fn create_user(&self, role: UserRole) -> User {
        User::create(
            &self.db,
            CreateUser {
                name: "Test User".to_string(),
                email: unique_email(),
                password_hash: hash_password(TEST_PASSWORD).unwrap(),
                role,
            },
        )
        .await
        .expect("Failed to create user")
    }

    /// Logs in and returns the access token and the refresh cookie pair
    pub async fn login(&self, email: &str, password: &str) -> Session {
        let response = self
            .send(json_request(
                Method::POST,
                "/api/auth/login",
                None,
                serde_json::json!({ "email": email, "password": password }),
            ))
            .await;

        assert_eq!(response.status(), StatusCode::OK, "login failed for {}", email);

        let cookie = refresh_cookie(&response).expect("login set no refresh cookie");
        let body = body_json(response).await;

        Session {
            access_token: body["accessToken"].as_str().unwrap().to_string(),
            cookie,
        }
    }

    pub async fn cleanup_user(&self, id: Uuid) {
        User::delete(&self.db, id).await.ok();
    }
}

/// Tokens held by a signed-in test client
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,

    /// `refreshToken=<jwt>`, ready for a `Cookie` header
    pub cookie: String,
}

pub fn test_config(database_url: &str) -> Config {
    let database_url = database_url.to_string();

    Config::from_lookup(move |key| match key {
        "DATABASE_URL" => Some(database_url.clone()),
        "JWT_SECRET" => Some("integration-access-secret-0123456789abcdef".to_string()),
        "REFRESH_SECRET" => Some("integration-refresh-secret-0123456789abcdef".to_string()),
        "RESET_URL_BASE" => Some(RESET_URL_BASE.to_string()),
        _ => None,
    })
    .expect("Invalid test configuration")
}

pub fn unique_email() -> String {
    format!("test-{}@example.com", Uuid::new_v4())
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    builder.body(Body::empty()).unwrap()
}

pub fn with_cookie(mut request: Request<Body>, cookie: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    request
}

/// `name=value` of the refresh cookie set by a response
pub fn refresh_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("refreshToken="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

/// Full `Set-Cookie` value for the refresh cookie
pub fn refresh_set_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("refreshToken="))
        .map(str::to_string)
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}
