//! Shared harness for API tests
//!
//! Builds the full router over the in-memory store, a recording notifier
//! and a manual clock, so no database or mail server is needed.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use legacyverse_api::{
    app::{build_router, AppState},
    config::Config,
};
use legacyverse_shared::{
    clock::ManualClock,
    notify::{reset_token_from_url, Notification, RecordingNotifier},
    store::memory::MemoryStore,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

pub const PASSWORD: &str = "river-stone-42";

pub struct TestContext {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: ManualClock,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_env(&[])
    }

    /// Context with extra configuration variables on top of the defaults
    pub fn with_env(extra: &[(&str, &str)]) -> Self {
        let mut vars: HashMap<String, String> = HashMap::from([
            ("DATABASE_URL".to_string(), "postgresql://unused/test".to_string()),
            (
                "JWT_SECRET".to_string(),
                "api-test-secret-that-is-at-least-32-chars".to_string(),
            ),
            ("FRONTEND_URL".to_string(), "https://app.legacyverse.test/".to_string()),
        ]);
        for (key, value) in extra {
            vars.insert(key.to_string(), value.to_string());
        }
        let config = Config::from_lookup(|key| vars.get(key).cloned()).expect("valid test config");

        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let clock = ManualClock::starting_now();

        let state = AppState::new(store.clone(), notifier.clone(), Arc::new(clock.clone()), config);

        Self {
            app: build_router(state),
            store,
            notifier,
            clock,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(Method::GET, uri, token, None).await
    }

    /// Registers an account and returns the response body
    pub async fn register(&self, fullname: &str, email: &str) -> Value {
        let response = self
            .post(
                "/v1/auth/register",
                None,
                json!({
                    "fullname": fullname,
                    "email": email,
                    "password": PASSWORD,
                    "confirm_password": PASSWORD,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }

    /// Requests a reset and returns the token from the emailed link
    pub async fn request_reset_token(&self, email: &str) -> String {
        let response = self
            .post("/v1/auth/forgot-password", None, json!({ "email": email }))
            .await;
        assert_eq!(response.status, StatusCode::OK);

        match self.notifier.last_for(email).await {
            Some(Notification::PasswordReset { reset_url, .. }) => reset_token_from_url(&reset_url)
                .expect("reset link should carry a token")
                .to_string(),
            other => panic!("expected a reset notification, got {:?}", other),
        }
    }
}

/// Extracts a string field from a JSON body
pub fn str_field<'a>(body: &'a Value, field: &str) -> &'a str {
    body[field]
        .as_str()
        .unwrap_or_else(|| panic!("missing string field {} in {}", field, body))
}
