//! Shared harness: an in-memory app with a manual clock and a notifier that
//! records every reset secret it is handed.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Method, Request, Response, StatusCode};
use chrono::{DateTime, Utc};
use serde_json::Value;
use storefront_api::AppState;
use storefront_api::config::ApiConfig;
use storefront_core::auth::password::MIN_BCRYPT_COST;
use storefront_core::clock::ManualClock;
use storefront_core::notify::{NotifyError, ResetNotifier};
use storefront_core::store::memory::MemoryStore;
use tower::ServiceExt;

pub const SUPER_ADMIN_EMAIL: &str = "root@shop.test";
pub const SUPER_ADMIN_PASSWORD: &str = "RootPassw0rd";
pub const STRONG_PASSWORD: &str = "Secret123";

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_token(&self) -> Option<String> {
        self.sent.lock().unwrap().last().map(|(_, t)| t.clone())
    }
}

#[async_trait]
impl ResetNotifier for RecordingNotifier {
    async fn send_password_reset(
        &self,
        email: &str,
        token: &str,
        _expires_at: DateTime<Utc>,
    ) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), token.to_string()));
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub store: Arc<MemoryStore>,
}

/// Parsed response: status, JSON body and `Set-Cookie` values.
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub set_cookies: Vec<String>,
}

impl TestResponse {
    /// Value of a cookie set by the response, if any.
    pub fn cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{name}=");
        self.set_cookies.iter().find_map(|c| {
            c.strip_prefix(&prefix)
                .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
        })
    }

    /// Raw `Set-Cookie` header for a cookie name.
    pub fn set_cookie_header(&self, name: &str) -> Option<&str> {
        let prefix = format!("{name}=");
        self.set_cookies
            .iter()
            .find(|c| c.starts_with(&prefix))
            .map(String::as_str)
    }
}

pub fn spawn_app() -> TestApp {
    let mut config = ApiConfig::new("test-secret");
    config.bcrypt_cost = MIN_BCRYPT_COST;
    config.super_admin_email = Some(SUPER_ADMIN_EMAIL.into());
    config.super_admin_password = Some(SUPER_ADMIN_PASSWORD.into());

    let clock = Arc::new(ManualClock::starting_now());
    let notifier = Arc::new(RecordingNotifier::default());
    let store = Arc::new(MemoryStore::new());

    let state = AppState::new(config, store.clone(), notifier.clone(), clock.clone())
        .expect("app state");

    TestApp {
        router: storefront_api::router(state),
        clock,
        notifier,
        store,
    }
}

/// Request builder with an optional JSON body and credentials.
pub struct Call {
    method: Method,
    uri: String,
    body: Option<Value>,
    bearer: Option<String>,
    cookie: Option<String>,
}

impl Call {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            body: None,
            bearer: None,
            cookie: None,
        }
    }

    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: impl Into<String>) -> Self {
        Self::new(Method::POST, uri)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self
    }

    pub fn cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    pub async fn send(self, app: &TestApp) -> TestResponse {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        if let Some(token) = &self.bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(cookie) = &self.cookie {
            builder = builder.header(COOKIE, cookie);
        }
        let req = match self.body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let resp = app.router.clone().oneshot(req).await.expect("request");
        read_response(resp).await
    }
}

async fn read_response(resp: Response<Body>) -> TestResponse {
    let status = resp.status();
    let set_cookies = resp
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_string))
        .collect();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse JSON")
    };
    TestResponse {
        status,
        body,
        set_cookies,
    }
}

/// Register a customer and return the signup response.
pub async fn signup(app: &TestApp, email: &str) -> TestResponse {
    Call::post("/auth/signup")
        .json(serde_json::json!({
            "email": email,
            "password": STRONG_PASSWORD,
            "firstName": "Ada",
            "lastName": "Lovelace",
        }))
        .send(app)
        .await
}

/// Sign the super-admin in and return its access token.
pub async fn super_admin_token(app: &TestApp) -> String {
    let resp = Call::post("/admin/auth/signin")
        .json(serde_json::json!({
            "email": SUPER_ADMIN_EMAIL,
            "password": SUPER_ADMIN_PASSWORD,
        }))
        .send(app)
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.body);
    resp.body["accessToken"].as_str().unwrap().to_string()
}

/// Create an administrative account as the super-admin and sign it in.
pub async fn admin_token(
    app: &TestApp,
    email: &str,
    role: &str,
    permissions: Option<Value>,
) -> String {
    let root = super_admin_token(app).await;
    let mut body = serde_json::json!({
        "email": email,
        "password": STRONG_PASSWORD,
        "firstName": "Grace",
        "lastName": "Hopper",
        "role": role,
    });
    if let Some(permissions) = permissions {
        body["permissions"] = permissions;
    }
    let created = Call::post("/admin/admins")
        .bearer(&root)
        .json(body)
        .send(app)
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);

    let resp = Call::post("/admin/auth/signin")
        .json(serde_json::json!({ "email": email, "password": STRONG_PASSWORD }))
        .send(app)
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.body);
    resp.body["accessToken"].as_str().unwrap().to_string()
}
