#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use actix_web::test;
use serde_json::json;
use taskforge::auth::{AuthResponse, Clock, PasswordHasher, SessionCodec};
use taskforge::store::MemoryStore;
use taskforge::AppState;
use uuid::Uuid;

pub const TEST_SECRET: &[u8] = b"integration_test_secret_0123456789abcdef";
pub const SESSION_TTL_SECS: i64 = 3600;

/// Clock the tests can move forward by hand.
pub struct TestClock(AtomicI64);

impl TestClock {
    pub fn advance(&self, secs: i64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Fresh in-memory state with a cheap bcrypt cost and a controllable clock.
pub fn test_state() -> (AppState, Arc<TestClock>) {
    let clock = Arc::new(TestClock(AtomicI64::new(chrono::Utc::now().timestamp())));
    let state = AppState::new(
        Arc::new(MemoryStore::new()),
        SessionCodec::new(TEST_SECRET, clock.clone()),
        PasswordHasher::new(4),
        chrono::Duration::seconds(SESSION_TTL_SECS),
    );
    (state, clock)
}

pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> (actix_web::http::header::HeaderName, String) {
        (
            actix_web::http::header::AUTHORIZATION,
            format!("Bearer {}", self.token),
        )
    }
}

pub async fn register_user(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
    >,
    username: &str,
    password: &str,
) -> Result<TestUser, String> {
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(&json!({
            "username": username,
            "password": password
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;

    if !status.is_success() {
        return Err(format!(
            "Failed to register user. Status: {}. Body: {}",
            status,
            String::from_utf8_lossy(&body)
        ));
    }
    let auth_response: AuthResponse = serde_json::from_slice(&body)
        .map_err(|e| format!("Failed to parse registration response: {}", e))?;

    Ok(TestUser {
        id: auth_response.user_id,
        token: auth_response.token,
    })
}
