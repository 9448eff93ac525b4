use std::env;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    middleware::from_fn,
    routing::get,
    Extension, Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value as JsonValue;
use tower::ServiceExt;
use uuid::Uuid;

use jobboard_backend::middleware::auth::{require_bearer_auth, Claims};

const TEST_SECRET: &str = "test_secret_key";

fn init_test_config() {
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("DATABASE_URL", "postgres://localhost/unused");
    env::set_var("JWT_SECRET", TEST_SECRET);
    env::set_var("RTC_APP_ID", "test_app_id");
    env::set_var("RTC_APP_CERTIFICATE", "test_certificate");
    env::set_var("EMAIL_API_URL", "http://localhost/emails");
    env::set_var("EMAIL_API_KEY", "test_email_key");
    env::set_var("EMAIL_FROM", "noreply@example.com");
    // Tests share one process; only the first call wins the OnceLock.
    let _ = jobboard_backend::config::init_config();
}

async fn whoami(Extension(claims): Extension<Claims>) -> String {
    claims.sub
}

fn app() -> Router {
    Router::new()
        .route("/protected", get(whoami))
        .layer(from_fn(require_bearer_auth))
}

fn make_token(sub: &str, exp_offset_secs: i64, role: Option<&str>) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        exp: (Utc::now().timestamp() + exp_offset_secs) as usize,
        role: role.map(String::from),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .expect("encode token")
}

async fn send(app: Router, auth: Option<&str>) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder().uri("/protected");
    if let Some(value) = auth {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    let response = app
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(JsonValue::String(
        String::from_utf8_lossy(&bytes).into_owned(),
    ));
    (status, body)
}

#[tokio::test]
async fn missing_authorization_is_rejected() {
    init_test_config();
    let (status, body) = send(app(), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "missing_authorization");
}

#[tokio::test]
async fn non_bearer_scheme_is_rejected() {
    init_test_config();
    let (status, body) = send(app(), Some("Basic dXNlcjpwYXNz")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "unsupported_scheme");
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    init_test_config();
    let (status, body) = send(app(), Some("Bearer not.a.jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "invalid_token");
}

#[tokio::test]
async fn expired_token_is_rejected() {
    init_test_config();
    let token = make_token(&Uuid::new_v4().to_string(), -3600, None);
    let (status, body) = send(app(), Some(&format!("Bearer {}", token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "invalid_token");
}

#[tokio::test]
async fn valid_token_reaches_the_handler() {
    init_test_config();
    let user_id = Uuid::new_v4();
    let token = make_token(&user_id.to_string(), 3600, Some("jobseeker"));
    let (status, body) = send(app(), Some(&format!("Bearer {}", token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, JsonValue::String(user_id.to_string()));
}

#[tokio::test]
async fn token_signed_with_wrong_secret_is_rejected() {
    init_test_config();
    let claims = Claims {
        sub: Uuid::new_v4().to_string(),
        exp: (Utc::now().timestamp() + 3600) as usize,
        role: None,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"some_other_secret"),
    )
    .unwrap();
    let (status, body) = send(app(), Some(&format!("Bearer {}", token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "invalid_token");
}
