use std::env;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value as JsonValue};
use serial_test::serial;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use learnhub_backend::AppState;

async fn setup() -> Option<(AppState, PgPool)> {
    dotenvy::dotenv().ok();
    if env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    }
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    if env::var("JWT_SECRET").is_err() {
        env::set_var("JWT_SECRET", "test_secret_key");
    }
    if env::var("JWT_REFRESH_SECRET").is_err() {
        env::set_var("JWT_REFRESH_SECRET", "test_refresh_secret");
    }

    let _ = learnhub_backend::config::init_config();
    let pool = learnhub_backend::database::pool::create_pool()
        .await
        .expect("pool");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");

    Some((AppState::new(pool.clone()), pool))
}

fn auth_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/auth/register", post(learnhub_backend::routes::auth::register))
        .route(
            "/api/auth/verify-email",
            post(learnhub_backend::routes::auth::verify_email),
        )
        .route("/api/auth/login", post(learnhub_backend::routes::auth::login))
        .route("/api/auth/refresh", post(learnhub_backend::routes::auth::refresh));

    let private = Router::new()
        .route("/api/users/me", get(learnhub_backend::routes::users::get_me))
        .layer(axum::middleware::from_fn(
            learnhub_backend::middleware::auth::require_bearer_auth,
        ));

    public.merge(private).with_state(state)
}

async fn json_response(response: axum::response::Response) -> JsonValue {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
#[serial]
async fn register_verify_login_flow() {
    let Some((state, pool)) = setup().await else {
        return;
    };
    let app = auth_router(state);
    let email = format!("learner_{}@example.com", Uuid::new_v4());

    let req = Request::builder()
        .method("POST")
        .uri("/api/auth/register")
        .header("Content-Type", "application/json")
        .body(Body::from(
            json!({
                "email": email,
                "password": "hunter2hunter2",
                "first_name": "Ada",
                "last_name": "Lovelace"
            })
            .to_string(),
        ))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_response(resp).await;
    assert_eq!(body["email"].as_str().unwrap(), email);
    assert!(!body["is_verified"].as_bool().unwrap());
    assert!(body.get("password_hash").is_none());

    // Login before verification is rejected.
    let req = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("Content-Type", "application/json")
        .body(Body::from(
            json!({ "email": email, "password": "hunter2hunter2" }).to_string(),
        ))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // The code is logged rather than emailed; the test reads it back.
    let code: String =
        sqlx::query_scalar("SELECT verification_code FROM users WHERE email = $1")
            .bind(&email)
            .fetch_one(&pool)
            .await
            .expect("verification code");

    let req = Request::builder()
        .method("POST")
        .uri("/api/auth/verify-email")
        .header("Content-Type", "application/json")
        .body(Body::from(json!({ "email": email, "code": code }).to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Wrong password still fails after verification.
    let req = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("Content-Type", "application/json")
        .body(Body::from(
            json!({ "email": email, "password": "wrong-password" }).to_string(),
        ))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("Content-Type", "application/json")
        .body(Body::from(
            json!({ "email": email, "password": "hunter2hunter2" }).to_string(),
        ))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_response(resp).await;
    let access_token = body["access_token"].as_str().unwrap().to_string();
    let refresh_token = body["refresh_token"].as_str().unwrap().to_string();

    // The access token opens authenticated routes.
    let req = Request::builder()
        .method("GET")
        .uri("/api/users/me")
        .header("Authorization", format!("Bearer {}", access_token))
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_response(resp).await;
    assert_eq!(body["email"].as_str().unwrap(), email);

    // Refresh mints a fresh pair.
    let req = Request::builder()
        .method("POST")
        .uri("/api/auth/refresh")
        .header("Content-Type", "application/json")
        .body(Body::from(json!({ "refresh_token": refresh_token }).to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_response(resp).await;
    assert!(body["access_token"].is_string());

    // Unauthenticated access stays out.
    let req = Request::builder()
        .method("GET")
        .uri("/api/users/me")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[serial]
async fn duplicate_registration_is_rejected() {
    let Some((state, _pool)) = setup().await else {
        return;
    };
    let app = auth_router(state);
    let email = format!("dup_{}@example.com", Uuid::new_v4());
    let register = |email: String| {
        Request::builder()
            .method("POST")
            .uri("/api/auth/register")
            .header("Content-Type", "application/json")
            .body(Body::from(
                json!({
                    "email": email,
                    "password": "hunter2hunter2",
                    "first_name": "Ada",
                    "last_name": "Lovelace"
                })
                .to_string(),
            ))
            .unwrap()
    };

    let resp = app.clone().oneshot(register(email.clone())).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resp = app.clone().oneshot(register(email)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
