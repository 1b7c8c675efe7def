use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use learnhub_backend::middleware::rate_limit::RequestBudget;
use learnhub_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware, routes, AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    let public_api = Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/verify-email", post(routes::auth::verify_email))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/refresh", post(routes::auth::refresh))
        .route("/api/courses", get(routes::courses::list_courses))
        .route("/api/courses/:id", get(routes::courses::get_course))
        .route(
            "/api/courses/:id/lessons",
            get(routes::courses::list_course_lessons),
        )
        .route("/api/lessons/:id", get(routes::courses::get_lesson))
        .route(
            "/api/achievements/all",
            get(routes::achievements::get_all_achievements),
        )
        .route("/api/payments/webhook", post(routes::payments::stripe_webhook))
        .layer(axum::middleware::from_fn_with_state(
            RequestBudget::per_second(config.public_rps),
            middleware::rate_limit::throttle,
        ));

    let learner_api = Router::new()
        .route(
            "/api/users/me",
            get(routes::users::get_me).put(routes::users::update_me),
        )
        .route("/api/users/:id", get(routes::users::get_user))
        .route("/api/courses/:id/rate", post(routes::courses::rate_course))
        .route(
            "/api/progress/courses/:id",
            get(routes::progress::get_course_progress),
        )
        .route(
            "/api/progress/lessons/:id",
            post(routes::progress::mark_lesson_completed)
                .put(routes::progress::update_lesson_progress),
        )
        .route(
            "/api/progress/statistics",
            get(routes::progress::get_statistics),
        )
        .route(
            "/api/achievements",
            get(routes::achievements::get_my_achievements),
        )
        .route(
            "/api/achievements/points",
            get(routes::achievements::get_my_points),
        )
        .route(
            "/api/payments/create-intent",
            post(routes::payments::create_payment_intent),
        )
        .route("/api/payments/confirm", post(routes::payments::confirm_payment))
        .route(
            "/api/payments/history",
            get(routes::payments::get_payment_history),
        )
        .route(
            "/api/payments/refund/:id",
            post(routes::payments::request_refund),
        )
        .layer(axum::middleware::from_fn(
            middleware::auth::require_bearer_auth,
        ))
        .layer(axum::middleware::from_fn_with_state(
            RequestBudget::per_second(config.api_rps),
            middleware::rate_limit::throttle,
        ));

    let authoring_api = Router::new()
        .route("/api/courses", post(routes::courses::create_course))
        .route(
            "/api/courses/:id",
            axum::routing::patch(routes::courses::update_course)
                .delete(routes::courses::delete_course),
        )
        .route(
            "/api/courses/:id/publish",
            post(routes::courses::publish_course),
        )
        .layer(axum::middleware::from_fn(middleware::auth::require_teacher));

    let app = Router::new()
        .merge(public_api)
        .merge(learner_api)
        .merge(authoring_api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
