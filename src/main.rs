use axum::{
    routing::{get, post, put},
    Router,
};
use jobboard_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware::auth::require_bearer_auth,
    realtime, routes, AppState,
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

    let base_routes = Router::new()
        .route("/health", get(routes::health::health))
        .route("/ws", get(realtime::socket::ws_handler));

    let api = Router::new()
        .route(
            "/api/v1/applications",
            post(routes::application_routes::create_application),
        )
        .route(
            "/api/v1/applications/my-applications",
            get(routes::application_routes::my_applications),
        )
        .route(
            "/api/v1/applications/job/:job_id",
            get(routes::application_routes::job_applications),
        )
        .route(
            "/api/v1/applications/:id",
            get(routes::application_routes::get_application)
                .put(routes::application_routes::update_application_status)
                .delete(routes::application_routes::delete_application),
        )
        .route(
            "/api/v1/messages/conversation",
            post(routes::message_routes::get_or_create_conversation),
        )
        .route(
            "/api/v1/messages/conversations",
            get(routes::message_routes::list_conversations),
        )
        .route(
            "/api/v1/messages/conversation/:id",
            get(routes::message_routes::get_messages),
        )
        .route("/api/v1/messages", post(routes::message_routes::send_message))
        .route(
            "/api/v1/messages/:id",
            axum::routing::delete(routes::message_routes::delete_message),
        )
        .route(
            "/api/v1/interviews",
            post(routes::interview_routes::schedule_interview)
                .get(routes::interview_routes::list_interviews),
        )
        .route(
            "/api/v1/interviews/:id",
            get(routes::interview_routes::get_interview)
                .delete(routes::interview_routes::cancel_interview),
        )
        .route(
            "/api/v1/interviews/:id/token",
            get(routes::interview_routes::interview_token),
        )
        .route(
            "/api/v1/interviews/:id/feedback",
            post(routes::interview_routes::submit_feedback),
        )
        .route(
            "/api/v1/interviews/:id/reschedule",
            put(routes::interview_routes::reschedule_interview),
        )
        .layer(axum::middleware::from_fn(require_bearer_auth));

    let app = base_routes
        .merge(api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
