use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Method, Request, header},
    middleware,
    middleware::Next,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;

use super::AppState;
use super::auth;
use super::handlers::{config, keepalive, tasks};

fn build_localhost_cors(api_port: u16) -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        format!("http://127.0.0.1:{}", api_port),
        format!("http://localhost:{}", api_port),
    ]
    .iter()
    .filter_map(|o| o.parse().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(tower_http::cors::Any)
}

pub fn build_api_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/scheduled-tasks",
            get(tasks::list_tasks).post(tasks::create_task),
        )
        .route("/api/scheduled-tasks/stats", get(tasks::task_stats))
        .route(
            "/api/scheduled-tasks/type/{task_type}",
            get(tasks::list_by_type),
        )
        .route(
            "/api/scheduled-tasks/platform/{platform}",
            get(tasks::list_by_platform),
        )
        .route(
            "/api/scheduled-tasks/{code}",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/api/scheduled-tasks/{code}/toggle", put(tasks::toggle_task))
        .route(
            "/api/scheduled-tasks/{code}/trigger",
            post(tasks::trigger_task),
        )
        .route("/api/keepalive/platforms", get(keepalive::list_platforms))
        .route(
            "/api/keepalive/trigger/{platform}",
            post(keepalive::trigger_platform),
        )
        .route("/api/keepalive/trigger-all", post(keepalive::trigger_all))
        .route("/api/keepalive/logs", get(keepalive::list_logs))
        .route("/api/keepalive/stats", get(keepalive::keepalive_stats))
        .route("/api/keepalive/overview", get(keepalive::overview))
        .route(
            "/api/keepalive/config/{platform}",
            get(config::get_platform_config).put(config::put_platform_config),
        )
        .route(
            "/api/keepalive/config/{platform}/keys",
            put(config::put_platform_keys),
        )
        .route("/api/logs", get(super::sse_logs_endpoint))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ))
        .layer(middleware::from_fn(security_headers))
        .layer(build_localhost_cors(state.api_port))
        .with_state(state)
}

async fn security_headers(req: Request<Body>, next: Next) -> axum::response::Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );
    response
}
