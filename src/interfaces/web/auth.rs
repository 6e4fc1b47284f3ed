use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::AppState;
use super::response::ApiError;

pub(crate) fn is_loopback_host(host: &str) -> bool {
    matches!(host, "127.0.0.1" | "::1" | "localhost")
}

fn bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Bearer check against `admin_token`; without one only a loopback bind is served.
pub async fn require_auth(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.admin_token.as_deref() else {
        if is_loopback_host(&state.api_host) {
            return next.run(req).await;
        }
        return ApiError::unauthorized(
            "No admin_token configured. Set server.admin_token before exposing the API on a non-loopback address.",
        )
        .into_response();
    };

    match bearer_token(&req) {
        Some(token) if token == expected => next.run(req).await,
        Some(_) => ApiError::unauthorized("Invalid admin token").into_response(),
        None => ApiError::unauthorized(
            "Missing or invalid Authorization header. Use: Bearer <token>",
        )
        .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::web::router::tests::test_state;
    use axum::http::StatusCode;
    use axum::{Router, middleware, routing::get};
    use tower::util::ServiceExt;

    fn protected_app(state: AppState) -> Router {
        Router::new()
            .route("/api/ping", get(|| async { "pong" }))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                super::require_auth,
            ))
            .with_state(state)
    }

    async fn ping_status(app: Router, authorization: Option<&str>) -> StatusCode {
        let mut builder = Request::builder().uri("/api/ping");
        if let Some(value) = authorization {
            builder = builder.header("authorization", value);
        }
        app.oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn no_token_on_loopback_allows_request() {
        let state = test_state("127.0.0.1", None).await;
        assert_eq!(ping_status(protected_app(state), None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn no_token_on_non_loopback_rejects_request() {
        let state = test_state("0.0.0.0", None).await;
        assert_eq!(
            ping_status(protected_app(state), None).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn configured_token_requires_matching_bearer() {
        let state = test_state("0.0.0.0", Some("s3cret")).await;
        let app = protected_app(state);
        assert_eq!(ping_status(app.clone(), None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(
            ping_status(app.clone(), Some("Bearer wrong")).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ping_status(app, Some("Bearer s3cret")).await, StatusCode::OK);
    }

    #[test]
    fn loopback_hosts() {
        assert!(is_loopback_host("127.0.0.1"));
        assert!(is_loopback_host("localhost"));
        assert!(!is_loopback_host("0.0.0.0"));
    }
}
