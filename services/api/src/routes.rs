use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;

/// Mounts the API under the optional base path and adds the unauthenticated probes.
pub(crate) fn with_operational_routes(api: Router, base_path: Option<&str>) -> Router {
    let router = match base_path {
        Some(prefix) => Router::new().nest(prefix, api),
        None => api,
    };

    router
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state(ready: bool) -> AppState {
        let recorder = PrometheusBuilder::new().build_recorder();
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(recorder.handle()),
        }
    }

    fn app(api: Router, base_path: Option<&str>, state: AppState) -> Router {
        with_operational_routes(api, base_path).layer(Extension(state))
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_tracks_the_startup_flag() {
        let state = state(false);
        let flag = state.readiness.clone();
        let router = app(Router::new(), None, state);

        let response = router.clone().oneshot(get_request("/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        flag.store(true, Ordering::Release);
        let response = router.oneshot(get_request("/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn api_is_nested_under_the_base_path_while_probes_stay_at_the_root() {
        let api = Router::new().route("/api/v1/ping", get(|| async { "pong" }));
        let router = app(api, Some("/questionnaire-service"), state(true));

        let nested = router
            .clone()
            .oneshot(get_request("/questionnaire-service/api/v1/ping"))
            .await
            .unwrap();
        assert_eq!(nested.status(), StatusCode::OK);

        let bare = router
            .clone()
            .oneshot(get_request("/api/v1/ping"))
            .await
            .unwrap();
        assert_eq!(bare.status(), StatusCode::NOT_FOUND);

        let health = router.oneshot(get_request("/health")).await.unwrap();
        assert_eq!(health.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_are_exposed_as_prometheus_text() {
        let response = app(Router::new(), None, state(true))
            .oneshot(get_request("/metrics"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }
}
