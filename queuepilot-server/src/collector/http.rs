//! HTTP endpoints of the collector
//!
//! ## GET /metrics
//!
//! Prometheus text exposition of the latest telemetry values.
//!
//! ## GET /snapshot
//!
//! Latest snapshot as JSON; 404 until the first frame arrives.
//!
//! ```json
//! {
//!   "producer_rate": 9.0,
//!   "produced_total": 1200,
//!   "consumed_total": 1190,
//!   "occupancy": 10,
//!   "queue_threshold": 5
//! }
//! ```
//!
//! ## GET /health
//!
//! Returns "OK" with 200 status.

use crate::metrics::CollectorMetrics;
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Json},
    routing::get,
};
use queuepilot::MetricsSnapshot;
use std::sync::Arc;

pub fn router(metrics: Arc<CollectorMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(handle_metrics))
        .route("/snapshot", get(handle_snapshot))
        .route("/health", get(|| async { "OK" }))
        .with_state(metrics)
}

async fn handle_metrics(State(metrics): State<Arc<CollectorMetrics>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics.export_prometheus(),
    )
}

async fn handle_snapshot(
    State(metrics): State<Arc<CollectorMetrics>>,
) -> Result<Json<MetricsSnapshot>, StatusCode> {
    metrics.latest().map(Json).ok_or(StatusCode::NOT_FOUND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(Arc::new(CollectorMetrics::new()));
        let (status, body) = get_body(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn test_snapshot_not_found_before_first_frame() {
        let app = router(Arc::new(CollectorMetrics::new()));
        let (status, _) = get_body(app, "/snapshot").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_snapshot_and_metrics_after_frame() {
        let metrics = Arc::new(CollectorMetrics::new());
        metrics.record_snapshot(MetricsSnapshot::parse("7:100:90:10:5").unwrap());
        let app = router(Arc::clone(&metrics));

        let (status, body) = get_body(app.clone(), "/snapshot").await;
        assert_eq!(status, StatusCode::OK);
        let snapshot: MetricsSnapshot = serde_json::from_str(&body).unwrap();
        assert_eq!(snapshot.occupancy, 10);
        assert_eq!(snapshot.producer_rate, 7.0);

        let (status, body) = get_body(app, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("queuepilot_queue_occupancy 10"));
    }
}
