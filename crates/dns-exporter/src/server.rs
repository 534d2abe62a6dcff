//! HTTP surface: welcome text, Prometheus metrics and the discovery document.

use crate::cache::TargetCache;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusRecorder};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Gauge reporting the size of the current cache snapshot
pub const TOTAL_RECORDS: &str = "dns_exporter_total_records";

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    cache: TargetCache,
    recorder: Arc<PrometheusRecorder>,
}

impl AppState {
    /// Create state around `cache` with a private metrics registry
    #[must_use]
    pub fn new(cache: TargetCache) -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        metrics::with_local_recorder(&recorder, || {
            metrics::describe_gauge!(TOTAL_RECORDS, "Total number of DNS records fetched");
        });
        Self {
            cache,
            recorder: Arc::new(recorder),
        }
    }

    /// Render the registry with the gauge set to the current cache size
    #[must_use]
    pub fn render_metrics(&self) -> String {
        #[allow(clippy::cast_precision_loss)]
        let total = self.cache.len() as f64;
        metrics::with_local_recorder(self.recorder.as_ref(), || {
            metrics::gauge!(TOTAL_RECORDS).set(total);
        });
        self.recorder.handle().render()
    }
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/metrics", get(metrics_text))
        .route("/dns_targets", get(dns_targets))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn index() -> &'static str {
    "Welcome to DNS Exporter"
}

async fn metrics_text(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        state.render_metrics(),
    )
}

async fn dns_targets(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.cache.snapshot().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::BackoffPolicy;
    use crate::coordinator::Refresher;
    use crate::fetcher::tests::{a, FakeSource};
    use crate::fetcher::ZoneFetcher;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use dns_exporter_core::{ExclusionRules, RawRecord, RecordType, Target};
    use tokio::sync::Semaphore;
    use tower::ServiceExt;

    const GAUGE_HELP: &str =
        "# HELP dns_exporter_total_records Total number of DNS records fetched";

    fn targets(count: usize) -> Vec<Target> {
        (0..count)
            .map(|i| {
                RawRecord::new(&format!("Host{i}.Example.com."), RecordType::A, "10.0.0.1")
                    .into_target("Z1")
            })
            .collect()
    }

    async fn get_body(state: AppState, uri: &str) -> (StatusCode, String) {
        let response = router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn gauge_value(text: &str) -> f64 {
        text.lines()
            .find(|line| line.starts_with(TOTAL_RECORDS))
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|v| v.parse().ok())
            .expect("gauge line present")
    }

    #[tokio::test]
    async fn test_index() {
        let (status, body) = get_body(AppState::new(TargetCache::new()), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Welcome to DNS Exporter");
    }

    #[tokio::test]
    async fn test_dns_targets_empty_before_first_cycle() {
        let (status, body) = get_body(AppState::new(TargetCache::new()), "/dns_targets").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "[]");
    }

    #[tokio::test]
    async fn test_dns_targets_document_shape() {
        let cache = TargetCache::new();
        cache.replace(targets(2));

        let (_, body) = get_body(AppState::new(cache), "/dns_targets").await;
        let doc: serde_json::Value = serde_json::from_str(&body).unwrap();

        assert_eq!(doc.as_array().unwrap().len(), 2);
        assert_eq!(doc[0]["targets"][0], "https://host0.example.com");
        assert_eq!(doc[0]["labels"]["hosted_zone"], "Z1");
        assert_eq!(doc[0]["labels"]["record"], "10.0.0.1");
        assert_eq!(doc[0]["labels"]["type"], "A");
    }

    #[tokio::test]
    async fn test_metrics_tracks_cache_size() {
        let cache = TargetCache::new();
        let state = AppState::new(cache.clone());

        let (status, body) = get_body(state.clone(), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(GAUGE_HELP));
        assert!(body.contains("# TYPE dns_exporter_total_records gauge"));
        assert!(gauge_value(&body).abs() < f64::EPSILON);

        cache.replace(targets(7));
        let (_, body) = get_body(state.clone(), "/metrics").await;
        assert!((gauge_value(&body) - 7.0).abs() < f64::EPSILON);

        cache.replace(targets(3));
        let (_, body) = get_body(state, "/metrics").await;
        assert!((gauge_value(&body) - 3.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_metrics_content_type() {
        let response = router(AppState::new(TargetCache::new()))
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/plain"));
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let (status, _) = get_body(AppState::new(TargetCache::new()), "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshed_zones_are_served() {
        let source = FakeSource::default()
            .with_zone(
                "Z1",
                vec![vec![
                    a("a.example.com.", "1.2.3.4"),
                    a("internal-b.example.com.", "10.0.0.2"),
                ]],
            )
            .with_zone("Z2", vec![vec![a("c.example.com.", "5.6.7.8")]]);
        let rules = ExclusionRules {
            excluded_prefixes: vec!["internal-".into()],
            ..ExclusionRules::default()
        };
        let fetcher = ZoneFetcher::new(
            Arc::new(source),
            Arc::new(rules),
            Arc::new(Semaphore::new(2)),
            BackoffPolicy::default(),
        );
        let cache = TargetCache::new();
        // Z3 is unknown to the source and fails every attempt
        let zones = vec!["Z1".into(), "Z3".into(), "Z2".into()];
        let refresher = Refresher::new(Arc::new(fetcher), zones, cache.clone());

        assert_eq!(refresher.refresh_all().await, 2);

        let state = AppState::new(cache);
        let (status, body) = get_body(state.clone(), "/dns_targets").await;
        assert_eq!(status, StatusCode::OK);
        let doc: serde_json::Value = serde_json::from_str(&body).unwrap();
        let entries = doc.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["targets"][0], "https://a.example.com");
        assert_eq!(entries[0]["labels"]["hosted_zone"], "Z1");
        assert_eq!(entries[1]["targets"][0], "https://c.example.com");
        assert_eq!(entries[1]["labels"]["hosted_zone"], "Z2");

        let (_, metrics) = get_body(state, "/metrics").await;
        assert!((gauge_value(&metrics) - 2.0).abs() < f64::EPSILON);
    }
}
