//! Scrape handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::debug;

use crate::ApiState;

/// GET /metrics
///
/// Snapshots the repository on every request; an empty repository yields an
/// empty body.
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let snapshot = state.repo.dump().await;
    debug!(series = snapshot.len(), "serving scrape");

    let body = histats_metrics::render_prometheus(&snapshot);
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use histats_core::Metric;
    use histats_metrics::MetricRepository;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn scrape(repo: MetricRepository) -> (StatusCode, String, String) {
        let req = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();
        let resp = crate::build_router(repo).oneshot(req).await.unwrap();

        let status = resp.status();
        let content_type = resp
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn empty_repository_gives_empty_body() {
        let (status, content_type, body) = scrape(MetricRepository::new()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("text/plain"));
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn scrape_lists_every_series() {
        let repo = MetricRepository::new();
        repo.update("google", Metric::new(1000, 42.5)).await;
        repo.update("amazon", Metric::new(1000, 7.0)).await;

        let (_, _, body) = scrape(repo).await;
        assert_eq!(body, "amazon_response_ms 7\ngoogle_response_ms 42.5\n");
    }

    #[tokio::test]
    async fn scrape_reflects_latest_update() {
        let repo = MetricRepository::new();
        repo.update("a", Metric::new(1000, 1.0)).await;
        let (_, _, first) = scrape(repo.clone()).await;
        let (_, _, again) = scrape(repo.clone()).await;
        assert_eq!(first, again);

        repo.update("a", Metric::new(1001, 2.0)).await;
        let (_, _, after) = scrape(repo).await;
        assert_eq!(after, "a_response_ms 2\n");
    }

    #[tokio::test]
    async fn handler_returns_text() {
        let state = ApiState {
            repo: MetricRepository::new(),
        };
        let resp = prometheus_metrics(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let req = Request::builder().uri("/nope").body(Body::empty()).unwrap();
        let resp = crate::build_router(MetricRepository::new())
            .oneshot(req)
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
