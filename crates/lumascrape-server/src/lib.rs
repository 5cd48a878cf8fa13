pub mod envelope;
pub mod error;
pub mod handlers;
pub mod state;

use axum::Router;
use axum::http::Method;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};

pub use state::{AppState, BrowserPools, FetchOptions};

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/scrape/explore", get(handlers::scrape_explore))
        .route("/scrape/custom", get(handlers::scrape_custom))
        .route("/scrape/city", get(handlers::scrape_city))
        .route("/scrape/url", post(handlers::scrape_url))
        .route("/batch", post(handlers::batch))
        .route("/export/json", post(handlers::export_json))
        .route("/export/csv", post(handlers::export_csv))
        .route("/stats", post(handlers::stats))
        .fallback(handlers::not_found)
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use lumascrape::{FetchError, PageFetcher, ScraperConfig};
    use serde_json::{Value, json};
    use std::collections::{HashMap, HashSet};
    use std::fs;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    struct FixtureFetcher {
        pages: HashMap<String, String>,
    }

    impl FixtureFetcher {
        fn new() -> Self {
            let page = |name: &str| {
                fs::read_to_string(format!("../lumascrape/fixtures/{}", name))
                    .expect("Failed to read fixture")
            };
            let pages = [
                ("https://lu.ma/web3", "listing_web3.html"),
                ("https://lu.ma/explore", "listing_empty.html"),
                ("https://lu.ma/e/evt-zk-proofs", "event_zk_proofs.html"),
                ("https://lu.ma/e/evt-crypto-night", "event_crypto_night.html"),
                ("https://lu.ma/e/evt-design-jam", "event_design_jam.html"),
                ("https://lu.ma/rust-meetup", "event_rust_meetup.html"),
            ]
            .into_iter()
            .map(|(url, name)| (url.to_string(), page(name)))
            .collect();
            Self { pages }
        }
    }

    #[async_trait]
    impl PageFetcher for FixtureFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }

    fn app() -> Router {
        let config = ScraperConfig {
            request_delay: Duration::ZERO,
            enrich_profiles: false,
            ..ScraperConfig::default()
        };
        router(AppState::new(config, Arc::new(FixtureFetcher::new()), None))
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn two_events() -> Value {
        json!([
            {
                "event_name": "Rust Meetup",
                "date_time": "Saturday 15th March",
                "event_details": "Talks, pizza and friends",
                "location": "Nairobi, Kenya",
                "organizer_name": "Rust Nairobi",
                "organizer_contact": "https://lu.ma/u/rustnairobi",
                "host_email": "hello@rustnairobi.dev",
                "host_social_media": "https://x.com/rustnairobi",
                "event_url": "https://lu.ma/rust-meetup"
            },
            {
                "event_name": "Design Jam",
                "location": "Nairobi, Kenya",
                "event_url": "https://lu.ma/design-jam"
            }
        ])
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["success"], true);
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_index_lists_endpoints() {
        let (status, body) = send(get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["endpoints"]["POST /batch"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_route_uses_envelope() {
        let (status, body) = send(get("/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("/nope"));
    }

    #[tokio::test]
    async fn test_custom_requires_slug() {
        let (status, body) = send(get("/scrape/custom")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required parameter: slug");
    }

    #[tokio::test]
    async fn test_custom_with_keyword_filter() {
        let (status, body) = send(get("/scrape/custom?slug=web3&keywords=crypto")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 1);
        assert_eq!(body["events"].as_array().unwrap().len(), 1);
        assert_eq!(body["events"][0]["event_name"], "Web3 Builders Night");
    }

    #[tokio::test]
    async fn test_custom_without_keywords_returns_all() {
        let (status, body) =
            send(get("/scrape/custom?slug=web3&use_selenium=false&headless=true")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 3);
    }

    #[tokio::test]
    async fn test_invalid_flag_is_bad_request() {
        let (status, body) = send(get("/scrape/custom?slug=web3&headless=maybe")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_empty_listing_is_success_with_zero_count() {
        let (status, body) = send(get("/scrape/explore")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);
        assert_eq!(body["events"], json!([]));
    }

    #[tokio::test]
    async fn test_listing_fetch_failure_is_server_error() {
        let (status, body) = send(get("/scrape/city?city=Atlantis")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_scrape_url() {
        let (status, body) = send(post_json(
            "/scrape/url",
            json!({"url": "https://lu.ma/rust-meetup", "use_selenium": false}),
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["events"][0]["organizer_name"], "Rust Nairobi");
    }

    #[tokio::test]
    async fn test_scrape_url_requires_url() {
        let (status, _) = send(post_json("/scrape/url", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_batch_reports_each_source() {
        let (status, body) = send(post_json(
            "/batch",
            json!({
                "sources": [
                    {"type": "custom", "params": {"slug": "web3"}},
                    {"type": "moon", "params": {}},
                    {"type": "city", "params": {}}
                ],
                "keywords": ["crypto"],
                "use_selenium": false
            }),
        ))
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0], json!({"type": "custom", "success": true, "count": 1}));
        assert_eq!(results[1]["success"], false);
        assert_eq!(results[2]["error"], "Missing required parameter: city");
    }

    #[tokio::test]
    async fn test_batch_overlapping_sources_return_each_event_once() {
        let (status, body) = send(post_json(
            "/batch",
            json!({
                "sources": [
                    {"type": "custom", "params": {"slug": "web3"}},
                    {"type": "slug", "params": {"slug": "web3"}}
                ],
                "use_selenium": false
            }),
        ))
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 3);
        let urls: HashSet<&str> = body["events"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["event_url"].as_str().unwrap())
            .collect();
        assert_eq!(urls.len(), 3);
        assert_eq!(body["results"][0]["count"], 3);
        assert_eq!(body["results"][1], json!({"type": "custom", "success": true, "count": 0}));
    }

    #[tokio::test]
    async fn test_batch_requires_sources() {
        let (status, _) = send(post_json("/batch", json!({"sources": []}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_export_csv() {
        let response = app()
            .oneshot(post_json("/export/csv", json!({"events": two_events()})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/csv"));
        let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment; filename=\"luma_events_"));
        assert!(disposition.ends_with(".csv\""));

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "event_name,date_time,event_details,location,organizer_name,organizer_contact,host_email,host_social_media,event_url"
        );
        assert!(lines[2].starts_with("Design Jam,N/A,N/A,\"Nairobi, Kenya\""));
    }

    #[tokio::test]
    async fn test_export_json_with_filename() {
        let response = app()
            .oneshot(post_json(
                "/export/json",
                json!({"events": two_events(), "filename": "my events"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"myevents.json\""
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let events: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(events.as_array().unwrap().len(), 2);
        assert_eq!(events[1]["host_email"], "N/A");
    }

    #[tokio::test]
    async fn test_export_requires_events() {
        let (status, body) = send(post_json("/export/json", json!({"events": []}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No events provided");
    }

    #[tokio::test]
    async fn test_stats() {
        let (status, body) = send(post_json("/stats", json!({"events": two_events()}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Computed statistics for 2 events");
        assert_eq!(body["count"], 2);
        assert_eq!(body["stats"]["total_events"], 2);
        assert_eq!(body["stats"]["with_email"], 1);
        assert_eq!(body["stats"]["top_locations"][0]["count"], 2);
    }
}
