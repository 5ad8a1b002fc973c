use axum::{
    routing::{delete, get, post},
    Router,
};
use es_core::{Error, Result};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub mod dto;
pub mod error;
pub mod handlers;
pub mod state;

pub use state::AppState;

/// Local dev origins of the dashboard frontend.
pub const DEFAULT_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "http://localhost:8080",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:8080",
];

pub const BIND_ENV: &str = "EPISCOUT_BIND";
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

pub fn create_app(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/api/scan", post(handlers::scan))
        .route("/api/articles", get(handlers::list_articles))
        .route("/api/articles/save", post(handlers::save_article))
        .route("/api/stats/overview", get(handlers::stats_overview))
        .route("/api/stats/trends", get(handlers::stats_trends))
        .route("/api/keywords", get(handlers::list_keywords).post(handlers::create_keyword))
        .route("/api/keywords/:id", delete(handlers::delete_keyword))
        .route("/api/whitelist", get(handlers::list_whitelist).post(handlers::create_whitelist))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

pub async fn serve(app: Router, bind: &str) -> Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .map_err(|e| Error::Config(format!("Invalid bind address {}: {}", bind, e)))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🌐 API listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub mod prelude {
    pub use es_core::{Error, Result};
    pub use crate::{create_app, serve, AppState, DEFAULT_ORIGINS};
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use chrono::{Duration, Utc};
    use es_core::{ArticleStorage, CatalogStorage, FeedEntry, FeedTransport};
    use es_scanner::{ScanManager, ScannerConfig};
    use es_storage::InMemoryStorage;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    const FEED: &str = "https://feed.test/rss";

    struct StaticTransport(Vec<FeedEntry>);

    #[async_trait]
    impl FeedTransport for StaticTransport {
        async fn fetch(&self, _url: &str) -> es_core::Result<Vec<FeedEntry>> {
            Ok(self.0.clone())
        }
    }

    async fn test_app(entries: Vec<FeedEntry>) -> (Router, Arc<dyn CatalogStorage>) {
        let storage: Arc<dyn CatalogStorage> = Arc::new(InMemoryStorage::new());
        storage.create_keyword("sởi").await.unwrap();
        let config = ScannerConfig {
            feeds: vec![FEED.to_string()],
            ..ScannerConfig::default()
        };
        let scanner = ScanManager::new(
            storage.clone().as_article_storage(),
            Arc::new(StaticTransport(entries)),
            &config,
        )
        .unwrap();
        let origins: Vec<String> = DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect();
        (create_app(AppState::new(storage.clone(), scanner), &origins), storage)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    fn entry(link: &str, title: &str) -> FeedEntry {
        FeedEntry {
            link: link.to_string(),
            title: title.to_string(),
            summary: "Sở Y tế cho biết".to_string(),
            published_at: Some(Utc::now() - Duration::hours(1)),
        }
    }

    #[tokio::test]
    async fn test_scan_then_list_and_stats() {
        let (app, _) = test_app(vec![
            entry("https://vnexpress.net/soi-1.html", "Hà Nội ghi nhận 15 ca mắc sởi"),
            entry("https://blog.example.com/soi", "Bệnh sởi ở trẻ nhỏ"),
        ])
        .await;

        let (status, scan) = call(&app, "POST", "/api/scan", Some(json!({"fetch_unknown": true}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(scan["saved_trusted_count"], 1);
        assert_eq!(scan["unknown_articles"][0]["source"], "blog.example.com");
        assert_eq!(scan["unknown_articles"][0]["is_whitelisted"], false);

        let (status, articles) = call(&app, "GET", "/api/articles?skip=0&limit=10", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(articles.as_array().unwrap().len(), 1);
        assert_eq!(articles[0]["keywords_matched"], "sởi");
        assert_eq!(articles[0]["tags"], "Mới");

        let (_, overview) = call(&app, "GET", "/api/stats/overview", None).await;
        assert_eq!(overview["total_articles"], 1);
        assert_eq!(overview["total_cases"], 15);
        assert_eq!(overview["alert_count"], 0);

        let (_, trends) = call(&app, "GET", "/api/stats/trends?days=7", None).await;
        assert_eq!(trends[0]["cases"], 15);
    }

    #[tokio::test]
    async fn test_trends_rejects_out_of_range_days() {
        let (app, _) = test_app(vec![]).await;
        let (status, error) = call(&app, "GET", "/api/stats/trends?days=1000000000", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["detail"], "days out of range: 1000000000");

        let (status, trends) = call(&app, "GET", "/api/stats/trends?days=30", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(trends, json!([]));
    }

    #[tokio::test]
    async fn test_save_reviewed_article_twice() {
        let (app, _) = test_app(vec![]).await;
        let body = json!({"title": "Ổ dịch sởi", "link": "https://blog.example.com/soi"});

        let (status, saved) = call(&app, "POST", "/api/articles/save", Some(body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert!(saved["id"].is_i64());
        assert_eq!(saved["source"], "blog.example.com");

        let (status, error) = call(&app, "POST", "/api/articles/save", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["detail"], "Article already saved");
    }

    #[tokio::test]
    async fn test_save_rejects_unparsable_link() {
        let (app, storage) = test_app(vec![]).await;
        let body = json!({"title": "Ổ dịch sởi", "link": "not a url"});

        let (status, error) = call(&app, "POST", "/api/articles/save", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["detail"], "Article link is not a valid URL: not a url");
        assert!(storage.list_articles(0, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_keyword_routes() {
        let (app, storage) = test_app(vec![]).await;

        let (status, created) = call(&app, "POST", "/api/keywords", Some(json!({"text": "cúm A"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["text"], "cúm A");

        let (status, error) = call(&app, "POST", "/api/keywords", Some(json!({"text": "sởi"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["detail"], "Keyword already exists");

        let (_, listed) = call(&app, "GET", "/api/keywords", None).await;
        assert_eq!(listed[0]["text"], "cúm A");

        let id = created["id"].as_i64().unwrap();
        let (status, deleted) = call(&app, "DELETE", &format!("/api/keywords/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted, json!({"status": "success", "id": id}));
        assert_eq!(storage.list_keywords().await.unwrap(), vec!["sởi".to_string()]);

        let (status, error) = call(&app, "DELETE", &format!("/api/keywords/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error["detail"], "Keyword not found");
    }

    #[tokio::test]
    async fn test_whitelist_routes() {
        let (app, storage) = test_app(vec![]).await;

        let (status, created) = call(&app, "POST", "/api/whitelist", Some(json!({"domain": "Vov.vn"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["domain"], "vov.vn");
        assert_eq!(created["is_active"], true);

        let (status, _) = call(&app, "POST", "/api/whitelist", Some(json!({"domain": "vov.vn"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, listed) = call(&app, "GET", "/api/whitelist", None).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(storage.list_whitelist_domains().await.unwrap(), vec!["vov.vn".to_string()]);
    }

    #[tokio::test]
    async fn test_cors_preflight_for_dev_origin() {
        let (app, _) = test_app(vec![]).await;
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/scan")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:5173"
        );
    }
}
