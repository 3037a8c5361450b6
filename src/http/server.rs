//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, access log)
//! - Install the inactivity watchdog around tracked routes
//! - Bind server to listener and drain gracefully on shutdown

use std::time::Duration;

use axum::{
    middleware,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;

use crate::config::{ServiceConfig, ServiceInfoConfig};
use crate::http::handlers::{create_item, delete_item, get_item, health, list_items};
use crate::http::request::{access_log, propagate_request_id_layer, set_request_id_layer, trace_layer};
use crate::inactivity::Watchdog;
use crate::lifecycle::ShutdownListener;
use crate::storage::ItemStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: ItemStore,
    pub watchdog: Option<Watchdog>,
    pub service: ServiceInfoConfig,
}

/// HTTP server for the service.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
}

impl HttpServer {
    /// Create a new HTTP server. Requests are tracked by `watchdog` when given.
    pub fn new(config: ServiceConfig, store: ItemStore, watchdog: Option<Watchdog>) -> Self {
        let state = AppState {
            store,
            watchdog,
            service: config.service.clone(),
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// With `track_health` the watchdog wraps everything, including unmatched
    /// routes; without it, `/health` is merged in outside the watchdog layer.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        let items: Router<AppState> = Router::new()
            .route("/items", get(list_items).post(create_item))
            .route("/items/{id}", get(get_item).delete(delete_item));
        let health_route: Router<AppState> = Router::new().route("/health", get(health));

        let watchdog = state.watchdog.clone();
        let track_health = config.inactivity.track_health;

        let routes = match (&watchdog, track_health) {
            (Some(watchdog), false) => items.layer(watchdog.layer()).merge(health_route),
            _ => items.merge(health_route),
        };

        let router = routes
            .with_state(state)
            .layer(middleware::from_fn(access_log))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(trace_layer())
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer());

        match watchdog {
            Some(watchdog) if track_health => router.layer(watchdog.layer()),
            _ => router,
        }
    }

    /// The fully layered router, for in-process use (tests, embedding).
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain open connections.
    pub async fn run(self, listener: TcpListener, shutdown: ShutdownListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            inactivity_enabled = self.config.inactivity.enabled,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.wait().await;
                tracing::info!("Shutdown requested, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::http::X_REQUEST_ID;
    use crate::inactivity::WatchdogState;
    use crate::storage::Item;

    fn server(watchdog: Option<Watchdog>, track_health: bool) -> HttpServer {
        let mut config = ServiceConfig::default();
        config.inactivity.track_health = track_health;
        config.service.region = "ams".into();
        HttpServer::new(config, ItemStore::new(), watchdog)
    }

    fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_json() {
        let router = server(None, true).router();
        let response = router
            .oneshot(
                Request::get("/health")
                    .header(header::ACCEPT, "application/json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(&X_REQUEST_ID));
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["region"], "ams");
        assert!(json.get("inactivity").is_none());
    }

    #[tokio::test]
    async fn test_health_html_by_default() {
        let router = server(None, true).router();
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/html"));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("Region: ams"));
    }

    #[tokio::test]
    async fn test_client_request_id_is_echoed() {
        let router = server(None, true).router();
        let response = router
            .oneshot(
                Request::get("/items")
                    .header(&X_REQUEST_ID, "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()[&X_REQUEST_ID], "abc-123");
    }

    #[tokio::test]
    async fn test_items_crud() {
        let router = server(None, true).router();

        let response = router
            .clone()
            .oneshot(json_request("POST", "/items", r#"{"name":"widget"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: Item = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(created.name, "widget");

        let response = router
            .clone()
            .oneshot(Request::get(format!("/items/{}", created.id)).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .clone()
            .oneshot(Request::get("/items").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);

        let response = router
            .clone()
            .oneshot(Request::delete(format!("/items/{}", created.id)).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = router
            .oneshot(Request::get(format!("/items/{}", created.id)).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_item_validation() {
        let router = server(None, true).router();

        let response = router
            .clone()
            .oneshot(json_request("POST", "/items", r#"{"name":"  "}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "name is required");

        let response = router
            .oneshot(json_request("POST", "/items", "not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_requests_reset_watchdog() {
        let watchdog = Watchdog::new(Duration::from_secs(60), || {}).unwrap();
        let router = server(Some(watchdog.clone()), true).router();

        router
            .clone()
            .oneshot(Request::get("/items").body(Body::empty()).unwrap())
            .await
            .unwrap();
        router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(watchdog.generation(), 2);
        assert_eq!(watchdog.in_flight(), 0);
        assert_eq!(watchdog.state(), WatchdogState::Armed);
    }

    #[tokio::test]
    async fn test_untracked_health_does_not_reset_watchdog() {
        let watchdog = Watchdog::new(Duration::from_secs(60), || {}).unwrap();
        let router = server(Some(watchdog.clone()), false).router();

        let response = router
            .clone()
            .oneshot(
                Request::get("/health")
                    .header(header::ACCEPT, "application/json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["inactivity"]["state"], "armed");
        assert_eq!(json["inactivity"]["in_flight"], 0);
        assert_eq!(watchdog.generation(), 0);

        router
            .oneshot(Request::get("/items").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(watchdog.generation(), 1);
    }
}
