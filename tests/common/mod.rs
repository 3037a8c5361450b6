//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{routing::get, Router};
use scale_to_zero::config::ServiceConfig;
use scale_to_zero::lifecycle::{self, Shutdown, ShutdownReason, StartupError};
use scale_to_zero::Watchdog;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A watchdog-wrapped server whose only route sleeps for `handler_duration`.
#[allow(dead_code)]
pub struct SlowServer {
    pub addr: SocketAddr,
    pub watchdog: Watchdog,
    pub fired: oneshot::Receiver<()>,
}

/// Start a server whose every request takes `handler_duration`, wrapped by a
/// watchdog with `timeout`. `fired` resolves when the watchdog fires.
#[allow(dead_code)]
pub async fn start_slow_server(timeout: Duration, handler_duration: Duration) -> SlowServer {
    let (fired_tx, fired) = oneshot::channel();
    let watchdog = Watchdog::new(timeout, move || {
        let _ = fired_tx.send(());
    })
    .unwrap();

    let app = Router::new()
        .route(
            "/",
            get(move || async move {
                tokio::time::sleep(handler_duration).await;
                "done"
            }),
        )
        .layer(watchdog.layer());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    SlowServer { addr, watchdog, fired }
}

/// A full service instance on an ephemeral port.
#[allow(dead_code)]
pub struct TestService {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<Option<ShutdownReason>, StartupError>>,
}

#[allow(dead_code)]
impl TestService {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Config suitable for tests: ephemeral listener, short timeouts, quiet logs.
#[allow(dead_code)]
pub fn test_config(inactivity_secs: u64) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.inactivity.timeout_secs = inactivity_secs;
    config.timeouts.shutdown_grace_secs = 2;
    config
}

#[allow(dead_code)]
pub async fn start_service(config: ServiceConfig) -> TestService {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(lifecycle::serve(config, listener, shutdown.clone()));

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestService {
        addr,
        shutdown,
        handle,
    }
}

#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
