//! Tower middleware that reports every request to a [`Watchdog`].

use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use tower::{Layer, Service};

use super::Watchdog;

/// Layer producing [`InactivityService`].
#[derive(Clone, Debug)]
pub struct InactivityLayer {
    watchdog: Watchdog,
}

impl InactivityLayer {
    pub fn new(watchdog: Watchdog) -> Self {
        Self { watchdog }
    }
}

impl<S> Layer<S> for InactivityLayer {
    type Service = InactivityService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InactivityService::new(inner, self.watchdog.clone())
    }
}

/// Service wrapper that counts requests as in flight for their whole lifetime.
///
/// The response is passed through untouched; errors from the inner service
/// propagate unchanged.
#[derive(Clone, Debug)]
pub struct InactivityService<S> {
    inner: S,
    watchdog: Watchdog,
}

impl<S> InactivityService<S> {
    pub fn new(inner: S, watchdog: Watchdog) -> Self {
        Self { inner, watchdog }
    }
}

impl<S, Req> Service<Req> for InactivityService<S>
where
    S: Service<Req>,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let guard = self.watchdog.enter();
        let response = self.inner.call(req);
        Box::pin(async move {
            // Held until the response future completes or is dropped.
            let _guard = guard;
            response.await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::time::Duration;
    use tower::{service_fn, ServiceExt};

    use crate::inactivity::WatchdogState;

    #[tokio::test(start_paused = true)]
    async fn test_counts_request_while_running() {
        let watchdog = Watchdog::new(Duration::from_secs(2), || {}).unwrap();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let mut release_rx = Some(release_rx);

        let service = watchdog.wrap(service_fn(move |n: u32| {
            let rx = release_rx.take();
            async move {
                if let Some(rx) = rx {
                    let _ = rx.await;
                }
                Ok::<_, Infallible>(n * 2)
            }
        }));

        let pending = tokio::spawn(service.oneshot(21));
        tokio::task::yield_now().await;
        assert_eq!(watchdog.in_flight(), 1);

        release_tx.send(()).unwrap();
        assert_eq!(pending.await.unwrap().unwrap(), 42);
        assert_eq!(watchdog.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inner_error_passes_through() {
        let watchdog = Watchdog::new(Duration::from_secs(2), || {}).unwrap();
        let service = watchdog.wrap(service_fn(|_: ()| async { Err::<(), _>("boom") }));

        let err = service.oneshot(()).await.unwrap_err();
        assert_eq!(err, "boom");
        assert_eq!(watchdog.in_flight(), 0);
        assert_eq!(watchdog.generation(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_request_is_released() {
        let watchdog = Watchdog::new(Duration::from_secs(2), || {}).unwrap();
        let service = watchdog.wrap(service_fn(|_: ()| async {
            std::future::pending::<()>().await;
            Ok::<_, Infallible>(())
        }));

        let pending = tokio::spawn(service.oneshot(()));
        tokio::task::yield_now().await;
        assert_eq!(watchdog.in_flight(), 1);

        pending.abort();
        let _ = pending.await;
        assert_eq!(watchdog.in_flight(), 0);
        assert_eq!(watchdog.state(), WatchdogState::Armed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_handler_is_released() {
        let watchdog = Watchdog::new(Duration::from_secs(2), || {}).unwrap();
        async fn explode(_: ()) -> Result<(), Infallible> {
            tokio::task::yield_now().await;
            panic!("handler blew up")
        }
        let service = watchdog.wrap(service_fn(explode));

        let join_err = tokio::spawn(service.oneshot(())).await.unwrap_err();
        assert!(join_err.is_panic());
        assert_eq!(watchdog.in_flight(), 0);
        assert_eq!(watchdog.generation(), 1);
        assert_eq!(watchdog.state(), WatchdogState::Armed);
    }
}
