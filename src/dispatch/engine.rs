//! Per-request retry and failover loop.

use std::sync::Arc;

use axum::body::Body;
use axum::http::Response;
use http_body_util::BodyExt;

use crate::http::forward::ForwardRequest;
use crate::load_balancer::{Backend, ConnPool, LoadGuard};
use crate::observability::metrics;
use crate::resilience::retries::{NextStep, RequestAttempts, RetryPolicy};

/// A request that reached a backend and got an HTTP response back.
#[derive(Debug)]
pub struct Dispatched {
    pub response: Response<Body>,
    /// Backend that produced the response.
    pub backend: String,
    pub attempts: RequestAttempts,
}

/// Why no backend produced a response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("no alive backend available")]
    NoBackendAvailable { attempts: RequestAttempts },

    #[error("max attempts reached")]
    AttemptsExhausted { attempts: RequestAttempts },
}

impl DispatchError {
    pub fn attempts(&self) -> RequestAttempts {
        match self {
            DispatchError::NoBackendAvailable { attempts }
            | DispatchError::AttemptsExhausted { attempts } => *attempts,
        }
    }
}

/// Drives one logical request across retries and failovers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    pool: Arc<ConnPool>,
    policy: RetryPolicy,
}

impl Dispatcher {
    pub fn new(pool: Arc<ConnPool>, policy: RetryPolicy) -> Self {
        Self { pool, policy }
    }

    pub fn pool(&self) -> &Arc<ConnPool> {
        &self.pool
    }

    /// Forward `request` starting at `initial`, retrying and failing over as needed.
    ///
    /// `initial` is the backend the front-end selected; `None` fails immediately.
    pub async fn dispatch(
        &self,
        initial: Option<Arc<Backend>>,
        request: &ForwardRequest,
    ) -> Result<Dispatched, DispatchError> {
        let mut attempts = RequestAttempts::new();
        let mut backend = initial.ok_or(DispatchError::NoBackendAvailable { attempts })?;

        loop {
            let guard = backend.track_load();
            match backend.forward(request).await {
                Ok(response) => {
                    return Ok(Dispatched {
                        response: hold_until_body_done(response, guard),
                        backend: backend.address().to_string(),
                        attempts,
                    });
                }
                Err(e) => {
                    drop(guard);
                    tracing::debug!(
                        backend = %backend.address(),
                        retry = attempts.retry_count,
                        attempt = attempts.attempt_count,
                        error = %e,
                        "Forward failed"
                    );
                }
            }

            match attempts.on_failure(&self.policy, self.pool.len()) {
                NextStep::Retry => {
                    metrics::record_retry(backend.address());
                    tokio::time::sleep(self.policy.backoff).await;
                }
                step => {
                    // Retry budget spent: this backend is considered down.
                    backend.set_alive(false);
                    metrics::record_backend_alive(backend.address(), false);
                    tracing::warn!(backend = %backend.address(), "Backend marked dead after retries");

                    if step == NextStep::GiveUp {
                        tracing::warn!(
                            backends_tried = attempts.attempt_count - 1,
                            "Max attempts reached"
                        );
                        return Err(DispatchError::AttemptsExhausted { attempts });
                    }

                    let next = self
                        .pool
                        .select_backend()
                        .ok_or(DispatchError::NoBackendAvailable { attempts })?;

                    metrics::record_failover(backend.address());
                    tracing::info!(
                        from = %backend.address(),
                        to = %next.address(),
                        attempt = attempts.attempt_count,
                        "Failing over"
                    );
                    attempts.switch_backend();
                    backend = next;
                }
            }
        }
    }
}

/// Keep the backend's load counted until the response body is finished or dropped.
fn hold_until_body_done(response: Response<Body>, guard: LoadGuard) -> Response<Body> {
    let (parts, body) = response.into_parts();
    let body = body.map_frame(move |frame| {
        let _held = &guard;
        frame
    });
    Response::from_parts(parts, Body::new(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::forward::{Forward, ForwardError};
    use axum::body::Bytes;
    use axum::http::{HeaderMap, Method, StatusCode};
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;
    use url::Url;

    #[derive(Debug, Clone, Copy)]
    enum Outcome {
        Fail,
        Status(u16),
    }

    /// Fake transport that plays back a script per backend address.
    #[derive(Debug, Default)]
    struct Scripted {
        scripts: Mutex<HashMap<String, VecDeque<Outcome>>>,
        fallback: Mutex<HashMap<String, Outcome>>,
        calls: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn script(self, addr: &str, outcomes: &[Outcome]) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .insert(addr.to_string(), outcomes.iter().copied().collect());
            self
        }

        fn always(self, addr: &str, outcome: Outcome) -> Self {
            self.fallback.lock().unwrap().insert(addr.to_string(), outcome);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn calls_to(&self, addr: &str) -> usize {
            self.calls().iter().filter(|a| a.as_str() == addr).count()
        }
    }

    #[async_trait]
    impl Forward for Scripted {
        async fn forward(
            &self,
            target: &Url,
            _request: &ForwardRequest,
        ) -> Result<Response<Body>, ForwardError> {
            let addr = crate::http::forward::authority_of(target);
            self.calls.lock().unwrap().push(addr.clone());
            let next = self
                .scripts
                .lock()
                .unwrap()
                .get_mut(&addr)
                .and_then(|q| q.pop_front())
                .or_else(|| self.fallback.lock().unwrap().get(&addr).copied())
                .unwrap_or(Outcome::Status(200));

            match next {
                Outcome::Fail => Err(ForwardError::Connect("connection refused".into())),
                Outcome::Status(code) => Ok(Response::builder()
                    .status(code)
                    .body(Body::from(addr))
                    .unwrap()),
            }
        }
    }

    const A: &str = "127.0.0.1:5001";
    const B: &str = "127.0.0.1:5002";

    fn setup(fake: Scripted) -> (Dispatcher, Arc<Scripted>) {
        let fake = Arc::new(fake);
        let hosts = vec![format!("http://{}", A), format!("http://{}", B)];
        let pool = Arc::new(ConnPool::create(&hosts, fake.clone()).unwrap());
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        (Dispatcher::new(pool, policy), fake)
    }

    fn request() -> ForwardRequest {
        ForwardRequest::new(Method::GET, "/".parse().unwrap(), HeaderMap::new(), Bytes::new())
    }

    async fn body_of(response: Response<Body>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn transient_failures_retry_same_backend() {
        let (dispatcher, fake) = setup(Scripted::default().script(A, &[Outcome::Fail, Outcome::Fail]));
        let initial = dispatcher.pool().select_backend();

        let done = dispatcher.dispatch(initial, &request()).await.unwrap();

        assert_eq!(done.backend, A);
        assert_eq!(done.attempts, RequestAttempts { retry_count: 2, attempt_count: 1 });
        assert_eq!(fake.calls(), vec![A, A, A]);
        assert!(dispatcher.pool().backends()[0].is_alive());
    }

    #[tokio::test]
    async fn exhausted_retries_fail_over() {
        let (dispatcher, fake) = setup(Scripted::default().always(A, Outcome::Fail));
        let initial = dispatcher.pool().select_backend();

        let done = dispatcher.dispatch(initial, &request()).await.unwrap();

        assert_eq!(done.backend, B);
        assert_eq!(done.attempts.attempt_count, 2);
        assert_eq!(done.attempts.retry_count, 0);
        assert_eq!(fake.calls_to(A), 4);
        assert_eq!(fake.calls_to(B), 1);
        assert!(!dispatcher.pool().backends()[0].is_alive());
        assert_eq!(body_of(done.response).await, B);
    }

    #[tokio::test]
    async fn both_backends_failing_yields_exhausted() {
        let (dispatcher, fake) = setup(
            Scripted::default()
                .always(A, Outcome::Fail)
                .always(B, Outcome::Fail),
        );
        let initial = dispatcher.pool().select_backend();

        let err = dispatcher.dispatch(initial, &request()).await.unwrap_err();

        assert!(matches!(err, DispatchError::AttemptsExhausted { .. }));
        assert_eq!(err.attempts().attempt_count, 3);
        assert_eq!(fake.calls(), vec![A, A, A, A, B, B, B, B]);
        assert!(dispatcher.pool().select_backend().is_none());
        assert!(dispatcher.pool().backends().iter().all(|b| b.load() == 0));
    }

    #[tokio::test]
    async fn http_errors_pass_through() {
        let (dispatcher, fake) = setup(Scripted::default().always(A, Outcome::Status(500)));
        let initial = dispatcher.pool().select_backend();

        let done = dispatcher.dispatch(initial, &request()).await.unwrap();

        assert_eq!(done.response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(fake.calls(), vec![A]);
        assert!(dispatcher.pool().backends()[0].is_alive());
    }

    #[tokio::test]
    async fn no_initial_backend_is_unavailable() {
        let (dispatcher, fake) = setup(Scripted::default());

        let err = dispatcher.dispatch(None, &request()).await.unwrap_err();

        assert!(matches!(err, DispatchError::NoBackendAvailable { .. }));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn failover_with_nothing_left_is_unavailable() {
        let (dispatcher, fake) = setup(Scripted::default().always(A, Outcome::Fail));
        dispatcher.pool().backends()[1].set_alive(false);
        let initial = dispatcher.pool().select_backend();

        let err = dispatcher.dispatch(initial, &request()).await.unwrap_err();

        assert!(matches!(err, DispatchError::NoBackendAvailable { .. }));
        assert_eq!(err.attempts().attempt_count, 2);
        assert_eq!(fake.calls_to(B), 0);
    }

    #[tokio::test]
    async fn load_is_held_until_body_is_released() {
        let (dispatcher, _fake) = setup(Scripted::default());
        let a = dispatcher.pool().backends()[0].clone();

        let done = dispatcher.dispatch(Some(a.clone()), &request()).await.unwrap();
        assert_eq!(a.load(), 1);

        // A second request now prefers B.
        assert_eq!(dispatcher.pool().select_backend().unwrap().address(), B);

        assert_eq!(body_of(done.response).await, A);
        assert_eq!(a.load(), 0);
    }

    #[tokio::test]
    async fn marks_the_failing_instance_dead_when_addresses_collide() {
        let fake = Arc::new(Scripted::default().always(A, Outcome::Fail));
        let hosts = vec![format!("http://{}", A), format!("http://{}/mirror", A)];
        let pool = Arc::new(ConnPool::create(&hosts, fake.clone()).unwrap());
        let dispatcher = Dispatcher::new(pool, RetryPolicy::new(0, Duration::ZERO));
        let initial = dispatcher.pool().select_backend();

        let err = dispatcher.dispatch(initial, &request()).await.unwrap_err();

        assert!(matches!(err, DispatchError::AttemptsExhausted { .. }));
        assert_eq!(fake.calls_to(A), 2);
        assert!(dispatcher.pool().backends().iter().all(|b| !b.is_alive()));
    }
}
