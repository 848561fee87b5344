//! Engine lifecycle: ignite, register routes, await initialisation, stop.
//!
//! A [`Service`] collects routes and security settings while idle, then
//! [`Service::await_initialization`] binds the configured address, starts an
//! Axum server on a dedicated thread with its own tokio runtime, and blocks
//! until that server is accepting connections.
//!
//! [`Service::stop`] only *signals* shutdown and returns immediately. The
//! server thread releases the socket once in-flight requests have drained,
//! and [`Service::port`] reports [`EngineError::NotRunning`] from that point
//! on. Callers that need to know the socket is free poll `port()`.

use std::net::SocketAddr;
use std::sync::{mpsc, Arc, RwLock};
use std::thread::JoinHandle;

use axum::{handler::Handler, routing::MethodRouter, Router};
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;

use crate::{
    config::EngineConfig,
    error::EngineError,
    middleware::auth::{require_token, TokenValidator},
};

struct Running {
    shutdown: oneshot::Sender<()>,
    /// Detached on stop; the thread clears `bound` itself when done.
    _thread: JoinHandle<()>,
}

/// One engine instance.
pub struct Service {
    addr: SocketAddr,
    router: Router,
    security: Option<Arc<TokenValidator>>,
    bound: Arc<RwLock<Option<SocketAddr>>>,
    running: Option<Running>,
}

impl Service {
    /// Create an idle engine that will bind `config`'s host and port.
    pub fn ignite(config: &EngineConfig) -> Result<Self, EngineError> {
        Ok(Self {
            addr: config.socket_addr()?,
            router: Router::new(),
            security: None,
            bound: Arc::new(RwLock::new(None)),
            running: None,
        })
    }

    /// Register `method_router` at `path`. Panics on a duplicate path, like
    /// [`Router::route`].
    pub fn route(&mut self, path: &str, method_router: MethodRouter) -> &mut Self {
        self.router = std::mem::take(&mut self.router).route(path, method_router);
        self
    }

    /// Merge a fully-built router (e.g. one with its own state applied).
    pub fn merge(&mut self, router: Router) -> &mut Self {
        self.router = std::mem::take(&mut self.router).merge(router);
        self
    }

    /// Handler for requests that match no route.
    pub fn fallback<H, T>(&mut self, handler: H) -> &mut Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.router = std::mem::take(&mut self.router).fallback(handler);
        self
    }

    /// Require a valid bearer token on every non-open route.
    pub fn register_security(&mut self, validator: TokenValidator) -> &mut Self {
        self.security = Some(Arc::new(validator));
        self
    }

    /// Take the registered routes and wrap them in the engine's layers.
    pub(crate) fn assemble(&mut self) -> Router {
        let mut app = std::mem::take(&mut self.router);
        if let Some(validator) = &self.security {
            let validator = Arc::clone(validator);
            app = app.layer(axum::middleware::from_fn(move |req, next| {
                require_token(Arc::clone(&validator), req, next)
            }));
        }
        app.layer(TraceLayer::new_for_http())
    }

    /// Bind, start serving, and block until the server accepts connections.
    ///
    /// Returns the bound port. Calling this on a running service returns the
    /// current port without side effects. A bind failure is returned as
    /// [`EngineError::Bind`] and never retried.
    pub fn await_initialization(&mut self) -> Result<u16, EngineError> {
        if self.running.is_some() {
            return self.port();
        }

        let listener = std::net::TcpListener::bind(self.addr).map_err(|source| {
            EngineError::Bind {
                addr: self.addr,
                source,
            }
        })?;
        listener
            .set_nonblocking(true)
            .map_err(|e| EngineError::Startup(format!("set_nonblocking: {e}")))?;
        let local = listener
            .local_addr()
            .map_err(|e| EngineError::Startup(format!("local_addr: {e}")))?;

        let app = self.assemble();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let bound = Arc::clone(&self.bound);

        let thread = std::thread::Builder::new()
            .name(format!("grove-engine-{}", local.port()))
            .spawn(move || serve(listener, app, local, bound, ready_tx, shutdown_rx))
            .map_err(|e| EngineError::Startup(format!("spawn server thread: {e}")))?;

        wait_ready(&ready_rx)?;

        self.running = Some(Running {
            shutdown: shutdown_tx,
            _thread: thread,
        });
        tracing::info!(port = local.port(), "service initialised");
        Ok(local.port())
    }

    /// The port the server currently holds, or [`EngineError::NotRunning`].
    pub fn port(&self) -> Result<u16, EngineError> {
        let bound = *self.bound.read().unwrap_or_else(|p| p.into_inner());
        bound.map(|addr| addr.port()).ok_or(EngineError::NotRunning)
    }

    pub fn is_running(&self) -> bool {
        self.port().is_ok()
    }

    /// Signal shutdown. Returns immediately; see the module docs.
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            // The receiver is gone only if the server already exited.
            let _ = running.shutdown.send(());
            tracing::debug!(addr = %self.addr, "service shutdown signalled");
        }
    }
}

impl Drop for Service {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Block until the server thread reports readiness or dies trying.
fn wait_ready(ready: &mpsc::Receiver<Result<(), String>>) -> Result<(), EngineError> {
    match ready.recv() {
        Ok(Ok(())) => Ok(()),
        Ok(Err(reason)) => Err(EngineError::Startup(reason)),
        Err(_) => Err(EngineError::Startup(
            "server thread exited before becoming ready".into(),
        )),
    }
}

/// Body of the server thread.
fn serve(
    listener: std::net::TcpListener,
    app: Router,
    local: SocketAddr,
    bound: Arc<RwLock<Option<SocketAddr>>>,
    ready: mpsc::Sender<Result<(), String>>,
    shutdown: oneshot::Receiver<()>,
) {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("grove-engine-worker")
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            let _ = ready.send(Err(format!("build runtime: {e}")));
            return;
        }
    };

    let bound_task = Arc::clone(&bound);
    let result = runtime.block_on(async move {
        let listener = match tokio::net::TcpListener::from_std(listener) {
            Ok(l) => l,
            Err(e) => {
                let _ = ready.send(Err(format!("register listener: {e}")));
                return Ok(());
            }
        };
        *bound_task.write().unwrap_or_else(|p| p.into_inner()) = Some(local);
        let _ = ready.send(Ok(()));

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.await;
            })
            .await
    });
    if let Err(e) = result {
        tracing::error!(port = local.port(), error = %e, "service terminated with error");
    }

    // Dropping the runtime closes any connection tasks still holding the socket.
    drop(runtime);
    *bound.write().unwrap_or_else(|p| p.into_inner()) = None;
    tracing::info!(port = local.port(), "service stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SERVER_PORT;
    use axum::routing::get;
    use std::time::{Duration, Instant};

    fn config_on(port: u16) -> EngineConfig {
        let mut c = EngineConfig::default();
        c.set(SERVER_PORT, port);
        c
    }

    fn wait_until_stopped(service: &Service) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while service.is_running() {
            assert!(Instant::now() < deadline, "service did not stop");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn port_is_not_running_before_start() {
        let service = Service::ignite(&config_on(0)).unwrap();
        assert!(matches!(service.port(), Err(EngineError::NotRunning)));
    }

    #[test]
    fn serves_after_initialisation_and_releases_on_stop() {
        let mut service = Service::ignite(&config_on(0)).unwrap();
        service.route("/ping", get(|| async { "pong" }));
        let port = service.await_initialization().unwrap();
        assert_eq!(service.port().unwrap(), port);

        let body = reqwest::blocking::get(format!("http://127.0.0.1:{port}/ping"))
            .unwrap()
            .text()
            .unwrap();
        assert_eq!(body, "pong");

        service.stop();
        wait_until_stopped(&service);
        std::net::TcpListener::bind(("127.0.0.1", port)).expect("port released");
    }

    #[test]
    fn bind_conflict_is_reported() {
        let holder = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = holder.local_addr().unwrap().port();
        let mut service = Service::ignite(&config_on(port)).unwrap();
        let err = service.await_initialization().unwrap_err();
        assert!(matches!(err, EngineError::Bind { .. }));
        assert!(!service.is_running());
    }

    #[test]
    fn thread_reporting_failure_is_a_startup_error() {
        let (tx, rx) = mpsc::channel();
        tx.send(Err("build runtime: out of threads".to_string())).unwrap();
        let err = wait_ready(&rx).unwrap_err();
        assert!(matches!(err, EngineError::Startup(ref r) if r == "build runtime: out of threads"));
    }

    #[test]
    fn thread_exiting_silently_is_a_startup_error() {
        let (tx, rx) = mpsc::channel::<Result<(), String>>();
        drop(tx);
        assert!(matches!(wait_ready(&rx), Err(EngineError::Startup(_))));
    }

    #[test]
    fn stop_is_idempotent() {
        let mut service = Service::ignite(&config_on(0)).unwrap();
        service.await_initialization().unwrap();
        service.stop();
        service.stop();
        wait_until_stopped(&service);
    }
}
