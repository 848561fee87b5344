//! Ephemeral engine lifecycle for tests.
//!
//! A [`ServiceContext`] owns one engine run: it allocates a free port at
//! construction, starts the engine with the standard wiring plus the
//! caller's controllers, and stops it again, blocking until the port has
//! actually been released so the next test cannot race a half-closed socket.
//!
//! ```rust,ignore
//! use axum::routing::get;
//! use grove_testkit::ServiceContext;
//!
//! let ctx = ServiceContext::with_service_controllers(|service| {
//!     service.route("/hello", get(|| async { "hi" }));
//! })?;
//! ctx.run(|ctx| {
//!     let uri = ctx.base_uri().unwrap();
//!     // drive requests against `uri`
//! })?;
//! ```

use std::time::{Duration, Instant};

use grove_engine::{config::SERVER_PORT, configure_service, EngineConfig, Service};

use crate::{error::HarnessError, port::ephemeral_port};

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(10);

type Controllers = Box<dyn FnOnce(&mut Service, &EngineConfig) + Send>;

/// Where a [`ServiceContext`] is in its single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    Running,
    Stopped,
}

/// Starts and stops one in-process engine bound to an ephemeral port.
pub struct ServiceContext {
    controllers: Option<Controllers>,
    config: EngineConfig,
    /// Snapshot of `config` taken by `start`; what the engine was given.
    launched: Option<EngineConfig>,
    service: Option<Service>,
    state: Lifecycle,
    shutdown_timeout: Duration,
}

impl ServiceContext {
    /// Create a context whose controllers receive the engine and its config.
    pub fn with_controllers<F>(controllers: F) -> Result<Self, HarnessError>
    where
        F: FnOnce(&mut Service, &EngineConfig) + Send + 'static,
    {
        let mut config = EngineConfig::from_env();
        config.set(SERVER_PORT, ephemeral_port()?);
        Ok(Self {
            controllers: Some(Box::new(controllers)),
            config,
            launched: None,
            service: None,
            state: Lifecycle::Created,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        })
    }

    /// Create a context whose controllers only need the engine.
    pub fn with_service_controllers<F>(controllers: F) -> Result<Self, HarnessError>
    where
        F: FnOnce(&mut Service) + Send + 'static,
    {
        Self::with_controllers(move |service, _config| controllers(service))
    }

    /// Override the port. Ignored once the context has been started.
    pub fn with_port(mut self, port: u16) -> Self {
        if self.state != Lifecycle::Created {
            tracing::warn!(port, state = ?self.state, "port change after start ignored");
            return self;
        }
        self.config.set(SERVER_PORT, port);
        self
    }

    /// How long [`stop`](Self::stop) waits for the port to be released.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// The engine's port. Fixed once [`start`](Self::start) has been called.
    pub fn port(&self) -> Result<u16, HarnessError> {
        Ok(self.config().port()?)
    }

    /// The address test clients should target, e.g. `http://127.0.0.1:49152`.
    pub fn base_uri(&self) -> Result<String, HarnessError> {
        Ok(self.config().uri()?)
    }

    /// The configuration the engine was started with, or the pending one
    /// before [`start`](Self::start).
    pub fn config(&self) -> &EngineConfig {
        self.launched.as_ref().unwrap_or(&self.config)
    }

    /// Mutable access for per-test overrides (secrets, host). Changes made
    /// after [`start`](Self::start) are ignored and logged.
    pub fn config_mut(&mut self) -> &mut EngineConfig {
        if self.state != Lifecycle::Created {
            tracing::warn!(state = ?self.state, "config change after start ignored");
        }
        &mut self.config
    }

    pub fn state(&self) -> Lifecycle {
        self.state
    }

    /// The running engine, if any.
    pub fn service(&self) -> Option<&Service> {
        self.service.as_ref()
    }

    /// Start the engine and block until it accepts requests.
    ///
    /// A context runs once; a second call fails with
    /// [`HarnessError::AlreadyStarted`], including after a failed start.
    pub fn start(&mut self) -> Result<(), HarnessError> {
        if self.state != Lifecycle::Created {
            return Err(HarnessError::AlreadyStarted);
        }
        // Controllers are consumed either way, so a failed start is final.
        self.state = Lifecycle::Stopped;
        let config: &EngineConfig = self.launched.insert(self.config.clone());

        let mut service = Service::ignite(config)?;
        configure_service(&mut service, config)?;
        if let Some(controllers) = self.controllers.take() {
            controllers(&mut service, config);
        }
        let port = service.await_initialization()?;

        self.service = Some(service);
        self.state = Lifecycle::Running;
        tracing::info!(port, "service context started");
        Ok(())
    }

    /// Stop the engine and block until it no longer holds its port.
    ///
    /// A no-op when nothing is running, so calling it twice is safe. Fails
    /// with [`HarnessError::ShutdownTimeout`] if the port is still held after
    /// the configured timeout.
    pub fn stop(&mut self) -> Result<(), HarnessError> {
        let Some(mut service) = self.service.take() else {
            return Ok(());
        };
        self.state = Lifecycle::Stopped;
        service.stop();

        let started = Instant::now();
        while let Ok(port) = service.port() {
            let waited = started.elapsed();
            if waited >= self.shutdown_timeout {
                return Err(HarnessError::ShutdownTimeout { port, waited });
            }
            std::thread::sleep(SHUTDOWN_POLL_INTERVAL);
        }
        tracing::info!(waited = ?started.elapsed(), "service context stopped");
        Ok(())
    }

    /// Run `f` against a started context, stopping it on every exit path.
    ///
    /// If `f` panics, the engine is stopped while the panic unwinds.
    pub fn run<R>(mut self, f: impl FnOnce(&ServiceContext) -> R) -> Result<R, HarnessError> {
        self.start()?;
        let out = f(&self);
        self.stop()?;
        Ok(out)
    }
}

impl Drop for ServiceContext {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::error!(error = %e, "service context failed to stop cleanly");
        }
    }
}
