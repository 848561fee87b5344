//! Engine configuration, populated from environment variables.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use crate::error::EngineError;

/// Host the engine binds to.
pub const SERVER_HOST: &str = "server.host";
/// TCP port the engine binds to.
pub const SERVER_PORT: &str = "server.port";
/// Secret used to sign and verify bearer tokens. The tokens themselves are
/// HMAC-signed strings, not JWTs; see [`crate::middleware::auth`].
pub const JWT_SECRET: &str = "JWT.secret";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 4567;

/// Runtime configuration for an engine instance.
///
/// A mutable key/value map. [`EngineConfig::from_env`] seeds it from the
/// environment; callers may override any property afterwards with
/// [`EngineConfig::set`].
///
/// | Variable | Property | Default |
/// |----------|----------|---------|
/// | `GROVE_HOST` | `server.host` | `127.0.0.1` |
/// | `GROVE_PORT` | `server.port` | `4567` |
/// | `GROVE_JWT_SECRET` | `JWT.secret` | random 32-byte hex string |
#[derive(Debug, Clone)]
pub struct EngineConfig {
    properties: BTreeMap<String, String>,
}

impl EngineConfig {
    /// Populate config from environment variables, applying defaults where absent.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        for (var, key) in [
            ("GROVE_HOST", SERVER_HOST),
            ("GROVE_PORT", SERVER_PORT),
            ("GROVE_JWT_SECRET", JWT_SECRET),
        ] {
            if let Ok(value) = std::env::var(var) {
                config.set(key, value);
            }
        }
        config
    }

    /// Set a property, replacing any previous value.
    pub fn set(&mut self, key: &str, value: impl ToString) -> &mut Self {
        self.properties.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Parse a property into `T`.
    pub fn get_parsed<T>(&self, key: &str) -> Result<T, EngineError>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.get(key).ok_or_else(|| EngineError::Config {
            key: key.to_string(),
            reason: "missing".into(),
        })?;
        raw.parse().map_err(|e: T::Err| EngineError::Config {
            key: key.to_string(),
            reason: format!("{raw:?}: {e}"),
        })
    }

    pub fn host(&self) -> &str {
        self.get(SERVER_HOST).unwrap_or(DEFAULT_HOST)
    }

    pub fn port(&self) -> Result<u16, EngineError> {
        self.get_parsed(SERVER_PORT)
    }

    pub fn jwt_secret(&self) -> Result<&str, EngineError> {
        self.get(JWT_SECRET).ok_or_else(|| EngineError::Config {
            key: JWT_SECRET.to_string(),
            reason: "missing".into(),
        })
    }

    /// Base URL clients should target, e.g. `http://127.0.0.1:4567`.
    pub fn uri(&self) -> Result<String, EngineError> {
        Ok(format!("http://{}:{}", self.host(), self.port()?))
    }

    /// Resolve `host:port` to the first matching socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, EngineError> {
        let port = self.port()?;
        let host = self.host();
        (host, port)
            .to_socket_addrs()
            .map_err(|e| EngineError::Config {
                key: SERVER_HOST.to_string(),
                reason: format!("{host:?}: {e}"),
            })?
            .next()
            .ok_or_else(|| EngineError::Config {
                key: SERVER_HOST.to_string(),
                reason: format!("{host:?} resolved to no addresses"),
            })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut properties = BTreeMap::new();
        properties.insert(SERVER_HOST.to_string(), DEFAULT_HOST.to_string());
        properties.insert(SERVER_PORT.to_string(), DEFAULT_PORT.to_string());
        properties.insert(
            JWT_SECRET.to_string(),
            hex::encode(rand::random::<[u8; 32]>()),
        );
        Self { properties }
    }
}
