//! Ephemeral port allocation.
//!
//! The port is discovered by binding a throwaway listener to port 0 and
//! reading back what the OS assigned; the listener is closed before
//! returning. Another process may claim the port before the engine re-binds
//! it. That window is accepted: the engine then fails with a bind error and
//! nothing retries.

use std::net::{Ipv4Addr, TcpListener};

use crate::error::HarnessError;

/// Return a port that was free at the time of the call.
pub fn ephemeral_port() -> Result<u16, HarnessError> {
    let listener =
        TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).map_err(HarnessError::NoEphemeralPort)?;
    let port = listener
        .local_addr()
        .map_err(HarnessError::NoEphemeralPort)?
        .port();
    Ok(port)
}
