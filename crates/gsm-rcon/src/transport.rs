// ── Transport boundary ──
//
// The session layer only ever sees these traits. A transport is a live,
// authenticated connection; a connector produces one from a parameter
// snapshot.

use std::fmt;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// Where and how to reach a server's remote console.
///
/// Treated as an immutable snapshot: changing any field means building a
/// new value and handing it to the session, which reconnects on next use.
#[derive(Clone)]
pub struct ConnectionParameters {
    pub address: String,
    pub port: u16,
    pub credential: SecretString,
}

impl ConnectionParameters {
    pub fn new(address: impl Into<String>, port: u16, credential: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            port,
            credential: SecretString::from(credential.into()),
        }
    }

    /// `address:port`, suitable for `TcpStream::connect` and log fields.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

impl fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParameters")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("credential", &"[REDACTED]")
            .finish()
    }
}

impl PartialEq for ConnectionParameters {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
            && self.port == other.port
            && self.credential.expose_secret() == other.credential.expose_secret()
    }
}

impl Eq for ConnectionParameters {}

/// An open, authenticated console connection.
#[async_trait]
pub trait Transport: Send {
    /// Send one command and return the server's (possibly multi-line) reply.
    async fn send(&mut self, command: &str) -> Result<String, Error>;

    /// Close the connection. Errors are informational; the handle is
    /// discarded either way.
    async fn close(&mut self) -> Result<(), Error>;
}

/// Opens [`Transport`]s.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, params: &ConnectionParameters) -> Result<Box<dyn Transport>, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_credential() {
        let params = ConnectionParameters::new("10.0.0.5", 27020, "hunter2");
        let rendered = format!("{params:?}");
        assert!(rendered.contains("10.0.0.5"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn equality_includes_credential() {
        let a = ConnectionParameters::new("localhost", 27020, "one");
        let b = ConnectionParameters::new("localhost", 27020, "two");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(a.endpoint(), "localhost:27020");
    }
}
