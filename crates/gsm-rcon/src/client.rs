// Source RCON client
//
// One TCP connection per transport. Authentication happens inside
// `RconTransport::connect`; a transport that exists is authenticated.
// Every network step is bounded by the configured timeout.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, trace};

use crate::error::Error;
use crate::packet::{
    AUTH_FAILED_ID, Packet, SERVERDATA_AUTH, SERVERDATA_AUTH_RESPONSE, SERVERDATA_EXECCOMMAND,
    SERVERDATA_RESPONSE_VALUE,
};
use crate::transport::{ConnectionParameters, Connector, Transport};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Produces authenticated [`RconTransport`]s.
#[derive(Debug, Clone)]
pub struct RconConnector {
    timeout: Duration,
}

impl RconConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for RconConnector {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl Connector for RconConnector {
    async fn connect(&self, params: &ConnectionParameters) -> Result<Box<dyn Transport>, Error> {
        let transport = RconTransport::connect(params, self.timeout).await?;
        Ok(Box::new(transport))
    }
}

/// A live, authenticated RCON connection.
pub struct RconTransport {
    stream: TcpStream,
    endpoint: String,
    timeout: Duration,
    next_id: i32,
}

impl RconTransport {
    pub async fn connect(params: &ConnectionParameters, timeout: Duration) -> Result<Self, Error> {
        let endpoint = params.endpoint();
        let stream = with_timeout("connect", timeout, async {
            TcpStream::connect(&endpoint)
                .await
                .map_err(|source| Error::Connect {
                    address: endpoint.clone(),
                    source,
                })
        })
        .await?;
        stream.set_nodelay(true)?;
        debug!(endpoint = %endpoint, "rcon tcp connection established");

        let mut transport = Self {
            stream,
            endpoint,
            timeout,
            next_id: 1,
        };
        transport.authenticate(params.credential.expose_secret()).await?;
        Ok(transport)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn authenticate(&mut self, password: &str) -> Result<(), Error> {
        let id = self.allocate_id();
        let timeout = self.timeout;
        let endpoint = self.endpoint.clone();
        let stream = &mut self.stream;

        with_timeout("authentication", timeout, async move {
            Packet::new(id, SERVERDATA_AUTH, password)
                .write_to(stream)
                .await?;

            // Servers usually send an empty RESPONSE_VALUE before the auth
            // response; skip anything that isn't the auth response itself.
            loop {
                let reply = Packet::read_from(stream).await?;
                if reply.kind != SERVERDATA_AUTH_RESPONSE {
                    trace!(id = reply.id, kind = reply.kind, "skipping pre-auth packet");
                    continue;
                }
                if reply.id == AUTH_FAILED_ID {
                    return Err(Error::Authentication { address: endpoint });
                }
                if reply.id == id {
                    debug!(endpoint = %endpoint, "rcon authenticated");
                    return Ok(());
                }
                return Err(Error::Malformed(format!(
                    "auth response id {} does not match request id {id}",
                    reply.id
                )));
            }
        })
        .await
    }

    /// Packet ids are per connection; -1 is reserved for auth failure and
    /// 0 is avoided because some servers use it for unsolicited output.
    fn allocate_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id = if id == i32::MAX { 1 } else { id + 1 };
        id
    }
}

#[async_trait]
impl Transport for RconTransport {
    async fn send(&mut self, command: &str) -> Result<String, Error> {
        if command.len() > Packet::max_body_len() {
            return Err(Error::CommandTooLong {
                len: command.len(),
                limit: Packet::max_body_len(),
            });
        }

        let id = self.allocate_id();
        let terminator = self.allocate_id();
        let timeout = self.timeout;
        let stream = &mut self.stream;

        with_timeout("command", timeout, async move {
            Packet::new(id, SERVERDATA_EXECCOMMAND, command)
                .write_to(stream)
                .await?;
            // Long replies arrive as several packets sharing the request id.
            // Servers answer an empty RESPONSE_VALUE in order, so its echo
            // marks the end of the reply.
            Packet::new(terminator, SERVERDATA_RESPONSE_VALUE, "")
                .write_to(stream)
                .await?;

            let mut body = String::new();
            let mut fragments = 0usize;
            loop {
                let reply = Packet::read_from(stream).await?;
                if reply.id == terminator {
                    trace!(id, fragments, len = body.len(), "rcon reply complete");
                    return Ok(body);
                }
                if reply.id == id && reply.kind == SERVERDATA_RESPONSE_VALUE {
                    fragments += 1;
                    body.push_str(&reply.body);
                    continue;
                }
                trace!(
                    expected = id,
                    id = reply.id,
                    kind = reply.kind,
                    "discarding unrelated packet"
                );
            }
        })
        .await
    }

    async fn close(&mut self) -> Result<(), Error> {
        debug!(endpoint = %self.endpoint, "closing rcon connection");
        self.stream.shutdown().await?;
        Ok(())
    }
}

async fn with_timeout<T, F>(operation: &'static str, timeout: Duration, fut: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| Error::Timeout { operation, timeout })?
}
