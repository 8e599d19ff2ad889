//! TCP protocol server.
//!
//! The server listens on a TCP port and serves each accepted connection on
//! its own task. Connections share only the object store.
//!
//! # Connection Lifecycle
//!
//! 1. Manager connects
//! 2. Manager sends a request; the agent answers with exactly one response
//! 3. Step 2 repeats, strictly in order, until either side closes
//!
//! A connection ends when the peer closes it, when a read or write exceeds
//! its timeout, or on the first framing or codec error. Store failures are
//! reported in the response status and never end a connection.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use snmp_core::mib::SharedMib;
use snmp_core::protocol::{FrameReader, Message, ProtocolError, write_frame};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::AgentConfig;
use crate::dispatch::Dispatcher;
use crate::error::{AgentError, AgentResult};

/// Pause after a failed `accept` before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// TCP protocol server.
///
/// # Invariants
///
/// - [INV-SRV-001] Concurrent connections limited by semaphore.
/// - [INV-SRV-002] One request is fully answered before the next is read.
pub struct AgentServer {
    config: AgentConfig,
    listener: TcpListener,
    connection_sem: Arc<Semaphore>,
    dispatcher: Arc<Dispatcher>,
}

impl AgentServer {
    /// Bind the listener and prepare to serve `mib`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Config`] for an invalid config and
    /// [`AgentError::Bind`] if the address cannot be bound.
    pub async fn bind(config: AgentConfig, mib: SharedMib) -> AgentResult<Self> {
        config.validate()?;

        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|source| AgentError::Bind {
                addr: config.bind_addr,
                source,
            })?;

        info!(
            addr = %listener.local_addr().unwrap_or(config.bind_addr),
            max_connections = config.max_connections,
            objects = mib.len(),
            "Agent bound"
        );

        let dispatcher = Dispatcher::new(mib).with_max_message_size(config.max_message_size);

        Ok(Self {
            connection_sem: Arc::new(Semaphore::new(config.max_connections)),
            dispatcher: Arc::new(dispatcher),
            config,
            listener,
        })
    }

    /// The address actually bound, useful after binding port 0.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from the socket.
    pub fn local_addr(&self) -> AgentResult<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|err| AgentError::Protocol(ProtocolError::Io(err)))
    }

    /// Returns the server configuration.
    #[must_use]
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// The store being served.
    #[must_use]
    pub fn mib(&self) -> &SharedMib {
        self.dispatcher.mib()
    }

    /// Accept the next connection once a connection slot is free.
    ///
    /// The permit must be held for as long as the connection is served.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from `accept`.
    pub async fn accept(&self) -> AgentResult<(TcpStream, SocketAddr, ConnectionPermit)> {
        let permit = Arc::clone(&self.connection_sem)
            .acquire_owned()
            .await
            .map_err(|_| {
                ProtocolError::Io(std::io::Error::other("connection semaphore closed"))
            })?;

        let (stream, peer) = self.listener.accept().await.map_err(ProtocolError::Io)?;
        debug!(peer = %peer, "Accepted connection");

        Ok((stream, peer, ConnectionPermit { _permit: permit }))
    }

    /// Accept and serve connections until the task is cancelled.
    ///
    /// `accept` failures, such as running out of file descriptors, are
    /// logged and retried after a short pause.
    pub async fn serve(self) {
        loop {
            let (stream, peer, permit) = match self.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!(error = %err, "Accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                },
            };

            if let Err(err) = stream.set_nodelay(true) {
                debug!(peer = %peer, error = %err, "failed to set TCP_NODELAY");
            }

            let dispatcher = Arc::clone(&self.dispatcher);
            let config = self.config.clone();
            tokio::spawn(
                async move {
                    serve_connection(stream, &dispatcher, &config).await;
                    drop(permit);
                }
                .instrument(info_span!("connection", peer = %peer)),
            );
        }
    }
}

impl std::fmt::Debug for AgentServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentServer")
            .field("config", &self.config)
            .field("available_slots", &self.connection_sem.available_permits())
            .finish_non_exhaustive()
    }
}

/// Permit for an active connection.
///
/// Holds a semaphore permit that is released when dropped,
/// allowing another connection to be accepted.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: OwnedSemaphorePermit,
}

/// Serve one connection until it closes, logging why it ended.
pub async fn serve_connection<S>(stream: S, dispatcher: &Dispatcher, config: &AgentConfig)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match exchange(stream, dispatcher, config).await {
        Ok(served) => debug!(requests = served, "Connection closed by peer"),
        Err(AgentError::Protocol(ProtocolError::Timeout { duration_ms })) => {
            debug!(duration_ms, "Connection timed out");
        },
        Err(err) if err.is_disconnect() => debug!("Connection reset by peer"),
        Err(err) => warn!(error = %err, "Closing connection"),
    }
}

/// Request/response loop. Returns the number of requests answered once the
/// peer closes its side.
async fn exchange<S>(stream: S, dispatcher: &Dispatcher, config: &AgentConfig) -> AgentResult<u64>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut frames = FrameReader::new(reader).with_max_frame_size(config.max_message_size);
    let mut served = 0u64;

    loop {
        let frame = match frames.read_frame_timeout(config.read_timeout()).await {
            Ok(frame) => frame,
            Err(ProtocolError::ConnectionClosed) => return Ok(served),
            Err(err) => return Err(err.into()),
        };

        let request = Message::decode(&frame)?;
        let response = dispatcher.handle(&request)?;
        write_frame(&mut writer, &response.encode()?, config.write_timeout()).await?;
        served += 1;
    }
}
