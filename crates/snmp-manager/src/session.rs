//! Request/response session with one agent.
//!
//! A [`Session`] owns one byte stream. Each call sends one request with a
//! fresh correlation id, waits for exactly one reply, and checks that the
//! reply echoes the id. Calls on one session are strictly sequential.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use snmp_core::protocol::{ErrorStatus, FrameReader, Message, Oid, Pdu, VarBind, write_frame};
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

use crate::error::{SessionError, SessionResult};

/// Default connect, read and write timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Monotonic source of correlation ids.
///
/// Ids wrap at `u32::MAX`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIds {
    next: u32,
}

impl RequestIds {
    /// Start counting at `first`.
    #[must_use]
    pub const fn starting_at(first: u32) -> Self {
        Self { next: first }
    }

    /// Take the next id.
    pub const fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        id
    }
}

impl Default for RequestIds {
    /// Start somewhere in `1..=10000`, varying between runs.
    fn default() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.subsec_nanos());
        Self::starting_at(nanos % 10_000 + 1)
    }
}

/// A decoded reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Correlation id (equal to the request's).
    pub request_id: u32,
    /// Response-level status.
    pub status: ErrorStatus,
    /// Returned bindings; empty unless `status` is success.
    pub bindings: Vec<VarBind>,
    /// Size of the reply on the wire in bytes.
    pub wire_size: usize,
}

impl Response {
    /// Returns `true` if the agent reported success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// A connection to one agent.
pub struct Session<S> {
    frames: FrameReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    timeout: Duration,
    ids: RequestIds,
}

impl Session<TcpStream> {
    /// Connect to an agent over TCP.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Connect`] if the address cannot be resolved,
    /// the agent refuses, or `timeout` elapses first.
    pub async fn connect(
        target: impl ToSocketAddrs + fmt::Display,
        timeout: Duration,
    ) -> SessionResult<Self> {
        let connect_error = |source| SessionError::Connect {
            target: target.to_string(),
            source,
        };
        let stream = tokio::time::timeout(timeout, TcpStream::connect(&target))
            .await
            .map_err(|_| {
                connect_error(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "connect timed out",
                ))
            })?
            .map_err(connect_error)?;
        if let Err(err) = stream.set_nodelay(true) {
            debug!(error = %err, "failed to set TCP_NODELAY");
        }
        debug!(target = %target, "Connected to agent");
        Ok(Self::new(stream, timeout))
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already connected stream.
    pub fn new(stream: S, timeout: Duration) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            frames: FrameReader::new(reader),
            writer,
            timeout,
            ids: RequestIds::default(),
        }
    }

    /// Use `ids` for correlation ids instead of the default counter.
    #[must_use]
    pub fn with_request_ids(mut self, ids: RequestIds) -> Self {
        self.ids = ids;
        self
    }

    /// Read the given objects.
    ///
    /// # Errors
    ///
    /// See [`SessionError`]. A non-success status is not an error.
    pub async fn get(&mut self, oids: &[Oid]) -> SessionResult<Response> {
        self.call(Pdu::GetRequest {
            oids: oids.to_vec(),
        })
        .await
    }

    /// Write the given bindings.
    ///
    /// # Errors
    ///
    /// See [`SessionError`]. A non-success status is not an error.
    pub async fn set(&mut self, bindings: &[VarBind]) -> SessionResult<Response> {
        self.call(Pdu::SetRequest {
            bindings: bindings.to_vec(),
        })
        .await
    }

    /// Read up to `max_repetitions` objects after `start`.
    ///
    /// # Errors
    ///
    /// See [`SessionError`].
    pub async fn bulk(&mut self, start: &Oid, max_repetitions: u16) -> SessionResult<Response> {
        self.call(Pdu::GetBulkRequest {
            oid: start.clone(),
            max_repetitions,
        })
        .await
    }

    async fn call(&mut self, pdu: Pdu) -> SessionResult<Response> {
        let request = Message::new(self.ids.next_id(), pdu);
        let expected = request.request_id;
        let op = request.pdu.pdu_type();

        write_frame(&mut self.writer, &request.encode()?, self.timeout).await?;
        let frame = self.frames.read_frame_timeout(self.timeout).await?;
        let reply = Message::decode(&frame)?;
        debug!(request_id = expected, ?op, wire_size = frame.len(), "Received reply");

        if reply.request_id != expected {
            return Err(SessionError::Correlation {
                expected,
                actual: reply.request_id,
            });
        }
        match reply.pdu {
            Pdu::Response { status, bindings } => Ok(Response {
                request_id: expected,
                status,
                bindings,
                wire_size: frame.len(),
            }),
            other => Err(SessionError::UnexpectedMessage {
                op: other.pdu_type(),
            }),
        }
    }
}

impl<S> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("timeout", &self.timeout)
            .field("ids", &self.ids)
            .finish_non_exhaustive()
    }
}
