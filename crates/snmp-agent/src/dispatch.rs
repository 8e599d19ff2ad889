//! Request dispatch.
//!
//! [`Dispatcher`] turns one decoded request into one response. It owns no
//! connection state, so a single instance is shared by every connection
//! task.
//!
//! # Status Policy
//!
//! A response carries one status for the whole request. When any identifier
//! fails, the first failure in request order sets the status and the response
//! carries no bindings.
//!
//! - `GetRequest`: each identifier is read in order against one consistent
//!   view of the store; duplicates are answered once per occurrence
//! - `SetRequest`: every binding is checked before any is written, so a
//!   failed request changes nothing
//! - `GetBulkRequest`: never fails; returns up to `min(max_repetitions, 255)`
//!   successors, stopping early rather than exceeding the message size limit
//!
//! A `GetRequest` or `SetRequest` whose response would exceed the message
//! size limit is answered with `BadValue` and no bindings. An oversized
//! `SetRequest` is refused before anything is written.

use std::time::Instant;

use snmp_core::mib::{MibError, SharedMib};
use snmp_core::protocol::{
    ErrorStatus, MAX_BINDINGS, MAX_MESSAGE_SIZE, Message, Oid, Pdu, Value, VarBind, binding_size,
    response_size,
};
use tracing::{debug, trace};

use crate::error::{AgentError, AgentResult};

/// `sysUpTime.0`, refreshed before every read.
const SYS_UPTIME: [u8; 9] = [1, 3, 6, 1, 2, 1, 1, 3, 0];

/// Milliseconds per tick (ticks are hundredths of a second).
const MILLIS_PER_TICK: u128 = 10;

/// Maps requests onto the shared store.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    mib: SharedMib,
    started: Instant,
    uptime_oid: Option<Oid>,
    max_message_size: usize,
}

impl Dispatcher {
    /// Create a dispatcher whose uptime clock starts now.
    #[must_use]
    pub fn new(mib: SharedMib) -> Self {
        Self {
            mib,
            started: Instant::now(),
            uptime_oid: Oid::from_bytes(&SYS_UPTIME).ok(),
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }

    /// Cap every response at `size` bytes.
    #[must_use]
    pub const fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Start the uptime clock at `started` instead of now.
    #[must_use]
    pub const fn with_start_time(mut self, started: Instant) -> Self {
        self.started = started;
        self
    }

    /// The store this dispatcher serves.
    #[must_use]
    pub const fn mib(&self) -> &SharedMib {
        &self.mib
    }

    /// Produce the response for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::UnexpectedResponse`] if `request` is itself a
    /// response. Store failures are not errors; they become the response
    /// status.
    pub fn handle(&self, request: &Message) -> AgentResult<Message> {
        let request_id = request.request_id;
        let (status, bindings) = match &request.pdu {
            Pdu::GetRequest { oids } => {
                debug!(request_id, count = oids.len(), "GetRequest");
                self.refresh_uptime();
                self.get(oids)
            },
            Pdu::SetRequest { bindings } => {
                debug!(request_id, count = bindings.len(), "SetRequest");
                self.set(bindings)
            },
            Pdu::GetBulkRequest {
                oid,
                max_repetitions,
            } => {
                debug!(request_id, start = %oid, max_repetitions, "GetBulkRequest");
                self.refresh_uptime();
                (ErrorStatus::Success, self.bulk(oid, *max_repetitions))
            },
            Pdu::Response { .. } => return Err(AgentError::UnexpectedResponse { request_id }),
        };

        debug!(request_id, %status, bindings = bindings.len(), "Response");
        Ok(Message::new(request_id, Pdu::Response { status, bindings }))
    }

    fn get(&self, oids: &[Oid]) -> (ErrorStatus, Vec<VarBind>) {
        match self.mib.get_many(oids) {
            Ok(bindings) if self.fits(&bindings) => (ErrorStatus::Success, bindings),
            Ok(_) => Self::too_big(),
            Err(err) => Self::failed(&err),
        }
    }

    fn set(&self, bindings: &[VarBind]) -> (ErrorStatus, Vec<VarBind>) {
        // The echo repeats the request bindings, so its size is known up front.
        if !self.fits(bindings) {
            return Self::too_big();
        }
        match self.mib.set_all(bindings) {
            Ok(applied) => (ErrorStatus::Success, applied),
            Err(err) => Self::failed(&err),
        }
    }

    fn bulk(&self, start: &Oid, max_repetitions: u16) -> Vec<VarBind> {
        let cap = usize::from(max_repetitions).min(MAX_BINDINGS);
        let mut size = response_size(&[]);
        let mut bindings = self.mib.get_next(start, cap);
        let fits = bindings
            .iter()
            .take_while(|binding| {
                size += binding_size(binding);
                size <= self.max_message_size
            })
            .count();
        if fits < bindings.len() {
            debug!(
                found = bindings.len(),
                kept = fits,
                "bulk response truncated to fit message size"
            );
            bindings.truncate(fits);
        }
        bindings
    }

    fn fits(&self, bindings: &[VarBind]) -> bool {
        response_size(bindings) <= self.max_message_size
    }

    fn too_big() -> (ErrorStatus, Vec<VarBind>) {
        debug!("response would exceed message size limit");
        (ErrorStatus::BadValue, Vec::new())
    }

    fn failed(err: &MibError) -> (ErrorStatus, Vec<VarBind>) {
        debug!(error = %err, "request failed");
        (err.status(), Vec::new())
    }

    fn refresh_uptime(&self) {
        let Some(uptime_oid) = &self.uptime_oid else {
            return;
        };
        let hundredths = self.started.elapsed().as_millis() / MILLIS_PER_TICK;
        // Wraps after ~497 days, like any 32-bit ticks value.
        #[allow(clippy::cast_possible_truncation)]
        let ticks = hundredths as u32;
        if let Err(err) = self.mib.refresh(uptime_oid, Value::Ticks(ticks)) {
            trace!(error = %err, "uptime not refreshed");
        }
    }
}
