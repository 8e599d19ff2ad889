//! Manager client for the simplified SNMP protocol.
//!
//! - [`session`]: one connection, sequential requests with id correlation
//! - [`display`]: rendering replies for people
//!
//! ```ignore
//! let mut session = Session::connect("127.0.0.1:1161", DEFAULT_TIMEOUT).await?;
//! let reply = session.get(&["1.3.6.1.2.1.1.5.0".parse()?]).await?;
//! for line in display::render_get(&reply) {
//!     println!("{line}");
//! }
//! ```

pub mod display;
pub mod error;
pub mod session;

pub use error::{SessionError, SessionResult};
pub use session::{DEFAULT_TIMEOUT, RequestIds, Response, Session};
