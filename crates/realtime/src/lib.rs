//! Live click fan-out to dashboard viewers.
//!
//! ```text
//! notification subscriber ──► dispatcher ──► Hub ──► client buffer ──► write loop ──► socket
//!                                             ▲
//!                         socket ──► read loop (subscribe / unsubscribe)
//! ```
//!
//! The [`Hub`] owns the workspace and link indices. Registration goes
//! through the [`HubLoop`] task; subscription changes and broadcasts take
//! the indices lock directly. Each connection runs one read loop and one
//! write loop; the write loop is the only reader of its client's buffer.

pub mod client;
pub mod connection;
pub mod dispatcher;
pub mod hub;
pub mod protocol;

pub use client::{Client, ClientId};
pub use connection::{run_connection, serve_socket, ConnectionConfig};
pub use dispatcher::{dispatch, run_dispatcher};
pub use hub::{Hub, HubConfig, HubLoop, HubStats};
pub use protocol::ControlMessage;
