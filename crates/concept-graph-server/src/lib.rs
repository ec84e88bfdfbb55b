//! Concept Graph wire protocol server.
//!
//! # Transport
//!
//! Plain TCP. Every message is one frame: a big-endian `u32` payload length
//! followed by the bincode encoding of a [`Request`] or [`Response`]. A client
//! sends one request and reads exactly one response before the next.
//!
//! Protocol errors (oversized frame, undecodable payload, unknown request tag)
//! are answered with `Response::Error { kind: Protocol, .. }` and the
//! connection stays open. I/O failures and EOF close it.

pub mod client;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use client::Client;
pub use handlers::Handlers;
pub use protocol::{ErrorKind, ProtocolError, Request, Response};
pub use server::Server;
