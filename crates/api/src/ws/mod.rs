//! WebSocket progress feed.
//!
//! Each connection subscribes to the event bus directly and forwards the
//! events it is interested in; no connection registry is needed.

pub mod feed;
mod handler;

pub use handler::ws_handler;
