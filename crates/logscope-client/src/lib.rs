//! Stream connection management for logscope
//!
//! This crate keeps a websocket stream alive, reconnecting on unexpected
//! closes, and applies every pushed message to a shared `LogStore`.

mod config;
mod error;
mod events;
mod manager;
mod reconnect;
mod state;
mod transport;

pub use config::{ClearTarget, ConnectionConfig, DEFAULT_RECONNECT_DELAY, DEFAULT_SERVER};
pub use error::{ClientError, Result};
pub use events::{ConnectionEvent, ConnectionEvents, EventSender};
pub use manager::ConnectionManager;
pub use reconnect::{remaining_secs, spawn_countdown};
pub use state::{CloseKind, ConnectionState};
pub use transport::{Connector, TransportHandle, WsConnector};
