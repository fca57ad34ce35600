//! Events flowing back from transports and timers.

use tokio::sync::mpsc;

/// Everything a spawned task reports to the connection manager
///
/// Transport events carry the generation of the socket that produced them
/// and timer events carry the ticket of the countdown that produced them.
/// The manager discards events that no longer match.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// Socket handshake completed.
    Opened { generation: u64 },
    /// Text frame received.
    Message { generation: u64, text: String },
    /// Socket closed with a close code.
    Closed { generation: u64, code: u16 },
    /// Transport failure; a `Closed` follows.
    TransportError { generation: u64, message: String },
    /// Bootstrap history body, or the reason the fetch failed.
    HistoryLoaded {
        generation: u64,
        result: Result<String, String>,
    },
    /// One second of the reconnect countdown elapsed.
    ReconnectTick { ticket: u64, remaining_secs: u64 },
    /// Reconnect countdown expired.
    ReconnectDue { ticket: u64 },
    /// A fire-and-forget request failed.
    RequestFailed { message: String },
}

pub type EventSender = mpsc::UnboundedSender<ConnectionEvent>;

/// Receiving half handed to the manager's owner
pub type ConnectionEvents = mpsc::UnboundedReceiver<ConnectionEvent>;
