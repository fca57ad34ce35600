//! Connection state types.

/// State of the stream connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected.
    #[default]
    Disconnected,
    /// Socket is being opened.
    Connecting,
    /// Socket is open and streaming.
    Connected,
    /// Server rejected the credentials; waits for a manual reconnect.
    AuthRequired,
    /// Waiting to reconnect after an unexpected close.
    Reconnecting { remaining_secs: u64 },
}

impl ConnectionState {
    pub fn label(&self) -> String {
        match self {
            Self::Disconnected => "Disconnected".to_string(),
            Self::Connecting => "Connecting".to_string(),
            Self::Connected => "Connected".to_string(),
            Self::AuthRequired => "Auth required".to_string(),
            Self::Reconnecting { remaining_secs } => format!("Reconnecting in {remaining_secs}s"),
        }
    }

    /// A socket exists or is being opened
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

/// How a close code is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseKind {
    /// Normal closure; no reconnect
    Clean,
    /// Credentials rejected; no reconnect until forced
    AuthRequired,
    /// Anything else; reconnect after the delay
    Unexpected,
}

impl CloseKind {
    pub const NORMAL: u16 = 1000;
    pub const ABNORMAL: u16 = 1006;
    pub const AUTH_REQUIRED: u16 = 4001;

    pub fn from_code(code: u16) -> Self {
        match code {
            Self::NORMAL => Self::Clean,
            Self::AUTH_REQUIRED => Self::AuthRequired,
            _ => Self::Unexpected,
        }
    }
}
