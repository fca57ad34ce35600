//! Shared types for logscope
//!
//! This crate contains the data model pushed by the log server (entries, watches,
//! control commands) and the styling primitives shared by the engines and the TUI.

use chrono::{DateTime, TimeZone, Utc};
use ratatui::style::{Modifier, Style};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::sync::Arc;

pub use ratatui::style::Color;

// ============================================================================
// Wire helpers
// ============================================================================

/// Enum fields arrive either as a name or as a numeric code
#[derive(Deserialize)]
#[serde(untagged)]
enum NameOrCode {
    Code(u64),
    Name(String),
}

/// Timestamps arrive either as RFC 3339 strings or as epoch milliseconds
#[derive(Deserialize)]
#[serde(untagged)]
enum TimestampRepr {
    Millis(i64),
    Text(String),
}

fn de_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    match TimestampRepr::deserialize(deserializer)? {
        TimestampRepr::Millis(ms) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {ms}"))),
        TimestampRepr::Text(s) => DateTime::parse_from_rfc3339(&s)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom),
    }
}

/// Watch values are displayed as text whatever JSON scalar the server sent
fn de_scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

// ============================================================================
// Log Types
// ============================================================================

/// Shared handle to an immutable entry held by the store
pub type ArcLogEntry = Arc<LogEntry>;

/// Log severity level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Level {
    Debug,
    Verbose,
    #[default]
    Message,
    Warning,
    Error,
    Fatal,
}

impl Level {
    pub const ALL: [Level; 6] = [
        Self::Debug,
        Self::Verbose,
        Self::Message,
        Self::Warning,
        Self::Error,
        Self::Fatal,
    ];

    /// Parse log level from common spellings, falling back to `Message`
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "debug" | "dbg" => Self::Debug,
            "verbose" | "vrb" | "trace" => Self::Verbose,
            "message" | "msg" | "info" | "information" => Self::Message,
            "warning" | "warn" | "wrn" => Self::Warning,
            "error" | "err" => Self::Error,
            "fatal" | "ftl" | "critical" => Self::Fatal,
            _ => Self::Message,
        }
    }

    /// Level for a numeric wire code (declaration order)
    pub fn from_code(code: u64) -> Self {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or_default()
    }

    /// Canonical name, used as the value filter rules match against
    pub fn name(&self) -> &'static str {
        match self {
            Self::Debug => "Debug",
            Self::Verbose => "Verbose",
            Self::Message => "Message",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::Fatal => "Fatal",
        }
    }

    /// Short display string (3 chars)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DBG",
            Self::Verbose => "VRB",
            Self::Message => "MSG",
            Self::Warning => "WRN",
            Self::Error => "ERR",
            Self::Fatal => "FTL",
        }
    }

    /// Get display color for this level
    pub fn color(&self) -> Color {
        match self {
            Self::Debug => Color::Cyan,
            Self::Verbose => Color::DarkGray,
            Self::Message => Color::Green,
            Self::Warning => Color::Yellow,
            Self::Error => Color::Red,
            Self::Fatal => Color::Magenta,
        }
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match NameOrCode::deserialize(deserializer)? {
            NameOrCode::Code(code) => Self::from_code(code),
            NameOrCode::Name(name) => Self::parse(&name),
        })
    }
}

/// Kind of record: control markers for call-stack tracking plus payload kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum EntryType {
    Separator,
    EnterMethod,
    LeaveMethod,
    ResetCallstack,
    #[default]
    Message,
    Warning,
    Error,
    InternalError,
    Comment,
    VariableValue,
    Checkpoint,
    Debug,
    Verbose,
    Fatal,
    Conditional,
    Assert,
    Text,
    Binary,
    Graphic,
    Source,
    Object,
    WebContent,
    System,
    MemoryStatistic,
    DatabaseResult,
    DatabaseStructure,
    Unknown,
}

impl EntryType {
    const KNOWN: [EntryType; 26] = [
        Self::Separator,
        Self::EnterMethod,
        Self::LeaveMethod,
        Self::ResetCallstack,
        Self::Message,
        Self::Warning,
        Self::Error,
        Self::InternalError,
        Self::Comment,
        Self::VariableValue,
        Self::Checkpoint,
        Self::Debug,
        Self::Verbose,
        Self::Fatal,
        Self::Conditional,
        Self::Assert,
        Self::Text,
        Self::Binary,
        Self::Graphic,
        Self::Source,
        Self::Object,
        Self::WebContent,
        Self::System,
        Self::MemoryStatistic,
        Self::DatabaseResult,
        Self::DatabaseStructure,
    ];

    /// Parse an entry type name, ignoring case
    pub fn parse(s: &str) -> Self {
        Self::KNOWN
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .unwrap_or(Self::Unknown)
    }

    /// Entry type for a numeric wire code
    pub fn from_code(code: u64) -> Self {
        Self::KNOWN
            .iter()
            .copied()
            .find(|t| t.code() == Some(code))
            .unwrap_or(Self::Unknown)
    }

    /// Numeric wire code: control markers 0-3, messages from 100, payloads from 200
    pub fn code(&self) -> Option<u64> {
        let code = match self {
            Self::Separator => 0,
            Self::EnterMethod => 1,
            Self::LeaveMethod => 2,
            Self::ResetCallstack => 3,
            Self::Message => 100,
            Self::Warning => 101,
            Self::Error => 102,
            Self::InternalError => 103,
            Self::Comment => 104,
            Self::VariableValue => 105,
            Self::Checkpoint => 106,
            Self::Debug => 107,
            Self::Verbose => 108,
            Self::Fatal => 109,
            Self::Conditional => 110,
            Self::Assert => 111,
            Self::Text => 200,
            Self::Binary => 201,
            Self::Graphic => 202,
            Self::Source => 203,
            Self::Object => 204,
            Self::WebContent => 205,
            Self::System => 206,
            Self::MemoryStatistic => 207,
            Self::DatabaseResult => 208,
            Self::DatabaseStructure => 209,
            Self::Unknown => return None,
        };
        Some(code)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Separator => "Separator",
            Self::EnterMethod => "EnterMethod",
            Self::LeaveMethod => "LeaveMethod",
            Self::ResetCallstack => "ResetCallstack",
            Self::Message => "Message",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::InternalError => "InternalError",
            Self::Comment => "Comment",
            Self::VariableValue => "VariableValue",
            Self::Checkpoint => "Checkpoint",
            Self::Debug => "Debug",
            Self::Verbose => "Verbose",
            Self::Fatal => "Fatal",
            Self::Conditional => "Conditional",
            Self::Assert => "Assert",
            Self::Text => "Text",
            Self::Binary => "Binary",
            Self::Graphic => "Graphic",
            Self::Source => "Source",
            Self::Object => "Object",
            Self::WebContent => "WebContent",
            Self::System => "System",
            Self::MemoryStatistic => "MemoryStatistic",
            Self::DatabaseResult => "DatabaseResult",
            Self::DatabaseStructure => "DatabaseStructure",
            Self::Unknown => "Unknown",
        }
    }

    /// Control markers carry no payload worth showing as a message row
    pub fn is_control(&self) -> bool {
        matches!(
            self,
            Self::Separator | Self::EnterMethod | Self::LeaveMethod | Self::ResetCallstack
        )
    }
}

impl<'de> Deserialize<'de> for EntryType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match NameOrCode::deserialize(deserializer)? {
            NameOrCode::Code(code) => Self::from_code(code),
            NameOrCode::Name(name) => Self::parse(&name),
        })
    }
}

/// A single log entry
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Server-assigned sequential ID; entries without one are rejected
    pub id: u64,

    #[serde(default = "Utc::now", deserialize_with = "de_timestamp")]
    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub level: Level,

    #[serde(default)]
    pub entry_type: EntryType,

    #[serde(default, alias = "session")]
    pub session_name: String,

    #[serde(default, alias = "app", alias = "appName", alias = "applicationName")]
    pub app_name: String,

    #[serde(default, alias = "host")]
    pub host_name: String,

    #[serde(default)]
    pub title: String,

    /// Message body
    #[serde(default, alias = "text")]
    pub message: String,

    /// Context tags attached by the producer
    #[serde(default, alias = "contextTags", alias = "tags")]
    pub context: BTreeMap<String, String>,
}

impl LogEntry {
    /// Create a new log entry with minimal fields
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            level: Level::Message,
            entry_type: EntryType::Message,
            session_name: String::new(),
            app_name: String::new(),
            host_name: String::new(),
            title: title.into(),
            message: String::new(),
            context: BTreeMap::new(),
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_entry_type(mut self, entry_type: EntryType) -> Self {
        self.entry_type = entry_type;
        self
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session_name = session.into();
        self
    }

    pub fn with_app(mut self, app: impl Into<String>) -> Self {
        self.app_name = app.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host_name = host.into();
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Text shown in the log list: the title, or the message when the title is empty
    pub fn display_text(&self) -> &str {
        if self.title.is_empty() {
            &self.message
        } else {
            &self.title
        }
    }
}

// ============================================================================
// Watch Types
// ============================================================================

/// A named, continuously overwritten value slot
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchValue {
    pub name: String,

    #[serde(default, deserialize_with = "de_scalar_string")]
    pub value: String,

    #[serde(default = "Utc::now", deserialize_with = "de_timestamp")]
    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub watch_type: Option<String>,

    #[serde(default, alias = "sessionName")]
    pub session: Option<String>,
}

impl WatchValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            timestamp: Utc::now(),
            watch_type: None,
            session: None,
        }
    }
}

// ============================================================================
// Server Messages
// ============================================================================

/// Store commands pushed by the server
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlCommand {
    ClearLog,
    ClearWatches,
    ClearAll,
}

impl ControlCommand {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "clearLog" => Some(Self::ClearLog),
            "clearWatches" => Some(Self::ClearWatches),
            "clearAll" => Some(Self::ClearAll),
            _ => None,
        }
    }
}

/// A decoded push message
#[derive(Clone, Debug, PartialEq)]
pub enum ServerMessage {
    Entries(Vec<LogEntry>),
    Entry(LogEntry),
    Watch(WatchValue),
    Watches(Vec<WatchValue>),
    Control(ControlCommand),
    /// Informational session notice, carried through untouched
    Session(serde_json::Value),
}

// ============================================================================
// Styling
// ============================================================================

/// Visual emphasis applied to a row by a highlight rule
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HighlightStyle {
    pub background: Option<Color>,
    pub foreground: Option<Color>,
    pub bold: bool,
}

impl HighlightStyle {
    /// Convert to a ratatui style to patch over the base row style
    pub fn to_style(&self) -> Style {
        let mut style = Style::default();
        if let Some(bg) = self.background {
            style = style.bg(bg);
        }
        if let Some(fg) = self.foreground {
            style = style.fg(fg);
        }
        if self.bold {
            style = style.add_modifier(Modifier::BOLD);
        }
        style
    }
}
