use ratatui::style::{Color, Modifier, Style};

use logscope_client::ConnectionState;
use logscope_logs::Level;

/// Color theme for the application
pub struct Theme;

impl Theme {
    // Base colors
    pub const BG: Color = Color::Reset;
    pub const FG: Color = Color::White;
    pub const FG_DIM: Color = Color::DarkGray;

    // Accent colors
    pub const PRIMARY: Color = Color::Cyan;
    pub const HIGHLIGHT: Color = Color::Yellow;

    // Status colors
    pub const SUCCESS: Color = Color::Green;
    pub const WARNING: Color = Color::Yellow;
    pub const ERROR: Color = Color::Red;

    pub fn border() -> Style {
        Style::default().fg(Self::FG_DIM)
    }

    pub fn border_focused() -> Style {
        Style::default().fg(Self::HIGHLIGHT)
    }

    pub fn title() -> Style {
        Style::default()
            .fg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text() -> Style {
        Style::default().fg(Self::FG)
    }

    pub fn text_dim() -> Style {
        Style::default().fg(Self::FG_DIM)
    }

    pub fn text_highlight() -> Style {
        Style::default()
            .fg(Self::HIGHLIGHT)
            .add_modifier(Modifier::BOLD)
    }

    /// Active tab in the view strip
    pub fn tab_selected() -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    /// Quick filter match inside a row
    pub fn search_match() -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Self::HIGHLIGHT)
            .add_modifier(Modifier::BOLD)
    }

    pub fn status_bar() -> Style {
        Style::default().fg(Self::FG_DIM).bg(Color::DarkGray)
    }

    pub fn status_bar_key() -> Style {
        Style::default()
            .fg(Self::HIGHLIGHT)
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    }

    pub fn error() -> Style {
        Style::default()
            .fg(Self::ERROR)
            .add_modifier(Modifier::BOLD)
    }

    /// Level tag in front of each row
    pub fn level(level: Level) -> Style {
        Style::default()
            .fg(level.color())
            .add_modifier(Modifier::BOLD)
    }

    /// Row text before any highlight rule is applied
    pub fn level_text(level: Level) -> Style {
        match level {
            Level::Error | Level::Fatal => Style::default().fg(Self::ERROR),
            Level::Warning => Style::default().fg(Self::WARNING),
            Level::Debug | Level::Verbose => Self::text_dim(),
            Level::Message => Self::text(),
        }
    }

    pub fn connection(state: ConnectionState) -> Style {
        let color = match state {
            ConnectionState::Connected => Self::SUCCESS,
            ConnectionState::Connecting | ConnectionState::Reconnecting { .. } => Self::WARNING,
            ConnectionState::AuthRequired => Self::ERROR,
            ConnectionState::Disconnected => Self::FG_DIM,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }
}
