use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::Widget,
};
use unicode_width::UnicodeWidthStr;

use crate::ui::Theme;

/// Bottom line with key hints and a right-aligned status
pub struct StatusBar<'a> {
    hints: Vec<(&'a str, &'a str)>,
    right_text: Option<String>,
    alert: Option<String>,
    prompt: Option<String>,
}

impl<'a> StatusBar<'a> {
    pub fn new() -> Self {
        Self {
            hints: Vec::new(),
            right_text: None,
            alert: None,
            prompt: None,
        }
    }

    /// Add keyboard hints as (key, description) pairs
    pub fn hints<I>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.hints = hints.into_iter().collect();
        self
    }

    pub fn right<S: Into<String>>(mut self, text: S) -> Self {
        self.right_text = Some(text.into());
        self
    }

    /// Message shown in place of the hints
    pub fn alert(mut self, message: Option<String>) -> Self {
        self.alert = message;
        self
    }

    /// Question waiting for an answer; shown before alerts and hints
    pub fn prompt(mut self, question: Option<String>) -> Self {
        self.prompt = question;
        self
    }
}

impl Default for StatusBar<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, Theme::status_bar());

        let line = match (self.prompt, self.alert) {
            (Some(question), _) => Line::from(Span::styled(question, Theme::status_bar_key())),
            (None, Some(message)) => Line::from(Span::styled(
                format!("⚠ {message}  [Esc] dismiss"),
                Theme::error().bg(ratatui::style::Color::DarkGray),
            )),
            (None, None) => {
                let mut spans = Vec::new();
                for (i, (key, desc)) in self.hints.iter().enumerate() {
                    if i > 0 {
                        spans.push(Span::styled("  ", Theme::status_bar()));
                    }
                    spans.push(Span::styled(format!("[{key}]"), Theme::status_bar_key()));
                    spans.push(Span::styled(format!(" {desc}"), Theme::status_bar()));
                }
                Line::from(spans)
            }
        };
        let line_width = line.width() as u16;

        buf.set_line(area.x + 1, area.y, &line, area.width.saturating_sub(2));

        if let Some(right) = self.right_text {
            let right_width = right.width() as u16;
            let right_x = area.x + area.width.saturating_sub(right_width + 1);
            if right_x > area.x + line_width + 2 {
                buf.set_span(
                    right_x,
                    area.y,
                    &Span::styled(&right, Theme::status_bar()),
                    right_width,
                );
            }
        }
    }
}

/// Default hints for the log viewer
pub fn log_viewer_hints() -> Vec<(&'static str, &'static str)> {
    vec![
        ("/", "Filter"),
        ("Tab", "View"),
        ("p", "Pause"),
        ("f", "Follow"),
        ("?", "Help"),
        ("q", "Quit"),
    ]
}
