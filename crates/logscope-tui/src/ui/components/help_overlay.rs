use ratatui::{
    Frame,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::ui::Layout;

/// Help overlay showing keybindings
pub struct HelpOverlay;

impl HelpOverlay {
    pub fn render(frame: &mut Frame) {
        let popup_area = Layout::popup(frame.area(), 52, 36);
        frame.render_widget(Clear, popup_area);

        let help_text = vec![
            Line::from(Span::styled(
                "Keybindings",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Self::section("Navigation"),
            Self::key_line("j/↓", "Scroll down"),
            Self::key_line("k/↑", "Scroll up"),
            Self::key_line("Ctrl+d", "Page down"),
            Self::key_line("Ctrl+u", "Page up"),
            Self::key_line("g", "Go to top"),
            Self::key_line("G", "Go to bottom"),
            Self::key_line("Tab", "Next view"),
            Self::key_line("S-Tab", "Previous view"),
            Line::from(""),
            Self::section("Display"),
            Self::key_line("p/Space", "Pause or resume view"),
            Self::key_line("f", "Toggle auto-scroll"),
            Self::key_line("t", "Toggle timestamps"),
            Self::key_line("s", "Toggle stats bar"),
            Self::key_line("W", "Toggle watch panel"),
            Line::from(""),
            Self::section("Filter"),
            Self::key_line("/", "Quick filter on messages"),
            Self::key_line("Tab", "Contains or regex (in filter)"),
            Self::key_line("i", "Toggle case sensitivity"),
            Self::key_line("n", "Clear quick filter"),
            Line::from(""),
            Self::section("Server"),
            Self::key_line("c", "Clear log"),
            Self::key_line("w", "Clear watches"),
            Self::key_line("x", "Clear log and watches"),
            Self::key_line("y/Enter", "Confirm a clear"),
            Self::key_line("R", "Reconnect now"),
            Self::key_line("L", "Reload settings file"),
            Line::from(""),
            Self::key_line("?", "Toggle this help"),
            Self::key_line("q", "Quit"),
        ];

        let help_widget = Paragraph::new(help_text).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(Span::styled(
                    " Help ",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )),
        );

        frame.render_widget(help_widget, popup_area);
    }

    fn section(title: &str) -> Line<'_> {
        Line::from(Span::styled(title, Style::default().fg(Color::Yellow)))
    }

    fn key_line<'a>(key: &'a str, desc: &'a str) -> Line<'a> {
        Line::from(vec![
            Span::styled(format!("  {:>8}", key), Style::default().fg(Color::Green)),
            Span::styled(format!("  {}", desc), Style::default().fg(Color::White)),
        ])
    }
}
