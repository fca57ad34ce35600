use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use unicode_width::UnicodeWidthStr;

use logscope_logs::WatchValue;

use crate::ui::Theme;

/// Name/value list of the latest watch values
pub struct WatchPanel;

impl WatchPanel {
    pub fn render(frame: &mut Frame, area: Rect, watches: &[WatchValue]) {
        let name_width = watches
            .iter()
            .map(|w| w.name.width())
            .max()
            .unwrap_or(0)
            .min(usize::from(area.width / 2));

        let lines: Vec<Line> = if watches.is_empty() {
            vec![Line::from(Span::styled(" no watches", Theme::text_dim()))]
        } else {
            watches
                .iter()
                .map(|watch| Self::watch_line(watch, name_width))
                .collect()
        };

        let widget = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border())
                .title(Span::styled(
                    format!(" Watches ({}) ", watches.len()),
                    Theme::title(),
                )),
        );

        frame.render_widget(widget, area);
    }

    fn watch_line(watch: &WatchValue, name_width: usize) -> Line<'static> {
        let padding = name_width.saturating_sub(watch.name.width());
        Line::from(vec![
            Span::styled(format!(" {}{}", watch.name, " ".repeat(padding)), Theme::title()),
            Span::styled(" = ", Theme::text_dim()),
            Span::styled(watch.value.clone(), Theme::text()),
        ])
    }
}
