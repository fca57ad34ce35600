use chrono::Local;
use ratatui::{
    Frame,
    layout::{Margin, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use logscope_client::ConnectionState;
use logscope_logs::{FilterRule, FollowState, HighlightRule, Level, LogEntry, LogStore, pick_style};

use crate::app::AppState;
use crate::ui::components::{StatusBar, WatchPanel, log_viewer_hints};
use crate::ui::{Layout, Theme};

/// Log viewer screen
pub struct LogViewerScreen;

/// Truncate `s` to `max_width` terminal columns, marking the cut with `…`
fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let budget = max_width.saturating_sub(1);
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    if max_width > 0 {
        out.push('…');
    }
    out
}

/// Collapse line breaks and tabs so a row stays on one line
fn single_line(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

impl LogViewerScreen {
    pub fn render(frame: &mut Frame, state: &mut AppState, store: &LogStore) {
        let show_filter_bar = state.ui_state.search_active
            || state.ui_state.filter_error.is_some()
            || state.active().filter.has_constraints();

        let (header, stats, filter, content, status) =
            Layout::main(frame.area(), state.ui_state.stats_visible, show_filter_bar);

        Self::render_header(frame, header, state);
        if let Some(area) = stats {
            Self::render_stats_bar(frame, area, store);
        }
        if let Some(area) = filter {
            Self::render_filter_bar(frame, area, state);
        }

        let (logs, watches) = Layout::log_viewer(content, state.ui_state.watches_visible);
        Self::render_logs(frame, logs, state, store);
        if let Some(area) = watches {
            WatchPanel::render(frame, area, &store.watches());
        }

        Self::render_status_bar(frame, status, state);
    }

    fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
        let connection = &state.connection;
        let mut spans = vec![
            Span::styled("logscope", Theme::title()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(connection.server.clone(), Theme::text()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(
                format!("● {}", connection.state.label()),
                Theme::connection(connection.state),
            ),
            Span::styled(" │", Theme::text_dim()),
        ];

        for (i, view) in state.views.iter().enumerate() {
            spans.push(Span::raw(" "));
            let label = if view.view.is_paused() {
                format!(" {} ⏸ ", view.name)
            } else {
                format!(" {} ", view.name)
            };
            let style = if i == state.active_index() {
                Theme::tab_selected()
            } else {
                Theme::text_dim()
            };
            spans.push(Span::styled(label, style));
        }

        let header = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border()),
        );

        frame.render_widget(header, area);
    }

    fn render_stats_bar(frame: &mut Frame, area: Rect, store: &LogStore) {
        let counts = store.level_counts();

        let mut spans = vec![Span::raw(" ")];
        for level in Level::ALL.iter().rev() {
            let count = counts.get(*level);
            // Rare levels only when present
            if count == 0 && matches!(level, Level::Fatal | Level::Verbose) {
                continue;
            }
            spans.push(Span::styled(format!("{}:", level.as_str()), Theme::level(*level)));
            spans.push(Span::styled(format!("{count} "), Theme::text()));
        }

        spans.push(Span::styled("│ ", Theme::text_dim()));
        spans.push(Span::styled("Total:", Theme::text_dim()));
        spans.push(Span::styled(format!("{} ", counts.total()), Theme::text()));
        spans.push(Span::styled("Watches:", Theme::text_dim()));
        spans.push(Span::styled(format!("{}", store.watch_count()), Theme::text()));

        let stats_widget = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border())
                .title(Span::styled(" Stats ", Theme::title())),
        );

        frame.render_widget(stats_widget, area);
    }

    fn render_filter_bar(frame: &mut Frame, area: Rect, state: &AppState) {
        let ui = &state.ui_state;
        let view = state.active();
        let mut spans = vec![];

        if ui.search_active {
            spans.push(Span::styled(" /", Theme::text_highlight()));
            spans.push(Span::styled(ui.search_input.clone(), Theme::text_highlight()));
            spans.push(Span::styled(
                "█",
                Style::default()
                    .fg(Theme::HIGHLIGHT)
                    .add_modifier(Modifier::SLOW_BLINK),
            ));
        } else {
            let (include, exclude) = view.filter.active_counts();
            spans.push(Span::styled(
                format!(" {include} include, {exclude} exclude"),
                Theme::text_dim(),
            ));
            if let Some(rule) = view.quick_rule() {
                spans.push(Span::styled("  message ", Theme::text_dim()));
                spans.push(Span::styled(
                    format!("{} ", rule.operator().name()),
                    Theme::text_dim(),
                ));
                spans.push(Span::styled(rule.value().to_string(), Theme::text_highlight()));
            }
        }

        if let Some(err) = &ui.filter_error {
            spans.push(Span::raw(" "));
            spans.push(Span::styled(format!("⚠ {err}"), Theme::error()));
        }

        if ui.search_active || view.quick_rule().is_some() {
            let mode = if ui.search_regex { "[regex]" } else { "[contains]" };
            let case = if ui.filter_case_insensitive {
                "[i] case-insensitive"
            } else {
                "[I] case-sensitive"
            };
            spans.push(Span::styled(format!("  {mode} {case}"), Theme::text_dim()));
        }

        if ui.search_active {
            spans.push(Span::styled(
                "  [Enter] Apply  [Tab] Mode  [Esc] Cancel",
                Theme::text_dim(),
            ));
        } else if view.quick_rule().is_some() {
            spans.push(Span::styled("  [n] Clear  [/] Edit", Theme::text_dim()));
        }

        let border_style = if ui.search_active {
            Theme::border_focused()
        } else if ui.filter_error.is_some() {
            Theme::error()
        } else {
            Theme::border()
        };

        let filter_bar = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(Span::styled(format!(" Filter: {} ", view.name), Theme::title())),
        );

        frame.render_widget(filter_bar, area);
    }

    fn render_logs(frame: &mut Frame, area: Rect, state: &mut AppState, store: &LogStore) {
        let inner_height = area.height.saturating_sub(2) as usize;
        // Borders plus the scrollbar column
        let inner_width = area.width.saturating_sub(3) as usize;

        state.refresh(store);
        {
            let view = state.active_mut();
            let total = view.cache.len();
            view.view.update_content_size(total, inner_height);
        }

        let active = state.active();
        let range = active.view.visible_range();
        let quick_rule = active.quick_rule();
        let lines: Vec<Line> = active.cache.entries[range]
            .iter()
            .map(|entry| {
                Self::format_line(
                    entry,
                    state.ui_state.show_timestamps,
                    &state.highlights,
                    quick_rule,
                    inner_width,
                )
            })
            .collect();

        let total_rows = active.view.total_rows();
        let mut title = format!(" {} ({} rows) ", active.name, total_rows);
        if active.view.is_paused() {
            title.push_str("[PAUSED] ");
        }
        match active.view.follow_state() {
            FollowState::Stuck => title.push_str("▼ "),
            FollowState::ScrolledAway => title.push_str("↑ scrolled "),
            FollowState::Disabled => {}
        }

        let logs_widget = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border())
                .title(Span::styled(title, Theme::title())),
        );

        frame.render_widget(logs_widget, area);

        if total_rows > inner_height {
            let max_scroll = total_rows.saturating_sub(inner_height);
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("▲"))
                .end_symbol(Some("▼"));
            let mut scrollbar_state = ScrollbarState::default()
                .content_length(max_scroll)
                .position(active.view.offset().min(max_scroll));

            frame.render_stateful_widget(
                scrollbar,
                area.inner(Margin {
                    vertical: 1,
                    horizontal: 0,
                }),
                &mut scrollbar_state,
            );
        }
    }

    /// Format one entry as a single styled row
    fn format_line(
        entry: &LogEntry,
        show_timestamps: bool,
        highlights: &[HighlightRule],
        quick_rule: Option<&FilterRule>,
        available_width: usize,
    ) -> Line<'static> {
        let mut spans = Vec::new();
        let mut prefix_width = 0;

        spans.push(Span::styled(format!("{:>6}", entry.id), Theme::text_dim()));
        prefix_width += 6;

        if show_timestamps {
            let ts = entry.timestamp.with_timezone(&Local).format(" %H:%M:%S%.3f");
            spans.push(Span::styled(ts.to_string(), Theme::text_dim()));
            prefix_width += 13;
        }

        spans.push(Span::styled(
            format!(" {}", entry.level.as_str()),
            Theme::level(entry.level),
        ));
        prefix_width += 4;

        if !entry.app_name.is_empty() {
            let app = format!(" [{}]", entry.app_name);
            prefix_width += app.width();
            spans.push(Span::styled(app, Theme::text_dim()));
        }

        spans.push(Span::styled(" │ ", Theme::text_dim()));
        prefix_width += 3;

        let text = if entry.entry_type.is_control() {
            format!("── {} {}", entry.entry_type.name(), entry.display_text())
        } else {
            entry.display_text().to_string()
        };
        let message = truncate_to_width(
            &single_line(&text),
            available_width.saturating_sub(prefix_width),
        );

        let highlight = pick_style(entry, highlights);
        let base_style = match highlight {
            Some(highlight) => Theme::level_text(entry.level).patch(highlight.to_style()),
            None => Theme::level_text(entry.level),
        };

        let matches = quick_rule
            .map(|rule| rule.find_matches(&message))
            .unwrap_or_default();
        let mut last_end = 0;
        for (start, end) in matches {
            if start < last_end {
                continue;
            }
            if start > last_end {
                spans.push(Span::styled(message[last_end..start].to_string(), base_style));
            }
            spans.push(Span::styled(
                message[start..end].to_string(),
                base_style.patch(Theme::search_match()),
            ));
            last_end = end;
        }
        if last_end < message.len() {
            spans.push(Span::styled(message[last_end..].to_string(), base_style));
        }

        let line = Line::from(spans);
        match highlight.and_then(|h| h.background) {
            Some(bg) => line.style(Style::default().bg(bg)),
            None => line,
        }
    }

    fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState) {
        let connection = &state.connection;
        let view = &state.active().view;

        let mut right = match (connection.state, &connection.last_error) {
            (ConnectionState::Connected, _) | (_, None) => connection.state.label(),
            (current, Some(err)) => format!("{} ({err})", current.label()),
        };
        right.push_str(&format!(" │ {}/{}", view.offset() + 1, view.total_rows()));

        let prompt = state.ui_state.pending_clear.map(|target| {
            format!(
                "Clear {} on the server? [y/Enter] yes  [any other key] no",
                target.label()
            )
        });

        let hints = log_viewer_hints();
        let status = StatusBar::new()
            .hints(hints.iter().copied())
            .right(right)
            .alert(state.ui_state.error_message.clone())
            .prompt(prompt);

        frame.render_widget(status, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logscope_logs::{FilterOperator, FilterSet, HighlightStyle, StoreLimits, WatchValue};
    use ratatui::{Terminal, backend::TestBackend, style::Color};

    use crate::app::LogView;

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("hello", 10), "hello");
        assert_eq!(truncate_to_width("hello world", 6), "hello…");
        // Wide characters count double
        assert_eq!(truncate_to_width("日本語テキスト", 5), "日本…");
        assert_eq!(truncate_to_width("abc", 0), "");
    }

    #[test]
    fn test_single_line() {
        assert_eq!(single_line("a\nb\tc"), "a b c");
    }

    #[test]
    fn test_format_line_applies_highlight_background() {
        let mut filter = FilterSet::default();
        filter.levels.push(FilterRule::list(1, ["Error"]));
        let rule = HighlightRule::new(
            1,
            "errors",
            1,
            filter,
            HighlightStyle {
                background: Some(Color::Red),
                foreground: None,
                bold: true,
            },
        );

        let entry = LogEntry::new(7, "boom").with_level(Level::Error);
        let line = LogViewerScreen::format_line(&entry, false, &[rule], None, 80);
        assert_eq!(line.style.bg, Some(Color::Red));

        let plain = LogEntry::new(8, "fine");
        let line = LogViewerScreen::format_line(&plain, false, &[], None, 80);
        assert_eq!(line.style.bg, None);
    }

    #[test]
    fn test_format_line_marks_quick_filter_matches() {
        let rule = FilterRule::text(1, FilterOperator::Contains, "disk", true).unwrap();
        let entry = LogEntry::new(1, "disk full on disk 2");
        let line = LogViewerScreen::format_line(&entry, false, &[], Some(&rule), 80);

        let marked: Vec<_> = line
            .spans
            .iter()
            .filter(|s| s.style.bg == Some(Theme::HIGHLIGHT))
            .map(|s| s.content.to_string())
            .collect();
        assert_eq!(marked, vec!["disk", "disk"]);
    }

    #[test]
    fn test_format_line_marks_case_insensitive_matches() {
        let rule = FilterRule::text(1, FilterOperator::Contains, "disk", false).unwrap();
        let entry = LogEntry::new(1, "Disk full on DISK 2");
        let line = LogViewerScreen::format_line(&entry, false, &[], Some(&rule), 80);

        let marked: Vec<_> = line
            .spans
            .iter()
            .filter(|s| s.style.bg == Some(Theme::HIGHLIGHT))
            .map(|s| s.content.to_string())
            .collect();
        assert_eq!(marked, vec!["Disk", "DISK"]);
    }

    #[test]
    fn test_render_shows_rows_watches_and_state() {
        let store = LogStore::new(StoreLimits::default());
        store.append(LogEntry::new(1, "service started"));
        store.upsert_watch(WatchValue::new("queue", "12"));

        let mut state = AppState::new(vec![LogView::new("All", FilterSet::default())], Vec::new(), 100);
        state.connection.server = "localhost:3000".to_string();
        state.connection.state = ConnectionState::Reconnecting { remaining_secs: 2 };

        let mut terminal = Terminal::new(TestBackend::new(120, 20)).unwrap();
        terminal
            .draw(|frame| LogViewerScreen::render(frame, &mut state, &store))
            .unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("service started"));
        assert!(text.contains("queue"));
        assert!(text.contains("Reconnecting in 2s"));
        assert_eq!(state.active().view.total_rows(), 1);

        state.request_clear(logscope_client::ClearTarget::Watches);
        terminal
            .draw(|frame| LogViewerScreen::render(frame, &mut state, &store))
            .unwrap();
        assert!(screen_text(&terminal).contains("Clear watches on the server?"));
    }
}
