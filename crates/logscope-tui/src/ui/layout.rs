use ratatui::layout::{Constraint, Direction, Layout as RatatuiLayout, Rect};

/// Layout helper for consistent screen layouts
pub struct Layout;

impl Layout {
    /// Split the screen into header, optional bars, content and status line
    ///
    /// Returns `(header, stats, filter, content, status)`.
    pub fn main(
        area: Rect,
        show_stats: bool,
        show_filter: bool,
    ) -> (Rect, Option<Rect>, Option<Rect>, Rect, Rect) {
        let mut constraints = vec![Constraint::Length(3)];
        if show_stats {
            constraints.push(Constraint::Length(3));
        }
        if show_filter {
            constraints.push(Constraint::Length(3));
        }
        constraints.push(Constraint::Min(1));
        constraints.push(Constraint::Length(1));

        let chunks = RatatuiLayout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        let mut idx = 1;
        let stats = if show_stats {
            idx += 1;
            Some(chunks[idx - 1])
        } else {
            None
        };
        let filter = if show_filter {
            idx += 1;
            Some(chunks[idx - 1])
        } else {
            None
        };

        (chunks[0], stats, filter, chunks[idx], chunks[idx + 1])
    }

    /// Log list with an optional watch panel on the right
    pub fn log_viewer(area: Rect, show_watches: bool) -> (Rect, Option<Rect>) {
        if show_watches {
            let chunks = RatatuiLayout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Min(20), Constraint::Percentage(30)])
                .split(area);
            (chunks[0], Some(chunks[1]))
        } else {
            (area, None)
        }
    }

    /// Centered popup of at most `width` x `height`
    pub fn popup(area: Rect, width: u16, height: u16) -> Rect {
        let width = width.min(area.width.saturating_sub(4));
        let height = height.min(area.height.saturating_sub(4));
        let x = area.x + area.width.saturating_sub(width) / 2;
        let y = area.y + area.height.saturating_sub(height) / 2;
        Rect::new(x, y, width, height)
    }
}
