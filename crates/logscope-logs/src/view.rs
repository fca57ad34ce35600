/// How a view follows new content
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FollowState {
    /// Auto-scroll is switched off
    Disabled,
    /// Pinned to the newest row
    Stuck,
    /// Auto-scroll is on but the user scrolled away from the tail
    ScrolledAway,
}

/// Per-view pause, follow and scroll state
#[derive(Clone, Debug)]
pub struct ViewState {
    paused: bool,
    auto_scroll: bool,
    stuck_to_bottom: bool,

    /// Store revision the rows were last built from
    last_revision: Option<u64>,

    /// First visible row
    offset: usize,

    /// Rows currently materialized for the view
    total_rows: usize,

    /// Rows that fit in the viewport
    visible_rows: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self {
            paused: false,
            auto_scroll: true,
            stuck_to_bottom: true,
            last_revision: None,
            offset: 0,
            total_rows: 0,
            visible_rows: 0,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume and force a re-read of the current store contents
    pub fn resume(&mut self) {
        self.paused = false;
        self.last_revision = None;
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll
    }

    /// Turning auto-scroll on re-pins the view to the tail
    pub fn set_auto_scroll(&mut self, enabled: bool) {
        self.auto_scroll = enabled;
        if enabled {
            self.stuck_to_bottom = true;
            self.offset = self.max_offset();
        }
    }

    pub fn toggle_auto_scroll(&mut self) {
        self.set_auto_scroll(!self.auto_scroll);
    }

    pub fn follow_state(&self) -> FollowState {
        match (self.auto_scroll, self.stuck_to_bottom) {
            (false, _) => FollowState::Disabled,
            (true, true) => FollowState::Stuck,
            (true, false) => FollowState::ScrolledAway,
        }
    }

    pub fn is_stuck_to_bottom(&self) -> bool {
        self.auto_scroll && self.stuck_to_bottom
    }

    /// Record a user scroll that ended at or away from the tail
    pub fn on_scroll(&mut self, at_tail: bool) {
        if self.auto_scroll {
            self.stuck_to_bottom = at_tail;
        }
    }

    /// True when the view should rebuild its rows for `revision`
    pub fn needs_refresh(&self, revision: u64) -> bool {
        !self.paused && self.last_revision != Some(revision)
    }

    pub fn mark_refreshed(&mut self, revision: u64) {
        self.last_revision = Some(revision);
    }

    /// Force the next refresh, e.g. after the filter changed
    pub fn invalidate(&mut self) {
        self.last_revision = None;
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn visible_rows(&self) -> usize {
        self.visible_rows
    }

    fn max_offset(&self) -> usize {
        self.total_rows.saturating_sub(self.visible_rows)
    }

    pub fn at_tail(&self) -> bool {
        self.offset >= self.max_offset()
    }

    /// Index range of rows inside the viewport
    pub fn visible_range(&self) -> std::ops::Range<usize> {
        let start = self.offset.min(self.total_rows);
        let end = (self.offset + self.visible_rows).min(self.total_rows);
        start..end
    }

    /// Track new row count and viewport height, following the tail when stuck
    pub fn update_content_size(&mut self, total_rows: usize, visible_rows: usize) {
        self.total_rows = total_rows;
        self.visible_rows = visible_rows;
        if self.is_stuck_to_bottom() {
            self.offset = self.max_offset();
        } else {
            self.offset = self.offset.min(self.max_offset());
        }
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.offset = self.offset.saturating_sub(lines);
        self.on_scroll(self.at_tail());
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.offset = (self.offset + lines).min(self.max_offset());
        self.on_scroll(self.at_tail());
    }

    pub fn page_up(&mut self) {
        self.scroll_up(self.visible_rows.saturating_sub(1).max(1));
    }

    pub fn page_down(&mut self) {
        self.scroll_down(self.visible_rows.saturating_sub(1).max(1));
    }

    pub fn scroll_to_top(&mut self) {
        self.offset = 0;
        self.on_scroll(self.at_tail());
    }

    pub fn scroll_to_bottom(&mut self) {
        self.offset = self.max_offset();
        self.on_scroll(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sized(total: usize, visible: usize) -> ViewState {
        let mut view = ViewState::new();
        view.update_content_size(total, visible);
        view
    }

    #[test]
    fn test_starts_stuck_at_tail() {
        let view = sized(100, 10);
        assert_eq!(view.follow_state(), FollowState::Stuck);
        assert_eq!(view.offset(), 90);
        assert_eq!(view.visible_range(), 90..100);
    }

    #[test]
    fn test_scroll_away_and_back() {
        let mut view = sized(100, 10);
        view.scroll_up(5);
        assert_eq!(view.follow_state(), FollowState::ScrolledAway);

        // New rows must not drag a scrolled-away view
        view.update_content_size(120, 10);
        assert_eq!(view.offset(), 85);

        view.scroll_down(1000);
        assert_eq!(view.follow_state(), FollowState::Stuck);
        view.update_content_size(130, 10);
        assert_eq!(view.offset(), 120);
    }

    #[test]
    fn test_disabled_auto_scroll_never_sticks() {
        let mut view = sized(50, 10);
        view.set_auto_scroll(false);
        assert_eq!(view.follow_state(), FollowState::Disabled);

        view.scroll_to_bottom();
        assert_eq!(view.follow_state(), FollowState::Disabled);
        let offset = view.offset();
        view.update_content_size(80, 10);
        assert_eq!(view.offset(), offset);

        view.toggle_auto_scroll();
        assert_eq!(view.follow_state(), FollowState::Stuck);
        assert_eq!(view.offset(), 70);
    }

    #[test]
    fn test_pause_blocks_refresh() {
        let mut view = ViewState::new();
        assert!(view.needs_refresh(1));
        view.mark_refreshed(1);
        assert!(!view.needs_refresh(1));
        assert!(view.needs_refresh(2));

        view.pause();
        assert!(!view.needs_refresh(3));

        view.resume();
        assert!(view.needs_refresh(1));
    }

    #[test]
    fn test_invalidate_forces_refresh() {
        let mut view = ViewState::new();
        view.mark_refreshed(4);
        view.invalidate();
        assert!(view.needs_refresh(4));
    }

    #[test]
    fn test_short_content_is_at_tail() {
        let mut view = sized(3, 10);
        assert_eq!(view.offset(), 0);
        view.scroll_to_top();
        assert!(view.at_tail());
        assert_eq!(view.follow_state(), FollowState::Stuck);
        assert_eq!(view.visible_range(), 0..3);
    }

    #[test]
    fn test_paging() {
        let mut view = sized(100, 11);
        view.scroll_to_top();
        view.page_down();
        assert_eq!(view.offset(), 10);
        view.page_up();
        assert_eq!(view.offset(), 0);
    }

    #[test]
    fn test_shrinking_content_clamps_offset() {
        let mut view = sized(100, 10);
        view.scroll_to_top();
        view.scroll_down(50);
        view.update_content_size(20, 10);
        assert_eq!(view.offset(), 10);
    }
}
