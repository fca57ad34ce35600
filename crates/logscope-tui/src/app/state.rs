use logscope_client::{ClearTarget, ConnectionState};
use logscope_logs::{
    ArcLogEntry, FilterOperator, FilterPresets, FilterRule, FilterSet, HighlightRule, LogStore,
    ViewState,
};

/// Rows a view last selected from the store
#[derive(Default)]
pub struct FilterCache {
    pub entries: Vec<ArcLogEntry>,
}

impl FilterCache {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reselect the newest `limit` visible entries
    pub fn rebuild(&mut self, store: &LogStore, filter: &FilterSet, limit: usize) {
        self.entries = store.visible(|entry| filter.is_visible(entry), limit);
    }
}

/// A named, independently filtered and scrolled window onto the store
pub struct LogView {
    pub name: String,
    pub filter: FilterSet,
    pub view: ViewState,
    pub cache: FilterCache,

    /// Id of the rule added from the quick filter bar
    quick_rule: Option<u64>,
}

impl LogView {
    pub fn new(name: impl Into<String>, filter: FilterSet) -> Self {
        Self {
            name: name.into(),
            filter,
            view: ViewState::new(),
            cache: FilterCache::default(),
            quick_rule: None,
        }
    }

    /// Rebuild rows when the store moved on and the view is not paused
    pub fn refresh(&mut self, store: &LogStore, max_rows: usize) -> bool {
        let revision = store.entry_revision();
        if !self.view.needs_refresh(revision) {
            return false;
        }
        self.cache.rebuild(store, &self.filter, max_rows);
        self.view.mark_refreshed(revision);
        true
    }

    /// The rule currently driven by the quick filter bar
    pub fn quick_rule(&self) -> Option<&FilterRule> {
        let id = self.quick_rule?;
        self.filter.messages.iter().find(|rule| rule.id() == id)
    }

    fn set_quick_rule(&mut self, rule: FilterRule) {
        self.remove_quick_rule();
        self.quick_rule = Some(rule.id());
        self.filter.messages.push(rule);
        self.view.invalidate();
    }

    fn remove_quick_rule(&mut self) {
        if let Some(id) = self.quick_rule.take() {
            self.filter.messages.remove(id);
            self.view.invalidate();
        }
    }
}

/// What the UI shows about the connection
#[derive(Clone, Debug, Default)]
pub struct ConnectionStatus {
    pub server: String,
    pub state: ConnectionState,
    pub last_error: Option<String>,
}

/// UI-specific transient state
pub struct UiState {
    pub help_visible: bool,

    /// Error message to display (if any)
    pub error_message: Option<String>,

    pub show_timestamps: bool,

    /// Watch panel beside the log list
    pub watches_visible: bool,

    /// Level counts bar
    pub stats_visible: bool,

    /// Is the quick filter bar accepting input?
    pub search_active: bool,

    pub search_input: String,

    /// Quick filter compiles as a regex instead of a substring match
    pub search_regex: bool,

    pub filter_case_insensitive: bool,

    /// Filter input error message (e.g., invalid regex)
    pub filter_error: Option<String>,

    /// Server clear waiting for a yes
    pub pending_clear: Option<ClearTarget>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            help_visible: false,
            error_message: None,
            show_timestamps: true,
            watches_visible: true,
            stats_visible: false,
            search_active: false,
            search_input: String::new(),
            search_regex: false,
            filter_case_insensitive: true,
            filter_error: None,
            pending_clear: None,
        }
    }
}

/// Global application state
pub struct AppState {
    pub views: Vec<LogView>,
    active_view: usize,

    pub highlights: Vec<HighlightRule>,

    pub ui_state: UiState,

    pub connection: ConnectionStatus,

    /// Upper bound on rows a view materializes
    pub max_rows: usize,

    pub should_quit: bool,
}

impl AppState {
    /// Falls back to the default views when `views` is empty
    pub fn new(views: Vec<LogView>, highlights: Vec<HighlightRule>, max_rows: usize) -> Self {
        let views = if views.is_empty() {
            Self::default_views()
        } else {
            views
        };

        Self {
            views,
            active_view: 0,
            highlights,
            ui_state: UiState::default(),
            connection: ConnectionStatus::default(),
            max_rows,
            should_quit: false,
        }
    }

    pub fn default_views() -> Vec<LogView> {
        vec![
            LogView::new("All", FilterSet::default()),
            LogView::new("Quiet", FilterPresets::hide_debug()),
            LogView::new("Warnings", FilterPresets::warnings_and_above()),
            LogView::new("Errors", FilterPresets::errors_only()),
        ]
    }

    pub fn active_index(&self) -> usize {
        self.active_view
    }

    pub fn active(&self) -> &LogView {
        &self.views[self.active_view]
    }

    pub fn active_mut(&mut self) -> &mut LogView {
        &mut self.views[self.active_view]
    }

    pub fn next_view(&mut self) {
        self.select_view((self.active_view + 1) % self.views.len());
    }

    pub fn prev_view(&mut self) {
        let len = self.views.len();
        self.select_view((self.active_view + len - 1) % len);
    }

    fn select_view(&mut self, index: usize) {
        self.active_view = index;
        self.ui_state.search_active = false;
        self.ui_state.search_input.clear();
        self.ui_state.filter_error = None;
    }

    /// Bring the active view up to date with the store
    pub fn refresh(&mut self, store: &LogStore) -> bool {
        let max_rows = self.max_rows;
        self.active_mut().refresh(store, max_rows)
    }

    /// New row cap; every view reselects on its next refresh
    pub fn set_max_rows(&mut self, max_rows: usize) {
        if self.max_rows == max_rows {
            return;
        }
        self.max_rows = max_rows;
        for view in &mut self.views {
            view.view.invalidate();
        }
    }

    pub fn request_clear(&mut self, target: ClearTarget) {
        self.ui_state.pending_clear = Some(target);
    }

    /// The confirmed target, if a clear was pending
    pub fn confirm_clear(&mut self) -> Option<ClearTarget> {
        self.ui_state.pending_clear.take()
    }

    pub fn cancel_clear(&mut self) {
        self.ui_state.pending_clear = None;
    }

    pub fn show_error(&mut self, msg: String) {
        self.ui_state.error_message = Some(msg);
    }

    pub fn dismiss_error(&mut self) {
        self.ui_state.error_message = None;
    }

    /// Open the quick filter bar, seeded with the current quick filter
    pub fn start_search(&mut self) {
        let current = self
            .active()
            .quick_rule()
            .map(|rule| rule.value().to_string())
            .unwrap_or_default();
        self.ui_state.search_active = true;
        self.ui_state.search_input = current;
        self.ui_state.filter_error = None;
    }

    /// Close the bar and leave the applied filter alone
    pub fn cancel_search(&mut self) {
        self.ui_state.search_active = false;
        self.ui_state.search_input.clear();
        self.ui_state.filter_error = None;
    }

    pub fn search_input_char(&mut self, c: char) {
        self.ui_state.search_input.push(c);
    }

    pub fn search_input_backspace(&mut self) {
        self.ui_state.search_input.pop();
    }

    pub fn toggle_search_mode(&mut self) {
        self.ui_state.search_regex = !self.ui_state.search_regex;
        self.ui_state.filter_error = None;
    }

    /// Turn the input into a message rule on the active view
    ///
    /// An invalid regex leaves the previous rule in place and keeps the bar
    /// open with the compiler's message.
    pub fn apply_filter(&mut self) {
        self.ui_state.filter_error = None;

        let pattern = self.ui_state.search_input.clone();
        if pattern.is_empty() {
            self.ui_state.search_active = false;
            self.active_mut().remove_quick_rule();
            return;
        }

        let operator = if self.ui_state.search_regex {
            FilterOperator::Regex
        } else {
            FilterOperator::Contains
        };

        if self.install_quick_rule(operator, pattern) {
            self.ui_state.search_active = false;
        } else {
            self.ui_state.search_active = true;
        }
    }

    fn install_quick_rule(&mut self, operator: FilterOperator, pattern: String) -> bool {
        let case_sensitive = !self.ui_state.filter_case_insensitive;
        let id = self.active().filter.next_rule_id();
        match FilterRule::text(id, operator, pattern, case_sensitive) {
            Ok(rule) => {
                self.active_mut().set_quick_rule(rule);
                true
            }
            Err(e) => {
                self.ui_state.filter_error = Some(e.to_string());
                false
            }
        }
    }

    pub fn clear_filter(&mut self) {
        self.active_mut().remove_quick_rule();
        self.ui_state.search_input.clear();
        self.ui_state.filter_error = None;
    }

    /// Flip case sensitivity and rebuild the quick filter with it
    pub fn toggle_case_sensitive(&mut self) {
        self.ui_state.filter_case_insensitive = !self.ui_state.filter_case_insensitive;
        let current = self
            .active()
            .quick_rule()
            .map(|rule| (rule.operator(), rule.value().to_string()));
        if let Some((operator, pattern)) = current {
            self.install_quick_rule(operator, pattern);
        }
    }
}
