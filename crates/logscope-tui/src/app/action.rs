use logscope_client::ClearTarget;

/// All possible actions in the application (command pattern)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Quit,

    // UI toggles
    ToggleHelp,
    ToggleTimestamps,
    ToggleStats,
    ToggleWatches,

    // Views
    NextView,
    PrevView,
    TogglePause,
    ToggleAutoScroll,

    // Scrolling
    ScrollUp(usize),
    ScrollDown(usize),
    ScrollToTop,
    ScrollToBottom,
    PageUp,
    PageDown,

    // Quick filter input
    OpenSearch,
    CloseSearch,
    SearchInput(char),
    SearchBackspace,
    SearchClear,
    ToggleSearchMode,

    // Filter on the active view
    ApplyFilter,
    ClearFilter,
    ToggleCaseSensitive,

    // Connection
    /// Ask before clearing on the server
    Clear(ClearTarget),
    ConfirmClear,
    CancelClear,
    Reconnect,
    ReloadSettings,

    // Error handling
    ShowError(String),
    DismissError,

    Render,
}
