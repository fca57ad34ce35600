mod help_overlay;
mod status_bar;
mod watch_panel;

pub use help_overlay::HelpOverlay;
pub use status_bar::{StatusBar, log_viewer_hints};
pub use watch_panel::WatchPanel;
