//! TUI components for logscope
//!
//! This crate provides the terminal user interface for logscope,
//! including view state, keybindings, event handling, and widgets.

pub mod app;
pub mod config;
pub mod tui;
pub mod ui;

pub use app::{Action, AppState, ConnectionStatus, FilterCache, LogView, UiState};
pub use config::{KeyBinding, KeyBindings, KeyContext};
pub use tui::{Event, EventHandler, Tui};
pub use ui::components::{HelpOverlay, StatusBar, WatchPanel, log_viewer_hints};
pub use ui::screens::LogViewerScreen;
pub use ui::{Layout, Theme};
