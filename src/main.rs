mod settings;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use logscope_client::{ConnectionEvent, ConnectionManager, Connector, WsConnector};
use logscope_logs::LogStore;
use logscope_tui::{
    Action, AppState, Event, EventHandler, HelpOverlay, KeyBindings, KeyContext, LogViewerScreen,
    Tui,
};

use crate::settings::{Overrides, Settings, SettingsSource};

/// logscope - A terminal client for live log and watch streams
#[derive(Parser, Debug)]
#[command(name = "logscope")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address (http, https, ws, wss or host:port)
    #[arg(short, long)]
    server: Option<String>,

    /// Auth token sent with every request
    #[arg(long)]
    token: Option<String>,

    /// User name sent with every request
    #[arg(long)]
    user: Option<String>,

    /// Settings file (defaults to <config dir>/logscope/config.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Maximum number of buffered entries
    #[arg(long)]
    buffer_size: Option<usize>,

    /// Entries fetched from the server after connecting (0 to skip)
    #[arg(long)]
    initial_load: Option<usize>,

    /// Maximum rows a view shows
    #[arg(long)]
    max_rows: Option<usize>,

    /// Delay before reconnecting after an unexpected close
    #[arg(long, value_name = "MS")]
    reconnect_delay_ms: Option<u64>,

    /// Write diagnostics to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            server: self.server.clone(),
            token: self.token.clone(),
            user: self.user.clone(),
            reconnect_delay_ms: self.reconnect_delay_ms,
            buffer_size: self.buffer_size,
            initial_load: self.initial_load,
            max_rows: self.max_rows,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(args.log_file.as_deref())?;

    let result = run_app(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

/// `RUST_LOG` wins; otherwise only warnings and errors are kept
fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}

type Manager = ConnectionManager<WsConnector>;

async fn run_app(args: Args) -> Result<()> {
    let source = SettingsSource::new(args.config.clone(), args.overrides());
    let mut settings = source.load()?;

    let store = LogStore::new(settings.limits);
    let (mut manager, mut connection_events) =
        ConnectionManager::new(settings.connection_config(), WsConnector::new(), store.clone());

    let views = settings.take_views();
    let highlights = std::mem::take(&mut settings.highlights);
    let mut state = AppState::new(views, highlights, settings.limits.max_grid_rows);
    state.connection.server = manager.config().display_host();

    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    let mut tui = Tui::new()?;
    let mut events = EventHandler::new(Duration::from_millis(100));
    let keybindings = KeyBindings::new();

    manager.start();
    sync_connection(&mut state, &manager);
    render(&mut tui, &mut state, &store)?;

    loop {
        tokio::select! {
            Some(event) = events.next() => {
                match event {
                    Event::Key(key) => {
                        let action = if state.ui_state.pending_clear.is_some() {
                            Some(keybindings.get_confirm_action(&key))
                        } else if state.ui_state.search_active {
                            keybindings.get_filter_input_action(&key)
                        } else {
                            keybindings.get_action(KeyContext::LogViewer, &key)
                        };
                        if let Some(action) = action {
                            let _ = action_tx.send(action);
                        }
                    }
                    Event::Scroll(delta) => {
                        let lines = delta.unsigned_abs();
                        let action = if delta < 0 {
                            Action::ScrollUp(lines)
                        } else {
                            Action::ScrollDown(lines)
                        };
                        let _ = action_tx.send(action);
                    }
                    Event::Tick => {
                        // Picks up store changes on the next render
                    }
                    Event::Resize(_, _) => {
                        let _ = action_tx.send(Action::Render);
                    }
                    Event::Error(e) => {
                        let _ = action_tx.send(Action::ShowError(e));
                    }
                }
            }

            Some(event) = connection_events.recv() => {
                if let ConnectionEvent::RequestFailed { message } = &event {
                    state.show_error(message.clone());
                }
                manager.handle_event(event);
            }

            Some(action) = action_rx.recv() => {
                handle_action(&mut state, &mut manager, &store, &source, action);
            }
        }

        sync_connection(&mut state, &manager);

        if state.should_quit {
            break;
        }

        render(&mut tui, &mut state, &store)?;
    }

    manager.stop();
    events.shutdown();
    tui.restore()?;

    Ok(())
}

fn sync_connection(state: &mut AppState, manager: &Manager) {
    state.connection.state = manager.state();
    state.connection.last_error = manager.last_error().map(str::to_string);
}

fn handle_action(
    state: &mut AppState,
    manager: &mut Manager,
    store: &LogStore,
    source: &SettingsSource,
    action: Action,
) {
    match action {
        Action::Quit => {
            state.should_quit = true;
        }

        Action::ToggleHelp => {
            state.ui_state.help_visible = !state.ui_state.help_visible;
        }
        Action::ToggleTimestamps => {
            state.ui_state.show_timestamps = !state.ui_state.show_timestamps;
        }
        Action::ToggleStats => {
            state.ui_state.stats_visible = !state.ui_state.stats_visible;
        }
        Action::ToggleWatches => {
            state.ui_state.watches_visible = !state.ui_state.watches_visible;
        }

        Action::NextView => state.next_view(),
        Action::PrevView => state.prev_view(),
        Action::TogglePause => state.active_mut().view.toggle_pause(),
        Action::ToggleAutoScroll => state.active_mut().view.toggle_auto_scroll(),

        Action::ScrollUp(n) => state.active_mut().view.scroll_up(n),
        Action::ScrollDown(n) => state.active_mut().view.scroll_down(n),
        Action::PageUp => state.active_mut().view.page_up(),
        Action::PageDown => state.active_mut().view.page_down(),
        Action::ScrollToTop => state.active_mut().view.scroll_to_top(),
        Action::ScrollToBottom => state.active_mut().view.scroll_to_bottom(),

        Action::OpenSearch => state.start_search(),
        Action::CloseSearch => state.cancel_search(),
        Action::SearchInput(c) => state.search_input_char(c),
        Action::SearchBackspace => state.search_input_backspace(),
        Action::SearchClear => state.ui_state.search_input.clear(),
        Action::ToggleSearchMode => state.toggle_search_mode(),
        Action::ApplyFilter => state.apply_filter(),
        Action::ClearFilter => state.clear_filter(),
        Action::ToggleCaseSensitive => state.toggle_case_sensitive(),

        Action::Clear(target) => state.request_clear(target),
        Action::ConfirmClear => {
            if let Some(target) = state.confirm_clear() {
                info!(?target, "Clearing");
                manager.clear_remote(target);
            }
        }
        Action::CancelClear => state.cancel_clear(),
        Action::Reconnect => {
            state.dismiss_error();
            manager.force_reconnect();
        }
        Action::ReloadSettings => match source.load() {
            Ok(settings) => apply_settings(settings, store, state, manager),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Settings reload failed");
                state.show_error(format!("Reload failed: {e:#}"));
            }
        },

        Action::ShowError(msg) => state.show_error(msg),
        Action::DismissError => {
            if state.ui_state.help_visible {
                state.ui_state.help_visible = false;
            } else {
                state.dismiss_error();
            }
        }

        Action::Render => {}
    }
}

/// Apply reloaded settings to a running session
///
/// Limits take effect at once, shrinking the store if needed. Highlights are
/// replaced. A changed server or credentials reconnect. Views keep their
/// filters, scroll and pause state.
fn apply_settings<C: Connector>(
    mut settings: Settings,
    store: &LogStore,
    state: &mut AppState,
    manager: &mut ConnectionManager<C>,
) {
    let evicted = store.set_limits(settings.limits);
    state.set_max_rows(settings.limits.max_grid_rows);
    state.highlights = std::mem::take(&mut settings.highlights);

    let config = settings.connection_config();
    if &config != manager.config() {
        state.connection.server = config.display_host();
        manager.update_config(config);
    }

    info!(evicted, "Settings reloaded");
}

fn render(tui: &mut Tui, state: &mut AppState, store: &LogStore) -> Result<()> {
    tui.terminal().draw(|frame| {
        LogViewerScreen::render(frame, state, store);

        if state.ui_state.help_visible {
            HelpOverlay::render(frame);
        }
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use logscope_client::ClearTarget;
    use logscope_logs::{LogEntry, StoreLimits};

    fn session(limits: StoreLimits) -> (LogStore, AppState, Manager) {
        let store = LogStore::new(limits);
        let settings = Settings::default();
        let (manager, _events) =
            ConnectionManager::new(settings.connection_config(), WsConnector::new(), store.clone());
        let state = AppState::new(Vec::new(), Vec::new(), limits.max_grid_rows);
        (store, state, manager)
    }

    #[test]
    fn test_reload_applies_limits_now() {
        let (store, mut state, mut manager) = session(StoreLimits::default());
        store.append_batch((1..=10).map(|id| LogEntry::new(id, "t")));

        let settings = Settings::from_toml(
            "[limits]\nmax_buffer_entries = 4\nmax_grid_rows = 3\n",
        )
        .unwrap();
        apply_settings(settings, &store, &mut state, &mut manager);

        assert_eq!(store.len(), 4);
        assert_eq!(store.limits().max_buffer_entries, 4);
        assert_eq!(state.max_rows, 3);
        state.refresh(&store);
        assert_eq!(state.active().cache.len(), 3);
        // Same connection settings, nothing reopened
        assert_eq!(manager.generation(), 0);
    }

    #[tokio::test]
    async fn test_reload_with_new_server_reconnects() {
        let (store, mut state, mut manager) = session(StoreLimits::default());
        let settings = Settings::from_toml(
            "[connection]\nserver = \"127.0.0.1:1\"\n",
        )
        .unwrap();
        apply_settings(settings, &store, &mut state, &mut manager);

        assert_eq!(manager.config().server, "127.0.0.1:1");
        assert_eq!(state.connection.server, "127.0.0.1:1");
        assert!(manager.generation() > 0);
        manager.stop();
    }

    #[test]
    fn test_clear_runs_only_after_confirm() {
        let (store, mut state, mut manager) = session(StoreLimits::default());
        store.append(LogEntry::new(1, "kept"));
        let source = SettingsSource::default();

        handle_action(&mut state, &mut manager, &store, &source, Action::Clear(ClearTarget::Log));
        assert_eq!(store.len(), 1);

        handle_action(&mut state, &mut manager, &store, &source, Action::CancelClear);
        handle_action(&mut state, &mut manager, &store, &source, Action::ConfirmClear);
        assert_eq!(store.len(), 1);
    }
}
