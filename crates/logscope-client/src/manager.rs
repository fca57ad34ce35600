//! Connection lifecycle and inbound dispatch.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use logscope_logs::{LogStore, MessageParser};
use logscope_types::{ControlCommand, ServerMessage};

use crate::config::{ClearTarget, ConnectionConfig};
use crate::events::{ConnectionEvent, ConnectionEvents, EventSender};
use crate::reconnect::spawn_countdown;
use crate::state::{CloseKind, ConnectionState};
use crate::transport::{Connector, TransportHandle};

/// Owns one stream connection and feeds a store from it
///
/// All state changes happen in [`ConnectionManager::handle_event`], driven
/// by the owner's event loop. Spawned tasks only ever send events.
pub struct ConnectionManager<C: Connector> {
    config: ConnectionConfig,
    connector: C,
    store: LogStore,
    events_tx: EventSender,

    state: ConnectionState,
    last_error: Option<String>,

    /// Identifies the current transport; older events are stale
    generation: u64,
    transport: Option<TransportHandle>,

    /// Identifies the current reconnect countdown
    reconnect_ticket: u64,
    pending_reconnect: Option<CancellationToken>,

    /// Set by `stop()`; suppresses automatic reconnects
    stopped: bool,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(config: ConnectionConfig, connector: C, store: LogStore) -> (Self, ConnectionEvents) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let manager = Self {
            config,
            connector,
            store,
            events_tx,
            state: ConnectionState::Disconnected,
            last_error: None,
            generation: 0,
            transport: None,
            reconnect_ticket: 0,
            pending_reconnect: None,
            stopped: true,
        };
        (manager, events_rx)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// User-visible text for the most recent failure
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn store(&self) -> &LogStore {
        &self.store
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_pending_reconnect(&self) -> bool {
        self.pending_reconnect.is_some()
    }

    /// Begin the connection lifecycle
    pub fn start(&mut self) {
        info!(server = %self.config.server, "Starting connection manager");
        self.stopped = false;
        self.connect();
    }

    /// Disconnect on purpose; nothing reconnects until `start` or `force_reconnect`
    pub fn stop(&mut self) {
        self.stopped = true;
        self.cancel_pending_reconnect();
        self.close_transport();
        self.set_state(ConnectionState::Disconnected);
    }

    /// Open a transport unless one is already connecting or connected
    pub fn connect(&mut self) -> bool {
        if self.state.is_active() {
            debug!(state = ?self.state, "Connect ignored");
            return false;
        }

        self.cancel_pending_reconnect();
        let url = match self.config.socket_url() {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Cannot build socket URL");
                self.last_error = Some(e.to_string());
                self.set_state(ConnectionState::Disconnected);
                return false;
            }
        };

        self.stopped = false;
        self.generation += 1;
        debug!(generation = self.generation, %url, "Opening socket");
        self.transport = Some(
            self.connector
                .open(url, self.generation, self.events_tx.clone()),
        );
        self.set_state(ConnectionState::Connecting);
        true
    }

    /// Drop the current transport and any pending reconnect, then connect now
    pub fn force_reconnect(&mut self) {
        self.cancel_pending_reconnect();
        self.close_transport();
        self.set_state(ConnectionState::Disconnected);
        self.connect();
    }

    /// Apply new server, token or user and reconnect with them
    pub fn update_config(&mut self, config: ConnectionConfig) {
        self.config = config;
        self.force_reconnect();
    }

    /// Clear locally and ask the server to clear too
    pub fn clear_remote(&mut self, target: ClearTarget) {
        apply_control(&self.store, target.command());
        match self.config.clear_urls(target) {
            Ok(urls) => {
                for url in urls {
                    self.connector.delete(url, self.events_tx.clone());
                }
            }
            Err(e) => self.last_error = Some(e.to_string()),
        }
    }

    /// Stop any countdown; queued ticks from it become stale
    pub fn cancel_pending_reconnect(&mut self) {
        if let Some(token) = self.pending_reconnect.take() {
            token.cancel();
        }
        self.reconnect_ticket += 1;
    }

    /// Apply one event from a transport, fetch or timer
    pub fn handle_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Opened { generation } if generation == self.generation => {
                self.on_open(generation);
            }
            ConnectionEvent::Message { generation, text } if generation == self.generation => {
                self.dispatch(&text);
            }
            ConnectionEvent::Closed { generation, code } if generation == self.generation => {
                self.on_close(code);
            }
            ConnectionEvent::TransportError {
                generation,
                message,
            } if generation == self.generation => {
                self.last_error = Some(message);
            }
            ConnectionEvent::HistoryLoaded { generation, result }
                if generation == self.generation =>
            {
                self.on_history(result);
            }
            ConnectionEvent::ReconnectTick {
                ticket,
                remaining_secs,
            } if self.is_current_ticket(ticket) => {
                self.state = ConnectionState::Reconnecting { remaining_secs };
            }
            ConnectionEvent::ReconnectDue { ticket } if self.is_current_ticket(ticket) => {
                self.pending_reconnect = None;
                self.set_state(ConnectionState::Disconnected);
                self.connect();
            }
            ConnectionEvent::RequestFailed { message } => {
                self.last_error = Some(message);
            }
            stale => {
                debug!(event = ?stale, "Discarding stale connection event");
            }
        }
    }

    fn is_current_ticket(&self, ticket: u64) -> bool {
        self.pending_reconnect.is_some() && ticket == self.reconnect_ticket
    }

    fn on_open(&mut self, generation: u64) {
        self.last_error = None;
        self.set_state(ConnectionState::Connected);

        let limit = self.store.limits().initial_load_limit;
        if limit == 0 {
            return;
        }
        match self.config.history_url(limit) {
            Ok(url) => {
                self.connector
                    .fetch_history(url, generation, self.events_tx.clone())
            }
            Err(e) => warn!(error = %e, "Skipping history fetch"),
        }
    }

    fn on_history(&mut self, result: Result<String, String>) {
        let body = match result {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "History fetch failed, continuing without history");
                return;
            }
        };
        match MessageParser::parse_history(&body) {
            Ok(entries) => {
                let outcome = self.store.append_batch(entries);
                info!(
                    appended = outcome.appended,
                    duplicates = outcome.duplicates,
                    "Loaded history"
                );
            }
            Err(e) => warn!(error = %e, "History response unreadable, continuing without history"),
        }
    }

    fn on_close(&mut self, code: u16) {
        self.transport = None;
        self.set_state(ConnectionState::Disconnected);
        if self.stopped {
            return;
        }

        match CloseKind::from_code(code) {
            CloseKind::Clean => info!(code, "Server closed the connection"),
            CloseKind::AuthRequired => self.set_state(ConnectionState::AuthRequired),
            CloseKind::Unexpected => self.schedule_reconnect(code),
        }
    }

    fn schedule_reconnect(&mut self, code: u16) {
        self.cancel_pending_reconnect();
        let delay = self.config.reconnect_delay;
        info!(code, delay_ms = delay.as_millis() as u64, "Scheduling reconnect");

        let token = spawn_countdown(delay, self.reconnect_ticket, self.events_tx.clone());
        self.pending_reconnect = Some(token);

        let remaining_secs = delay.as_secs() + u64::from(delay.subsec_nanos() > 0);
        self.set_state(ConnectionState::Reconnecting { remaining_secs });
    }

    fn close_transport(&mut self) {
        if let Some(transport) = self.transport.take() {
            transport.close();
        }
        self.generation += 1;
    }

    fn dispatch(&self, text: &str) {
        match MessageParser::parse(text) {
            Ok(message) => apply_message(&self.store, message),
            Err(e) => warn!(error = %e, "Dropping malformed message"),
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            info!(from = ?self.state, to = ?state, "Connection state changed");
            self.state = state;
        }
    }
}

impl<C: Connector> Drop for ConnectionManager<C> {
    fn drop(&mut self) {
        if let Some(token) = self.pending_reconnect.take() {
            token.cancel();
        }
        if let Some(transport) = self.transport.take() {
            transport.close();
        }
    }
}

fn apply_message(store: &LogStore, message: ServerMessage) {
    match message {
        ServerMessage::Entries(entries) => {
            let outcome = store.append_batch(entries);
            debug!(
                appended = outcome.appended,
                evicted = outcome.evicted,
                duplicates = outcome.duplicates,
                "Applied entries"
            );
        }
        ServerMessage::Entry(entry) => {
            store.append(entry);
        }
        ServerMessage::Watch(watch) => store.upsert_watch(watch),
        ServerMessage::Watches(watches) => {
            let count = store.upsert_watch_batch(watches);
            debug!(count, "Applied watches");
        }
        ServerMessage::Control(command) => apply_control(store, command),
        ServerMessage::Session(_) => debug!("Session notice"),
    }
}

fn apply_control(store: &LogStore, command: ControlCommand) {
    info!(?command, "Clearing store");
    match command {
        ControlCommand::ClearLog => store.clear_entries(),
        ControlCommand::ClearWatches => store.clear_watches(),
        ControlCommand::ClearAll => store.clear_all(),
    }
}
