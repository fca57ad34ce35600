use std::time::Duration;

use crossterm::event::{
    Event as CrosstermEvent, EventStream, KeyEvent, KeyEventKind, MouseEventKind,
};
use futures::{FutureExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Lines moved per mouse wheel notch
const WHEEL_LINES: isize = 3;

/// Terminal events
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Periodic redraw
    Tick,
    Key(KeyEvent),
    /// Mouse wheel; negative scrolls up
    Scroll(isize),
    Resize(u16, u16),
    Error(String),
}

impl Event {
    /// Map a raw crossterm event, dropping the ones the UI ignores
    pub fn from_crossterm(event: CrosstermEvent) -> Option<Self> {
        match event {
            // Release/repeat events show up on Windows
            CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Some(Self::Key(key)),
            CrosstermEvent::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollUp => Some(Self::Scroll(-WHEEL_LINES)),
                MouseEventKind::ScrollDown => Some(Self::Scroll(WHEEL_LINES)),
                _ => None,
            },
            CrosstermEvent::Resize(w, h) => Some(Self::Resize(w, h)),
            _ => None,
        }
    }
}

/// Event handler managing terminal input
pub struct EventHandler {
    receiver: mpsc::UnboundedReceiver<Event>,
    cancel: CancellationToken,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let token = cancel.clone();
        tokio::spawn(async move {
            let mut reader = EventStream::new();
            let mut tick_interval = tokio::time::interval(tick_rate);

            loop {
                let tick = tick_interval.tick();
                let crossterm_event = reader.next().fuse();

                tokio::select! {
                    _ = token.cancelled() => break,

                    _ = tick => {
                        let _ = sender.send(Event::Tick);
                    }

                    maybe_event = crossterm_event => match maybe_event {
                        Some(Ok(evt)) => {
                            if let Some(event) = Event::from_crossterm(evt) {
                                let _ = sender.send(event);
                            }
                        }
                        Some(Err(e)) => {
                            let _ = sender.send(Event::Error(e.to_string()));
                        }
                        None => break,
                    }
                }
            }
        });

        Self { receiver, cancel }
    }

    pub async fn next(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for EventHandler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
