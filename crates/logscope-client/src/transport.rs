//! Socket and REST plumbing behind the connection manager.

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::error::{ClientError, Result};
use crate::events::{ConnectionEvent, EventSender};
use crate::state::CloseKind;

/// Close code reported when a close frame carries no status
const NO_STATUS: u16 = 1005;

/// Handle to an open or opening socket
#[derive(Debug)]
pub struct TransportHandle {
    cancel: CancellationToken,
}

impl TransportHandle {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Close the socket without reporting a `Closed` event
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Opens sockets and issues REST calls, reporting results as events
///
/// Implementations spawn their own tasks and never block the caller.
pub trait Connector: Send + Sync + 'static {
    /// Open a socket whose events are tagged with `generation`
    fn open(&self, url: Url, generation: u64, events: EventSender) -> TransportHandle;

    /// Fetch the bootstrap history body
    fn fetch_history(&self, url: Url, generation: u64, events: EventSender);

    /// Issue a `DELETE`, reporting failures only
    fn delete(&self, url: Url, events: EventSender);
}

/// Websocket and HTTP connector backed by tokio-tungstenite and reqwest
#[derive(Clone, Debug, Default)]
pub struct WsConnector {
    http: reqwest::Client,
}

impl WsConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Connector for WsConnector {
    fn open(&self, url: Url, generation: u64, events: EventSender) -> TransportHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        tokio::spawn(async move {
            run_socket(url, generation, events, token).await;
        });
        TransportHandle::new(cancel)
    }

    fn fetch_history(&self, url: Url, generation: u64, events: EventSender) {
        let http = self.http.clone();
        tokio::spawn(async move {
            let result = get_text(&http, url).await.map_err(|e| e.to_string());
            let _ = events.send(ConnectionEvent::HistoryLoaded { generation, result });
        });
    }

    fn delete(&self, url: Url, events: EventSender) {
        let http = self.http.clone();
        tokio::spawn(async move {
            if let Err(e) = send_delete(&http, url.clone()).await {
                warn!(%url, error = %e, "Clear request failed");
                let _ = events.send(ConnectionEvent::RequestFailed {
                    message: format!("Clear failed: {e}"),
                });
            }
        });
    }
}

async fn get_text(http: &reqwest::Client, url: Url) -> Result<String> {
    let response = http.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Status(status.as_u16()));
    }
    Ok(response.text().await?)
}

async fn send_delete(http: &reqwest::Client, url: Url) -> Result<()> {
    let response = http.delete(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Status(status.as_u16()));
    }
    Ok(())
}

/// Drive one socket until it closes or is cancelled
async fn run_socket(url: Url, generation: u64, events: EventSender, cancel: CancellationToken) {
    let connected = tokio::select! {
        _ = cancel.cancelled() => return,
        result = connect_async(url.as_str()) => result,
    };

    let ws_stream = match connected {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            report_failure(&events, generation, ClientError::from(e));
            return;
        }
    };

    debug!(generation, "Socket open");
    let _ = events.send(ConnectionEvent::Opened { generation });

    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = ws_sink.send(WsMessage::Close(None)).await;
                let _ = ws_sink.close().await;
                debug!(generation, "Socket closed locally");
                return;
            }

            frame = ws_stream.next() => {
                match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        let _ = events.send(ConnectionEvent::Message {
                            generation,
                            text: text.as_str().to_owned(),
                        });
                    }
                    Some(Ok(WsMessage::Close(frame))) => {
                        let code = frame.map_or(NO_STATUS, |f| u16::from(f.code));
                        debug!(generation, code, "Received close frame");
                        let _ = events.send(ConnectionEvent::Closed { generation, code });
                        return;
                    }
                    Some(Ok(_)) => {
                        // Ping/Pong/Binary - ignore
                    }
                    Some(Err(e)) => {
                        report_failure(&events, generation, ClientError::from(e));
                        return;
                    }
                    None => {
                        let _ = events.send(ConnectionEvent::Closed {
                            generation,
                            code: CloseKind::ABNORMAL,
                        });
                        return;
                    }
                }
            }
        }
    }
}

fn report_failure(events: &EventSender, generation: u64, error: ClientError) {
    warn!(generation, error = %error, "Socket failed");
    let _ = events.send(ConnectionEvent::TransportError {
        generation,
        message: error.to_string(),
    });
    let _ = events.send(ConnectionEvent::Closed {
        generation,
        code: CloseKind::ABNORMAL,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_close() {
        let handle = TransportHandle::new(CancellationToken::new());
        assert!(!handle.is_closed());
        handle.close();
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_abnormal_close() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let url = Url::parse("ws://127.0.0.1:1/ws").unwrap();
        let _handle = WsConnector::new().open(url, 3, tx);

        let first = rx.recv().await;
        assert!(matches!(
            first,
            Some(ConnectionEvent::TransportError { generation: 3, .. })
        ));
        assert_eq!(
            rx.recv().await,
            Some(ConnectionEvent::Closed {
                generation: 3,
                code: CloseKind::ABNORMAL
            })
        );
    }
}
