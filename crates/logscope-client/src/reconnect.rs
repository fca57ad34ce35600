//! Fixed-delay reconnect countdown.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::events::{ConnectionEvent, EventSender};

/// Whole seconds left until `deadline`, rounded up
pub fn remaining_secs(deadline: Instant) -> u64 {
    let left = deadline.saturating_duration_since(Instant::now());
    left.as_secs() + u64::from(left.subsec_nanos() > 0)
}

/// Start a countdown that reports once per second and fires once at `delay`
///
/// Returns the token that cancels it. A cancelled countdown sends nothing
/// further.
pub fn spawn_countdown(delay: Duration, ticket: u64, events: EventSender) -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    tokio::spawn(async move {
        let deadline = Instant::now() + delay;
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = token.cancelled() => return,

                _ = tokio::time::sleep_until(deadline) => {
                    let _ = events.send(ConnectionEvent::ReconnectDue { ticket });
                    return;
                }

                _ = ticker.tick() => {
                    let remaining_secs = remaining_secs(deadline);
                    let _ = events.send(ConnectionEvent::ReconnectTick { ticket, remaining_secs });
                }
            }
        }
    });

    cancel
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_countdown_ticks_then_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let start = Instant::now();
        let _token = spawn_countdown(Duration::from_millis(3000), 7, tx);

        let mut ticks = Vec::new();
        loop {
            match rx.recv().await {
                Some(ConnectionEvent::ReconnectTick { ticket, remaining_secs }) => {
                    assert_eq!(ticket, 7);
                    ticks.push(remaining_secs);
                }
                Some(ConnectionEvent::ReconnectDue { ticket }) => {
                    assert_eq!(ticket, 7);
                    break;
                }
                other => panic!("unexpected event {other:?}"),
            }
        }

        assert_eq!(ticks, vec![3, 2, 1]);
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_countdown_is_silent() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let token = spawn_countdown(Duration::from_secs(2), 1, tx);

        // First tick is immediate
        assert!(matches!(
            rx.recv().await,
            Some(ConnectionEvent::ReconnectTick { .. })
        ));
        token.cancel();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_secs_rounds_up() {
        let deadline = Instant::now() + Duration::from_millis(1500);
        assert_eq!(remaining_secs(deadline), 2);
        tokio::time::advance(Duration::from_millis(1500)).await;
        assert_eq!(remaining_secs(deadline), 0);
    }
}
