//! Periodic liveness signal on an established connection.
//!
//! Send-only: the monitor emits a bare-newline heartbeat frame on a fixed
//! period and does not wait for a broker response. A half-open connection is
//! surfaced by the transport's own close/error event, not by the heartbeat.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;

use deskrelay_core::frame::HEARTBEAT;

/// Run the heartbeat loop until cancelled or the session's outgoing channel
/// closes.
pub(crate) async fn run_heartbeat(
    outgoing: mpsc::UnboundedSender<String>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval(interval);
    // The first tick fires immediately; the CONNECT frame already proved the
    // connection live, so skip it.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if outgoing.send(HEARTBEAT.to_string()).is_err() {
                    tracing::debug!("session closed, heartbeat stopping");
                    return;
                }
                tracing::trace!("heartbeat sent");
            }
            () = cancel.cancelled() => {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn emits_on_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_heartbeat(tx, Duration::from_secs(10), cancel.clone()));

        time::sleep(Duration::from_secs(35)).await;
        cancel.cancel();
        handle.await.unwrap();

        let mut beats = 0;
        while let Ok(frame) = rx.try_recv() {
            assert_eq!(frame, HEARTBEAT);
            beats += 1;
        }
        assert_eq!(beats, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_immediately() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_heartbeat(tx, Duration::from_secs(10), cancel.clone()));

        cancel.cancel();
        handle.await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_session_drops() {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_heartbeat(tx, Duration::from_secs(10), cancel));

        drop(rx);
        time::sleep(Duration::from_secs(15)).await;
        // Loop must have exited on the send failure.
        handle.await.unwrap();
    }
}
