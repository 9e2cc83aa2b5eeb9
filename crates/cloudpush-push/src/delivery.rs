//! Push delivery state machine.
//!
//! One delivery per admitted push. The driver owns the sending half of the
//! response body and is the only writer to it.
//!
//! ```text
//! Admitted -> Streaming -> AwaitingCallback -+-> Terminated -> AwaitingClose -> Closed
//!                                             |
//!                                             +-> Abandoned   (peer hung up first)
//! ```
//!
//! `Rejected` is never reached here: a push that fails admission gets an
//! error response and no delivery.
//!
//! With [`Delivery::wait_until_opened`] the callback is not started until
//! the response body has been polled once, so the response head is on the
//! wire before any work happens.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::callback::{PushedMessage, SubscriptionCallback};
use crate::config::PushConfig;
use crate::error::PushError;
use crate::event::SseEvent;

/// Where a delivery is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Admitted,
    Streaming,
    AwaitingCallback,
    Terminated,
    AwaitingClose,
    Closed,
    Rejected,
    Abandoned,
}

/// How a delivery ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The callback succeeded and `ack` was written.
    Acked,
    /// The callback failed and `nack` was written with this text.
    Nacked(String),
    /// The peer went away before the callback finished. Nothing terminal
    /// was written.
    Abandoned,
}

/// Summary of one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub message_id: String,
    pub outcome: DeliveryOutcome,
    pub keepalives_sent: u32,
    /// `Closed` or `Abandoned`.
    pub state: DeliveryState,
    /// Whether the peer hung up within the confirmation timeout after the
    /// terminal event.
    pub peer_confirmed_close: bool,
}

/// A single push delivery, from admission to close.
pub struct Delivery {
    subscription_id: Arc<str>,
    message: PushedMessage,
    callback: Arc<dyn SubscriptionCallback>,
    config: PushConfig,
    state: DeliveryState,
    keepalives_sent: u32,
    opened: Option<oneshot::Receiver<()>>,
}

impl Delivery {
    pub fn new(
        subscription_id: Arc<str>,
        message: PushedMessage,
        callback: Arc<dyn SubscriptionCallback>,
        config: PushConfig,
    ) -> Self {
        Self {
            subscription_id,
            message,
            callback,
            config,
            state: DeliveryState::Admitted,
            keepalives_sent: 0,
            opened: None,
        }
    }

    /// Hold the callback back until `opened` fires.
    ///
    /// The driver first writes an empty frame; whoever reads the sink should
    /// fire `opened` once that frame has been taken.
    pub fn wait_until_opened(mut self, opened: oneshot::Receiver<()>) -> Self {
        self.opened = Some(opened);
        self
    }

    /// Drive the delivery to completion, writing frames to `sink`.
    ///
    /// The response headers must already be on their way; dropping the
    /// receiving half of `sink` is how the peer going away is observed.
    pub async fn run(mut self, sink: mpsc::Sender<Bytes>) -> DeliveryReport {
        self.transition(DeliveryState::Streaming);

        let cancel = CancellationToken::new();
        if let Some(opened) = self.opened.take() {
            if sink.send(Bytes::new()).await.is_err() {
                return self.abandon(&cancel);
            }
            tokio::select! {
                biased;

                _ = sink.closed() => return self.abandon(&cancel),
                opened = opened => {
                    if opened.is_err() {
                        return self.abandon(&cancel);
                    }
                }
            }
        }

        let mut result = self.spawn_callback(cancel.clone());
        self.transition(DeliveryState::AwaitingCallback);

        let period = self.config.keepalive_interval.max(Duration::from_millis(1));
        let mut keepalive = time::interval_at(Instant::now() + period, period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let outcome = loop {
            tokio::select! {
                biased;

                _ = sink.closed() => {
                    return self.abandon(&cancel);
                }

                outcome = &mut result => {
                    // The supervisor always sends; a closed channel means the
                    // runtime is shutting down underneath us.
                    break outcome.unwrap_or_else(|_| {
                        Err(PushError::CallbackFailure("callback supervisor dropped".into()))
                    });
                }

                _ = keepalive.tick() => {
                    match sink.try_send(SseEvent::Keepalive.encode()) {
                        Ok(()) => self.keepalives_sent += 1,
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            debug!(message_id = %self.message.id, "response buffer full, skipping keepalive");
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => {
                            return self.abandon(&cancel);
                        }
                    }
                }
            }
        };

        let (event, outcome) = match outcome {
            Ok(()) => (SseEvent::Ack, DeliveryOutcome::Acked),
            Err(err) => {
                let text = err.to_string();
                error!(
                    message_id = %self.message.id,
                    subscription_id = %self.subscription_id,
                    error = %text,
                    "error while handling pushed message"
                );
                (SseEvent::Nack(text.clone()), DeliveryOutcome::Nacked(text))
            }
        };

        let written = time::timeout(self.config.confirmation_timeout, sink.send(event.encode())).await;
        self.transition(DeliveryState::Terminated);
        if !matches!(written, Ok(Ok(()))) {
            warn!(
                message_id = %self.message.id,
                subscription_id = %self.subscription_id,
                event = event.name(),
                "unable to write terminal event"
            );
        }

        self.transition(DeliveryState::AwaitingClose);
        let peer_confirmed_close =
            match time::timeout(self.config.confirmation_timeout, sink.closed()).await {
                Ok(()) => true,
                Err(_) => {
                    let err = PushError::DeliveryConfirmationTimeout(self.config.confirmation_timeout);
                    warn!(
                        message_id = %self.message.id,
                        subscription_id = %self.subscription_id,
                        error = %err,
                        "push connection left open"
                    );
                    false
                }
            };

        drop(sink);
        self.transition(DeliveryState::Closed);

        DeliveryReport {
            message_id: self.message.id,
            outcome,
            keepalives_sent: self.keepalives_sent,
            state: self.state,
            peer_confirmed_close,
        }
    }

    /// Run the callback in its own task under a supervisor that turns a
    /// panic into a [`PushError::CallbackFailure`]. Exactly one result is
    /// sent on the returned channel.
    fn spawn_callback(
        &self,
        cancel: CancellationToken,
    ) -> oneshot::Receiver<Result<(), PushError>> {
        let (tx, rx) = oneshot::channel();
        let callback = Arc::clone(&self.callback);
        let message = self.message.clone();

        let task = tokio::spawn(async move { callback.handle(cancel, message).await });

        tokio::spawn(async move {
            let result = match task.await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(err)) => Err(PushError::CallbackFailure(format!("{err:#}"))),
                Err(join) if join.is_panic() => Err(PushError::CallbackFailure(format!(
                    "panic while processing message: {}",
                    panic_message(join.into_panic().as_ref())
                ))),
                Err(_) => Err(PushError::CallbackFailure("callback task cancelled".into())),
            };
            let _ = tx.send(result);
        });

        rx
    }

    fn abandon(mut self, cancel: &CancellationToken) -> DeliveryReport {
        cancel.cancel();
        warn!(
            message_id = %self.message.id,
            subscription_id = %self.subscription_id,
            "push closed by peer before callback completed"
        );
        self.transition(DeliveryState::Abandoned);

        DeliveryReport {
            message_id: self.message.id,
            outcome: DeliveryOutcome::Abandoned,
            keepalives_sent: self.keepalives_sent,
            state: self.state,
            peer_confirmed_close: false,
        }
    }

    fn transition(&mut self, next: DeliveryState) {
        debug!(
            message_id = %self.message.id,
            subscription_id = %self.subscription_id,
            from = ?self.state,
            to = ?next,
            "delivery state"
        );
        self.state = next;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        *msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn message() -> PushedMessage {
        PushedMessage {
            id: "m-1".into(),
            publish_time: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            delivery_attempt: 1,
            attributes: BTreeMap::new(),
            data: Bytes::from_static(br#"{"id":7}"#),
        }
    }

    fn delivery(callback: impl SubscriptionCallback + 'static) -> Delivery {
        Delivery::new(Arc::from("sub-1"), message(), Arc::new(callback), PushConfig::default())
    }

    /// Run a delivery with a reader that collects frames until the terminal
    /// event, then hangs up.
    async fn run_to_completion(delivery: Delivery) -> (DeliveryReport, Vec<SseEvent>) {
        let (tx, mut rx) = mpsc::channel(16);
        let driver = tokio::spawn(delivery.run(tx));

        let mut events = Vec::new();
        while let Some(frame) = rx.recv().await {
            let mut decoded = SseEvent::decode_all(std::str::from_utf8(&frame).unwrap());
            let done = decoded.iter().any(SseEvent::is_terminal);
            events.append(&mut decoded);
            if done {
                break;
            }
        }
        drop(rx);

        (driver.await.unwrap(), events)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_success_acks() {
        let d = delivery(|_cancel: CancellationToken, _msg: PushedMessage| async move {
            anyhow::Ok(())
        });
        let (report, events) = run_to_completion(d).await;

        assert_eq!(events, vec![SseEvent::Ack]);
        assert_eq!(report.outcome, DeliveryOutcome::Acked);
        assert_eq!(report.message_id, "m-1");
        assert_eq!(report.keepalives_sent, 0);
        assert_eq!(report.state, DeliveryState::Closed);
        assert!(report.peer_confirmed_close);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_nacks_with_text() {
        let d = delivery(|_cancel: CancellationToken, _msg: PushedMessage| async move {
            Err::<(), _>(anyhow::anyhow!("db down"))
        });
        let (report, events) = run_to_completion(d).await;

        assert_eq!(events, vec![SseEvent::Nack("db down".into())]);
        assert_eq!(report.outcome, DeliveryOutcome::Nacked("db down".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_callback_sends_keepalives() {
        let d = delivery(|_cancel: CancellationToken, _msg: PushedMessage| async move {
            time::sleep(Duration::from_secs(12)).await;
            anyhow::Ok(())
        });
        let (report, events) = run_to_completion(d).await;

        assert_eq!(
            events,
            vec![SseEvent::Keepalive, SseEvent::Keepalive, SseEvent::Ack]
        );
        assert_eq!(report.keepalives_sent, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panic_becomes_nack() {
        let d = delivery(|_cancel: CancellationToken, _msg: PushedMessage| async move {
            if true {
                panic!("boom");
            }
            anyhow::Ok(())
        });
        let (report, events) = run_to_completion(d).await;

        let expected = "panic while processing message: boom".to_string();
        assert_eq!(events, vec![SseEvent::Nack(expected.clone())]);
        assert_eq!(report.outcome, DeliveryOutcome::Nacked(expected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_peer_hangup_abandons_and_cancels() {
        let cancelled = Arc::new(AtomicBool::new(false));
        let seen = Arc::clone(&cancelled);
        let d = delivery(move |cancel: CancellationToken, _msg: PushedMessage| {
            let seen = Arc::clone(&seen);
            async move {
                cancel.cancelled().await;
                seen.store(true, Ordering::SeqCst);
                anyhow::Ok(())
            }
        });

        let (tx, mut rx) = mpsc::channel(16);
        let driver = tokio::spawn(d.run(tx));

        // Read one keepalive, then hang up.
        let frame = rx.recv().await.unwrap();
        assert_eq!(frame, SseEvent::Keepalive.encode());
        drop(rx);

        let report = driver.await.unwrap();
        assert_eq!(report.outcome, DeliveryOutcome::Abandoned);
        assert_eq!(report.state, DeliveryState::Abandoned);
        assert_eq!(report.keepalives_sent, 1);
        assert!(!report.peer_confirmed_close);

        // The callback task keeps running and sees the cancellation.
        time::sleep(Duration::from_millis(10)).await;
        assert!(cancelled.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_peer_left_open_times_out() {
        let d = delivery(|_cancel: CancellationToken, _msg: PushedMessage| async move {
            anyhow::Ok(())
        });
        let (tx, mut rx) = mpsc::channel(16);
        let driver = tokio::spawn(d.run(tx));

        assert_eq!(rx.recv().await.unwrap(), SseEvent::Ack.encode());
        // Keep the receiver alive past the confirmation timeout.
        let report = driver.await.unwrap();
        assert_eq!(report.outcome, DeliveryOutcome::Acked);
        assert!(!report.peer_confirmed_close);

        // The driver drops its sender when it is done.
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exactly_one_terminal_event() {
        let d = delivery(|_cancel: CancellationToken, _msg: PushedMessage| async move {
            time::sleep(Duration::from_secs(7)).await;
            Err::<(), _>(anyhow::anyhow!("first").context("outer"))
        });
        let (tx, mut rx) = mpsc::channel(16);
        let driver = tokio::spawn(d.run(tx));

        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }
        driver.await.unwrap();

        let events: Vec<SseEvent> = frames
            .iter()
            .flat_map(|f| SseEvent::decode_all(std::str::from_utf8(f).unwrap()))
            .collect();
        assert_eq!(
            events,
            vec![SseEvent::Keepalive, SseEvent::Nack("outer: first".into())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_waits_until_opened() {
        let started = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&started);
        let (open_tx, open_rx) = oneshot::channel();
        let d = delivery(move |_cancel: CancellationToken, _msg: PushedMessage| {
            let flag = Arc::clone(&flag);
            async move {
                flag.store(true, Ordering::SeqCst);
                anyhow::Ok(())
            }
        })
        .wait_until_opened(open_rx);

        let (tx, mut rx) = mpsc::channel(16);
        let driver = tokio::spawn(d.run(tx));

        assert_eq!(rx.recv().await.unwrap(), Bytes::new());
        time::sleep(Duration::from_secs(30)).await;
        assert!(!started.load(Ordering::SeqCst));

        open_tx.send(()).unwrap();
        assert_eq!(rx.recv().await.unwrap(), SseEvent::Ack.encode());
        drop(rx);

        let report = driver.await.unwrap();
        assert!(started.load(Ordering::SeqCst));
        assert_eq!(report.outcome, DeliveryOutcome::Acked);
        assert_eq!(report.state, DeliveryState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hangup_before_open_never_runs_callback() {
        let started = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&started);
        let (open_tx, open_rx) = oneshot::channel::<()>();
        let d = delivery(move |_cancel: CancellationToken, _msg: PushedMessage| {
            let flag = Arc::clone(&flag);
            async move {
                flag.store(true, Ordering::SeqCst);
                anyhow::Ok(())
            }
        })
        .wait_until_opened(open_rx);

        let (tx, rx) = mpsc::channel(16);
        drop(rx);
        drop(open_tx);

        let report = d.run(tx).await;
        assert_eq!(report.outcome, DeliveryOutcome::Abandoned);
        assert_eq!(report.state, DeliveryState::Abandoned);

        time::sleep(Duration::from_millis(10)).await;
        assert!(!started.load(Ordering::SeqCst));
    }
}
