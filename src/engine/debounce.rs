// src/engine/debounce.rs

//! Change-event queue and burst coalescing.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, trace};

use crate::errors::{DevloopError, Result};
use crate::types::ChangeEvent;

/// Producer side of the change-event queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<ChangeEvent>,
}

impl EventSender {
    /// Queue an event, waiting for room if the queue is full.
    pub async fn send(&self, event: ChangeEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|e| DevloopError::Other(anyhow::anyhow!("event queue closed: {}", e.0)))
    }

    /// Queue an event without waiting. Usable from non-async callbacks.
    pub fn try_send(&self, event: ChangeEvent) -> std::result::Result<(), TrySendError<ChangeEvent>> {
        self.tx.try_send(event)
    }
}

/// Create the bounded change-event queue.
pub fn event_channel(capacity: usize) -> (EventSender, mpsc::Receiver<ChangeEvent>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender { tx }, rx)
}

/// One settled burst of changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Burst {
    /// The event that opened the burst.
    pub first: ChangeEvent,
    /// How many further events were folded into it.
    pub coalesced: usize,
}

/// Collapses bursts of events into a single trigger.
///
/// `next_burst` waits for the first event, sleeps for the configured delay,
/// then drains whatever queued up meanwhile. Events that arrive after the
/// drain stay queued and open the next burst.
#[derive(Debug)]
pub struct Debouncer {
    rx: mpsc::Receiver<ChangeEvent>,
    delay: Duration,
}

impl Debouncer {
    pub fn new(rx: mpsc::Receiver<ChangeEvent>, delay: Duration) -> Self {
        Self { rx, delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait for the next burst to settle.
    ///
    /// Returns `None` once every sender has been dropped and the queue is
    /// empty. Not cancel-safe: dropping the future after the first event
    /// arrived loses that event.
    pub async fn next_burst(&mut self) -> Option<Burst> {
        let first = self.rx.recv().await?;
        debug!(event = %first, "received first event of burst");

        if !self.delay.is_zero() {
            debug!(delay_ms = self.delay.as_millis() as u64, "waiting for burst to settle");
            tokio::time::sleep(self.delay).await;
        }

        let coalesced = self.drain();
        debug!(event = %first, coalesced, "burst settled");

        Some(Burst { first, coalesced })
    }

    /// Discard every queued event without waiting; returns how many.
    pub fn drain(&mut self) -> usize {
        let mut drained = 0;
        while let Ok(event) = self.rx.try_recv() {
            trace!(event = %event, "coalescing event");
            drained += 1;
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn events_within_delay_form_one_burst() {
        let (tx, rx) = event_channel(16);
        let mut debouncer = Debouncer::new(rx, Duration::from_millis(500));
        let start = Instant::now();

        let producer = tokio::spawn(async move {
            for name in ["a", "b", "c"] {
                tx.send(ChangeEvent::from(name)).await.unwrap();
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            tx
        });

        let burst = debouncer.next_burst().await.unwrap();
        assert_eq!(burst.first, ChangeEvent::from("a"));
        assert_eq!(burst.coalesced, 2);
        assert!(start.elapsed() >= Duration::from_millis(500));

        drop(producer.await.unwrap());
        assert!(debouncer.next_burst().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn event_after_drain_opens_next_burst() {
        let (tx, rx) = event_channel(16);
        let mut debouncer = Debouncer::new(rx, Duration::from_millis(100));

        tx.send(ChangeEvent::from("a")).await.unwrap();
        let burst = debouncer.next_burst().await.unwrap();
        assert_eq!(burst.coalesced, 0);

        tx.send(ChangeEvent::from("b")).await.unwrap();
        let burst = debouncer.next_burst().await.unwrap();
        assert_eq!(burst.first, ChangeEvent::from("b"));
    }

    #[tokio::test]
    async fn zero_delay_still_drains() {
        let (tx, rx) = event_channel(16);
        let mut debouncer = Debouncer::new(rx, Duration::ZERO);
        for name in ["a", "b", "c", "d"] {
            tx.try_send(ChangeEvent::from(name)).unwrap();
        }
        let burst = debouncer.next_burst().await.unwrap();
        assert_eq!(burst.coalesced, 3);
        assert_eq!(debouncer.drain(), 0);
    }

    #[test]
    fn try_send_reports_full_queue() {
        let (tx, _rx) = event_channel(1);
        tx.try_send(ChangeEvent::from("a")).unwrap();
        assert!(matches!(
            tx.try_send(ChangeEvent::from("b")),
            Err(TrySendError::Full(_))
        ));
    }
}
