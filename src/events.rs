//! Event sources driving the background triggers.
//!
//! Timers, the OS location callback and app-state changes all look the same
//! to the scheduler: a stream of events handed to an async handler, one at a
//! time, on a spawned task.

use std::future::Future;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Something that yields events until it is exhausted.
pub trait EventSource: Send + 'static {
    type Event: Send + 'static;

    /// Next event, or `None` once the source is closed.
    fn next_event(&mut self) -> BoxFuture<'_, Option<Self::Event>>;
}

/// Run `handler` for every event of `source` on a new task.
///
/// Handlers are awaited in order, so a slow handler delays later events
/// rather than overlapping with them.
pub fn subscribe<S, F, Fut>(mut source: S, mut handler: F) -> JoinHandle<()>
where
    S: EventSource,
    F: FnMut(S::Event) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(event) = source.next_event().await {
            handler(event).await;
        }
    })
}

/// Fixed-period ticks. The first tick arrives one period after creation.
pub struct TimerSource {
    interval: Interval,
}

impl TimerSource {
    /// Must be called from within a tokio runtime.
    pub fn every(period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

impl EventSource for TimerSource {
    type Event = Instant;

    fn next_event(&mut self) -> BoxFuture<'_, Option<Instant>> {
        Box::pin(async move { Some(self.interval.tick().await) })
    }
}

/// Values pushed from outside the runtime, e.g. a platform callback.
pub struct ChannelSource<T> {
    rx: mpsc::Receiver<T>,
}

impl<T: Send + 'static> ChannelSource<T> {
    /// Bounded channel; returns the sending half and the source.
    pub fn bounded(capacity: usize) -> (mpsc::Sender<T>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self { rx })
    }
}

impl<T: Send + 'static> EventSource for ChannelSource<T> {
    type Event = T;

    fn next_event(&mut self) -> BoxFuture<'_, Option<T>> {
        Box::pin(self.rx.recv())
    }
}

/// Changes of a watched value, reported once the value has settled.
///
/// After a change the source waits `settle` and keeps waiting while further
/// changes arrive; only the final value is yielded.
pub struct WatchSource<T> {
    rx: watch::Receiver<T>,
    settle: Duration,
}

impl<T> WatchSource<T> {
    pub fn debounced(rx: watch::Receiver<T>, settle: Duration) -> Self {
        Self { rx, settle }
    }
}

impl<T: Clone + Send + Sync + 'static> EventSource for WatchSource<T> {
    type Event = T;

    fn next_event(&mut self) -> BoxFuture<'_, Option<T>> {
        Box::pin(async move {
            self.rx.changed().await.ok()?;
            if !self.settle.is_zero() {
                loop {
                    tokio::time::sleep(self.settle).await;
                    if !self.rx.has_changed().unwrap_or(false) {
                        break;
                    }
                    let _ = self.rx.borrow_and_update();
                }
            }
            let value = self.rx.borrow_and_update().clone();
            Some(value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_timer_first_tick_after_period() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let handle = subscribe(TimerSource::every(Duration::from_millis(40)), move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            async {}
        });

        tokio::time::sleep(Duration::from_millis(15)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(count.load(Ordering::SeqCst) >= 2);
        handle.abort();
    }

    #[tokio::test]
    async fn test_channel_source_ends_when_senders_drop() {
        let (tx, source) = ChannelSource::bounded(4);
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let handle = subscribe(source, move |n: u32| {
            sink.lock().unwrap().push(n);
            async {}
        });

        tx.send(1).await.unwrap();
        tx.send(2).await.unwrap();
        drop(tx);
        handle.await.unwrap();
        assert_eq!(*received.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_watch_source_yields_settled_value() {
        let (tx, rx) = watch::channel(0u32);
        let mut source = WatchSource::debounced(rx, Duration::from_millis(50));

        let producer = tokio::spawn(async move {
            tx.send(1).unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
            tx.send(2).unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
            tx.send(3).unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
        });

        assert_eq!(source.next_event().await, Some(3));
        producer.abort();
    }
}
