//! Spawned, cancellable timers.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{trace, warn};

/// Spawns timers and keeps count of the ones still pending.
///
/// Cheap to clone; clones share the count. Each timer is its own tokio
/// task, so a callback that fails (or panics) only takes itself down.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    pending: Arc<AtomicUsize>,
}

/// Owned handle to a spawned timer.
///
/// Dropping the handle does **not** cancel the timer; call
/// [`cancel`](Self::cancel). A timer's own callback must never cancel the
/// handle that refers to it (it would abort itself mid-flight). Callbacks
/// `take()` their handle out of wherever it is stored and drop it instead.
#[derive(Debug)]
pub struct TimerHandle {
    label: &'static str,
    task: AbortHandle,
}

impl TimerHandle {
    /// Stops the timer if it has not already finished.
    pub fn cancel(self) {
        if !self.task.is_finished() {
            trace!(timer = self.label, "timer cancelled");
            self.task.abort();
        }
    }

    /// Whether the timer has run to completion or been cancelled.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// The label the timer was created with.
    pub fn label(&self) -> &'static str {
        self.label
    }
}

/// Decrements the pending count when the timer task ends, however it ends.
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of timers that have been scheduled and have neither fired
    /// to completion nor been cancelled.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    fn track(&self) -> PendingGuard {
        self.pending.fetch_add(1, Ordering::SeqCst);
        PendingGuard(Arc::clone(&self.pending))
    }

    /// Runs `callback` once after `delay`.
    ///
    /// The callback future is built now but not polled until the delay has
    /// elapsed. An `Err` is logged at `warn` and goes no further.
    pub fn once<F, E>(
        &self,
        label: &'static str,
        delay: Duration,
        callback: F,
    ) -> TimerHandle
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let guard = self.track();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            time::sleep(delay).await;
            trace!(timer = label, "timer fired");
            if let Err(e) = callback.await {
                warn!(timer = label, error = %e, "timer callback failed");
            }
        });
        TimerHandle {
            label,
            task: handle.abort_handle(),
        }
    }

    /// Calls `tick` every `period`, starting one period from now, with the
    /// time elapsed since the timer was armed.
    ///
    /// Runs until cancelled. A failed tick is logged and the next tick still
    /// fires. Ticks missed while the runtime was busy are skipped rather
    /// than delivered in a burst.
    pub fn every<F, Fut, E>(
        &self,
        label: &'static str,
        period: Duration,
        mut tick: F,
    ) -> TimerHandle
    where
        F: FnMut(Duration) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let guard = self.track();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            let start = Instant::now();
            let mut interval = time::interval_at(start + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                let at = interval.tick().await;
                if let Err(e) = tick(at - start).await {
                    warn!(timer = label, error = %e, "periodic timer tick failed");
                }
            }
        });
        TimerHandle {
            label,
            task: handle.abort_handle(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use tokio::sync::mpsc;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_once_fires_after_delay_not_before() {
        let scheduler = Scheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);

        let handle = scheduler.once("t", Duration::from_secs(10), async move {
            f.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(())
        });

        time::sleep(Duration::from_millis(9_999)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!handle.is_finished());
        assert_eq!(scheduler.pending(), 1);

        time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(handle.is_finished());
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(handle.label(), "t");
    }

    #[tokio::test(start_paused = true)]
    async fn test_once_cancelled_never_fires() {
        let scheduler = Scheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);

        let handle = scheduler.once("t", Duration::from_secs(1), async move {
            f.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(())
        });
        handle.cancel();

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_does_not_cancel() {
        let scheduler = Scheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);

        drop(scheduler.once("t", Duration::from_secs(1), async move {
            f.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(())
        }));

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_callback_does_not_affect_other_timers() {
        let scheduler = Scheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);

        scheduler.once("bad", Duration::from_secs(1), async {
            Err::<(), _>("store unavailable")
        });
        scheduler.once("good", Duration::from_secs(2), async move {
            f.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(())
        });

        time::sleep(Duration::from_secs(3)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_reports_elapsed_whole_periods() {
        let scheduler = Scheduler::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle =
            scheduler.every("ticker", Duration::from_secs(1), move |elapsed| {
                let tx = tx.clone();
                async move {
                    tx.send(elapsed.as_secs()).map_err(|_| "receiver gone")
                }
            });

        time::sleep(Duration::from_millis(3_500)).await;
        handle.cancel();
        time::sleep(Duration::from_secs(5)).await;

        let mut seen = Vec::new();
        while let Ok(s) = rx.try_recv() {
            seen.push(s);
        }
        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_keeps_ticking_after_failed_tick() {
        let scheduler = Scheduler::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);

        let handle =
            scheduler.every("flaky", Duration::from_secs(1), move |_| {
                let n = c.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 { Err("first tick fails") } else { Ok(()) }
                }
            });

        time::sleep(Duration::from_millis(3_100)).await;
        handle.cancel();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
