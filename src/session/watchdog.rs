//! Proactive session expiry
//!
//! The watchdog keeps exactly one scheduled callback that fires a second
//! after the current token's `exp`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::debug;

use crate::token::{self, Clock, SystemClock};

/// Something that knows the current bearer token.
pub trait TokenSource: Send + Sync {
    fn current_token(&self) -> Option<String>;
}

/// Cancellation handle for a scheduled callback.
pub trait TimerHandle: Send {
    fn cancel(&self);
}

/// One-shot timer primitive.
pub trait Timer: Send + Sync {
    fn schedule(&self, delay: Duration, callback: Box<dyn FnOnce() + Send>)
    -> Box<dyn TimerHandle>;
}

/// Timer backed by a spawned tokio task. Needs a running runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTimer;

struct TokioTimerHandle(tokio::task::AbortHandle);

impl TimerHandle for TokioTimerHandle {
    fn cancel(&self) {
        self.0.abort();
    }
}

impl Timer for TokioTimer {
    fn schedule(
        &self,
        delay: Duration,
        callback: Box<dyn FnOnce() + Send>,
    ) -> Box<dyn TimerHandle> {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
        Box::new(TokioTimerHandle(task.abort_handle()))
    }
}

/// Padding added after `exp` so the server has definitely rejected the token.
const EXPIRY_PAD_SECS: i64 = 1;

#[derive(Default)]
struct Pending {
    /// Bumped on every watch/stop so a superseded timer never fires
    generation: u64,
    handle: Option<Box<dyn TimerHandle>>,
}

/// Schedules a deferred logout at token expiry.
pub struct SessionWatchdog {
    source: Arc<dyn TokenSource>,
    clock: Arc<dyn Clock>,
    timer: Arc<dyn Timer>,
    pending: Arc<Mutex<Pending>>,
}

fn lock(pending: &Mutex<Pending>) -> MutexGuard<'_, Pending> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionWatchdog {
    /// Watchdog using the system clock and tokio timers.
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self::with_parts(source, Arc::new(SystemClock), Arc::new(TokioTimer))
    }

    pub fn with_parts(
        source: Arc<dyn TokenSource>,
        clock: Arc<dyn Clock>,
        timer: Arc<dyn Timer>,
    ) -> Self {
        Self {
            source,
            clock,
            timer,
            pending: Arc::new(Mutex::new(Pending::default())),
        }
    }

    /// Arrange for `on_expire` to run when the current token expires.
    ///
    /// Replaces any previous watch. An already-expired token triggers
    /// `on_expire` immediately; a token without `exp` schedules nothing.
    pub fn watch<F>(&self, on_expire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut pending = lock(&self.pending);
        cancel(&mut pending);

        let Some(token) = self.source.current_token() else {
            return;
        };

        let now = self.clock.now();
        if token::is_expired_at(Some(&token), 0, now) {
            drop(pending);
            debug!("Session token already expired");
            on_expire();
            return;
        }

        let Some(secs) = token::seconds_until_expiry_at(Some(&token), now) else {
            debug!("Session token has no expiry, nothing to watch");
            return;
        };

        let delay = Duration::from_secs((secs + EXPIRY_PAD_SECS).max(0) as u64);
        let generation = pending.generation;
        let shared = Arc::clone(&self.pending);

        debug!("Session expires in {}s, scheduling logout", secs);
        let handle = self.timer.schedule(
            delay,
            Box::new(move || {
                {
                    let mut pending = lock(&shared);
                    if pending.generation != generation {
                        return;
                    }
                    pending.handle = None;
                }
                on_expire();
            }),
        );
        pending.handle = Some(handle);
    }

    /// Cancel the pending timer, if any. Safe to call repeatedly.
    pub fn stop(&self) {
        cancel(&mut lock(&self.pending));
    }

    /// Whether a timer is currently scheduled
    #[cfg(test)]
    pub fn is_watching(&self) -> bool {
        lock(&self.pending).handle.is_some()
    }
}

fn cancel(pending: &mut Pending) {
    pending.generation += 1;
    if let Some(handle) = pending.handle.take() {
        handle.cancel();
    }
}

impl Drop for SessionWatchdog {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::test_support::token_with_payload;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const NOW: i64 = 1_700_000_000;

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now(&self) -> i64 {
            self.0
        }
    }

    struct StaticToken(Option<String>);

    impl TokenSource for StaticToken {
        fn current_token(&self) -> Option<String> {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct Scheduled {
        delay: Duration,
        callback: Option<Box<dyn FnOnce() + Send>>,
        cancelled: Arc<AtomicBool>,
    }

    /// Timer that records callbacks so tests can fire them by hand
    #[derive(Default)]
    struct ManualTimer {
        scheduled: Mutex<Vec<Scheduled>>,
    }

    struct ManualHandle(Arc<AtomicBool>);

    impl TimerHandle for ManualHandle {
        fn cancel(&self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    impl Timer for ManualTimer {
        fn schedule(
            &self,
            delay: Duration,
            callback: Box<dyn FnOnce() + Send>,
        ) -> Box<dyn TimerHandle> {
            let cancelled = Arc::new(AtomicBool::new(false));
            self.scheduled.lock().unwrap().push(Scheduled {
                delay,
                callback: Some(callback),
                cancelled: cancelled.clone(),
            });
            Box::new(ManualHandle(cancelled))
        }
    }

    impl ManualTimer {
        fn fire(&self, index: usize) {
            let callback = self.scheduled.lock().unwrap()[index].callback.take();
            if let Some(callback) = callback {
                callback();
            }
        }

        fn count(&self) -> usize {
            self.scheduled.lock().unwrap().len()
        }

        fn delay(&self, index: usize) -> Duration {
            self.scheduled.lock().unwrap()[index].delay
        }

        fn is_cancelled(&self, index: usize) -> bool {
            self.scheduled.lock().unwrap()[index]
                .cancelled
                .load(Ordering::SeqCst)
        }
    }

    fn watchdog(token: Option<String>, timer: Arc<ManualTimer>) -> SessionWatchdog {
        SessionWatchdog::with_parts(
            Arc::new(StaticToken(token)),
            Arc::new(FixedClock(NOW)),
            timer,
        )
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Clone + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_no_token_does_nothing() {
        let timer = Arc::new(ManualTimer::default());
        let dog = watchdog(None, timer.clone());
        let (count, hit) = counter();

        dog.watch(hit);
        assert_eq!(timer.count(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!dog.is_watching());
    }

    #[test]
    fn test_expired_token_fires_immediately() {
        let timer = Arc::new(ManualTimer::default());
        let token = token_with_payload(&json!({ "exp": NOW - 1 }));
        let dog = watchdog(Some(token), timer.clone());
        let (count, hit) = counter();

        dog.watch(hit);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(timer.count(), 0);
    }

    #[test]
    fn test_schedules_one_second_after_expiry() {
        let timer = Arc::new(ManualTimer::default());
        let token = token_with_payload(&json!({ "exp": NOW + 30 }));
        let dog = watchdog(Some(token), timer.clone());
        let (count, hit) = counter();

        dog.watch(hit);
        assert_eq!(timer.count(), 1);
        assert_eq!(timer.delay(0), Duration::from_secs(31));
        assert!(dog.is_watching());

        timer.fire(0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!dog.is_watching());
    }

    #[test]
    fn test_token_without_exp_is_not_watched() {
        let timer = Arc::new(ManualTimer::default());
        let token = token_with_payload(&json!({ "sub": "forever" }));
        let dog = watchdog(Some(token), timer.clone());
        let (count, hit) = counter();

        dog.watch(hit);
        assert_eq!(timer.count(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_rewatch_replaces_previous_timer() {
        let timer = Arc::new(ManualTimer::default());
        let token = token_with_payload(&json!({ "exp": NOW + 30 }));
        let dog = watchdog(Some(token), timer.clone());
        let (count, hit) = counter();

        dog.watch(hit.clone());
        dog.watch(hit);
        assert_eq!(timer.count(), 2);
        assert!(timer.is_cancelled(0));
        assert!(!timer.is_cancelled(1));

        // A superseded callback that slips through still does nothing
        timer.fire(0);
        assert_eq!(count.load(Ordering::SeqCst), 0);

        timer.fire(1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_is_idempotent_and_clears_handle() {
        let timer = Arc::new(ManualTimer::default());
        let token = token_with_payload(&json!({ "exp": NOW + 30 }));
        let dog = watchdog(Some(token), timer.clone());
        let (count, hit) = counter();

        dog.stop();
        dog.watch(hit.clone());
        dog.stop();
        dog.stop();
        assert!(timer.is_cancelled(0));
        assert!(!dog.is_watching());

        timer.fire(0);
        assert_eq!(count.load(Ordering::SeqCst), 0);

        // Watching again after stop schedules a fresh timer
        dog.watch(hit);
        assert!(dog.is_watching());
        assert_eq!(timer.count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_timer_fires_after_delay() {
        let token = crate::token::test_support::token_expiring_in(2);
        let dog = SessionWatchdog::new(Arc::new(StaticToken(Some(token))));
        let (count, hit) = counter();

        dog.watch(hit);
        assert!(dog.is_watching());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!dog.is_watching());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_timer_cancelled_by_stop() {
        let token = crate::token::test_support::token_expiring_in(2);
        let dog = SessionWatchdog::new(Arc::new(StaticToken(Some(token))));
        let (count, hit) = counter();

        dog.watch(hit);
        dog.stop();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
