//! Single-slot debounce timer.
//!
//! At most one timer is pending. Scheduling while a timer is pending cancels
//! it and arms a fresh one, so a burst of triggers closer together than the
//! quiet period fires the action once, a quiet period after the last trigger.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error};

struct Pending {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Slot {
    generation: u64,
    pending: Option<Pending>,
}

/// Cancel-and-replace timer that runs an action after a quiet period
#[derive(Clone)]
pub struct Debouncer {
    quiet: Duration,
    slot: Arc<Mutex<Slot>>,
}

impl Debouncer {
    /// Create a debouncer with the given quiet period
    #[must_use]
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    /// Quiet period that must pass without a new trigger before the action runs
    #[must_use]
    pub fn quiet(&self) -> Duration {
        self.quiet
    }

    /// Arm the timer to run `action`, replacing any timer still pending.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slot = match self.slot.lock() {
            Ok(guard) => guard,
            Err(e) => {
                error!("Failed to acquire debounce timer lock: {e}");
                return;
            }
        };

        if let Some(previous) = slot.pending.take() {
            previous.handle.abort();
            debug!("Debounce timer reset");
        }

        slot.generation += 1;
        let generation = slot.generation;
        let quiet = self.quiet;
        let shared = Arc::clone(&self.slot);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(quiet).await;

            // Clear the slot before running so a trigger that arrives while the
            // action runs arms a new timer instead of aborting this one.
            {
                let mut slot = match shared.lock() {
                    Ok(guard) => guard,
                    Err(e) => {
                        error!("Failed to acquire debounce timer lock: {e}");
                        return;
                    }
                };
                match &slot.pending {
                    Some(pending) if pending.generation == generation => {
                        slot.pending = None;
                    }
                    _ => return,
                }
            }

            action.await;
        });

        slot.pending = Some(Pending { generation, handle });
    }

    /// Whether a timer is armed and has not fired yet
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.slot
            .lock()
            .map(|slot| slot.pending.is_some())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    const QUIET: Duration = Duration::from_millis(200);

    fn counting_action(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_fires_once() {
        let debouncer = Debouncer::new(QUIET);
        let fired = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            debouncer.schedule(counting_action(&fired));
            sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(debouncer.is_pending());

        sleep(Duration::from_millis(250)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_triggers_fire_each_time() {
        let debouncer = Debouncer::new(QUIET);
        let fired = Arc::new(AtomicUsize::new(0));

        for expected in 1..=3 {
            debouncer.schedule(counting_action(&fired));
            sleep(Duration::from_millis(300)).await;
            assert_eq!(fired.load(Ordering::SeqCst), expected);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_only_after_quiet_period() {
        let debouncer = Debouncer::new(QUIET);
        let fired = Arc::new(AtomicUsize::new(0));

        debouncer.schedule(counting_action(&fired));
        sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        // Resetting at 150ms pushes the deadline out to 350ms.
        debouncer.schedule(counting_action(&fired));
        sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_during_action_arms_new_timer() {
        let debouncer = Debouncer::new(QUIET);
        let fired = Arc::new(AtomicUsize::new(0));

        let inner = debouncer.clone();
        let counter = Arc::clone(&fired);
        debouncer.schedule(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            inner.schedule(counting_action(&counter));
        });

        sleep(Duration::from_millis(250)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(debouncer.is_pending());

        sleep(Duration::from_millis(250)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }
}
