//! Resolve-once arbiter for the startup race.
//!
//! Readiness, fatal stderr, timeout and early exit all race to decide how a
//! start ends. The first caller of [`OutcomeArbiter::resolve`] wins; every
//! later call is a no-op that reports `false`.

use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;

use super::StartOutcome;

#[derive(Debug)]
pub(crate) struct OutcomeArbiter {
    sender: Mutex<Option<oneshot::Sender<StartOutcome>>>,
}

impl OutcomeArbiter {
    pub(crate) fn new() -> (Self, oneshot::Receiver<StartOutcome>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                sender: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    /// Resolve with `outcome` if nobody has yet.
    ///
    /// `on_win` runs under the arbiter lock before the outcome is delivered,
    /// so anything it publishes is visible to whoever awaits the outcome.
    pub(crate) fn resolve<F>(&self, outcome: StartOutcome, on_win: F) -> bool
    where
        F: FnOnce(&StartOutcome),
    {
        let mut slot = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = slot.take() else {
            return false;
        };
        on_win(&outcome);
        // The receiver may already be gone; the state change still stands.
        let _ = tx.send(outcome);
        true
    }

    pub(crate) fn is_resolved(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kirlian_core::FailureReason;

    fn signals() -> [StartOutcome; 4] {
        [
            StartOutcome::Ready { port: 8501 },
            StartOutcome::Failed(FailureReason::FatalChildOutput {
                line: "Traceback".to_string(),
            }),
            StartOutcome::Failed(FailureReason::StartupTimeout { timeout_ms: 30_000 }),
            StartOutcome::Failed(FailureReason::PrematureExit { code: Some(1) }),
        ]
    }

    fn permutations(n: usize) -> Vec<Vec<usize>> {
        if n == 0 {
            return vec![Vec::new()];
        }
        let mut out = Vec::new();
        for rest in permutations(n - 1) {
            for at in 0..=rest.len() {
                let mut p = rest.clone();
                p.insert(at, n - 1);
                out.push(p);
            }
        }
        out
    }

    #[test]
    fn first_writer_wins_for_every_ordering() {
        let orders = permutations(4);
        assert_eq!(orders.len(), 24);

        for order in orders {
            let (arbiter, mut rx) = OutcomeArbiter::new();
            let mut wins = 0;
            let mut side_effects = Vec::new();

            for &i in &order {
                if arbiter.resolve(signals()[i].clone(), |o| side_effects.push(o.clone())) {
                    wins += 1;
                }
            }

            assert_eq!(wins, 1, "order {order:?}");
            assert_eq!(side_effects.len(), 1);
            assert!(arbiter.is_resolved());
            let delivered = rx.try_recv().unwrap();
            assert_eq!(delivered, signals()[order[0]], "order {order:?}");
            assert_eq!(side_effects[0], delivered);
        }
    }

    #[test]
    fn concurrent_resolvers_yield_one_winner() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let (arbiter, _rx) = OutcomeArbiter::new();
        let arbiter = Arc::new(arbiter);
        let wins = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = signals()
            .into_iter()
            .map(|outcome| {
                let arbiter = Arc::clone(&arbiter);
                let wins = Arc::clone(&wins);
                std::thread::spawn(move || {
                    if arbiter.resolve(outcome, |_| {}) {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(wins.load(Ordering::SeqCst), 1);
    }
}
