//! # Trailing-edge debounce gate.
//!
//! [`Debounce`] coalesces bursts of calls into a single execution: each call
//! schedules its future to run after the quiet window, and a newer call
//! supersedes any pending one. Only the last future of a burst runs, and
//! only once the gate has been quiet for the whole window.
//!
//! State is per-gate; create one gate per decision you want to coalesce.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::time::Duration;
//! use runvisor::Debounce;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let gate = Debounce::new(Duration::from_millis(20));
//! let runs = Arc::new(AtomicUsize::new(0));
//!
//! for _ in 0..5 {
//!     let runs = runs.clone();
//!     gate.call(async move {
//!         runs.fetch_add(1, Ordering::SeqCst);
//!     });
//! }
//!
//! tokio::time::sleep(Duration::from_millis(60)).await;
//! assert_eq!(runs.load(Ordering::SeqCst), 1);
//! # }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Coalescing gate: runs at most one scheduled future per quiet window.
#[derive(Clone)]
pub struct Debounce {
    window: Duration,
    generation: Arc<AtomicU64>,
}

impl Debounce {
    /// Creates a gate with the given quiet window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Schedules `fut` to run after the quiet window.
    ///
    /// A later `call` on the same gate supersedes this one: the superseded
    /// future is dropped without running. Returns immediately.
    pub fn call<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mine = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);
        let window = self.window;

        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if generation.load(Ordering::SeqCst) == mine {
                fut.await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn burst_collapses_to_last_call() {
        let gate = Debounce::new(Duration::from_millis(20));
        let runs = Arc::new(AtomicUsize::new(0));
        let winner = Arc::new(AtomicUsize::new(0));

        for i in 1..=4 {
            let runs = runs.clone();
            let winner = winner.clone();
            gate.call(async move {
                runs.fetch_add(1, Ordering::SeqCst);
                winner.store(i, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(winner.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn separate_quiet_windows_each_run() {
        let gate = Debounce::new(Duration::from_millis(10));
        let runs = Arc::new(AtomicUsize::new(0));

        let r = runs.clone();
        gate.call(async move {
            r.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(40)).await;

        let r = runs.clone();
        gate.call(async move {
            r.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }
}
