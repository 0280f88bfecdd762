//! Clock Module
//!
//! Monotonic time source used for entry expiry and eviction order.

use std::fmt::Debug;
use std::time::Instant;

#[cfg(any(test, feature = "test-util"))]
pub use manual::ManualClock;

/// Source of monotonic instants.
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> Instant;
}

// == System Clock ==
/// Reads `Instant::now()`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

// == Manual Clock ==
#[cfg(any(test, feature = "test-util"))]
mod manual {
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use super::Clock;

    /// A clock that only moves when told to. Clones share the same time.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        now: Arc<Mutex<Instant>>,
    }

    impl ManualClock {
        /// Creates a manual clock frozen at the current instant.
        pub fn new() -> Self {
            Self {
                now: Arc::new(Mutex::new(Instant::now())),
            }
        }

        /// Moves the clock forward.
        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            *now += by;
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
        }
    }
}
