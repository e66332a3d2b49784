//! Browser timer driving the history debounce.
//!
//! The core never sleeps; it only reports when the next debounced save is
//! due. This module arms one `setTimeout` for that deadline and re-arms it
//! whenever the deadline moves.

use web_time::Instant;

/// Milliseconds from `now` until `deadline`, rounded up so the timer never
/// fires before the save is due.
pub fn delay_ms(deadline: Instant, now: Instant) -> u32 {
    let wait = deadline.saturating_duration_since(now);
    let ms = wait.as_millis() + u128::from(wait.subsec_nanos() % 1_000_000 != 0);
    u32::try_from(ms).unwrap_or(u32::MAX)
}

/// Whether a timer armed for `armed` must be replaced to honor `deadline`.
pub fn needs_rearm(armed: Option<Instant>, deadline: Option<Instant>) -> bool {
    armed != deadline
}

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
mod browser {
    use gloo_timers::callback::Timeout;
    use web_time::Instant;

    use super::{delay_ms, needs_rearm};

    /// At most one pending `setTimeout` for the debounced save.
    #[derive(Default)]
    pub struct SaveTimer {
        pending: Option<(Instant, Timeout)>,
    }

    impl SaveTimer {
        pub fn new() -> Self {
            Self::default()
        }

        /// Arm for `deadline`, or cancel when there is none.
        pub fn arm(&mut self, deadline: Option<Instant>, on_fire: impl FnOnce() + 'static) {
            let armed = self.pending.as_ref().map(|(at, _)| *at);
            if !needs_rearm(armed, deadline) {
                return;
            }
            // Dropping a Timeout clears it.
            self.pending = deadline.map(|at| {
                let ms = delay_ms(at, Instant::now());
                tracing::trace!(ms, "arming save timer");
                (at, Timeout::new(ms, on_fire))
            });
        }

        /// Forget the current timer, typically because it just fired.
        pub fn disarm(&mut self) {
            self.pending = None;
        }

        pub fn is_armed(&self) -> bool {
            self.pending.is_some()
        }
    }
}

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub use browser::SaveTimer;
