use std::time::Duration;
use tokio::time::Instant;

/// Coalesces rapid text changes into one settled value.
///
/// Time is passed in rather than read, so the same type drives the async
/// controller (tokio clock) and plain unit tests.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<(String, Instant)>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Record a change; restarts the quiet window
    pub fn push(&mut self, value: String, now: Instant) {
        self.pending = Some((value, now + self.delay));
    }

    /// When the pending value settles, if there is one
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at)
    }

    /// The settled value, once the window has passed without changes
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match self.deadline() {
            Some(at) if at <= now => self.pending.take().map(|(value, _)| value),
            _ => None,
        }
    }

    /// Drop whatever is pending without emitting it
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}
