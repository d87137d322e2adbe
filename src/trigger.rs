use std::time::{Duration, Instant};

pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavigationKind {
    PopState,
    PushState,
    ReplaceState,
}

/// Why the host asked for a rescan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RescanTrigger {
    PageLoad,
    Mutation,
    Navigation(NavigationKind),
}

/// Trailing-edge coalescing of rescan requests.
///
/// Every [`Debouncer::notify`] pushes the deadline out to `now + window`;
/// [`Debouncer::poll`] fires once the deadline has passed and reports the most
/// recent trigger. Callers supply the clock.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
    last: Option<RescanTrigger>,
    coalesced: usize,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_DEBOUNCE_MS))
    }
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
            last: None,
            coalesced: 0,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn notify(&mut self, trigger: RescanTrigger, now: Instant) {
        self.deadline = Some(now + self.window);
        self.last = Some(trigger);
        self.coalesced += 1;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Number of notifications folded into the pending request.
    pub fn coalesced(&self) -> usize {
        self.coalesced
    }

    pub fn poll(&mut self, now: Instant) -> Option<RescanTrigger> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        self.deadline = None;
        self.coalesced = 0;
        self.last.take()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
        self.last = None;
        self.coalesced = 0;
    }
}
