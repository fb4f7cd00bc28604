use foundation::time::Time;

/// Leading-edge rate limiter with a trailing call.
///
/// Key properties:
/// - An attempt on an idle gate fires immediately.
/// - Attempts inside the window are coalesced into a single pending call.
/// - The pending call fires once the window elapses, so the last attempt
///   before a quiet period is never lost.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Throttle {
    interval_ms: f64,
    last_fire: Option<Time>,
    pending: bool,
}

impl Throttle {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms,
            last_fire: None,
            pending: false,
        }
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    pub fn has_pending(&self) -> bool {
        self.pending
    }

    /// Attempt to fire at `now`. Returns `true` if the caller should run the
    /// gated action now; otherwise the attempt is held for the trailing edge.
    pub fn fire(&mut self, now: Time) -> bool {
        match self.last_fire {
            Some(last) if now.since(last) < self.interval_ms => {
                self.pending = true;
                false
            }
            _ => {
                self.last_fire = Some(now);
                self.pending = false;
                true
            }
        }
    }

    /// Trailing edge: returns `true` exactly once when a held attempt's
    /// window has elapsed.
    pub fn poll(&mut self, now: Time) -> bool {
        if !self.pending {
            return false;
        }
        let elapsed = match self.last_fire {
            Some(last) => now.since(last) >= self.interval_ms,
            None => true,
        };
        if elapsed {
            self.last_fire = Some(now);
            self.pending = false;
            true
        } else {
            false
        }
    }
}
