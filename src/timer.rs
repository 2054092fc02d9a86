use std::time::Duration;

/// never owe more than this much wall-clock time; a host that was
/// suspended shouldn't come back and burn through seconds of backlog
const MAX_BACKLOG: Duration = Duration::from_millis(250);

/// Turns elapsed wall-clock time into a whole number of events at a fixed
/// rate. The host keeps one of these for CPU cycles and another for the
/// 60Hz timer tick, so the two rates never depend on each other.
#[derive(Debug, Clone)]
pub struct Cadence {
    period: Duration,
    owed: Duration,
}

impl Cadence {
    pub fn from_hz(hz: u32) -> Self {
        Cadence {
            period: Duration::from_secs(1) / hz.max(1),
            owed: Duration::ZERO,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// account for `elapsed` time and return how many events are now due
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        self.owed = (self.owed + elapsed).min(MAX_BACKLOG.max(self.period));
        let mut due = 0;
        while self.owed >= self.period {
            self.owed -= self.period;
            due += 1;
        }
        due
    }

    /// how long until the next event falls due
    pub fn until_next(&self) -> Duration {
        self.period - self.owed
    }
}
