use std::time::{Duration, Instant};

/// Capability the round engine uses to arm and cancel its once-per-period countdown.
///
/// The engine never sleeps or spawns anything itself. Whoever owns the event loop asks the
/// scheduler when the next tick is due and then calls `RoundEngine::tick`.
pub trait Scheduler {
    /// Arm a repeating task with the given period, replacing any armed one.
    fn start(&mut self, period: Duration);

    /// Cancel the repeating task. Calling this when nothing is armed is fine.
    fn stop(&mut self);

    /// Called by the engine each time it consumes a tick.
    fn fired(&mut self) {}
}

/// Scheduler that only records what the engine asked for. Ticks are delivered by hand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManualScheduler {
    period: Option<Duration>,
    starts: u32,
    fired: u32,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.period.is_some()
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// How many times the countdown has been armed.
    pub fn starts(&self) -> u32 {
        self.starts
    }

    /// How many ticks the engine has consumed.
    pub fn fired_count(&self) -> u32 {
        self.fired
    }
}

impl Scheduler for ManualScheduler {
    fn start(&mut self, period: Duration) {
        self.period = Some(period);
        self.starts += 1;
    }

    fn stop(&mut self) {
        self.period = None;
    }

    fn fired(&mut self) {
        self.fired += 1;
    }
}

/// Deadline-based scheduler for a blocking event loop.
#[derive(Debug, Clone, Default)]
pub struct IntervalScheduler {
    period: Duration,
    next_deadline: Option<Instant>,
}

impl IntervalScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// When the next tick is due, or `None` while nothing is armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.next_deadline
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_deadline.is_some_and(|deadline| now >= deadline)
    }
}

impl Scheduler for IntervalScheduler {
    fn start(&mut self, period: Duration) {
        self.period = period;
        self.next_deadline = Some(Instant::now() + period);
    }

    fn stop(&mut self) {
        self.next_deadline = None;
    }

    fn fired(&mut self) {
        if let Some(deadline) = self.next_deadline {
            self.next_deadline = Some(deadline + self.period);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_scheduler_start_stop() {
        let mut s = ManualScheduler::new();
        assert!(!s.is_running());

        s.start(Duration::from_secs(1));
        assert!(s.is_running());
        assert_eq!(s.period(), Some(Duration::from_secs(1)));
        assert_eq!(s.starts(), 1);

        s.stop();
        assert!(!s.is_running());
        s.stop();
        assert!(!s.is_running());
    }

    #[test]
    fn test_manual_scheduler_counts_fired() {
        let mut s = ManualScheduler::new();
        s.start(Duration::from_secs(1));
        s.fired();
        s.fired();
        assert_eq!(s.fired_count(), 2);
    }

    #[test]
    fn test_interval_scheduler_deadlines() {
        let mut s = IntervalScheduler::new();
        assert_eq!(s.deadline(), None);

        let before = Instant::now();
        s.start(Duration::from_millis(50));
        let first = s.deadline().unwrap();
        assert!(first >= before + Duration::from_millis(50));
        assert!(!s.is_due(before));
        assert!(s.is_due(first));

        s.fired();
        assert_eq!(s.deadline(), Some(first + Duration::from_millis(50)));

        s.stop();
        assert_eq!(s.deadline(), None);
        assert!(!s.is_due(first + Duration::from_secs(10)));
    }

    #[test]
    fn test_interval_scheduler_fired_when_stopped_is_noop() {
        let mut s = IntervalScheduler::new();
        s.fired();
        assert_eq!(s.deadline(), None);
    }
}
