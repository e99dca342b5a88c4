use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

/// Unified event type consumed by the round loop
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuizEvent {
    /// 0-based choice index.
    Answer(usize),
    Next,
    Quit,
    Invalid(String),
    Tick,
}

impl QuizEvent {
    /// Parse one line of player input: `1`..`n` answers, empty advances, `q` quits.
    pub fn parse_line(line: &str) -> Self {
        let input = line.trim();
        match input {
            "" => QuizEvent::Next,
            "q" | "Q" | "quit" => QuizEvent::Quit,
            _ => match input.parse::<usize>() {
                Ok(n) if n > 0 => QuizEvent::Answer(n - 1),
                _ => QuizEvent::Invalid(input.to_string()),
            },
        }
    }
}

/// Source of player input events
pub trait QuizEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<QuizEvent, RecvTimeoutError>;
}

/// Production event source reading lines from stdin on a background thread
pub struct StdinEventSource {
    rx: Receiver<QuizEvent>,
}

impl StdinEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(QuizEvent::parse_line(&line)).is_err() {
                    break;
                }
            }
        });

        Self { rx }
    }
}

impl Default for StdinEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizEventSource for StdinEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<QuizEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    /// Longest wait for input when no countdown deadline is pending.
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<QuizEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<QuizEvent>) -> Self {
        Self { rx }
    }
}

impl QuizEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<QuizEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the round one event/tick at a time
pub struct Runner<E: QuizEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: QuizEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks until input arrives or `deadline` passes (the ticker interval when there is
    /// none) and returns the event, or Tick on timeout. A closed input yields Quit.
    pub fn step(&self, deadline: Option<Instant>) -> QuizEvent {
        let timeout = deadline.map_or(self.ticker.interval(), |d| {
            d.saturating_duration_since(Instant::now())
        });
        match self.event_source.recv_timeout(timeout) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => QuizEvent::Tick,
            Err(RecvTimeoutError::Disconnected) => QuizEvent::Quit,
        }
    }
}
