use crate::question::Question;
use crate::scoring::TIME_LIMIT_SECS;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundOptions {
    /// Play without a countdown. Answers then always earn the full speed bonus.
    pub no_timer: bool,
}

/// Lifecycle of a round: Idle -> Playing <-> Answered -> RoundComplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum RoundPhase {
    #[default]
    Idle,
    Playing,
    Answered,
    RoundComplete,
}

/// How a single question of the round was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionOutcome {
    Correct { points: u32 },
    Wrong { choice: usize },
    TimedOut,
}

impl QuestionOutcome {
    pub fn is_correct(&self) -> bool {
        matches!(self, QuestionOutcome::Correct { .. })
    }
}

/// Bookkeeping owned by one engine for the round in progress.
#[derive(Debug, Clone)]
pub struct RoundState {
    pub questions: Vec<Question>,
    pub index: usize,
    pub phase: RoundPhase,
    pub score: u32,
    pub streak: u32,
    pub best_streak: u32,
    pub correct_count: u32,
    pub seconds_remaining: u32,
    pub timer_enabled: bool,
    pub timer_armed: bool,
    pub outcomes: Vec<QuestionOutcome>,
}

impl Default for RoundState {
    fn default() -> Self {
        Self {
            questions: Vec::new(),
            index: 0,
            phase: RoundPhase::Idle,
            score: 0,
            streak: 0,
            best_streak: 0,
            correct_count: 0,
            seconds_remaining: TIME_LIMIT_SECS,
            timer_enabled: true,
            timer_armed: false,
            outcomes: Vec::new(),
        }
    }
}

impl RoundState {
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn current(&self) -> Option<&Question> {
        self.questions.get(self.index)
    }
}
