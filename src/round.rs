use std::fmt;
use std::time::Duration;

use tracing::{debug, trace};

use crate::question::{AnswerOutcome, Question, QuestionView};
use crate::scoring::{
    accuracy_percent, is_perfect, score_correct_answer, star_rating, PERFECT_BONUS,
    QUESTIONS_PER_ROUND, TIME_LIMIT_SECS,
};
use crate::session::{QuestionOutcome, RoundOptions, RoundPhase, RoundState};
use crate::timer::{ManualScheduler, Scheduler};

const TICK_PERIOD: Duration = Duration::from_secs(1);

type TickCallback = Box<dyn FnMut(u32)>;
type TimeUpCallback = Box<dyn FnMut()>;

/// Summary of a finished round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundResult {
    pub score: u32,
    pub correct: u32,
    pub total: u32,
    pub accuracy: u32,
    pub best_streak: u32,
    pub stars: u8,
    pub is_perfect: bool,
}

/// What a delivered tick did to the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Tick(u32),
    TimeUp,
}

/// Drives one round of up to ten questions.
///
/// The countdown is delegated to a [`Scheduler`]; the engine arms it when a question starts
/// and cancels it on answer, timeout and [`RoundEngine::destroy`]. Ticks only count while a
/// countdown is armed, so a late tick can never touch an answered or destroyed round.
pub struct RoundEngine<S: Scheduler = ManualScheduler> {
    state: RoundState,
    scheduler: S,
    on_tick: Option<TickCallback>,
    on_time_up: Option<TimeUpCallback>,
}

impl RoundEngine<ManualScheduler> {
    pub fn new() -> Self {
        Self::with_scheduler(ManualScheduler::new())
    }
}

impl Default for RoundEngine<ManualScheduler> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Scheduler> fmt::Debug for RoundEngine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoundEngine")
            .field("state", &self.state)
            .field("on_tick", &self.on_tick.is_some())
            .field("on_time_up", &self.on_time_up.is_some())
            .finish()
    }
}

impl<S: Scheduler> RoundEngine<S> {
    pub fn with_scheduler(scheduler: S) -> Self {
        Self {
            state: RoundState::default(),
            scheduler,
            on_tick: None,
            on_time_up: None,
        }
    }

    /// Register the per-second countdown notification.
    pub fn on_tick(&mut self, callback: impl FnMut(u32) + 'static) {
        self.on_tick = Some(Box::new(callback));
    }

    /// Register the notification fired when a question's countdown runs out.
    pub fn on_time_up(&mut self, callback: impl FnMut() + 'static) {
        self.on_time_up = Some(Box::new(callback));
    }

    pub fn start_round(&mut self, mut questions: Vec<Question>, options: RoundOptions) {
        self.stop_timer();
        questions.truncate(QUESTIONS_PER_ROUND);

        self.state = RoundState {
            questions,
            timer_enabled: !options.no_timer,
            ..RoundState::default()
        };

        debug!(
            total = self.state.total(),
            no_timer = options.no_timer,
            "round started"
        );

        if self.state.questions.is_empty() {
            self.state.phase = RoundPhase::RoundComplete;
            debug!("round has no questions, completed immediately");
            return;
        }

        self.state.phase = RoundPhase::Playing;
        self.begin_question();
    }

    pub fn current_question(&self) -> Option<QuestionView<'_>> {
        match self.state.phase {
            RoundPhase::Idle | RoundPhase::RoundComplete => None,
            RoundPhase::Playing | RoundPhase::Answered => {
                let question = self.state.current()?;
                Some(QuestionView {
                    prompt: question.prompt(),
                    choices: question.choices(),
                    number: self.state.index + 1,
                    total: self.state.total(),
                })
            }
        }
    }

    /// Answer the current question. Returns `None` unless the round is `Playing`.
    pub fn submit_answer(&mut self, choice_index: usize) -> Option<AnswerOutcome> {
        if self.state.phase != RoundPhase::Playing {
            return None;
        }

        self.stop_timer();
        self.state.phase = RoundPhase::Answered;

        let question = self.state.questions.get(self.state.index)?;
        let correct = question.is_correct(choice_index);

        let mut outcome = AnswerOutcome {
            correct,
            correct_index: question.correct_index(),
            explanation: question.explanation().map(str::to_owned),
            deep_dive: question.deep_dive().map(str::to_owned),
            points_earned: 0,
            streak: 0,
            speed_bonus: 0,
            streak_multiplier: 1.0,
        };

        if correct {
            self.state.streak += 1;
            self.state.correct_count += 1;
            self.state.best_streak = self.state.best_streak.max(self.state.streak);

            let points = score_correct_answer(self.state.seconds_remaining, self.state.streak);
            self.state.score += points.earned;

            outcome.points_earned = points.earned;
            outcome.speed_bonus = points.speed_bonus;
            outcome.streak_multiplier = points.multiplier;
            self.state.outcomes.push(QuestionOutcome::Correct {
                points: points.earned,
            });
        } else {
            self.state.streak = 0;
            self.state.outcomes.push(QuestionOutcome::Wrong {
                choice: choice_index,
            });
        }
        outcome.streak = self.state.streak;

        debug!(
            question = self.state.index + 1,
            correct,
            points = outcome.points_earned,
            streak = self.state.streak,
            "answer submitted"
        );

        Some(outcome)
    }

    /// Move past an answered question. Returns the next question, or `None` once the round
    /// is complete (or when called outside `Answered`).
    pub fn next_question(&mut self) -> Option<QuestionView<'_>> {
        if self.state.phase != RoundPhase::Answered {
            return None;
        }

        self.state.index += 1;

        if self.state.index >= self.state.total() {
            self.complete_round();
            return None;
        }

        self.state.phase = RoundPhase::Playing;
        self.begin_question();
        self.current_question()
    }

    /// Final summary; `None` until the round is complete.
    pub fn round_result(&self) -> Option<RoundResult> {
        if self.state.phase != RoundPhase::RoundComplete {
            return None;
        }

        let total = self.state.total() as u32;
        let correct = self.state.correct_count;
        let accuracy = accuracy_percent(correct, total);

        Some(RoundResult {
            score: self.state.score,
            correct,
            total,
            accuracy,
            best_streak: self.state.best_streak,
            stars: star_rating(accuracy),
            is_perfect: is_perfect(correct, total),
        })
    }

    /// Deliver one countdown tick.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        if self.state.phase != RoundPhase::Playing || !self.state.timer_armed {
            return None;
        }

        self.scheduler.fired();
        self.state.seconds_remaining = self.state.seconds_remaining.saturating_sub(1);
        let remaining = self.state.seconds_remaining;
        trace!(remaining, "tick");

        if let Some(callback) = self.on_tick.as_mut() {
            callback(remaining);
        }

        if remaining > 0 {
            return Some(TimerEvent::Tick(remaining));
        }

        self.stop_timer();
        self.state.streak = 0;
        self.state.phase = RoundPhase::Answered;
        self.state.outcomes.push(QuestionOutcome::TimedOut);
        debug!(question = self.state.index + 1, "time up");

        if let Some(callback) = self.on_time_up.as_mut() {
            callback();
        }

        Some(TimerEvent::TimeUp)
    }

    /// Cancel any countdown and drop the registered callbacks. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        self.stop_timer();
        self.on_tick = None;
        self.on_time_up = None;
    }

    pub fn phase(&self) -> RoundPhase {
        self.state.phase
    }

    pub fn score(&self) -> u32 {
        self.state.score
    }

    pub fn streak(&self) -> u32 {
        self.state.streak
    }

    pub fn best_streak(&self) -> u32 {
        self.state.best_streak
    }

    pub fn correct_count(&self) -> u32 {
        self.state.correct_count
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.state.seconds_remaining
    }

    /// 0-based index of the current question.
    pub fn question_index(&self) -> usize {
        self.state.index
    }

    pub fn is_timer_running(&self) -> bool {
        self.state.timer_armed
    }

    /// The current question once it has been resolved, so the answer can be revealed.
    pub fn answered_question(&self) -> Option<&Question> {
        match self.state.phase {
            RoundPhase::Answered => self.state.current(),
            _ => None,
        }
    }

    pub fn outcomes(&self) -> &[QuestionOutcome] {
        &self.state.outcomes
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    fn begin_question(&mut self) {
        self.state.seconds_remaining = TIME_LIMIT_SECS;
        if self.state.timer_enabled {
            self.start_timer();
        }
    }

    fn start_timer(&mut self) {
        self.stop_timer();

        if let Some(callback) = self.on_tick.as_mut() {
            callback(self.state.seconds_remaining);
        }

        self.scheduler.start(TICK_PERIOD);
        self.state.timer_armed = true;
    }

    fn stop_timer(&mut self) {
        if self.state.timer_armed {
            self.scheduler.stop();
            self.state.timer_armed = false;
        }
    }

    fn complete_round(&mut self) {
        self.stop_timer();
        self.state.phase = RoundPhase::RoundComplete;

        let total = self.state.total() as u32;
        if is_perfect(self.state.correct_count, total) {
            self.state.score += PERFECT_BONUS;
        }

        debug!(
            score = self.state.score,
            correct = self.state.correct_count,
            total,
            "round complete"
        );
    }
}
