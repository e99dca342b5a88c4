//! Line-oriented terminal driver for a round.
//!
//! The loop waits on the [`Runner`] until the countdown deadline of the engine's
//! [`IntervalScheduler`], delivers due ticks, and renders questions and outcomes to `out`.

use std::io::{self, Write};
use std::time::Instant;

use tracing::debug;

use crate::question::AnswerOutcome;
use crate::round::{RoundEngine, RoundResult, TimerEvent};
use crate::runtime::{QuizEvent, QuizEventSource, Runner, Ticker};
use crate::session::RoundPhase;
use crate::timer::IntervalScheduler;

/// Seconds at which the remaining time is announced.
const ANNOUNCE_AT: [u32; 6] = [10, 5, 4, 3, 2, 1];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundExit {
    Completed(RoundResult),
    Quit,
}

/// Play the round already started on `engine` until it completes or the player quits.
pub fn run_round<E, T, W>(
    engine: &mut RoundEngine<IntervalScheduler>,
    runner: &Runner<E, T>,
    out: &mut W,
) -> io::Result<RoundExit>
where
    E: QuizEventSource,
    T: Ticker,
    W: Write,
{
    render_question(engine, out)?;

    loop {
        if let Some(result) = engine.round_result() {
            return Ok(RoundExit::Completed(result));
        }

        match runner.step(engine.scheduler().deadline()) {
            QuizEvent::Tick => {
                if !engine.scheduler().is_due(Instant::now()) {
                    continue;
                }
                match engine.tick() {
                    Some(TimerEvent::Tick(secs)) if ANNOUNCE_AT.contains(&secs) => {
                        writeln!(out, "  {secs}s left")?;
                    }
                    Some(TimerEvent::TimeUp) => render_time_up(engine, out)?,
                    _ => {}
                }
            }
            QuizEvent::Answer(choice) => {
                if engine.phase() != RoundPhase::Playing {
                    render_continue(engine, out)?;
                    continue;
                }
                let choices = engine.current_question().map_or(0, |view| view.choices.len());
                if choice >= choices {
                    writeln!(out, "Pick a number from 1 to {choices}.")?;
                    continue;
                }
                if let Some(outcome) = engine.submit_answer(choice) {
                    render_outcome(engine, &outcome, out)?;
                }
            }
            QuizEvent::Next => {
                if engine.phase() == RoundPhase::Answered && engine.next_question().is_some() {
                    render_question(engine, out)?;
                }
            }
            QuizEvent::Invalid(input) => {
                writeln!(out, "Unrecognized input {input:?}: type a number, Enter, or q.")?;
            }
            QuizEvent::Quit => {
                debug!(question = engine.question_index() + 1, "round abandoned");
                engine.destroy();
                return Ok(RoundExit::Quit);
            }
        }
    }
}

fn render_question<W: Write>(engine: &RoundEngine<IntervalScheduler>, out: &mut W) -> io::Result<()> {
    let Some(view) = engine.current_question() else {
        return Ok(());
    };

    writeln!(out)?;
    writeln!(out, "Question {}/{}", view.number, view.total)?;
    writeln!(out, "{}", view.prompt)?;
    for (i, choice) in view.choices.iter().enumerate() {
        writeln!(out, "  {}) {}", i + 1, choice)?;
    }
    if engine.is_timer_running() {
        writeln!(out, "[{}s] Your answer:", engine.seconds_remaining())?;
    } else {
        writeln!(out, "Your answer:")?;
    }
    out.flush()
}

fn render_outcome<W: Write>(
    engine: &RoundEngine<IntervalScheduler>,
    outcome: &AnswerOutcome,
    out: &mut W,
) -> io::Result<()> {
    if outcome.correct {
        write!(out, "Correct! +{}", outcome.points_earned)?;
        if outcome.streak_multiplier > 1.0 {
            write!(out, " (streak {}, x{})", outcome.streak, outcome.streak_multiplier)?;
        }
        writeln!(out)?;
    } else if let Some(question) = engine.answered_question() {
        writeln!(
            out,
            "Wrong. The answer was {}) {}",
            outcome.correct_index + 1,
            question.correct_choice()
        )?;
    }

    render_notes(outcome.explanation.as_deref(), outcome.deep_dive.as_deref(), out)?;
    render_continue(engine, out)
}

fn render_time_up<W: Write>(engine: &RoundEngine<IntervalScheduler>, out: &mut W) -> io::Result<()> {
    if let Some(question) = engine.answered_question() {
        writeln!(
            out,
            "Time's up! The answer was {}) {}",
            question.correct_index() + 1,
            question.correct_choice()
        )?;
        render_notes(question.explanation(), question.deep_dive(), out)?;
    }
    render_continue(engine, out)
}

fn render_notes<W: Write>(
    explanation: Option<&str>,
    deep_dive: Option<&str>,
    out: &mut W,
) -> io::Result<()> {
    if let Some(explanation) = explanation {
        writeln!(out, "  {explanation}")?;
    }
    if let Some(deep_dive) = deep_dive {
        writeln!(out, "  More: {deep_dive}")?;
    }
    Ok(())
}

fn render_continue<W: Write>(engine: &RoundEngine<IntervalScheduler>, out: &mut W) -> io::Result<()> {
    let total = engine.current_question().map_or(0, |view| view.total);
    if engine.question_index() + 1 >= total {
        writeln!(out, "Press Enter to see your results.")?;
    } else {
        writeln!(out, "Press Enter for the next question.")?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::Question;
    use crate::runtime::{FixedTicker, TestEventSource};
    use crate::session::RoundOptions;
    use std::sync::mpsc;
    use std::time::Duration;

    fn questions(count: usize) -> Vec<Question> {
        (0..count)
            .map(|n| {
                Question::new(format!("question {n}"), vec!["yes".into(), "no".into()], 0)
                    .unwrap()
                    .with_explanation("because")
            })
            .collect()
    }

    fn play(events: Vec<QuizEvent>, count: usize) -> (io::Result<RoundExit>, String) {
        let (tx, rx) = mpsc::channel();
        for event in events {
            tx.send(event).unwrap();
        }
        drop(tx);

        let runner = Runner::new(
            TestEventSource::new(rx),
            FixedTicker::new(Duration::from_millis(5)),
        );
        let mut engine = RoundEngine::with_scheduler(IntervalScheduler::new());
        engine.start_round(questions(count), RoundOptions { no_timer: true });

        let mut out = Vec::new();
        let exit = run_round(&mut engine, &runner, &mut out);
        (exit, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_full_round_completes() {
        let (exit, output) = play(
            vec![
                QuizEvent::Answer(0),
                QuizEvent::Next,
                QuizEvent::Answer(1),
                QuizEvent::Next,
            ],
            2,
        );

        let result = match exit.unwrap() {
            RoundExit::Completed(result) => result,
            other => panic!("expected completion, got {other:?}"),
        };
        assert_eq!(result.correct, 1);
        assert_eq!(result.total, 2);
        assert_eq!(result.score, 150);
        assert!(output.contains("Question 1/2"));
        assert!(output.contains("Correct! +150"));
        assert!(output.contains("Wrong. The answer was 1) yes"));
        assert!(output.contains("Press Enter to see your results."));
    }

    #[test]
    fn test_out_of_range_choice_is_rejected() {
        let (exit, output) = play(
            vec![QuizEvent::Answer(5), QuizEvent::Answer(0), QuizEvent::Next],
            1,
        );
        assert!(matches!(exit.unwrap(), RoundExit::Completed(r) if r.correct == 1));
        assert!(output.contains("Pick a number from 1 to 2."));
    }

    #[test]
    fn test_answer_after_last_question_points_to_results() {
        let (exit, output) = play(
            vec![QuizEvent::Answer(0), QuizEvent::Answer(1), QuizEvent::Next],
            1,
        );
        assert!(matches!(exit.unwrap(), RoundExit::Completed(r) if r.correct == 1));
        assert_eq!(output.matches("Press Enter to see your results.").count(), 2);
        assert!(!output.contains("Press Enter for the next question."));
    }

    #[test]
    fn test_quit_mid_round() {
        let (exit, output) = play(vec![QuizEvent::Answer(0), QuizEvent::Quit], 3);
        assert_eq!(exit.unwrap(), RoundExit::Quit);
        assert!(!output.contains("Question 2/3"));
    }

    #[test]
    fn test_closed_input_quits() {
        let (exit, _) = play(vec![QuizEvent::Invalid("x".into())], 2);
        assert_eq!(exit.unwrap(), RoundExit::Quit);
    }
}
