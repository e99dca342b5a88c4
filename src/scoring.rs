//! Point calculation for a round: speed bonus, streak multiplier, stars and the perfect bonus.

use crate::util::percent;

/// Seconds on the clock for each question.
pub const TIME_LIMIT_SECS: u32 = 15;
pub const BASE_POINTS: u32 = 100;
pub const MAX_SPEED_BONUS: u32 = 50;
pub const PERFECT_BONUS: u32 = 500;
pub const QUESTIONS_PER_ROUND: usize = 10;

/// (minimum streak, multiplier), highest tier first.
const STREAK_TIERS: [(u32, f64); 3] = [(10, 3.0), (5, 2.0), (3, 1.5)];

/// Breakdown of the points awarded for one correct answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Points {
    pub earned: u32,
    pub speed_bonus: u32,
    pub multiplier: f64,
}

/// Bonus proportional to the time left, capped at the time limit.
pub fn speed_bonus(seconds_remaining: u32) -> u32 {
    let secs = seconds_remaining.min(TIME_LIMIT_SECS);
    (MAX_SPEED_BONUS as f64 * secs as f64 / TIME_LIMIT_SECS as f64).round() as u32
}

pub fn streak_multiplier(streak: u32) -> f64 {
    STREAK_TIERS
        .iter()
        .find(|(threshold, _)| streak >= *threshold)
        .map_or(1.0, |(_, multiplier)| *multiplier)
}

/// Points for a correct answer. `streak` must already include this answer.
pub fn score_correct_answer(seconds_remaining: u32, streak: u32) -> Points {
    let speed_bonus = speed_bonus(seconds_remaining);
    let multiplier = streak_multiplier(streak);
    let earned = ((BASE_POINTS + speed_bonus) as f64 * multiplier).round() as u32;

    Points {
        earned,
        speed_bonus,
        multiplier,
    }
}

pub fn accuracy_percent(correct: u32, total: u32) -> u32 {
    percent(correct, total)
}

/// 1 to 3 stars from a rounded accuracy percentage.
pub fn star_rating(accuracy: u32) -> u8 {
    match accuracy {
        a if a >= 90 => 3,
        a if a >= 70 => 2,
        _ => 1,
    }
}

pub fn is_perfect(correct: u32, total: u32) -> bool {
    total > 0 && correct == total
}
