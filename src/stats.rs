//! Player progression: lifetime level curve, play streak, per-category stats and the
//! persisted [`Profile`] record.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::review::{record_result, QuestionHistory};
use crate::round::RoundResult;
use crate::round_source::PlannedQuestion;
use crate::scoring::star_rating;
use crate::session::QuestionOutcome;
use crate::util::percent;

pub const MAX_LEVEL: u32 = 50;

/// (lifetime score, level). Levels between milestones are interpolated linearly.
const LEVEL_MILESTONES: [(u64, u32); 13] = [
    (0, 1),
    (2_800, 2),
    (8_000, 3),
    (15_000, 4),
    (25_000, 5),
    (40_000, 7),
    (60_000, 10),
    (90_000, 15),
    (130_000, 20),
    (170_000, 25),
    (210_000, 30),
    (270_000, 40),
    (340_000, 50),
];

const MAX_LEVEL_SCORE: u64 = 340_000;

/// (minimum level, title), lowest first.
const LEVEL_TITLES: [(u32, &str); 23] = [
    (1, "Fledgling"),
    (2, "Wide-Eyed Beginner"),
    (3, "Curious Egg"),
    (4, "Somewhat Informed"),
    (5, "Trivia Apprentice"),
    (7, "Fact Collector"),
    (10, "Trivia Hunter"),
    (13, "Know-It-All Boss"),
    (15, "Walking Encyclopedia"),
    (18, "Quiz Demon"),
    (20, "Erudite Master"),
    (23, "Knowledge Wizard"),
    (25, "All-Round Intellectual"),
    (28, "Living Dictionary"),
    (30, "Trivia King"),
    (33, "Guardian of Knowledge"),
    (35, "Everything Enthusiast"),
    (38, "Human Search Engine"),
    (40, "Legendary Quiz Champion"),
    (43, "Knowledge Incarnate"),
    (45, "Genius of Geniuses"),
    (48, "Transcendent"),
    (50, "All-Knowing"),
];

pub fn calc_level(lifetime_score: u64) -> u32 {
    if lifetime_score >= MAX_LEVEL_SCORE {
        return MAX_LEVEL;
    }

    LEVEL_MILESTONES
        .windows(2)
        .rev()
        .find(|pair| lifetime_score >= pair[0].0)
        .map_or(1, |pair| {
            let (from_score, from_level) = pair[0];
            let (to_score, to_level) = pair[1];
            let progress = (lifetime_score - from_score) as f64 / (to_score - from_score) as f64;
            (from_level as f64 + progress * (to_level - from_level) as f64).floor() as u32
        })
}

/// Lowest lifetime score the curve maps to `level`, rounded down.
pub fn score_for_level(level: u32) -> u64 {
    if level <= 1 {
        return 0;
    }
    if level >= MAX_LEVEL {
        return MAX_LEVEL_SCORE;
    }

    LEVEL_MILESTONES
        .windows(2)
        .find(|pair| level >= pair[0].1 && level < pair[1].1)
        .map_or(MAX_LEVEL_SCORE, |pair| {
            let (from_score, from_level) = pair[0];
            let (to_score, to_level) = pair[1];
            let ratio = (level - from_level) as f64 / (to_level - from_level) as f64;
            (from_score as f64 + ratio * (to_score - from_score) as f64).floor() as u64
        })
}

pub fn level_title(level: u32) -> &'static str {
    LEVEL_TITLES
        .iter()
        .rev()
        .find(|(min_level, _)| level >= *min_level)
        .map_or(LEVEL_TITLES[0].1, |(_, title)| *title)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelInfo {
    pub level: u32,
    pub title: &'static str,
    pub current_score: u64,
    pub next_level_score: u64,
    /// Progress towards the next level in `[0, 1]`; 1 at the cap.
    pub progress: f64,
}

impl LevelInfo {
    pub fn for_score(lifetime_score: u64) -> Self {
        let level = calc_level(lifetime_score);
        let next_level_score = score_for_level((level + 1).min(MAX_LEVEL));

        let progress = if level >= MAX_LEVEL {
            1.0
        } else {
            let floor = score_for_level(level);
            match next_level_score.saturating_sub(floor) {
                0 => 1.0,
                range => {
                    (lifetime_score.saturating_sub(floor) as f64 / range as f64).clamp(0.0, 1.0)
                }
            }
        };

        Self {
            level,
            title: level_title(level),
            current_score: lifetime_score,
            next_level_score,
            progress,
        }
    }
}

/// Streak after playing on `today`: consecutive days extend it, a second play on the same day
/// keeps it, anything else starts over at 1.
pub fn next_play_streak(last_play: Option<NaiveDate>, streak: u32, today: NaiveDate) -> u32 {
    match last_play {
        Some(last) if last == today => streak.max(1),
        Some(last) if today.pred_opt() == Some(last) => streak + 1,
        _ => 1,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CategoryStats {
    pub high_score: u32,
    pub total_correct: u32,
    pub total_attempted: u32,
    pub times_played: u32,
}

impl CategoryStats {
    pub fn accuracy(&self) -> u32 {
        percent(self.total_correct, self.total_attempted)
    }

    /// 0 for a category that was never played, otherwise 1 to 3.
    pub fn stars(&self) -> u8 {
        match self.times_played {
            0 => 0,
            _ => star_rating(self.accuracy()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DailyRecord {
    pub last_date: Option<NaiveDate>,
    pub last_score: Option<u32>,
}

/// What saving a round changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundSaved {
    pub is_high_score: bool,
    pub level_before: u32,
    pub level_after: u32,
    pub level_up: bool,
}

/// Everything kept about a player between runs. Missing fields load as their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Profile {
    pub version: u32,
    pub lifetime_score: u64,
    pub play_streak: u32,
    pub last_play_date: Option<NaiveDate>,
    pub categories: BTreeMap<String, CategoryStats>,
    pub daily_challenge: DailyRecord,
    #[serde(deserialize_with = "crate::review::deserialize_history")]
    pub question_history: QuestionHistory,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            version: 1,
            lifetime_score: 0,
            play_streak: 0,
            last_play_date: None,
            categories: BTreeMap::new(),
            daily_challenge: DailyRecord::default(),
            question_history: QuestionHistory::new(),
        }
    }
}

impl Profile {
    pub fn level(&self) -> u32 {
        calc_level(self.lifetime_score)
    }

    pub fn level_info(&self) -> LevelInfo {
        LevelInfo::for_score(self.lifetime_score)
    }

    pub fn high_score(&self, category_id: &str) -> u32 {
        self.categories
            .get(category_id)
            .map_or(0, |stats| stats.high_score)
    }

    pub fn category_stats(&self, category_id: &str) -> CategoryStats {
        self.categories
            .get(category_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Fold a finished round into the category stats, lifetime score and play streak.
    pub fn apply_round(
        &mut self,
        category_id: &str,
        result: &RoundResult,
        today: NaiveDate,
    ) -> RoundSaved {
        let level_before = self.level();

        let stats = self.categories.entry(category_id.to_string()).or_default();
        let is_high_score = result.score > stats.high_score;
        if is_high_score {
            stats.high_score = result.score;
        }
        stats.total_correct += result.correct;
        stats.total_attempted += result.total;
        stats.times_played += 1;

        self.lifetime_score += u64::from(result.score);
        self.play_streak = next_play_streak(self.last_play_date, self.play_streak, today);
        self.last_play_date = Some(today);

        let level_after = self.level();
        debug!(
            category = category_id,
            score = result.score,
            level_before,
            level_after,
            "round saved"
        );

        RoundSaved {
            is_high_score,
            level_before,
            level_after,
            level_up: level_after > level_before,
        }
    }

    /// Daily rounds only keep the latest result; they do not count towards categories.
    pub fn apply_daily(&mut self, score: u32, today: NaiveDate) {
        self.daily_challenge = DailyRecord {
            last_date: Some(today),
            last_score: Some(score),
        };
    }

    pub fn daily_result(&self, today: NaiveDate) -> Option<u32> {
        match self.daily_challenge.last_date {
            Some(date) if date == today => self.daily_challenge.last_score,
            _ => None,
        }
    }

    pub fn has_played_daily(&self, today: NaiveDate) -> bool {
        self.daily_challenge.last_date == Some(today)
    }

    /// Record each answered question of a round in the history. `outcomes` is in play order,
    /// so a quit round only records what was answered.
    pub fn record_outcomes(
        &mut self,
        planned: &[PlannedQuestion],
        outcomes: &[QuestionOutcome],
        today: NaiveDate,
    ) {
        for (question, outcome) in planned.iter().zip(outcomes) {
            record_result(
                &mut self.question_history,
                &question.category_id,
                question.index,
                outcome.is_correct(),
                today,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::Question;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn result(score: u32, correct: u32, total: u32) -> RoundResult {
        RoundResult {
            score,
            correct,
            total,
            accuracy: percent(correct, total),
            best_streak: correct,
            stars: star_rating(percent(correct, total)),
            is_perfect: correct == total,
        }
    }

    #[test]
    fn test_calc_level_milestones() {
        assert_eq!(calc_level(0), 1);
        assert_eq!(calc_level(2_799), 1);
        assert_eq!(calc_level(2_800), 2);
        assert_eq!(calc_level(40_000), 7);
        assert_eq!(calc_level(270_000), 40);
        assert_eq!(calc_level(340_000), 50);
        assert_eq!(calc_level(10_000_000), 50);
    }

    #[test]
    fn test_calc_level_interpolates_and_floors() {
        assert_eq!(calc_level(1_400), 1);
        assert_eq!(calc_level(32_500), 6);
        assert_eq!(calc_level(46_667), 8);
        assert_eq!(calc_level(339_999), 49);
    }

    #[test]
    fn test_score_for_level() {
        assert_eq!(score_for_level(0), 0);
        assert_eq!(score_for_level(1), 0);
        assert_eq!(score_for_level(2), 2_800);
        assert_eq!(score_for_level(6), 32_500);
        assert_eq!(score_for_level(8), 46_666);
        assert_eq!(score_for_level(50), 340_000);
        assert_eq!(score_for_level(99), 340_000);
    }

    #[test]
    fn test_level_is_monotonic() {
        let mut previous = 1;
        for score in (0..=350_000).step_by(250) {
            let level = calc_level(score);
            assert!(level >= previous, "level dropped at {score}");
            previous = level;
        }
    }

    #[test]
    fn test_level_titles() {
        assert_eq!(level_title(0), "Fledgling");
        assert_eq!(level_title(1), "Fledgling");
        assert_eq!(level_title(6), "Trivia Apprentice");
        assert_eq!(level_title(14), "Know-It-All Boss");
        assert_eq!(level_title(50), "All-Knowing");
    }

    #[test]
    fn test_level_info() {
        let info = LevelInfo::for_score(0);
        assert_eq!(info.level, 1);
        assert_eq!(info.next_level_score, 2_800);
        assert_eq!(info.progress, 0.0);

        let info = LevelInfo::for_score(1_400);
        assert_eq!(info.level, 1);
        assert!((info.progress - 0.5).abs() < 1e-9);

        let info = LevelInfo::for_score(400_000);
        assert_eq!(info.level, 50);
        assert_eq!(info.title, "All-Knowing");
        assert_eq!(info.next_level_score, 340_000);
        assert_eq!(info.progress, 1.0);
    }

    #[test]
    fn test_play_streak() {
        let today = date(2024, 1, 15);
        assert_eq!(next_play_streak(None, 0, today), 1);
        assert_eq!(next_play_streak(Some(date(2024, 1, 14)), 4, today), 5);
        assert_eq!(next_play_streak(Some(today), 4, today), 4);
        assert_eq!(next_play_streak(Some(date(2024, 1, 12)), 4, today), 1);
        assert_eq!(next_play_streak(Some(date(2023, 12, 31)), 9, date(2024, 1, 1)), 10);
    }

    #[test]
    fn test_category_stats_stars() {
        assert_eq!(CategoryStats::default().stars(), 0);
        assert_eq!(CategoryStats::default().accuracy(), 0);

        let stats = CategoryStats {
            high_score: 900,
            total_correct: 14,
            total_attempted: 20,
            times_played: 2,
        };
        assert_eq!(stats.accuracy(), 70);
        assert_eq!(stats.stars(), 2);
    }

    #[test]
    fn test_apply_round() {
        let mut profile = Profile::default();
        let saved = profile.apply_round("science", &result(1_200, 8, 10), date(2024, 1, 15));
        assert!(saved.is_high_score);
        assert_eq!(saved.level_before, 1);
        assert!(!saved.level_up);

        let saved = profile.apply_round("science", &result(900, 6, 10), date(2024, 1, 16));
        assert!(!saved.is_high_score);
        assert_eq!(saved.level_after, 1);

        let stats = profile.category_stats("science");
        assert_eq!(stats.high_score, 1_200);
        assert_eq!(stats.total_correct, 14);
        assert_eq!(stats.total_attempted, 20);
        assert_eq!(stats.times_played, 2);
        assert_eq!(profile.lifetime_score, 2_100);
        assert_eq!(profile.play_streak, 2);
        assert_eq!(profile.last_play_date, Some(date(2024, 1, 16)));
    }

    #[test]
    fn test_apply_round_level_up() {
        let mut profile = Profile {
            lifetime_score: 2_500,
            ..Profile::default()
        };
        let saved = profile.apply_round("history", &result(400, 3, 10), date(2024, 1, 15));
        assert_eq!(saved.level_before, 1);
        assert_eq!(saved.level_after, 2);
        assert!(saved.level_up);
    }

    #[test]
    fn test_daily_result() {
        let mut profile = Profile::default();
        let today = date(2024, 1, 15);
        assert!(!profile.has_played_daily(today));

        profile.apply_daily(1_500, today);
        assert!(profile.has_played_daily(today));
        assert_eq!(profile.daily_result(today), Some(1_500));
        assert_eq!(profile.daily_result(date(2024, 1, 16)), None);
        assert!(profile.categories.is_empty());
        assert_eq!(profile.lifetime_score, 0);
    }

    #[test]
    fn test_record_outcomes_stops_at_last_answer() {
        let planned: Vec<PlannedQuestion> = (0..3)
            .map(|index| PlannedQuestion {
                category_id: "space".into(),
                index,
                question: Question::new("?", vec!["a".into(), "b".into()], 0).unwrap(),
            })
            .collect();
        let outcomes = [
            QuestionOutcome::Correct { points: 150 },
            QuestionOutcome::TimedOut,
        ];

        let mut profile = Profile::default();
        let today = date(2024, 1, 15);
        profile.record_outcomes(&planned, &outcomes, today);

        assert_eq!(profile.question_history.len(), 2);
        assert_eq!(profile.question_history["space_0"].last_result, Some(true));
        assert_eq!(profile.question_history["space_1"].wrong, 1);
        assert!(!profile.question_history.contains_key("space_2"));
    }

    #[test]
    fn test_profile_deserializes_partial_json() {
        let profile: Profile = serde_json::from_str(
            r#"{"lifetimeScore": 5000, "lastPlayDate": "2024-01-14",
                "categories": {"science": {"highScore": 800, "timesPlayed": 1}}}"#,
        )
        .unwrap();
        assert_eq!(profile.version, 1);
        assert_eq!(profile.level(), 2);
        assert_eq!(profile.high_score("science"), 800);
        assert_eq!(profile.high_score("history"), 0);
        assert!(profile.question_history.is_empty());
    }

    #[test]
    fn test_profile_survives_unreadable_history_record() {
        let profile: Profile = serde_json::from_str(
            r#"{"lifetimeScore": 300, "questionHistory": {
                "science_0": {"correct": 1, "lastSeen": "not-a-date", "lastResult": true},
                "science_1": {"correct": null, "wrong": 2},
                "space_4": {"correct": 3, "wrong": 1, "lastSeen": "2024-01-14", "lastResult": true}
            }}"#,
        )
        .unwrap();

        assert_eq!(profile.lifetime_score, 300);
        assert_eq!(profile.question_history.len(), 3);
        assert_eq!(profile.question_history["science_0"].attempts(), 0);
        assert_eq!(profile.question_history["science_1"].attempts(), 0);
        assert_eq!(profile.question_history["space_4"].correct, 3);
        assert_eq!(
            profile.question_history["space_4"].last_seen,
            Some(date(2024, 1, 14))
        );
    }
}
