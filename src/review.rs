//! Adaptive review: prioritize questions the player has missed.
//!
//! Every candidate gets a weight from its history record. Candidates are then ranked by
//! `weight * (0.5 + r)` with `r` uniform in `[0, 1)`, so heavier questions are more likely
//! to make the cut without crowding everything else out.

use std::collections::HashMap;

use chrono::NaiveDate;
use itertools::Itertools;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::bank::{CategoryMeta, QuestionBank, RawQuestion};
use crate::util::{percent, ratio};

/// Default number of questions in a review round.
pub const REVIEW_COUNT: usize = 10;

/// Weights at or below this are treated as mastered and never offered.
pub const MASTERED_THRESHOLD: f64 = 0.1;

const WEIGHT_UNSEEN: f64 = 2.0;
const WEIGHT_LAST_MISSED: f64 = 4.0;
const WRONG_RATE_SCALE: f64 = 3.0;
const DAYS_SINCE_UNKNOWN: i64 = 999;

/// Accumulated answers for one question. Missing fields deserialize to their empty values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuestionRecord {
    pub correct: u32,
    pub wrong: u32,
    pub last_seen: Option<NaiveDate>,
    /// Whether the most recent attempt was correct.
    pub last_result: Option<bool>,
}

impl QuestionRecord {
    pub fn attempts(&self) -> u32 {
        self.correct.saturating_add(self.wrong)
    }

    pub fn wrong_rate(&self) -> Option<f64> {
        ratio(self.wrong, self.attempts())
    }
}

/// History keyed by [`history_key`].
pub type QuestionHistory = HashMap<String, QuestionRecord>;

/// Read a history map record by record. A record that does not parse is replaced by an
/// empty one so the rest of the history survives.
pub fn deserialize_history<'de, D>(deserializer: D) -> Result<QuestionHistory, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<HashMap<String, serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| {
            let record = serde_json::from_value(value).unwrap_or_else(|err| {
                warn!(key = %key, error = %err, "unreadable history record, starting it over");
                QuestionRecord::default()
            });
            (key, record)
        })
        .collect())
}

/// `"{category_id}_{index}"`
pub fn history_key(category_id: &str, index: usize) -> String {
    format!("{category_id}_{index}")
}

/// Split a history key back into category id and question index.
fn parse_history_key(key: &str) -> Option<(&str, usize)> {
    let (category, index) = key.rsplit_once('_')?;
    Some((category, index.parse().ok()?))
}

/// Review priority for a question given its record and today's date.
///
/// A most-recent miss always ranks at the top, even if the question is usually answered
/// correctly.
pub fn review_weight(record: Option<&QuestionRecord>, today: NaiveDate) -> f64 {
    let Some(record) = record.filter(|r| r.attempts() > 0) else {
        return WEIGHT_UNSEEN;
    };

    if record.last_result != Some(true) {
        return WEIGHT_LAST_MISSED;
    }

    match record.wrong_rate() {
        Some(rate) if rate > 0.0 => WRONG_RATE_SCALE * rate,
        _ => {
            let days_since = record
                .last_seen
                .map_or(DAYS_SINCE_UNKNOWN, |seen| (today - seen).num_days());
            match days_since {
                d if d < 1 => 0.3,
                d if d < 3 => 0.5,
                d if d < 7 => 0.8,
                _ => 1.0,
            }
        }
    }
}

pub fn is_mastered(weight: f64) -> bool {
    weight <= MASTERED_THRESHOLD
}

/// A question eligible for review, with where it lives in the bank.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewCandidate<'a> {
    pub category_id: &'a str,
    pub index: usize,
    pub question: &'a RawQuestion,
    pub weight: f64,
}

/// Rank candidates by randomized priority and keep the top `count`, highest first.
pub fn weighted_select<'a, R: Rng + ?Sized>(
    candidates: Vec<ReviewCandidate<'a>>,
    count: usize,
    rng: &mut R,
) -> Vec<ReviewCandidate<'a>> {
    candidates
        .into_iter()
        .map(|candidate| {
            let priority = candidate.weight * (0.5 + rng.gen::<f64>());
            (priority, candidate)
        })
        .sorted_by(|a, b| b.0.total_cmp(&a.0))
        .take(count)
        .map(|(_, candidate)| candidate)
        .collect()
}

/// Weigh every question in the bank against the history and pick a review set.
pub fn select_review<'a, R: Rng + ?Sized>(
    bank: &'a QuestionBank,
    history: &QuestionHistory,
    today: NaiveDate,
    count: usize,
    rng: &mut R,
) -> Vec<ReviewCandidate<'a>> {
    let candidates = bank
        .entries()
        .filter_map(|entry| {
            let record = history.get(&history_key(entry.category_id, entry.index));
            let weight = review_weight(record, today);
            (!is_mastered(weight)).then_some(ReviewCandidate {
                category_id: entry.category_id,
                index: entry.index,
                question: entry.question,
                weight,
            })
        })
        .collect();

    weighted_select(candidates, count, rng)
}

/// Record one answer in the history, creating the entry if needed.
pub fn record_result(
    history: &mut QuestionHistory,
    category_id: &str,
    index: usize,
    correct: bool,
    today: NaiveDate,
) {
    let record = history.entry(history_key(category_id, index)).or_default();
    if correct {
        record.correct = record.correct.saturating_add(1);
    } else {
        record.wrong = record.wrong.saturating_add(1);
    }
    record.last_seen = Some(today);
    record.last_result = Some(correct);
}

/// Per-category accuracy summary for the weakness screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWeakness {
    pub category_id: String,
    pub name: String,
    pub emoji: String,
    pub color: String,
    pub total_answered: u32,
    pub accuracy: u32,
    /// Questions answered at least once with a wrong rate of 50% or more.
    pub weak_count: u32,
}

/// Aggregate the history per category, worst accuracy first.
pub fn analyze_weaknesses(
    categories: &[CategoryMeta],
    history: &QuestionHistory,
) -> Vec<CategoryWeakness> {
    let mut per_category: HashMap<&str, (u32, u32, u32)> = HashMap::new();
    for (key, record) in history {
        let Some((category_id, _)) = parse_history_key(key) else {
            continue;
        };
        let totals = per_category.entry(category_id).or_default();
        totals.0 = totals.0.saturating_add(record.correct);
        totals.1 = totals.1.saturating_add(record.wrong);
        if record.wrong_rate().is_some_and(|rate| rate >= 0.5) {
            totals.2 += 1;
        }
    }

    categories
        .iter()
        .map(|meta| {
            let (correct, wrong, weak_count) = per_category
                .get(meta.id.as_str())
                .copied()
                .unwrap_or_default();
            let total_answered = correct.saturating_add(wrong);
            CategoryWeakness {
                category_id: meta.id.clone(),
                name: meta.name.clone(),
                emoji: meta.emoji.clone(),
                color: meta.color.clone(),
                total_answered,
                accuracy: percent(correct, total_answered),
                weak_count,
            }
        })
        .sorted_by_key(|w| w.accuracy)
        .collect()
}
