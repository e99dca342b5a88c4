use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::warn;

use crate::bank::{BankEntry, QuestionBank};
use crate::question::Question;
use crate::review::{select_review, QuestionHistory};
use crate::shuffle::select_daily;

/// Where a round's questions come from.
#[derive(Debug, Clone, PartialEq, Eq, strum_macros::Display)]
pub enum RoundMode {
    Category(String),
    Daily,
    Review,
}

/// A playable question together with its bank position, so results can be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedQuestion {
    pub category_id: String,
    pub index: usize,
    pub question: Question,
}

/// Builds question lists for rounds from a bank and the player's history.
pub struct RoundSource<'a> {
    bank: &'a QuestionBank,
    history: &'a QuestionHistory,
}

impl<'a> RoundSource<'a> {
    pub fn new(bank: &'a QuestionBank, history: &'a QuestionHistory) -> Self {
        Self { bank, history }
    }

    /// Pick up to `count` questions in play order. Choice order is shuffled with `rng`
    /// in every mode; only daily question selection is independent of it.
    pub fn plan<R: Rng + ?Sized>(
        &self,
        mode: &RoundMode,
        count: usize,
        today: NaiveDate,
        rng: &mut R,
    ) -> Vec<PlannedQuestion> {
        let entries: Vec<BankEntry<'_>> = match mode {
            RoundMode::Category(id) => match self.bank.category(id) {
                Some(_) => {
                    let pool: Vec<_> = self
                        .bank
                        .entries()
                        .filter(|e| e.category_id == id.as_str())
                        .collect();
                    pool.choose_multiple(rng, count).copied().collect()
                }
                None => {
                    warn!(category = %id, "unknown category");
                    Vec::new()
                }
            },
            RoundMode::Daily => {
                let pool: Vec<_> = self.bank.entries().collect();
                select_daily(&pool, today, count)
            }
            RoundMode::Review => select_review(self.bank, self.history, today, count, rng)
                .into_iter()
                .map(|c| BankEntry {
                    category_id: c.category_id,
                    index: c.index,
                    question: c.question,
                })
                .collect(),
        };

        entries
            .into_iter()
            .filter_map(|entry| match entry.question.to_question(rng) {
                Ok(question) => Some(PlannedQuestion {
                    category_id: entry.category_id.to_string(),
                    index: entry.index,
                    question,
                }),
                Err(e) => {
                    warn!(
                        category = entry.category_id,
                        index = entry.index,
                        "skipping invalid question: {e}"
                    );
                    None
                }
            })
            .collect()
    }
}
