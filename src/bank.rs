//! Question bank: categories of raw questions as authored, plus conversion into playable
//! [`Question`]s.

use std::fs;
use std::path::Path;

use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{BankError, QuestionError};
use crate::question::Question;

static BANK_DIR: Dir = include_dir!("src/bank");

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryMeta {
    pub id: String,
    pub name: String,
    pub emoji: String,
    pub color: String,
    pub description: String,
}

/// A question in its authored form. `answer` indexes the choices as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawQuestion {
    #[serde(rename = "q")]
    pub prompt: String,
    pub choices: Vec<String>,
    pub answer: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(
        default,
        rename = "deepDive",
        skip_serializing_if = "Option::is_none"
    )]
    pub deep_dive: Option<String>,
}

impl RawQuestion {
    /// Build a playable question with the choices in a fresh random order.
    pub fn to_question<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Question, QuestionError> {
        // validates choice count and answer range against the authored order
        Question::new(self.prompt.as_str(), self.choices.clone(), self.answer)?;

        let mut order: Vec<usize> = (0..self.choices.len()).collect();
        order.shuffle(rng);

        let choices = order.iter().map(|&i| self.choices[i].clone()).collect();
        let correct_index = order
            .iter()
            .position(|&i| i == self.answer)
            .ok_or(QuestionError::AnswerOutOfRange {
                index: self.answer,
                len: self.choices.len(),
            })?;

        let mut question = Question::new(self.prompt.as_str(), choices, correct_index)?;
        if let Some(explanation) = &self.explanation {
            question = question.with_explanation(explanation.as_str());
        }
        if let Some(deep_dive) = &self.deep_dive {
            question = question.with_deep_dive(deep_dive.as_str());
        }
        Ok(question)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub meta: CategoryMeta,
    pub questions: Vec<RawQuestion>,
}

/// A set of categories loaded from a file, as shipped in external question packs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuestionPack {
    pub pack_name: Option<String>,
    pub categories: Vec<Category>,
}

impl QuestionPack {
    pub fn from_json(json: &str) -> Result<Self, BankError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, BankError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| BankError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

/// One question with its position in the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankEntry<'a> {
    pub category_id: &'a str,
    /// Position within the category; together with the id it forms the history key.
    pub index: usize,
    pub question: &'a RawQuestion,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionBank {
    categories: Vec<Category>,
}

impl QuestionBank {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    /// Categories compiled into the binary, ordered by file name.
    pub fn bundled() -> Result<Self, BankError> {
        let mut files: Vec<_> = BANK_DIR
            .files()
            .filter(|f| f.path().extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort_by(|a, b| a.path().cmp(b.path()));

        let mut categories = Vec::with_capacity(files.len());
        for file in files {
            let name = file.path().display().to_string();
            let contents = file
                .contents_utf8()
                .ok_or_else(|| BankError::Encoding(name.clone()))?;
            let category: Category = serde_json::from_str(contents)?;
            debug!(file = %name, questions = category.questions.len(), "loaded bundled category");
            categories.push(category);
        }

        Ok(Self::new(categories))
    }

    /// Add a pack's questions: existing categories are extended, new ones appended.
    /// Returns how many categories were added.
    pub fn merge_pack(&mut self, pack: QuestionPack) -> usize {
        let mut added = 0;
        for incoming in pack.categories {
            if incoming.meta.id.is_empty() {
                warn!(
                    pack = pack.pack_name.as_deref().unwrap_or("unknown"),
                    "skipping category without an id"
                );
                continue;
            }
            match self
                .categories
                .iter_mut()
                .find(|c| c.meta.id == incoming.meta.id)
            {
                Some(existing) => existing.questions.extend(incoming.questions),
                None => {
                    self.categories.push(incoming);
                    added += 1;
                }
            }
        }
        added
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn metas(&self) -> Vec<CategoryMeta> {
        self.categories.iter().map(|c| c.meta.clone()).collect()
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.meta.id == id)
    }

    /// Every question in bank order.
    pub fn entries(&self) -> impl Iterator<Item = BankEntry<'_>> {
        self.categories.iter().flat_map(|category| {
            category
                .questions
                .iter()
                .enumerate()
                .map(move |(index, question)| BankEntry {
                    category_id: category.meta.id.as_str(),
                    index,
                    question,
                })
        })
    }

    pub fn len(&self) -> usize {
        self.categories.iter().map(|c| c.questions.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
