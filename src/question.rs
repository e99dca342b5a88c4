use crate::error::QuestionError;

/// A multiple-choice question as played in a round.
///
/// Construction checks that there are at least two choices and that the correct index
/// points at one of them, so a `Question` held by the engine is always answerable.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    prompt: String,
    choices: Vec<String>,
    correct_index: usize,
    explanation: Option<String>,
    deep_dive: Option<String>,
}

impl Question {
    pub fn new(
        prompt: impl Into<String>,
        choices: Vec<String>,
        correct_index: usize,
    ) -> Result<Self, QuestionError> {
        if choices.len() < 2 {
            return Err(QuestionError::TooFewChoices {
                count: choices.len(),
            });
        }
        if correct_index >= choices.len() {
            return Err(QuestionError::AnswerOutOfRange {
                index: correct_index,
                len: choices.len(),
            });
        }

        Ok(Self {
            prompt: prompt.into(),
            choices,
            correct_index,
            explanation: None,
            deep_dive: None,
        })
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    pub fn with_deep_dive(mut self, deep_dive: impl Into<String>) -> Self {
        self.deep_dive = Some(deep_dive.into());
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    pub fn correct_choice(&self) -> &str {
        &self.choices[self.correct_index]
    }

    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    pub fn deep_dive(&self) -> Option<&str> {
        self.deep_dive.as_deref()
    }

    pub fn is_correct(&self, choice_index: usize) -> bool {
        choice_index == self.correct_index
    }
}

/// What a player is allowed to see of the current question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuestionView<'a> {
    pub prompt: &'a str,
    pub choices: &'a [String],
    /// 1-based position within the round
    pub number: usize,
    pub total: usize,
}

/// Result of a submitted answer, including the score breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub correct_index: usize,
    pub explanation: Option<String>,
    pub deep_dive: Option<String>,
    pub points_earned: u32,
    pub streak: u32,
    pub speed_bonus: u32,
    pub streak_multiplier: f64,
}
