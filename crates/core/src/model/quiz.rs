use serde::{Deserialize, Serialize};

use crate::model::ids::{QuestionId, QuizId};

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A catalog question: prompt, ordered choices and the expected answer.
///
/// Catalog data is never graded in place; attempts work on
/// [`WorkingQuestion`](crate::model::WorkingQuestion) copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    #[serde(rename = "question")]
    prompt: String,
    #[serde(rename = "options", default)]
    choices: Vec<String>,
    answer: String,
}

impl Question {
    #[must_use]
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        choices: Vec<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            id,
            prompt: prompt.into(),
            choices,
            answer: answer.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    /// The correct answer. Grading compares against it with exact string equality.
    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    #[must_use]
    pub fn is_correct(&self, chosen: &str) -> bool {
        self.answer == chosen
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// A titled, ordered set of questions as published by the catalog source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    id: QuizId,
    title: String,
    #[serde(default)]
    questions: Vec<Question>,
}

impl Quiz {
    #[must_use]
    pub fn new(id: QuizId, title: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            id,
            title: title.into(),
            questions,
        }
    }

    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
