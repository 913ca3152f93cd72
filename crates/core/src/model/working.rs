use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;
use crate::model::quiz::Question;

/// Per-attempt copy of a catalog question together with its grading.
///
/// The grading fields are only ever written together by [`WorkingQuestion::graded`],
/// so `correct_answer` is present exactly when the question was answered wrongly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingQuestion {
    #[serde(flatten)]
    question: Question,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_selected_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_correct_user_answer: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    correct_answer: Option<String>,
}

impl WorkingQuestion {
    /// Copies a catalog question with no grading recorded.
    #[must_use]
    pub fn from_question(question: &Question) -> Self {
        Self {
            question: question.clone(),
            user_selected_answer: None,
            is_correct_user_answer: None,
            correct_answer: None,
        }
    }

    /// Builds the graded version of this question for `chosen`.
    ///
    /// Any earlier grading is discarded; `self` is left untouched.
    #[must_use]
    pub fn graded(&self, chosen: impl Into<String>) -> Self {
        let chosen = chosen.into();
        let is_correct = self.question.is_correct(&chosen);
        Self {
            question: self.question.clone(),
            correct_answer: (!is_correct).then(|| self.question.answer().to_owned()),
            is_correct_user_answer: Some(is_correct),
            user_selected_answer: Some(chosen),
        }
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.question.id()
    }

    #[must_use]
    pub fn question(&self) -> &Question {
        &self.question
    }

    #[must_use]
    pub fn user_selected_answer(&self) -> Option<&str> {
        self.user_selected_answer.as_deref()
    }

    #[must_use]
    pub fn is_correct_user_answer(&self) -> Option<bool> {
        self.is_correct_user_answer
    }

    /// The expected answer, revealed only after a wrong answer.
    #[must_use]
    pub fn correct_answer(&self) -> Option<&str> {
        self.correct_answer.as_deref()
    }

    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.user_selected_answer.is_some()
    }

    #[must_use]
    pub fn is_answered_correctly(&self) -> bool {
        self.is_correct_user_answer == Some(true)
    }

    /// Whether the grading fields agree with each other and with the answer key,
    /// i.e. whether this value could have come out of [`WorkingQuestion::graded`].
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        match (&self.user_selected_answer, self.is_correct_user_answer) {
            (None, None) => self.correct_answer.is_none(),
            (Some(chosen), Some(is_correct)) => {
                let expected = (!is_correct).then(|| self.question.answer());
                is_correct == self.question.is_correct(chosen)
                    && self.correct_answer.as_deref() == expected
            }
            _ => false,
        }
    }
}
