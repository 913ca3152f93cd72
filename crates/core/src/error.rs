use thiserror::Error;

use crate::model::{QuestionId, QuizId};

/// Rejected progress transitions. State is left unchanged whenever one is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("question {0} is not part of the current attempt")]
    UnknownQuestion(QuestionId),

    #[error("quiz {0} is not in the catalog")]
    UnknownQuiz(QuizId),

    #[error("attempt already completed; select the quiz again to retake it")]
    AttemptCompleted,
}

/// Broken invariants found when checking a `ProgressState` built outside the
/// transitions, such as one read back from storage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StateError {
    #[error("cursor {cursor} is outside the {len} working questions")]
    CursorOutOfRange { cursor: usize, len: usize },

    #[error("question {0} carries inconsistent grading")]
    InconsistentGrading(QuestionId),

    #[error("score {stored} does not match {correct} correct answers")]
    ScoreMismatch { stored: u32, correct: u32 },
}
