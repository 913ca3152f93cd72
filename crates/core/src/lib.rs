#![forbid(unsafe_code)]

pub mod error;
pub mod model;

pub use error::{ProgressError, StateError};
pub use model::{
    Phase, ProgressState, Question, QuestionId, Quiz, QuizId, WorkingQuestion,
};
