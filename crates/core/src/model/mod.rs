mod ids;
mod progress;
mod quiz;
mod working;

pub use ids::{ParseIdError, QuestionId, QuizId};
pub use progress::{Phase, ProgressState};
pub use quiz::{Question, Quiz};
pub use working::WorkingQuestion;
