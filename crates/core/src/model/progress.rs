use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ProgressError, StateError};
use crate::model::ids::{QuestionId, QuizId};
use crate::model::quiz::Quiz;
use crate::model::working::WorkingQuestion;

/// Where the current attempt stands, derived from selection and completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No quiz selected.
    Idle,
    /// A quiz is selected and answers can be graded.
    InProgress,
    /// The attempt was completed; navigation is still allowed for review.
    Reviewing,
}

//
// ─── PROGRESS STATE ────────────────────────────────────────────────────────────
//

/// The whole quiz-taking state: catalog, current attempt, cursor and score.
///
/// Every transition is a plain synchronous method so it can be exercised without
/// a catalog source or a storage backend. Catalog quizzes are shared behind `Arc`
/// and never mutated; the working questions are a separate copy-on-write list, so
/// a clone handed out earlier keeps seeing the questions as they were.
///
/// Serialized field names match the persisted snapshot layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    #[serde(rename = "quizzes", default)]
    catalog: Vec<Arc<Quiz>>,
    #[serde(rename = "selectedQuizz", default)]
    selected_quiz: Option<Arc<Quiz>>,
    #[serde(rename = "questions", default)]
    working_questions: Arc<Vec<WorkingQuestion>>,
    #[serde(rename = "currentQuestion", default)]
    cursor: usize,
    #[serde(rename = "hasCompleteAll", default)]
    is_complete: bool,
    #[serde(default)]
    score: u32,
}

impl ProgressState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn catalog(&self) -> &[Arc<Quiz>] {
        &self.catalog
    }

    /// Looks up a catalog quiz by id.
    #[must_use]
    pub fn find_quiz(&self, id: QuizId) -> Option<Arc<Quiz>> {
        self.catalog.iter().find(|quiz| quiz.id() == id).cloned()
    }

    #[must_use]
    pub fn selected_quiz(&self) -> Option<&Arc<Quiz>> {
        self.selected_quiz.as_ref()
    }

    #[must_use]
    pub fn questions(&self) -> &[WorkingQuestion] {
        &self.working_questions
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&WorkingQuestion> {
        self.working_questions.get(self.cursor)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    /// The final score, available once the attempt is complete.
    #[must_use]
    pub fn score(&self) -> Option<u32> {
        self.is_complete.then_some(self.score)
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.working_questions
            .iter()
            .filter(|question| question.is_answered())
            .count()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        match (&self.selected_quiz, self.is_complete) {
            (None, _) => Phase::Idle,
            (Some(_), false) => Phase::InProgress,
            (Some(_), true) => Phase::Reviewing,
        }
    }

    /// Checks the invariants the transitions maintain.
    ///
    /// Needed for states that did not come out of the transitions, such as one
    /// decoded from a stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns the first `StateError` found: a cursor past the working questions,
    /// a question whose grading fields disagree, or a completed attempt whose
    /// score is not the number of correct answers.
    pub fn validate(&self) -> Result<(), StateError> {
        let len = self.working_questions.len();
        if self.cursor >= len.max(1) {
            return Err(StateError::CursorOutOfRange {
                cursor: self.cursor,
                len,
            });
        }
        if let Some(question) = self.working_questions.iter().find(|q| !q.is_consistent()) {
            return Err(StateError::InconsistentGrading(question.id()));
        }
        if self.is_complete {
            let correct = self.correct_count();
            if correct != self.score {
                return Err(StateError::ScoreMismatch {
                    stored: self.score,
                    correct,
                });
            }
        }
        Ok(())
    }

    fn correct_count(&self) -> u32 {
        let mut correct = 0_u32;
        for question in self.working_questions.iter() {
            if question.is_answered_correctly() {
                correct = correct.saturating_add(1);
            }
        }
        correct
    }

    /// Swaps in a freshly fetched catalog and clears the completion flag.
    ///
    /// The current selection and working questions are left alone.
    pub fn replace_catalog(&mut self, quizzes: Vec<Arc<Quiz>>) {
        self.catalog = quizzes;
        self.is_complete = false;
    }

    /// Starts a fresh attempt at `quiz`.
    ///
    /// Working questions are copied out of the quiz with no grading, the cursor
    /// returns to the first question and any previous completion is cleared.
    pub fn select_quiz(&mut self, quiz: Arc<Quiz>) {
        let questions = quiz
            .questions()
            .iter()
            .map(WorkingQuestion::from_question)
            .collect();
        self.working_questions = Arc::new(questions);
        self.selected_quiz = Some(quiz);
        self.cursor = 0;
        self.is_complete = false;
        self.score = 0;
    }

    /// Moves to the next question. Returns `false` at the last question.
    pub fn go_next(&mut self) -> bool {
        match self.cursor.checked_add(1) {
            Some(next) if next < self.working_questions.len() => {
                self.cursor = next;
                true
            }
            _ => false,
        }
    }

    /// Moves to the previous question. Returns `false` at the first question.
    pub fn go_previous(&mut self) -> bool {
        match self.cursor.checked_sub(1) {
            Some(previous) => {
                self.cursor = previous;
                true
            }
            None => false,
        }
    }

    /// Grades `chosen` for the working question `id` and returns whether it was correct.
    ///
    /// Only that question is replaced; the rest of the list is untouched.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::AttemptCompleted` once the attempt has been completed.
    /// Returns `ProgressError::UnknownQuestion` if no working question has this id.
    pub fn select_answer(
        &mut self,
        id: QuestionId,
        chosen: impl Into<String>,
    ) -> Result<bool, ProgressError> {
        if self.is_complete {
            return Err(ProgressError::AttemptCompleted);
        }
        let index = self
            .working_questions
            .iter()
            .position(|question| question.id() == id)
            .ok_or(ProgressError::UnknownQuestion(id))?;

        let graded = self.working_questions[index].graded(chosen);
        let is_correct = graded.is_answered_correctly();
        Arc::make_mut(&mut self.working_questions)[index] = graded;
        Ok(is_correct)
    }

    /// Finishes the attempt: scores it, marks it complete and rewinds the cursor.
    ///
    /// Unanswered questions count as not correct.
    pub fn complete_questions(&mut self) -> u32 {
        let score = self.correct_count();
        self.score = score;
        self.is_complete = true;
        self.cursor = 0;
        score
    }

    /// Drops the current attempt. The catalog is kept.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.working_questions = Arc::default();
        self.is_complete = false;
        self.selected_quiz = None;
        self.score = 0;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Question;

    fn question(id: u64, answer: &str) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Q{id}"),
            vec!["A".into(), "B".into(), "C".into()],
            answer,
        )
    }

    fn quiz() -> Arc<Quiz> {
        Arc::new(Quiz::new(
            QuizId::new(1),
            "Letters",
            vec![question(1, "A"), question(2, "B"), question(3, "C")],
        ))
    }

    fn started() -> ProgressState {
        let mut state = ProgressState::new();
        state.replace_catalog(vec![quiz()]);
        let selected = state.find_quiz(QuizId::new(1)).unwrap();
        state.select_quiz(selected);
        state
    }

    #[test]
    fn new_state_is_idle() {
        let state = ProgressState::new();
        assert_eq!(state.phase(), Phase::Idle);
        assert!(state.catalog().is_empty());
        assert!(state.questions().is_empty());
        assert_eq!(state.current_question(), None);
        assert_eq!(state.score(), None);
    }

    #[test]
    fn selection_copies_questions_without_grading() {
        let state = started();
        assert_eq!(state.phase(), Phase::InProgress);
        assert_eq!(state.questions().len(), 3);
        assert!(state.questions().iter().all(|q| !q.is_answered()));
        assert_eq!(state.current_question().unwrap().id(), QuestionId::new(1));
    }

    #[test]
    fn grading_never_touches_catalog_questions() {
        let mut state = started();
        state.select_answer(QuestionId::new(1), "B").unwrap();

        let catalog_quiz = state.find_quiz(QuizId::new(1)).unwrap();
        assert_eq!(catalog_quiz.as_ref(), quiz().as_ref());
        assert_eq!(state.selected_quiz().unwrap().as_ref(), quiz().as_ref());
    }

    #[test]
    fn earlier_clones_do_not_observe_grading() {
        let mut state = started();
        let before = state.clone();
        state.select_answer(QuestionId::new(2), "B").unwrap();

        assert!(!before.questions()[1].is_answered());
        assert!(state.questions()[1].is_answered());
        assert_eq!(before.questions()[0], state.questions()[0]);
    }

    #[test]
    fn grading_reports_correctness() {
        let mut state = started();
        assert!(state.select_answer(QuestionId::new(1), "A").unwrap());
        assert!(!state.select_answer(QuestionId::new(2), "A").unwrap());

        let first = &state.questions()[0];
        assert_eq!(first.is_correct_user_answer(), Some(true));
        assert_eq!(first.correct_answer(), None);

        let second = &state.questions()[1];
        assert_eq!(second.is_correct_user_answer(), Some(false));
        assert_eq!(second.correct_answer(), Some("B"));
        assert_eq!(state.answered_count(), 2);
    }

    #[test]
    fn unknown_question_leaves_state_unchanged() {
        let mut state = started();
        let before = state.clone();
        let err = state.select_answer(QuestionId::new(99), "A").unwrap_err();
        assert_eq!(err, ProgressError::UnknownQuestion(QuestionId::new(99)));
        assert_eq!(state, before);
    }

    #[test]
    fn navigation_is_bounded() {
        let mut state = started();
        assert!(!state.go_previous());
        assert_eq!(state.cursor(), 0);

        assert!(state.go_next());
        assert!(state.go_next());
        assert_eq!(state.cursor(), 2);
        assert!(!state.go_next());
        assert_eq!(state.cursor(), 2);

        assert!(state.go_previous());
        assert_eq!(state.cursor(), 1);
    }

    #[test]
    fn navigation_without_questions_is_a_no_op() {
        let mut state = ProgressState::new();
        assert!(!state.go_next());
        assert!(!state.go_previous());
        assert_eq!(state.cursor(), 0);
    }

    #[test]
    fn completion_scores_and_rewinds() {
        let mut state = started();
        state.select_answer(QuestionId::new(1), "A").unwrap();
        state.select_answer(QuestionId::new(2), "C").unwrap();
        state.go_next();
        state.go_next();

        // question 3 left unanswered
        assert_eq!(state.complete_questions(), 1);
        assert_eq!(state.score(), Some(1));
        assert!(state.is_complete());
        assert_eq!(state.cursor(), 0);
        assert_eq!(state.phase(), Phase::Reviewing);
    }

    #[test]
    fn grading_is_rejected_while_reviewing() {
        let mut state = started();
        state.select_answer(QuestionId::new(1), "B").unwrap();
        state.complete_questions();
        let before = state.clone();

        let err = state.select_answer(QuestionId::new(1), "A").unwrap_err();
        assert_eq!(err, ProgressError::AttemptCompleted);
        assert_eq!(state, before);

        // review navigation still works
        assert!(state.go_next());
    }

    #[test]
    fn selecting_again_starts_a_fresh_attempt() {
        let mut state = started();
        state.select_answer(QuestionId::new(1), "A").unwrap();
        state.go_next();
        state.complete_questions();

        let again = state.find_quiz(QuizId::new(1)).unwrap();
        state.select_quiz(again);
        assert_eq!(state.phase(), Phase::InProgress);
        assert_eq!(state.cursor(), 0);
        assert_eq!(state.answered_count(), 0);
        assert_eq!(state.score(), None);
    }

    #[test]
    fn reset_keeps_catalog() {
        let mut state = started();
        state.select_answer(QuestionId::new(1), "A").unwrap();
        state.go_next();
        state.complete_questions();
        state.reset();

        assert_eq!(state.phase(), Phase::Idle);
        assert!(state.questions().is_empty());
        assert_eq!(state.cursor(), 0);
        assert!(!state.is_complete());
        assert!(state.selected_quiz().is_none());
        assert_eq!(state.catalog().len(), 1);
    }

    #[test]
    fn replacing_catalog_clears_completion_only() {
        let mut state = started();
        state.go_next();
        state.complete_questions();
        state.go_next();

        state.replace_catalog(Vec::new());
        assert!(state.catalog().is_empty());
        assert!(!state.is_complete());
        assert_eq!(state.cursor(), 1);
        assert_eq!(state.questions().len(), 3);
        assert!(state.selected_quiz().is_some());
    }

    #[test]
    fn two_question_scenario_scores_one() {
        let quiz = Arc::new(Quiz::new(
            QuizId::new(7),
            "Pair",
            vec![question(1, "A"), question(2, "B")],
        ));
        let mut state = ProgressState::new();
        state.replace_catalog(vec![Arc::clone(&quiz)]);
        state.select_quiz(quiz);
        state.select_answer(QuestionId::new(1), "A").unwrap();
        state.select_answer(QuestionId::new(2), "C").unwrap();
        assert_eq!(state.complete_questions(), 1);
    }

    #[test]
    fn snapshot_round_trip_preserves_every_field() {
        let mut state = started();
        state.select_answer(QuestionId::new(1), "A").unwrap();
        state.select_answer(QuestionId::new(3), "A").unwrap();
        state.go_next();
        state.complete_questions();
        state.go_next();

        let json = serde_json::to_string(&state).unwrap();
        let restored: ProgressState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
        assert_eq!(restored.score(), Some(1));
        assert_eq!(restored.cursor(), 1);
    }

    #[test]
    fn transitions_keep_state_valid() {
        let mut state = ProgressState::new();
        assert_eq!(state.validate(), Ok(()));

        state = started();
        state.select_answer(QuestionId::new(1), "A").unwrap();
        state.select_answer(QuestionId::new(2), "A").unwrap();
        state.go_next();
        state.go_next();
        assert_eq!(state.validate(), Ok(()));

        state.complete_questions();
        assert_eq!(state.validate(), Ok(()));
    }

    fn decoded(json: serde_json::Value) -> ProgressState {
        serde_json::from_value(json).unwrap()
    }

    fn stored_question(extra: serde_json::Value) -> serde_json::Value {
        let mut question = serde_json::json!({
            "id": 1, "question": "Q1", "options": ["A", "B"], "answer": "A"
        });
        if let (Some(target), Some(fields)) = (question.as_object_mut(), extra.as_object()) {
            target.extend(fields.clone());
        }
        question
    }

    #[test]
    fn cursor_past_the_questions_is_invalid() {
        let state = decoded(serde_json::json!({
            "questions": [stored_question(serde_json::json!({}))],
            "currentQuestion": 5
        }));
        assert_eq!(
            state.validate(),
            Err(StateError::CursorOutOfRange { cursor: 5, len: 1 })
        );

        let empty = decoded(serde_json::json!({ "currentQuestion": 1 }));
        assert_eq!(
            empty.validate(),
            Err(StateError::CursorOutOfRange { cursor: 1, len: 0 })
        );
    }

    #[test]
    fn contradictory_grading_is_invalid() {
        let state = decoded(serde_json::json!({
            "questions": [stored_question(serde_json::json!({
                "isCorrectUserAnswer": true,
                "correctAnswer": "A"
            }))]
        }));
        assert_eq!(
            state.validate(),
            Err(StateError::InconsistentGrading(QuestionId::new(1)))
        );
    }

    #[test]
    fn completed_score_must_match_answers() {
        let state = decoded(serde_json::json!({
            "questions": [stored_question(serde_json::json!({
                "userSelectedAnswer": "B",
                "isCorrectUserAnswer": false,
                "correctAnswer": "A"
            }))],
            "hasCompleteAll": true,
            "score": 4
        }));
        assert_eq!(
            state.validate(),
            Err(StateError::ScoreMismatch {
                stored: 4,
                correct: 0
            })
        );
    }

    #[test]
    fn next_at_largest_cursor_does_not_overflow() {
        let mut state = decoded(serde_json::json!({
            "questions": [stored_question(serde_json::json!({}))],
            "currentQuestion": usize::MAX
        }));
        assert!(!state.go_next());
        assert_eq!(state.cursor(), usize::MAX);
    }

    #[test]
    fn snapshot_uses_store_field_names() {
        let value = serde_json::to_value(started()).unwrap();
        for key in [
            "quizzes",
            "selectedQuizz",
            "questions",
            "currentQuestion",
            "hasCompleteAll",
            "score",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }
}
