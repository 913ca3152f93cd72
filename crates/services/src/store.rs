use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, error, info, warn};
use quiz_core::ProgressError;
use quiz_core::model::{ProgressState, QuestionId, Quiz, QuizId};
use storage::repository::{SnapshotStore, StorageError};
use tokio::sync::Mutex;

use crate::catalog::CatalogSource;
use crate::error::{CatalogError, StoreError};
use crate::snapshot::{self, DEFAULT_NAMESPACE};

//
// ─── CATALOG LOAD RESULT ───────────────────────────────────────────────────────
//

/// Outcome of a `load_catalog` call.
///
/// Failures never change state; they are handed back so callers can decide
/// whether to surface them.
#[derive(Debug)]
pub enum CatalogLoad {
    /// The catalog was replaced with these quizzes.
    Loaded(Vec<Arc<Quiz>>),
    /// The source failed; the previous catalog is kept.
    Failed(CatalogError),
    /// A newer load was issued before this one resolved; its result was dropped.
    Superseded,
}

impl CatalogLoad {
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

//
// ─── STORE ─────────────────────────────────────────────────────────────────────
//

/// Owns the quiz progress state and persists a snapshot after every transition.
///
/// Transitions lock the state, apply the pure `ProgressState` method, then write
/// the snapshot before releasing the lock, so snapshots land in transition order.
/// The catalog fetch runs without the lock.
pub struct QuizProgressStore {
    state: Mutex<ProgressState>,
    catalog: Arc<dyn CatalogSource>,
    snapshots: Arc<dyn SnapshotStore>,
    namespace: String,
    load_generation: AtomicU64,
}

impl QuizProgressStore {
    /// Build a store with empty state. Call [`QuizProgressStore::restore`] to
    /// seed it from the last snapshot.
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogSource>, snapshots: Arc<dyn SnapshotStore>) -> Self {
        Self {
            state: Mutex::new(ProgressState::new()),
            catalog,
            snapshots,
            namespace: DEFAULT_NAMESPACE.to_owned(),
            load_generation: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Seed the state from the snapshot stored under this store's namespace.
    ///
    /// A missing snapshot keeps the empty state. An unreadable, foreign-version
    /// or invalid snapshot is logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` if the snapshot store cannot be read.
    pub async fn restore(mut self) -> Result<Self, StoreError> {
        match self.snapshots.load(&self.namespace).await? {
            None => info!("no snapshot under `{}`, starting fresh", self.namespace),
            Some(raw) => match snapshot::decode(&raw) {
                Ok(state) => {
                    info!(
                        "restored snapshot under `{}` ({} quizzes, {} working questions)",
                        self.namespace,
                        state.catalog().len(),
                        state.questions().len()
                    );
                    *self.state.get_mut() = state;
                }
                Err(err) => warn!("discarding snapshot under `{}`: {err}", self.namespace),
            },
        }
        Ok(self)
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Current state. Clones are cheap and never change afterwards.
    pub async fn state(&self) -> ProgressState {
        self.state.lock().await.clone()
    }

    /// Fetch the catalog and replace the known quizzes with it.
    ///
    /// Only the most recently issued load may apply its result; older ones
    /// resolve as [`CatalogLoad::Superseded`].
    pub async fn load_catalog(&self) -> CatalogLoad {
        let ticket = self.load_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let fetched = self.catalog.fetch_quizzes().await;

        let mut state = self.state.lock().await;
        if self.load_generation.load(Ordering::SeqCst) != ticket {
            warn!("dropping catalog load #{ticket}: a newer load was issued");
            return CatalogLoad::Superseded;
        }

        match fetched {
            Ok(quizzes) => {
                let quizzes: Vec<Arc<Quiz>> = quizzes.into_iter().map(Arc::new).collect();
                info!("catalog load #{ticket} returned {} quizzes", quizzes.len());
                state.replace_catalog(quizzes.clone());
                self.persist(&state).await;
                CatalogLoad::Loaded(quizzes)
            }
            Err(err) => {
                warn!("catalog load #{ticket} failed: {err}");
                CatalogLoad::Failed(err)
            }
        }
    }

    /// Start a fresh attempt at `quiz`.
    pub async fn select_quiz(&self, quiz: Arc<Quiz>) {
        let mut state = self.state.lock().await;
        debug!("selecting quiz {} ({} questions)", quiz.id(), quiz.question_count());
        state.select_quiz(quiz);
        self.persist(&state).await;
    }

    /// Look up `id` in the catalog and start a fresh attempt at it.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownQuiz` without touching state if the
    /// catalog has no such quiz.
    pub async fn select_quiz_by_id(&self, id: QuizId) -> Result<Arc<Quiz>, ProgressError> {
        let mut state = self.state.lock().await;
        let quiz = state.find_quiz(id).ok_or(ProgressError::UnknownQuiz(id))?;
        debug!("selecting quiz {id} ({} questions)", quiz.question_count());
        state.select_quiz(Arc::clone(&quiz));
        self.persist(&state).await;
        Ok(quiz)
    }

    /// Grade `chosen` for question `id`. Returns whether the answer was correct.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownQuestion` or `ProgressError::AttemptCompleted`;
    /// state is unchanged and nothing is persisted in either case.
    pub async fn select_answer(
        &self,
        id: QuestionId,
        chosen: impl Into<String>,
    ) -> Result<bool, ProgressError> {
        let mut state = self.state.lock().await;
        let is_correct = state.select_answer(id, chosen).inspect_err(|err| {
            debug!("answer for question {id} rejected: {err}");
        })?;
        debug!("question {id} answered (correct: {is_correct})");
        self.persist(&state).await;
        Ok(is_correct)
    }

    /// Move to the next question. Returns `false` if already at the last one.
    pub async fn go_next(&self) -> bool {
        let mut state = self.state.lock().await;
        let moved = state.go_next();
        if moved {
            self.persist(&state).await;
        }
        moved
    }

    /// Move to the previous question. Returns `false` if already at the first one.
    pub async fn go_previous(&self) -> bool {
        let mut state = self.state.lock().await;
        let moved = state.go_previous();
        if moved {
            self.persist(&state).await;
        }
        moved
    }

    /// Complete the attempt and return its score.
    pub async fn complete_questions(&self) -> u32 {
        let mut state = self.state.lock().await;
        let score = state.complete_questions();
        info!(
            "attempt completed: {score}/{} correct",
            state.questions().len()
        );
        self.persist(&state).await;
        score
    }

    /// Drop the current attempt, keeping the catalog.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.reset();
        debug!("attempt reset");
        self.persist(&state).await;
    }

    /// Forget everything, including the catalog, and delete the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Storage` if the snapshot cannot be removed; the
    /// in-memory state is kept in that case.
    pub async fn clear_snapshot(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        match self.snapshots.remove(&self.namespace).await {
            Ok(()) | Err(StorageError::NotFound) => {
                *state = ProgressState::new();
                info!("cleared snapshot under `{}`", self.namespace);
                Ok(())
            }
            Err(err) => {
                error!("failed to clear snapshot under `{}`: {err}", self.namespace);
                Err(err.into())
            }
        }
    }

    async fn persist(&self, state: &ProgressState) {
        let encoded = match snapshot::encode(state) {
            Ok(encoded) => encoded,
            Err(err) => {
                error!("failed to encode snapshot: {err}");
                return;
            }
        };
        if let Err(err) = self.snapshots.save(&self.namespace, &encoded).await {
            error!("failed to persist snapshot under `{}`: {err}", self.namespace);
        }
    }
}

impl fmt::Debug for QuizProgressStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizProgressStore")
            .field("namespace", &self.namespace)
            .field("load_generation", &self.load_generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
