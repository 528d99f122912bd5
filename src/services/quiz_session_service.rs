use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use tokio::sync::Mutex;

use crate::{
    auth::{Claims, UserRole},
    errors::{AppError, AppResult},
    models::domain::{OptionLabel, Question, QuizDefinition, QuizProgress, QuizResponse},
    repositories::ProgressRepository,
    services::{
        quiz_service::QuizService,
        quiz_submission_service::QuizSubmissionService,
        quiz_timer::SessionTimers,
        retake_service::RetakeService,
        retry::{retry_with_backoff, RetryPolicy},
        session_lock::SessionLocks,
    },
};

/// Whether the caller has to decide between resuming and starting over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeChoice {
    /// A saved record exists. Nothing has been restored yet.
    Required(QuizProgress),
    NotNeeded,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub quiz: QuizDefinition,
    pub questions: Vec<Question>,
    pub progress: QuizProgress,
    /// `None` while the countdown has not been started.
    pub remaining_seconds: Option<u32>,
    /// False when the latest change could not be written to the progress store.
    pub persisted: bool,
}

#[derive(Debug, Clone)]
pub struct LoadedSession {
    pub state: SessionState,
    pub resume_choice: ResumeChoice,
}

#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub progress: QuizProgress,
    pub total_questions: usize,
    /// False when navigation hit the first or last question.
    pub changed: bool,
    pub persisted: bool,
    pub remaining_seconds: Option<u32>,
}

pub struct QuizSessionService {
    quiz_service: Arc<QuizService>,
    progress: Arc<dyn ProgressRepository>,
    submissions: Arc<QuizSubmissionService>,
    retakes: Arc<RetakeService>,
    timers: Arc<SessionTimers>,
    locks: Arc<SessionLocks>,
    /// Sessions loaded with saved progress that have not picked resume or start-fresh.
    awaiting_choice: Mutex<HashSet<(String, String)>>,
    retry_policy: RetryPolicy,
}

impl QuizSessionService {
    pub fn new(
        quiz_service: Arc<QuizService>,
        progress: Arc<dyn ProgressRepository>,
        submissions: Arc<QuizSubmissionService>,
        retakes: Arc<RetakeService>,
        timers: Arc<SessionTimers>,
        locks: Arc<SessionLocks>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            quiz_service,
            progress,
            submissions,
            retakes,
            timers,
            locks,
            awaiting_choice: Mutex::new(HashSet::new()),
            retry_policy,
        }
    }

    /// Opens a quiz for taking. With saved progress the caller must choose
    /// `resume` or `start_fresh` before the countdown begins.
    pub async fn load_session(&self, claims: &Claims, quiz_id: &str) -> AppResult<LoadedSession> {
        let user_id = claims.user_id();
        let quiz = self.fetch_quiz(quiz_id).await?;
        ensure_takeable(claims, &quiz)?;
        self.retakes.ensure_can_attempt(user_id, &quiz).await?;

        let questions = self.quiz_service.get_questions(quiz_id).await?;
        let _guard = self.locks.lock(user_id, quiz_id).await;
        let saved = self.saved_progress(user_id, quiz_id).await;

        match saved {
            Some(mut saved) => {
                saved.clamp_to(questions.len());
                self.set_awaiting_choice(user_id, quiz_id, true).await;
                log::debug!(
                    "User '{}' has saved progress on quiz '{}' at question {}",
                    user_id,
                    quiz_id,
                    saved.current_question_index
                );
                Ok(LoadedSession {
                    state: SessionState {
                        quiz,
                        questions,
                        progress: QuizProgress::new(quiz_id),
                        remaining_seconds: None,
                        persisted: true,
                    },
                    resume_choice: ResumeChoice::Required(saved),
                })
            }
            None => {
                self.set_awaiting_choice(user_id, quiz_id, false).await;
                let remaining_seconds = self.start_timer(user_id, &quiz).await;
                Ok(LoadedSession {
                    state: SessionState {
                        quiz,
                        questions,
                        progress: QuizProgress::new(quiz_id),
                        remaining_seconds,
                        persisted: true,
                    },
                    resume_choice: ResumeChoice::NotNeeded,
                })
            }
        }
    }

    /// Restores the saved position and answers. Without a saved record this starts at question 0.
    pub async fn resume(&self, claims: &Claims, quiz_id: &str) -> AppResult<SessionState> {
        let user_id = claims.user_id();
        let quiz = self.fetch_quiz(quiz_id).await?;
        ensure_takeable(claims, &quiz)?;
        self.retakes.ensure_can_attempt(user_id, &quiz).await?;

        let questions = self.quiz_service.get_questions(quiz_id).await?;
        let _guard = self.locks.lock(user_id, quiz_id).await;
        let mut progress = self
            .saved_progress(user_id, quiz_id)
            .await
            .unwrap_or_else(|| QuizProgress::new(quiz_id));
        progress.clamp_to(questions.len());

        self.set_awaiting_choice(user_id, quiz_id, false).await;
        let remaining_seconds = self.start_timer(user_id, &quiz).await;
        log::info!(
            "User '{}' resumed quiz '{}' at question {} with {} answers",
            user_id,
            quiz_id,
            progress.current_question_index,
            progress.answered_count()
        );

        Ok(SessionState {
            quiz,
            questions,
            progress,
            remaining_seconds,
            persisted: true,
        })
    }

    /// Discards any saved record and starts at question 0.
    pub async fn start_fresh(&self, claims: &Claims, quiz_id: &str) -> AppResult<SessionState> {
        let user_id = claims.user_id();
        let quiz = self.fetch_quiz(quiz_id).await?;
        ensure_takeable(claims, &quiz)?;
        self.retakes.ensure_can_attempt(user_id, &quiz).await?;

        let questions = self.quiz_service.get_questions(quiz_id).await?;
        let _guard = self.locks.lock(user_id, quiz_id).await;

        let persisted = match self.progress.remove(user_id, quiz_id).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!(
                    "Could not discard saved progress for user '{}' on quiz '{}': {}",
                    user_id,
                    quiz_id,
                    e
                );
                false
            }
        };

        self.set_awaiting_choice(user_id, quiz_id, false).await;
        let remaining_seconds = self.start_timer(user_id, &quiz).await;

        Ok(SessionState {
            quiz,
            questions,
            progress: QuizProgress::new(quiz_id),
            remaining_seconds,
            persisted,
        })
    }

    pub async fn select_answer(
        &self,
        claims: &Claims,
        quiz_id: &str,
        question_index: usize,
        answer: OptionLabel,
    ) -> AppResult<ProgressUpdate> {
        let _guard = self.locks.lock(claims.user_id(), quiz_id).await;
        let (total, mut progress) = self.current_progress(claims, quiz_id).await?;
        progress.select_answer(question_index, answer, total)?;
        Ok(self.record(claims.user_id(), progress, total, true).await)
    }

    pub async fn next(&self, claims: &Claims, quiz_id: &str) -> AppResult<ProgressUpdate> {
        let _guard = self.locks.lock(claims.user_id(), quiz_id).await;
        let (total, mut progress) = self.current_progress(claims, quiz_id).await?;
        let changed = progress.next(total);
        Ok(self.record(claims.user_id(), progress, total, changed).await)
    }

    pub async fn previous(&self, claims: &Claims, quiz_id: &str) -> AppResult<ProgressUpdate> {
        let _guard = self.locks.lock(claims.user_id(), quiz_id).await;
        let (total, mut progress) = self.current_progress(claims, quiz_id).await?;
        let changed = progress.previous();
        Ok(self.record(claims.user_id(), progress, total, changed).await)
    }

    /// Submits the attempt and stops its countdown. Holds the session lock, so
    /// an auto-submit firing meanwhile finds the countdown gone and skips.
    pub async fn submit(
        &self,
        claims: &Claims,
        quiz_id: &str,
        answers: Option<BTreeMap<usize, OptionLabel>>,
    ) -> AppResult<QuizResponse> {
        let user_id = claims.user_id();
        let quiz = self.quiz_service.get_quiz(quiz_id).await?;
        ensure_takeable(claims, &quiz)?;

        let _guard = self.locks.lock(user_id, quiz_id).await;
        let response = self
            .submissions
            .submit(user_id, quiz_id, answers, false)
            .await?;
        self.timers.cancel(user_id, quiz_id).await;
        self.set_awaiting_choice(user_id, quiz_id, false).await;
        Ok(response)
    }

    pub async fn remaining_seconds(&self, user_id: &str, quiz_id: &str) -> Option<u32> {
        self.timers.remaining_seconds(user_id, quiz_id).await
    }

    /// A freshly saved quiz may not be readable yet, so not-found is retried
    /// alongside transient errors.
    async fn fetch_quiz(&self, quiz_id: &str) -> AppResult<QuizDefinition> {
        retry_with_backoff(
            &self.retry_policy,
            |e: &AppError| e.is_retryable() || matches!(e, AppError::NotFound(_)),
            |_| self.quiz_service.get_quiz(quiz_id),
        )
        .await
    }

    /// Caller holds the session lock.
    async fn current_progress(
        &self,
        claims: &Claims,
        quiz_id: &str,
    ) -> AppResult<(usize, QuizProgress)> {
        let user_id = claims.user_id();
        let quiz = self.quiz_service.get_quiz(quiz_id).await?;
        ensure_takeable(claims, &quiz)?;
        self.retakes.ensure_can_attempt(user_id, &quiz).await?;

        let key = (user_id.to_string(), quiz_id.to_string());
        if self.awaiting_choice.lock().await.contains(&key) {
            return Err(AppError::StateConflict(
                "Saved progress found; resume or start fresh first".to_string(),
            ));
        }

        let total = quiz.question_count.max(0) as usize;
        let mut progress = self
            .saved_progress(user_id, quiz_id)
            .await
            .unwrap_or_else(|| QuizProgress::new(quiz_id));
        progress.clamp_to(total);
        Ok((total, progress))
    }

    async fn set_awaiting_choice(&self, user_id: &str, quiz_id: &str, awaiting: bool) {
        let key = (user_id.to_string(), quiz_id.to_string());
        let mut sessions = self.awaiting_choice.lock().await;
        if awaiting {
            sessions.insert(key);
        } else {
            sessions.remove(&key);
        }
    }

    async fn saved_progress(&self, user_id: &str, quiz_id: &str) -> Option<QuizProgress> {
        match self.progress.load(user_id, quiz_id).await {
            Ok(progress) => progress,
            Err(e) => {
                log::warn!(
                    "Progress for user '{}' on quiz '{}' unreadable, starting without it: {}",
                    user_id,
                    quiz_id,
                    e
                );
                None
            }
        }
    }

    async fn record(
        &self,
        user_id: &str,
        progress: QuizProgress,
        total_questions: usize,
        changed: bool,
    ) -> ProgressUpdate {
        let persisted = if changed {
            match self.progress.save(user_id, &progress).await {
                Ok(()) => true,
                Err(e) => {
                    log::warn!(
                        "Progress for user '{}' on quiz '{}' not saved: {}",
                        user_id,
                        progress.quiz_id,
                        e
                    );
                    false
                }
            }
        } else {
            true
        };

        let remaining_seconds = self.timers.remaining_seconds(user_id, &progress.quiz_id).await;
        ProgressUpdate {
            progress,
            total_questions,
            changed,
            persisted,
            remaining_seconds,
        }
    }

    /// Starts the full countdown; on expiry the saved progress is submitted
    /// unless a manual submit claimed the session first.
    async fn start_timer(&self, user_id: &str, quiz: &QuizDefinition) -> Option<u32> {
        let minutes = quiz.duration_minutes.max(1) as u32;
        let submissions = Arc::clone(&self.submissions);
        let timers = Arc::clone(&self.timers);
        let locks = Arc::clone(&self.locks);
        let owner = user_id.to_string();
        let quiz_id = quiz.id.clone();

        self.timers
            .start(
                user_id,
                &quiz.id,
                Some(minutes),
                Box::new(move || {
                    tokio::spawn(async move {
                        let _guard = locks.lock(&owner, &quiz_id).await;
                        if !timers.take_expired(&owner, &quiz_id).await {
                            log::debug!(
                                "Skipping auto-submit for user '{}' on quiz '{}'",
                                owner,
                                quiz_id
                            );
                            return;
                        }
                        log::info!(
                            "Time is up for user '{}' on quiz '{}', submitting saved answers",
                            owner,
                            quiz_id
                        );
                        if let Err(e) = submissions.submit(&owner, &quiz_id, None, true).await {
                            log::error!(
                                "Automatic submission for user '{}' on quiz '{}' failed: {}",
                                owner,
                                quiz_id,
                                e
                            );
                        }
                    });
                }),
            )
            .await;

        self.timers.remaining_seconds(user_id, &quiz.id).await
    }
}

/// Unpublished quizzes can only be taken by their creator, e.g. for a preview.
pub fn ensure_takeable(claims: &Claims, quiz: &QuizDefinition) -> AppResult<()> {
    if quiz.published || quiz.created_by_user_id == claims.sub || claims.role == UserRole::Admin {
        return Ok(());
    }
    Err(AppError::Forbidden(format!(
        "Quiz '{}' has not been published yet",
        quiz.id
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        repositories::{
            progress_repository::MockProgressRepository,
            question_repository::MockQuestionRepository,
            quiz_repository::MockQuizRepository,
            quiz_response_repository::MockQuizResponseRepository,
            QuizResponseRepository,
        },
        test_utils::fixtures::{test_questions, test_quiz},
    };
    use std::{
        sync::atomic::{AtomicU32, Ordering},
        time::Duration,
    };

    fn published_quiz(question_count: i32) -> QuizDefinition {
        let mut quiz = test_quiz("owner", true);
        quiz.published = true;
        quiz.question_count = question_count;
        quiz
    }

    fn student() -> Claims {
        Claims::new("student", "student", UserRole::Student, 1)
    }

    fn quiz_service(quiz: QuizDefinition) -> Arc<QuizService> {
        let count = quiz.question_count as usize;
        let mut quizzes = MockQuizRepository::new();
        quizzes
            .expect_find_by_id()
            .returning(move |_| Ok(Some(quiz.clone())));
        let mut questions = MockQuestionRepository::new();
        questions
            .expect_find_by_quiz()
            .returning(move |_| Ok(test_questions(count)));
        Arc::new(QuizService::new(Arc::new(quizzes), Arc::new(questions)))
    }

    fn no_responses() -> MockQuizResponseRepository {
        let mut responses = MockQuizResponseRepository::new();
        responses.expect_find_latest().returning(|_, _| Ok(None));
        responses
    }

    fn session_service(
        quiz_service: Arc<QuizService>,
        progress: MockProgressRepository,
    ) -> QuizSessionService {
        let responses: Arc<dyn QuizResponseRepository> = Arc::new(no_responses());
        let progress: Arc<dyn ProgressRepository> = Arc::new(progress);
        let retakes = Arc::new(RetakeService::new(
            Arc::clone(&quiz_service),
            Arc::clone(&responses),
            Arc::clone(&progress),
        ));
        let submissions = Arc::new(QuizSubmissionService::new(
            Arc::clone(&quiz_service),
            responses,
            Arc::clone(&progress),
            Arc::clone(&retakes),
        ));
        QuizSessionService::new(
            quiz_service,
            progress,
            submissions,
            retakes,
            Arc::new(SessionTimers::new()),
            Arc::new(SessionLocks::new()),
            RetryPolicy::new(3, Duration::from_millis(1)),
        )
    }

    fn saved_at_question_three(quiz_id: &str) -> QuizProgress {
        let mut saved = QuizProgress::new(quiz_id);
        saved.current_question_index = 3;
        saved.selected_answers.insert(0, OptionLabel::A);
        saved.selected_answers.insert(2, OptionLabel::B);
        saved
    }

    #[tokio::test]
    async fn test_load_with_saved_progress_requires_choice() {
        let mut progress = MockProgressRepository::new();
        progress
            .expect_load()
            .returning(|_, quiz_id| Ok(Some(saved_at_question_three(quiz_id))));

        let service = session_service(quiz_service(published_quiz(5)), progress);
        let loaded = service.load_session(&student(), "quiz-1").await.unwrap();

        match loaded.resume_choice {
            ResumeChoice::Required(saved) => assert_eq!(saved.current_question_index, 3),
            ResumeChoice::NotNeeded => panic!("expected a resume choice"),
        }
        assert_eq!(loaded.state.progress.current_question_index, 0);
        assert_eq!(loaded.state.remaining_seconds, None);
    }

    #[tokio::test]
    async fn test_load_without_saved_progress_starts_timer() {
        let mut progress = MockProgressRepository::new();
        progress.expect_load().returning(|_, _| Ok(None));

        let service = session_service(quiz_service(published_quiz(5)), progress);
        let loaded = service.load_session(&student(), "quiz-1").await.unwrap();

        assert_eq!(loaded.resume_choice, ResumeChoice::NotNeeded);
        assert_eq!(loaded.state.questions.len(), 5);
        assert_eq!(loaded.state.remaining_seconds, Some(60));
    }

    #[tokio::test]
    async fn test_unreadable_progress_degrades_to_fresh_session() {
        let mut progress = MockProgressRepository::new();
        progress
            .expect_load()
            .returning(|_, _| Err(AppError::ValidationError("corrupt payload".to_string())));

        let service = session_service(quiz_service(published_quiz(5)), progress);
        let loaded = service.load_session(&student(), "quiz-1").await.unwrap();
        assert_eq!(loaded.resume_choice, ResumeChoice::NotNeeded);
    }

    #[tokio::test]
    async fn test_resume_restores_index_and_answers() {
        let mut progress = MockProgressRepository::new();
        progress
            .expect_load()
            .returning(|_, quiz_id| Ok(Some(saved_at_question_three(quiz_id))));

        let service = session_service(quiz_service(published_quiz(5)), progress);
        let state = service.resume(&student(), "quiz-1").await.unwrap();

        assert_eq!(state.progress.current_question_index, 3);
        assert_eq!(state.progress.selected_answers.get(&0), Some(&OptionLabel::A));
        assert_eq!(state.progress.selected_answers.get(&2), Some(&OptionLabel::B));
    }

    #[tokio::test]
    async fn test_start_fresh_deletes_record() {
        let mut progress = MockProgressRepository::new();
        progress.expect_remove().times(1).returning(|_, _| Ok(()));

        let service = session_service(quiz_service(published_quiz(5)), progress);
        let state = service.start_fresh(&student(), "quiz-1").await.unwrap();

        assert_eq!(state.progress.current_question_index, 0);
        assert!(state.progress.selected_answers.is_empty());
        assert!(state.persisted);
    }

    #[tokio::test]
    async fn test_select_answer_persists_every_change() {
        let mut progress = MockProgressRepository::new();
        progress.expect_load().returning(|_, _| Ok(None));
        progress
            .expect_save()
            .times(1)
            .withf(|user_id, saved| {
                user_id == "student" && saved.selected_answers.get(&1) == Some(&OptionLabel::D)
            })
            .returning(|_, _| Ok(()));

        let service = session_service(quiz_service(published_quiz(5)), progress);
        let update = service
            .select_answer(&student(), "quiz-1", 1, OptionLabel::D)
            .await
            .unwrap();
        assert!(update.persisted);
        assert!(update.changed);
    }

    #[tokio::test]
    async fn test_select_answer_out_of_range_is_rejected() {
        let mut progress = MockProgressRepository::new();
        progress.expect_load().returning(|_, _| Ok(None));
        progress.expect_save().never();

        let service = session_service(quiz_service(published_quiz(5)), progress);
        let err = service
            .select_answer(&student(), "quiz-1", 5, OptionLabel::A)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_failed_save_is_reported_not_raised() {
        let mut progress = MockProgressRepository::new();
        progress.expect_load().returning(|_, _| Ok(None));
        progress
            .expect_save()
            .returning(|_, _| Err(AppError::DatabaseError("quota exceeded".to_string())));

        let service = session_service(quiz_service(published_quiz(5)), progress);
        let update = service.next(&student(), "quiz-1").await.unwrap();

        assert!(update.changed);
        assert!(!update.persisted);
        assert_eq!(update.progress.current_question_index, 1);
    }

    #[tokio::test]
    async fn test_navigation_bounds_do_not_write() {
        let mut progress = MockProgressRepository::new();
        progress.expect_load().returning(|_, quiz_id| {
            let mut saved = QuizProgress::new(quiz_id);
            saved.current_question_index = 4;
            Ok(Some(saved))
        });
        progress.expect_save().never();

        let service = session_service(quiz_service(published_quiz(5)), progress);
        let update = service.next(&student(), "quiz-1").await.unwrap();

        assert!(!update.changed);
        assert_eq!(update.progress.current_question_index, 4);
    }

    #[tokio::test]
    async fn test_previous_at_first_question_is_a_no_op() {
        let mut progress = MockProgressRepository::new();
        progress.expect_load().returning(|_, _| Ok(None));
        progress.expect_save().never();

        let service = session_service(quiz_service(published_quiz(5)), progress);
        let update = service.previous(&student(), "quiz-1").await.unwrap();
        assert!(!update.changed);
        assert_eq!(update.progress.current_question_index, 0);
    }

    #[tokio::test]
    async fn test_unpublished_quiz_is_hidden_from_students() {
        let mut unpublished = published_quiz(5);
        unpublished.published = false;

        let service = session_service(quiz_service(unpublished), MockProgressRepository::new());
        let err = service.load_session(&student(), "quiz-1").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_quiz_lookup_retries_until_visible() {
        let lookups = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&lookups);

        let mut quizzes = MockQuizRepository::new();
        quizzes.expect_find_by_id().returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(None)
            } else {
                Ok(Some(published_quiz(2)))
            }
        });
        let mut questions = MockQuestionRepository::new();
        questions
            .expect_find_by_quiz()
            .returning(|_| Ok(test_questions(2)));
        let quiz_service = Arc::new(QuizService::new(Arc::new(quizzes), Arc::new(questions)));

        let mut progress = MockProgressRepository::new();
        progress.expect_load().returning(|_, _| Ok(None));

        let service = session_service(quiz_service, progress);
        assert!(service.load_session(&student(), "quiz-1").await.is_ok());
        assert_eq!(lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_navigation_waits_for_resume_choice() {
        let mut progress = MockProgressRepository::new();
        progress
            .expect_load()
            .returning(|_, quiz_id| Ok(Some(saved_at_question_three(quiz_id))));
        progress
            .expect_save()
            .times(1)
            .withf(|_, saved| saved.current_question_index == 4)
            .returning(|_, _| Ok(()));

        let service = session_service(quiz_service(published_quiz(5)), progress);
        service.load_session(&student(), "quiz-1").await.unwrap();

        let err = service
            .select_answer(&student(), "quiz-1", 1, OptionLabel::C)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StateConflict(_)));
        assert!(matches!(
            service.previous(&student(), "quiz-1").await,
            Err(AppError::StateConflict(_))
        ));

        service.resume(&student(), "quiz-1").await.unwrap();
        let update = service.next(&student(), "quiz-1").await.unwrap();
        assert_eq!(update.progress.current_question_index, 4);
    }

    #[tokio::test]
    async fn test_stranger_cannot_submit_unpublished_quiz() {
        let mut unpublished = published_quiz(5);
        unpublished.published = false;

        let mut progress = MockProgressRepository::new();
        progress.expect_load().never();
        progress.expect_remove().never();

        let service = session_service(quiz_service(unpublished), progress);
        let err = service
            .submit(&student(), "quiz-1", Some(BTreeMap::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
