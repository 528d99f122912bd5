use std::sync::Arc;

use async_graphql::SimpleObject;
use serde::Serialize;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{QuizDefinition, QuizResponse},
    repositories::{ProgressRepository, QuizResponseRepository},
    services::quiz_service::QuizService,
};

pub const RETAKE_WARNING: &str = "Retaking this quiz replaces the score shown on your dashboard. \
     Your previous attempts stay in your history.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, SimpleObject)]
pub struct RetakeDecision {
    pub quiz_id: String,
    pub allowed: bool,
    /// Submitted attempts so far.
    pub attempts: i32,
    pub previous_score: Option<i32>,
    pub warning: Option<String>,
}

pub struct RetakeService {
    quiz_service: Arc<QuizService>,
    responses: Arc<dyn QuizResponseRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl RetakeService {
    pub fn new(
        quiz_service: Arc<QuizService>,
        responses: Arc<dyn QuizResponseRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            quiz_service,
            responses,
            progress,
        }
    }

    pub async fn evaluate(
        &self,
        user_id: &str,
        quiz: &QuizDefinition,
    ) -> AppResult<RetakeDecision> {
        let latest = self.responses.find_latest(user_id, &quiz.id).await?;

        let decision = match latest {
            None => RetakeDecision {
                quiz_id: quiz.id.clone(),
                allowed: true,
                attempts: 0,
                previous_score: None,
                warning: None,
            },
            Some(response) => RetakeDecision {
                quiz_id: quiz.id.clone(),
                allowed: quiz.allow_retakes,
                attempts: response.attempt_number,
                previous_score: Some(response.score),
                warning: quiz.allow_retakes.then(|| RETAKE_WARNING.to_string()),
            },
        };
        Ok(decision)
    }

    pub async fn retake_status(&self, user_id: &str, quiz_id: &str) -> AppResult<RetakeDecision> {
        let quiz = self.quiz_service.get_quiz(quiz_id).await?;
        self.evaluate(user_id, &quiz).await
    }

    /// Fails with a state conflict when the user already submitted a quiz that forbids retakes.
    pub async fn ensure_can_attempt(
        &self,
        user_id: &str,
        quiz: &QuizDefinition,
    ) -> AppResult<RetakeDecision> {
        let decision = self.evaluate(user_id, quiz).await?;
        if !decision.allowed {
            return Err(AppError::StateConflict(format!(
                "Quiz '{}' does not allow retakes and has already been submitted",
                quiz.title
            )));
        }
        Ok(decision)
    }

    /// Clears leftover progress so the new attempt starts at the first question.
    pub async fn begin_retake(&self, user_id: &str, quiz_id: &str) -> AppResult<RetakeDecision> {
        let quiz = self.quiz_service.get_quiz(quiz_id).await?;
        let decision = self.ensure_can_attempt(user_id, &quiz).await?;

        if let Err(e) = self.progress.remove(user_id, quiz_id).await {
            log::warn!(
                "Could not clear progress for user '{}' on quiz '{}': {}",
                user_id,
                quiz_id,
                e
            );
        }

        log::info!(
            "User '{}' starting attempt {} of quiz '{}'",
            user_id,
            decision.attempts + 1,
            quiz_id
        );
        Ok(decision)
    }

    /// Every submitted attempt, newest first.
    pub async fn attempt_history(
        &self,
        user_id: &str,
        quiz_id: &str,
    ) -> AppResult<Vec<QuizResponse>> {
        self.responses.find_by_user_and_quiz(user_id, quiz_id).await
    }

    /// The attempt the dashboard shows.
    pub async fn latest_response(
        &self,
        user_id: &str,
        quiz_id: &str,
    ) -> AppResult<Option<QuizResponse>> {
        self.responses.find_latest(user_id, quiz_id).await
    }
}
