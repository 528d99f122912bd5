use std::{collections::BTreeMap, sync::Arc};

use crate::{
    errors::{AppError, AppResult},
    models::domain::{quiz_response::answers_to_list, OptionLabel, QuizResponse},
    repositories::{ProgressRepository, QuizResponseRepository},
    services::{quiz_service::QuizService, retake_service::RetakeService, scoring::score_answers},
};

pub struct QuizSubmissionService {
    quiz_service: Arc<QuizService>,
    responses: Arc<dyn QuizResponseRepository>,
    progress: Arc<dyn ProgressRepository>,
    retakes: Arc<RetakeService>,
}

impl QuizSubmissionService {
    pub fn new(
        quiz_service: Arc<QuizService>,
        responses: Arc<dyn QuizResponseRepository>,
        progress: Arc<dyn ProgressRepository>,
        retakes: Arc<RetakeService>,
    ) -> Self {
        Self {
            quiz_service,
            responses,
            progress,
            retakes,
        }
    }

    /// Scores and records one attempt.
    ///
    /// With `answers` set to `None` the saved progress record is graded. The
    /// progress record is only removed once the response is stored, so a failed
    /// submission can simply be retried.
    pub async fn submit(
        &self,
        user_id: &str,
        quiz_id: &str,
        answers: Option<BTreeMap<usize, OptionLabel>>,
        auto_submitted: bool,
    ) -> AppResult<QuizResponse> {
        let quiz = self.quiz_service.get_quiz(quiz_id).await?;
        self.retakes.ensure_can_attempt(user_id, &quiz).await?;

        let questions = self.quiz_service.get_questions(quiz_id).await?;

        let answers = match answers {
            Some(answers) => answers,
            None => self
                .progress
                .load(user_id, quiz_id)
                .await?
                .map(|progress| progress.selected_answers)
                .unwrap_or_default(),
        };

        if let Some(index) = answers.keys().find(|index| **index >= questions.len()) {
            return Err(AppError::ValidationError(format!(
                "Answer for question {} does not match a question in this quiz",
                index
            )));
        }

        let summary = score_answers(&questions, &answers);
        let prior_attempts = self
            .responses
            .count_for_user_and_quiz(user_id, quiz_id)
            .await?;

        let mut response = QuizResponse::new(user_id, quiz_id, prior_attempts as i32 + 1);
        response.score = summary.score;
        response.correct_answers = summary.correct_answers;
        response.total_questions = summary.total_questions;
        response.total_points = summary.total_points;
        response.topic_performance = summary.topic_performance;
        response.answers = answers_to_list(&answers);
        response.auto_submitted = auto_submitted;

        let response = self.responses.create(response).await?;

        if let Err(e) = self.progress.remove(user_id, quiz_id).await {
            log::warn!(
                "Response '{}' stored but progress for quiz '{}' was not cleared: {}",
                response.id,
                quiz_id,
                e
            );
        }

        log::info!(
            "User '{}' submitted quiz '{}' attempt {}: {}% ({}/{}){}",
            user_id,
            quiz_id,
            response.attempt_number,
            response.score,
            response.correct_answers,
            response.total_questions,
            if auto_submitted { " on timeout" } else { "" }
        );

        Ok(response)
    }
}
