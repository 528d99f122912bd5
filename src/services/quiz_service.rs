use chrono::Utc;
use std::sync::Arc;

use crate::{
    auth::{require_owner_or_admin, Claims},
    errors::{AppError, AppResult},
    models::domain::{Difficulty, Question, QuizDefinition},
    repositories::{QuestionRepository, QuizRepository},
};

/// Everything needed to persist a quiz, whether generated or hand-written.
#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub title: Option<String>,
    pub duration_minutes: i32,
    pub course_id: Option<String>,
    pub allow_retakes: bool,
    pub difficulty: Difficulty,
    pub topics: Vec<String>,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SavedQuiz {
    pub quiz: QuizDefinition,
    pub questions: Vec<Question>,
}

pub struct QuizService {
    quizzes: Arc<dyn QuizRepository>,
    questions: Arc<dyn QuestionRepository>,
}

impl QuizService {
    pub fn new(quizzes: Arc<dyn QuizRepository>, questions: Arc<dyn QuestionRepository>) -> Self {
        Self { quizzes, questions }
    }

    /// Writes the quiz row, then its questions. A failed question insert deletes the quiz again.
    pub async fn save_quiz(&self, user_id: &str, new_quiz: NewQuiz) -> AppResult<SavedQuiz> {
        if new_quiz.questions.is_empty() {
            return Err(AppError::ValidationError(
                "A quiz needs at least one question".to_string(),
            ));
        }
        if new_quiz.duration_minutes < 1 {
            return Err(AppError::ValidationError(
                "Duration must be at least one minute".to_string(),
            ));
        }

        let quiz = QuizDefinition::new(
            new_quiz.title.as_deref(),
            user_id,
            new_quiz.duration_minutes,
            new_quiz.course_id.as_deref(),
            new_quiz.allow_retakes,
            new_quiz.difficulty,
            new_quiz.topics,
            new_quiz.questions.len() as i32,
        );

        let quiz = self.quizzes.create(quiz).await?;

        let now = Utc::now();
        let questions: Vec<Question> = new_quiz
            .questions
            .into_iter()
            .enumerate()
            .map(|(index, mut question)| {
                question.quiz_id = quiz.id.clone();
                question.order = index as i32;
                question.created_at = Some(now);
                question
            })
            .collect();

        match self.questions.insert_many(questions).await {
            Ok(questions) => {
                log::info!(
                    "Saved quiz '{}' with {} questions for user '{}'",
                    quiz.id,
                    questions.len(),
                    user_id
                );
                Ok(SavedQuiz { quiz, questions })
            }
            Err(err) => {
                log::warn!(
                    "Question insert for quiz '{}' failed, removing quiz: {}",
                    quiz.id,
                    err
                );
                self.compensate(&quiz.id).await;
                Err(err)
            }
        }
    }

    async fn compensate(&self, quiz_id: &str) {
        if let Err(e) = self.questions.delete_by_quiz(quiz_id).await {
            log::error!(
                "Failed to remove partial questions of quiz '{}': {}",
                quiz_id,
                e
            );
        }
        if let Err(e) = self.quizzes.delete(quiz_id).await {
            log::error!("Failed to remove orphaned quiz '{}': {}", quiz_id, e);
        }
    }

    pub async fn get_quiz(&self, id: &str) -> AppResult<QuizDefinition> {
        let quiz = self
            .quizzes
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz with id '{}' not found", id)))?;

        Ok(quiz)
    }

    pub async fn get_questions(&self, quiz_id: &str) -> AppResult<Vec<Question>> {
        self.questions.find_by_quiz(quiz_id).await
    }

    /// Full quiz including answers, restricted to its creator.
    pub async fn get_quiz_for_owner(&self, claims: &Claims, id: &str) -> AppResult<SavedQuiz> {
        let quiz = self.get_quiz(id).await?;
        require_owner_or_admin(claims, &quiz.created_by_user_id)?;
        let questions = self.get_questions(id).await?;
        Ok(SavedQuiz { quiz, questions })
    }

    pub async fn publish_quiz(&self, claims: &Claims, id: &str) -> AppResult<QuizDefinition> {
        let mut quiz = self.get_quiz(id).await?;
        require_owner_or_admin(claims, &quiz.created_by_user_id)?;

        if quiz.published {
            return Ok(quiz);
        }

        quiz.published = true;
        quiz.modified_at = Some(Utc::now());
        let quiz = self.quizzes.update(quiz).await?;

        log::info!("Quiz '{}' published by '{}'", quiz.id, claims.sub);
        Ok(quiz)
    }
}
