use async_graphql::SimpleObject;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    models::domain::{Question, QuestionOptions, QuizDefinition, QuizProgress, SelectedAnswer},
    services::{
        quiz_service::SavedQuiz,
        quiz_session_service::{LoadedSession, ProgressUpdate, ResumeChoice, SessionState},
    },
};

/// A question as shown to someone taking the quiz; the answer is left out.
#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct QuestionForTaking {
    pub id: String,
    pub index: i32,
    pub question: String,
    pub options: QuestionOptions,
    pub topic: String,
    pub points: i32,
}

impl From<&Question> for QuestionForTaking {
    fn from(question: &Question) -> Self {
        QuestionForTaking {
            id: question.id.clone(),
            index: question.order,
            question: question.question.clone(),
            options: question.options.clone(),
            topic: question.topic.clone(),
            points: question.points,
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct QuizForTaking {
    pub id: String,
    pub title: String,
    pub duration_minutes: i32,
    pub allow_retakes: bool,
    pub question_count: i32,
    pub questions: Vec<QuestionForTaking>,
}

impl QuizForTaking {
    pub fn from_quiz(quiz: &QuizDefinition, questions: &[Question]) -> Self {
        QuizForTaking {
            id: quiz.id.clone(),
            title: quiz.title.clone(),
            duration_minutes: quiz.duration_minutes,
            allow_retakes: quiz.allow_retakes,
            question_count: questions.len() as i32,
            questions: questions.iter().map(QuestionForTaking::from).collect(),
        }
    }
}

/// Full quiz with answers, for its creator.
#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct QuizDetail {
    pub quiz: QuizDefinition,
    pub questions: Vec<Question>,
}

impl From<SavedQuiz> for QuizDetail {
    fn from(saved: SavedQuiz) -> Self {
        QuizDetail {
            quiz: saved.quiz,
            questions: saved.questions,
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct ProgressDto {
    pub current_question_index: i32,
    pub selected_answers: Vec<SelectedAnswer>,
    pub answered_count: i32,
    pub saved_at: DateTime<Utc>,
}

impl From<&QuizProgress> for ProgressDto {
    fn from(progress: &QuizProgress) -> Self {
        ProgressDto {
            current_question_index: progress.current_question_index as i32,
            selected_answers: progress.answers_as_list(),
            answered_count: progress.answered_count() as i32,
            saved_at: progress.saved_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct SessionResponse {
    pub quiz: QuizForTaking,
    pub progress: ProgressDto,
    /// True when saved progress exists and the caller must resume or start fresh.
    pub resume_required: bool,
    pub saved_progress: Option<ProgressDto>,
    pub remaining_seconds: Option<i32>,
    pub persisted: bool,
}

impl From<&SessionState> for SessionResponse {
    fn from(state: &SessionState) -> Self {
        SessionResponse {
            quiz: QuizForTaking::from_quiz(&state.quiz, &state.questions),
            progress: ProgressDto::from(&state.progress),
            resume_required: false,
            saved_progress: None,
            remaining_seconds: state.remaining_seconds.map(|s| s as i32),
            persisted: state.persisted,
        }
    }
}

impl From<&LoadedSession> for SessionResponse {
    fn from(loaded: &LoadedSession) -> Self {
        let mut response = SessionResponse::from(&loaded.state);
        if let ResumeChoice::Required(saved) = &loaded.resume_choice {
            response.resume_required = true;
            response.saved_progress = Some(ProgressDto::from(saved));
        }
        response
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct ProgressUpdateResponse {
    pub progress: ProgressDto,
    pub total_questions: i32,
    pub changed: bool,
    pub persisted: bool,
    pub remaining_seconds: Option<i32>,
}

impl From<&ProgressUpdate> for ProgressUpdateResponse {
    fn from(update: &ProgressUpdate) -> Self {
        ProgressUpdateResponse {
            progress: ProgressDto::from(&update.progress),
            total_questions: update.total_questions as i32,
            changed: update.changed,
            persisted: update.persisted,
            remaining_seconds: update.remaining_seconds.map(|s| s as i32),
        }
    }
}
