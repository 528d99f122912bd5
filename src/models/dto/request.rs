use std::collections::BTreeMap;

use async_graphql::InputObject;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Difficulty, OptionLabel, Question, QuestionOptions},
    services::{quiz_generation_service::QuizSettings, quiz_service::NewQuiz},
};

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct QuizSettingsRequest {
    #[validate(length(max = 200))]
    pub title: Option<String>,

    #[validate(range(min = 1, max = 240))]
    pub duration_minutes: Option<i32>,

    pub course_id: Option<String>,

    pub allow_retakes: Option<bool>,

    pub difficulty: Option<Difficulty>,

    #[validate(length(min = 1, max = 10, message = "Choose between 1 and 10 topics"))]
    pub topics: Vec<String>,

    #[validate(range(min = 1, max = 50))]
    pub number_of_questions: u32,

    #[validate(length(max = 20000))]
    pub source_text: Option<String>,
}

impl QuizSettingsRequest {
    pub fn into_settings(self, default_duration_minutes: i32) -> QuizSettings {
        QuizSettings {
            title: self.title,
            duration_minutes: self.duration_minutes.unwrap_or(default_duration_minutes),
            course_id: self.course_id,
            allow_retakes: self.allow_retakes.unwrap_or(true),
            difficulty: self.difficulty.unwrap_or_default(),
            topics: self.topics,
            number_of_questions: self.number_of_questions,
            source_text: self.source_text,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuestionInput {
    #[validate(length(min = 1, max = 1000))]
    pub question: String,

    pub options: QuestionOptions,

    pub correct_answer: OptionLabel,

    pub topic: Option<String>,

    #[validate(range(min = 1, max = 100))]
    pub points: Option<i32>,

    pub explanation: Option<String>,
}

/// A quiz written by hand rather than generated.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(max = 200))]
    pub title: Option<String>,

    #[validate(range(min = 1, max = 240))]
    pub duration_minutes: Option<i32>,

    pub course_id: Option<String>,

    pub allow_retakes: Option<bool>,

    pub difficulty: Option<Difficulty>,

    #[serde(default)]
    pub topics: Vec<String>,

    #[validate(length(min = 1, max = 50), nested)]
    pub questions: Vec<QuestionInput>,
}

impl CreateQuizRequest {
    pub fn into_new_quiz(self, default_duration_minutes: i32) -> AppResult<NewQuiz> {
        let questions = self
            .questions
            .into_iter()
            .enumerate()
            .map(|(index, input)| {
                if input.options.has_blank_option() {
                    return Err(AppError::ValidationError(format!(
                        "Question {} has an empty option",
                        index + 1
                    )));
                }
                Ok(Question {
                    id: Uuid::new_v4().to_string(),
                    quiz_id: String::new(),
                    order: index as i32,
                    question: input.question,
                    options: input.options,
                    correct_answer: input.correct_answer,
                    topic: input
                        .topic
                        .filter(|t| !t.trim().is_empty())
                        .unwrap_or_else(|| "general".to_string()),
                    points: input.points.unwrap_or(1),
                    explanation: input.explanation,
                    created_at: None,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(NewQuiz {
            title: self.title,
            duration_minutes: self.duration_minutes.unwrap_or(default_duration_minutes),
            course_id: self.course_id,
            allow_retakes: self.allow_retakes.unwrap_or(true),
            difficulty: self.difficulty.unwrap_or_default(),
            topics: self.topics,
            questions,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct SelectAnswerRequest {
    #[validate(range(min = 0))]
    pub question_index: i32,
    pub answer: OptionLabel,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct AnswerInput {
    #[validate(range(min = 0))]
    pub question_index: i32,
    pub answer: OptionLabel,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, InputObject)]
pub struct SubmitQuizRequest {
    /// When absent the saved progress is submitted.
    #[validate(nested)]
    pub answers: Option<Vec<AnswerInput>>,
}

impl SubmitQuizRequest {
    pub fn answer_map(&self) -> Option<BTreeMap<usize, OptionLabel>> {
        self.answers.as_ref().map(|answers| {
            answers
                .iter()
                .map(|a| (a.question_index.max(0) as usize, a.answer))
                .collect()
        })
    }
}
