use std::collections::BTreeMap;

use async_graphql::SimpleObject;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::quiz_question::OptionLabel;

/// One submitted attempt. Written once and never updated.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, SimpleObject)]
pub struct QuizResponse {
    pub id: String,
    pub user_id: String,
    pub quiz_id: String,
    pub score: i32,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub total_points: i32,
    pub answers: Vec<SelectedAnswer>,
    pub topic_performance: Vec<TopicPerformance>,
    pub attempt_number: i32,
    pub auto_submitted: bool,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, SimpleObject)]
pub struct SelectedAnswer {
    pub question_index: i32,
    pub answer: OptionLabel,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, SimpleObject)]
pub struct TopicPerformance {
    pub topic: String,
    pub correct: i32,
    pub total: i32,
    pub points_earned: i32,
    pub points_possible: i32,
    pub percentage: i32,
}

/// Flattens an index-keyed answer map into storable rows, ordered by question.
pub fn answers_to_list(answers: &BTreeMap<usize, OptionLabel>) -> Vec<SelectedAnswer> {
    answers
        .iter()
        .map(|(index, answer)| SelectedAnswer {
            question_index: *index as i32,
            answer: *answer,
        })
        .collect()
}

impl QuizResponse {
    pub fn new(user_id: &str, quiz_id: &str, attempt_number: i32) -> Self {
        QuizResponse {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            quiz_id: quiz_id.to_string(),
            score: 0,
            correct_answers: 0,
            total_questions: 0,
            total_points: 0,
            answers: Vec::new(),
            topic_performance: Vec::new(),
            attempt_number,
            auto_submitted: false,
            submitted_at: Utc::now(),
        }
    }
}
