use async_graphql::{Enum, SimpleObject};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, SimpleObject)]
pub struct QuizDefinition {
    pub id: String,                 // Assigned on save
    pub title: String,              // User supplied or date-stamped default
    pub duration_minutes: i32,      // Drives the countdown, always positive
    pub course_id: Option<String>,
    pub allow_retakes: bool,
    pub published: bool,            // Only mutable field, see QuizService::publish_quiz
    pub created_by_user_id: String,
    pub difficulty: Difficulty,
    pub topics: Vec<String>,
    pub question_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Enum, Copy, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Difficulty::Beginner => write!(f, "beginner"),
            Difficulty::Intermediate => write!(f, "intermediate"),
            Difficulty::Advanced => write!(f, "advanced"),
        }
    }
}

impl QuizDefinition {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        title: Option<&str>,
        created_by_user_id: &str,
        duration_minutes: i32,
        course_id: Option<&str>,
        allow_retakes: bool,
        difficulty: Difficulty,
        topics: Vec<String>,
        question_count: i32,
    ) -> Self {
        let now = Utc::now();
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_title(now));

        QuizDefinition {
            id: Uuid::new_v4().to_string(),
            title,
            duration_minutes,
            course_id: course_id.map(str::to_string),
            allow_retakes,
            published: false,
            created_by_user_id: created_by_user_id.to_string(),
            difficulty,
            topics,
            question_count,
            created_at: Some(now),
            modified_at: Some(now),
        }
    }
}

/// Label used when the creator leaves the title blank.
pub fn default_title(at: DateTime<Utc>) -> String {
    format!("Quiz - {}", at.format("%Y-%m-%d"))
}
