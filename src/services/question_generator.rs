use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    config::Config,
    constants::quiz_prompt::{QUIZ_GENERATION_PROMPT, QUIZ_GENERATION_USER_TEMPLATE},
    errors::{AppError, AppResult},
    models::domain::{Difficulty, OptionLabel, Question, QuestionOptions},
};

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```[a-zA-Z]*\s*\n?(.*?)\n?\s*```\s*$")
        .expect("code fence regex is invalid")
});

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub topics: Vec<String>,
    pub difficulty: Difficulty,
    pub number_of_questions: u32,
    pub source_text: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// Returns questions with fresh ids and `order` set; `quiz_id` is left empty until save.
    async fn generate_questions(&self, request: &GenerationRequest) -> AppResult<Vec<Question>>;
}

/// One question as the model returns it.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    pub question: String,
    pub options: QuestionOptions,
    /// One of "A", "B", "C", "D".
    pub correct_answer: String,
    pub topic: Option<String>,
    pub points: Option<i32>,
    pub explanation: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerationPayload {
    pub quiz_questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

pub struct OpenAiQuestionGenerator {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiQuestionGenerator {
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.openai_api_key.expose_secret())
            .with_api_base(&config.openai_api_base);

        Self {
            client: Client::with_config(openai_config),
            model: config.openai_model.clone(),
        }
    }
}

#[async_trait]
impl QuestionGenerator for OpenAiQuestionGenerator {
    async fn generate_questions(&self, request: &GenerationRequest) -> AppResult<Vec<Question>> {
        let body = json!({
            "model": self.model,
            "temperature": 0.7,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": system_prompt()? },
                { "role": "user", "content": user_prompt(request) },
            ],
        });

        log::debug!(
            "Requesting {} {} questions from model '{}'",
            request.number_of_questions,
            request.difficulty,
            self.model
        );

        let completion: ChatCompletion = self.client.chat().create_byot(body).await?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::GenerationError("Model returned no content".to_string()))?;

        let mut questions = parse_generation_payload(&content)?;
        let requested = request.number_of_questions as usize;
        if questions.len() > requested {
            questions.truncate(requested);
        } else if questions.len() < requested {
            log::warn!(
                "Model returned {} of {} requested questions",
                questions.len(),
                requested
            );
        }
        Ok(questions)
    }
}

fn system_prompt() -> AppResult<String> {
    let schema = serde_json::to_string_pretty(&schemars::schema_for!(GenerationPayload))?;
    Ok(format!("{}\n{}", QUIZ_GENERATION_PROMPT, schema))
}

fn user_prompt(request: &GenerationRequest) -> String {
    let mut prompt = QUIZ_GENERATION_USER_TEMPLATE
        .replace("{topics}", &request.topics.join(", "))
        .replace("{difficulty}", &request.difficulty.to_string())
        .replace("{count}", &request.number_of_questions.to_string());

    if let Some(source) = request.source_text.as_deref().filter(|s| !s.trim().is_empty()) {
        prompt.push_str("\n\nSource material:\n");
        prompt.push_str(source);
    }
    prompt
}

pub fn strip_code_fences(raw: &str) -> &str {
    match CODE_FENCE.captures(raw).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => raw.trim(),
    }
}

/// Validates a model reply and turns it into unsaved questions.
pub fn parse_generation_payload(raw: &str) -> AppResult<Vec<Question>> {
    let value: Value = serde_json::from_str(strip_code_fences(raw)).map_err(|e| {
        AppError::ValidationError(format!("Generation reply is not valid JSON: {}", e))
    })?;

    let items = value
        .get("quizQuestions")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            AppError::ValidationError(
                "Generation reply has no quizQuestions array".to_string(),
            )
        })?;

    if items.is_empty() {
        return Err(AppError::ValidationError(
            "Generation reply contains no questions".to_string(),
        ));
    }

    items
        .iter()
        .enumerate()
        .map(|(index, item)| to_question(index, item))
        .collect()
}

fn to_question(index: usize, item: &Value) -> AppResult<Question> {
    let generated: GeneratedQuestion = serde_json::from_value(item.clone()).map_err(|e| {
        AppError::ValidationError(format!("Question {} is malformed: {}", index + 1, e))
    })?;

    if generated.question.trim().is_empty() {
        return Err(AppError::ValidationError(format!(
            "Question {} has no text",
            index + 1
        )));
    }
    if generated.options.has_blank_option() {
        return Err(AppError::ValidationError(format!(
            "Question {} has an empty option",
            index + 1
        )));
    }

    let correct_answer: OptionLabel = generated.correct_answer.parse().map_err(|e| {
        AppError::ValidationError(format!("Question {} correctAnswer: {}", index + 1, e))
    })?;

    Ok(Question {
        id: Uuid::new_v4().to_string(),
        quiz_id: String::new(),
        order: index as i32,
        question: generated.question.trim().to_string(),
        options: generated.options,
        correct_answer,
        topic: generated
            .topic
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "general".to_string()),
        points: generated.points.filter(|p| *p > 0).unwrap_or(1),
        explanation: generated.explanation,
        created_at: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "quizQuestions": [
            {
                "question": "Which keyword moves a value into a closure?",
                "options": { "A": "ref", "B": "move", "C": "static", "D": "mut" },
                "correctAnswer": "B",
                "topic": "closures",
                "points": 2,
                "explanation": "move forces captures by value."
            },
            {
                "question": "What does Option::None represent?",
                "options": {
                    "A": "An error",
                    "B": "A panic",
                    "C": "Absence of a value",
                    "D": "Zero"
                },
                "correctAnswer": "c"
            }
        ]
    }"#;

    #[test]
    fn test_parse_valid_payload() {
        let questions = parse_generation_payload(VALID).unwrap();

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].correct_answer, OptionLabel::B);
        assert_eq!(questions[0].correct_text(), "move");
        assert_eq!(questions[0].points, 2);
        assert_eq!(questions[1].order, 1);
        assert_eq!(questions[1].correct_answer, OptionLabel::C);
        assert_eq!(questions[1].topic, "general");
        assert_eq!(questions[1].points, 1);
        assert!(questions[1].quiz_id.is_empty());
    }

    #[test]
    fn test_parse_strips_code_fences() {
        let fenced = format!("```json\n{}\n```", VALID);
        let questions = parse_generation_payload(&fenced).unwrap();
        assert_eq!(questions.len(), 2);
    }

    #[test]
    fn test_strip_code_fences_leaves_plain_text() {
        assert_eq!(strip_code_fences("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn test_missing_array_is_validation_error() {
        let err = parse_generation_payload(r#"{"questions": []}"#).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let err = parse_generation_payload(r#"{"quizQuestions": "nope"}"#).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn test_not_json_is_validation_error() {
        let err = parse_generation_payload("Sure! Here are your questions").unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_missing_option_key_is_rejected() {
        let raw = r#"{"quizQuestions": [{
            "question": "Q",
            "options": { "A": "1", "B": "2", "C": "3" },
            "correctAnswer": "A"
        }]}"#;
        let err = parse_generation_payload(raw).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(msg) if msg.contains("Question 1")));
    }

    #[test]
    fn test_correct_answer_outside_labels_is_rejected() {
        let raw = r#"{"quizQuestions": [{
            "question": "Q",
            "options": { "A": "1", "B": "2", "C": "3", "D": "4" },
            "correctAnswer": "E"
        }]}"#;
        let err = parse_generation_payload(raw).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(msg) if msg.contains("correctAnswer")));
    }

    #[test]
    fn test_empty_question_list_is_rejected() {
        let err = parse_generation_payload(r#"{"quizQuestions": []}"#).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn test_user_prompt_includes_source_when_present() {
        let mut request = GenerationRequest {
            topics: vec!["ownership".to_string(), "traits".to_string()],
            difficulty: Difficulty::Advanced,
            number_of_questions: 5,
            source_text: None,
        };
        let prompt = user_prompt(&request);
        assert!(prompt.contains("ownership, traits"));
        assert!(prompt.contains("advanced"));
        assert!(!prompt.contains("Source material"));

        request.source_text = Some("Borrowing rules...".to_string());
        assert!(user_prompt(&request).contains("Borrowing rules..."));
    }

    #[test]
    fn test_system_prompt_embeds_schema() {
        let prompt = system_prompt().unwrap();
        assert!(prompt.contains("quizQuestions"));
        assert!(prompt.contains("correctAnswer"));
    }
}
