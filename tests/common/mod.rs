#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::RwLock;
use uuid::Uuid;

use quizforge_server::{
    app_state::{AppState, Repositories},
    config::Config,
    errors::{AppError, AppResult},
    models::domain::{
        OptionLabel, Question, QuestionOptions, QuizDefinition, QuizProgress, QuizResponse,
    },
    repositories::{ProgressRepository, QuestionRepository, QuizRepository, QuizResponseRepository},
    services::question_generator::{GenerationRequest, QuestionGenerator},
};

pub fn test_config() -> Config {
    Config {
        mongo_conn_string: "mongodb://localhost:27017".to_string(),
        mongo_db_name: "quizforge-it".to_string(),
        web_server_host: "127.0.0.1".to_string(),
        web_server_port: 8080,
        jwt_secret: SecretString::from("integration_secret_key".to_string()),
        jwt_expiration_hours: 1,
        openai_api_key: SecretString::from("unused".to_string()),
        openai_api_base: "http://localhost:9999/v1".to_string(),
        openai_model: "test-model".to_string(),
        generation_max_attempts: 3,
        generation_base_delay_ms: 1,
        question_cache_capacity: 8,
        question_cache_ttl_secs: 300,
        default_quiz_duration_minutes: 1,
        generation_job_retention_secs: 60,
    }
}

/// A one-point question whose correct option is always `A`.
pub fn question(order: i32, topic: &str) -> Question {
    Question {
        id: Uuid::new_v4().to_string(),
        quiz_id: String::new(),
        order,
        question: format!("Question {}?", order),
        options: QuestionOptions::from_array([
            format!("right {}", order),
            format!("wrong {} b", order),
            format!("wrong {} c", order),
            format!("wrong {} d", order),
        ]),
        correct_answer: OptionLabel::A,
        topic: topic.to_string(),
        points: 1,
        explanation: None,
        created_at: None,
    }
}

#[derive(Default)]
pub struct InMemoryQuizRepository {
    pub quizzes: RwLock<HashMap<String, QuizDefinition>>,
}

#[async_trait]
impl QuizRepository for InMemoryQuizRepository {
    async fn create(&self, quiz: QuizDefinition) -> AppResult<QuizDefinition> {
        let mut quizzes = self.quizzes.write().await;
        if quizzes.contains_key(&quiz.id) {
            return Err(AppError::AlreadyExists(format!("Quiz '{}'", quiz.id)));
        }
        quizzes.insert(quiz.id.clone(), quiz.clone());
        Ok(quiz)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizDefinition>> {
        Ok(self.quizzes.read().await.get(id).cloned())
    }

    async fn update(&self, quiz: QuizDefinition) -> AppResult<QuizDefinition> {
        let mut quizzes = self.quizzes.write().await;
        match quizzes.get_mut(&quiz.id) {
            Some(existing) => {
                *existing = quiz.clone();
                Ok(quiz)
            }
            None => Err(AppError::NotFound(format!("Quiz '{}' not found", quiz.id))),
        }
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        Ok(self.quizzes.write().await.remove(id).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryQuestionRepository {
    pub questions: RwLock<Vec<Question>>,
    pub fail_inserts: AtomicBool,
}

#[async_trait]
impl QuestionRepository for InMemoryQuestionRepository {
    async fn insert_many(&self, questions: Vec<Question>) -> AppResult<Vec<Question>> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError("insert interrupted".to_string()));
        }
        self.questions.write().await.extend(questions.iter().cloned());
        Ok(questions)
    }

    async fn find_by_quiz(&self, quiz_id: &str) -> AppResult<Vec<Question>> {
        let mut found: Vec<Question> = self
            .questions
            .read()
            .await
            .iter()
            .filter(|q| q.quiz_id == quiz_id)
            .cloned()
            .collect();
        found.sort_by_key(|q| q.order);
        Ok(found)
    }

    async fn delete_by_quiz(&self, quiz_id: &str) -> AppResult<u64> {
        let mut questions = self.questions.write().await;
        let before = questions.len();
        questions.retain(|q| q.quiz_id != quiz_id);
        Ok((before - questions.len()) as u64)
    }
}

#[derive(Default)]
pub struct InMemoryQuizResponseRepository {
    pub responses: RwLock<Vec<QuizResponse>>,
    /// Simulated write latency, in (tokio) milliseconds.
    pub create_delay_ms: AtomicU64,
}

#[async_trait]
impl QuizResponseRepository for InMemoryQuizResponseRepository {
    async fn create(&self, response: QuizResponse) -> AppResult<QuizResponse> {
        let delay = self.create_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
        let mut responses = self.responses.write().await;
        let duplicate = responses.iter().any(|r| {
            r.user_id == response.user_id
                && r.quiz_id == response.quiz_id
                && r.attempt_number == response.attempt_number
        });
        if duplicate {
            return Err(AppError::AlreadyExists(format!(
                "Attempt {} already recorded",
                response.attempt_number
            )));
        }
        responses.push(response.clone());
        Ok(response)
    }

    async fn count_for_user_and_quiz(&self, user_id: &str, quiz_id: &str) -> AppResult<usize> {
        Ok(self
            .responses
            .read()
            .await
            .iter()
            .filter(|r| r.user_id == user_id && r.quiz_id == quiz_id)
            .count())
    }

    async fn find_latest(&self, user_id: &str, quiz_id: &str) -> AppResult<Option<QuizResponse>> {
        Ok(self
            .find_by_user_and_quiz(user_id, quiz_id)
            .await?
            .into_iter()
            .next())
    }

    async fn find_by_user_and_quiz(
        &self,
        user_id: &str,
        quiz_id: &str,
    ) -> AppResult<Vec<QuizResponse>> {
        let mut found: Vec<QuizResponse> = self
            .responses
            .read()
            .await
            .iter()
            .filter(|r| r.user_id == user_id && r.quiz_id == quiz_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.attempt_number.cmp(&a.attempt_number));
        Ok(found)
    }
}

#[derive(Default)]
pub struct InMemoryProgressRepository {
    pub records: RwLock<HashMap<(String, String), QuizProgress>>,
    pub fail_writes: AtomicBool,
}

impl InMemoryProgressRepository {
    pub async fn stored(&self, user_id: &str, quiz_id: &str) -> Option<QuizProgress> {
        self.records
            .read()
            .await
            .get(&(user_id.to_string(), quiz_id.to_string()))
            .cloned()
    }
}

#[async_trait]
impl ProgressRepository for InMemoryProgressRepository {
    async fn load(&self, user_id: &str, quiz_id: &str) -> AppResult<Option<QuizProgress>> {
        // Lets concurrent callers interleave between load and save.
        tokio::task::yield_now().await;
        Ok(self.stored(user_id, quiz_id).await)
    }

    async fn save(&self, user_id: &str, progress: &QuizProgress) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError("storage full".to_string()));
        }
        self.records
            .write()
            .await
            .insert((user_id.to_string(), progress.quiz_id.clone()), progress.clone());
        Ok(())
    }

    async fn remove(&self, user_id: &str, quiz_id: &str) -> AppResult<()> {
        self.records
            .write()
            .await
            .remove(&(user_id.to_string(), quiz_id.to_string()));
        Ok(())
    }
}

/// Returns `number_of_questions` questions, topics round-robin. The first `failures`
/// calls fail.
#[derive(Default)]
pub struct FakeGenerator {
    pub calls: AtomicUsize,
    pub failures: usize,
}

#[async_trait]
impl QuestionGenerator for FakeGenerator {
    async fn generate_questions(&self, request: &GenerationRequest) -> AppResult<Vec<Question>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(AppError::GenerationError("model overloaded".to_string()));
        }
        Ok((0..request.number_of_questions as usize)
            .map(|i| question(i as i32, &request.topics[i % request.topics.len()]))
            .collect())
    }
}

pub struct TestWorld {
    pub state: AppState,
    pub quizzes: Arc<InMemoryQuizRepository>,
    pub questions: Arc<InMemoryQuestionRepository>,
    pub responses: Arc<InMemoryQuizResponseRepository>,
    pub progress: Arc<InMemoryProgressRepository>,
    pub generator: Arc<FakeGenerator>,
}

pub fn world() -> TestWorld {
    world_with_generator(FakeGenerator::default())
}

pub fn world_with_generator(generator: FakeGenerator) -> TestWorld {
    let quizzes = Arc::new(InMemoryQuizRepository::default());
    let questions = Arc::new(InMemoryQuestionRepository::default());
    let responses = Arc::new(InMemoryQuizResponseRepository::default());
    let progress = Arc::new(InMemoryProgressRepository::default());
    let generator = Arc::new(generator);

    let state = AppState::with_repositories(
        test_config(),
        Repositories {
            quizzes: quizzes.clone(),
            questions: questions.clone(),
            responses: responses.clone(),
            progress: progress.clone(),
        },
        generator.clone(),
    );

    TestWorld {
        state,
        quizzes,
        questions,
        responses,
        progress,
        generator,
    }
}
