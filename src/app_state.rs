use std::{sync::Arc, time::Duration};

use crate::{
    auth::JwtService,
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::{
        MongoProgressRepository, MongoQuestionRepository, MongoQuizRepository,
        MongoQuizResponseRepository, ProgressRepository, QuestionRepository, QuizRepository,
        QuizResponseRepository,
    },
    services::{
        question_cache::{QuestionCache, SystemClock},
        question_generator::{OpenAiQuestionGenerator, QuestionGenerator},
        quiz_generation_service::{GenerationJobRegistry, QuizGenerationService},
        quiz_service::QuizService,
        quiz_session_service::QuizSessionService,
        quiz_submission_service::QuizSubmissionService,
        quiz_timer::SessionTimers,
        retake_service::RetakeService,
        retry::RetryPolicy,
        session_lock::SessionLocks,
    },
};

/// Repositories behind the services, swappable for in-memory versions in tests.
pub struct Repositories {
    pub quizzes: Arc<dyn QuizRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub responses: Arc<dyn QuizResponseRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

#[derive(Clone)]
pub struct AppState {
    pub quiz_service: Arc<QuizService>,
    pub generation_service: Arc<QuizGenerationService>,
    pub session_service: Arc<QuizSessionService>,
    pub retake_service: Arc<RetakeService>,
    pub jwt_service: Arc<JwtService>,
    pub db: Option<Database>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let quizzes = Arc::new(MongoQuizRepository::new(&db));
        quizzes.ensure_indexes().await?;
        let questions = Arc::new(MongoQuestionRepository::new(&db));
        questions.ensure_indexes().await?;
        let responses = Arc::new(MongoQuizResponseRepository::new(&db));
        responses.ensure_indexes().await?;
        let progress = Arc::new(MongoProgressRepository::new(&db));
        progress.ensure_indexes().await?;

        let repositories = Repositories {
            quizzes,
            questions,
            responses,
            progress,
        };
        let generator = Arc::new(OpenAiQuestionGenerator::new(&config));

        let mut state = Self::with_repositories(config, repositories, generator);
        state.db = Some(db);
        Ok(state)
    }

    /// Wires every service over the given storage and generator.
    pub fn with_repositories(
        config: Config,
        repositories: Repositories,
        generator: Arc<dyn QuestionGenerator>,
    ) -> Self {
        let retry_policy = RetryPolicy::new(
            config.generation_max_attempts,
            Duration::from_millis(config.generation_base_delay_ms),
        );

        let quiz_service = Arc::new(QuizService::new(
            Arc::clone(&repositories.quizzes),
            Arc::clone(&repositories.questions),
        ));
        let retake_service = Arc::new(RetakeService::new(
            Arc::clone(&quiz_service),
            Arc::clone(&repositories.responses),
            Arc::clone(&repositories.progress),
        ));
        let submission_service = Arc::new(QuizSubmissionService::new(
            Arc::clone(&quiz_service),
            Arc::clone(&repositories.responses),
            Arc::clone(&repositories.progress),
            Arc::clone(&retake_service),
        ));
        let session_service = Arc::new(QuizSessionService::new(
            Arc::clone(&quiz_service),
            Arc::clone(&repositories.progress),
            submission_service,
            Arc::clone(&retake_service),
            Arc::new(SessionTimers::new()),
            Arc::new(SessionLocks::new()),
            retry_policy,
        ));

        let cache = Arc::new(QuestionCache::new(
            config.question_cache_capacity,
            chrono::Duration::seconds(config.question_cache_ttl_secs),
            Arc::new(SystemClock),
        ));
        let generation_service = Arc::new(QuizGenerationService::new(
            generator,
            Arc::clone(&quiz_service),
            cache,
            GenerationJobRegistry::new(chrono::Duration::seconds(
                config.generation_job_retention_secs,
            )),
            retry_policy,
        ));

        let jwt_service = Arc::new(JwtService::new(
            &config.jwt_secret,
            config.jwt_expiration_hours,
        ));

        Self {
            quiz_service,
            generation_service,
            session_service,
            retake_service,
            jwt_service,
            db: None,
            config: Arc::new(config),
        }
    }
}
