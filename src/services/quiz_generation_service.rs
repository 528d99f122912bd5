use std::{collections::HashMap, sync::Arc};

use async_graphql::SimpleObject;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Difficulty, Question},
    services::{
        generation_progress::{GenerationProgress, StageTransitionError},
        option_shuffle::shuffle_all,
        question_cache::{cache_key, QuestionCache},
        question_generator::{GenerationRequest, QuestionGenerator},
        quiz_service::{NewQuiz, QuizService, SavedQuiz},
        retry::{retry_with_backoff, RetryPolicy},
    },
};

pub const MAX_QUESTIONS_PER_QUIZ: u32 = 50;

/// Settings chosen by the quiz creator before generation starts.
#[derive(Debug, Clone)]
pub struct QuizSettings {
    pub title: Option<String>,
    pub duration_minutes: i32,
    pub course_id: Option<String>,
    pub allow_retakes: bool,
    pub difficulty: Difficulty,
    pub topics: Vec<String>,
    pub number_of_questions: u32,
    pub source_text: Option<String>,
}

impl QuizSettings {
    /// Trims and de-duplicates topics (case-insensitive), keeping first-seen order.
    pub fn normalized_topics(&self) -> Vec<String> {
        let mut seen = Vec::<String>::new();
        let mut topics = Vec::new();
        for topic in &self.topics {
            let trimmed = topic.trim();
            if trimmed.is_empty() {
                continue;
            }
            let lowered = trimmed.to_lowercase();
            if !seen.contains(&lowered) {
                seen.push(lowered);
                topics.push(trimmed.to_string());
            }
        }
        topics
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct GenerationJob {
    pub job_id: String,
    pub user_id: String,
    pub progress: GenerationProgress,
    pub quiz_id: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl GenerationJob {
    fn new(user_id: &str) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            progress: GenerationProgress::new(),
            quiz_id: None,
            error: None,
            created_at: Utc::now(),
        }
    }
}

/// In-memory job table polled by clients while generation runs in the background.
/// Finished jobs are kept for `retention` after creation so clients can read the outcome.
#[derive(Clone)]
pub struct GenerationJobRegistry {
    jobs: Arc<RwLock<HashMap<String, GenerationJob>>>,
    retention: chrono::Duration,
}

impl GenerationJobRegistry {
    pub fn new(retention: chrono::Duration) -> Self {
        Self {
            jobs: Arc::default(),
            retention,
        }
    }

    pub async fn create(&self, user_id: &str) -> GenerationJob {
        let removed = self.prune_finished(Utc::now() - self.retention).await;
        if removed > 0 {
            log::debug!("Pruned {} finished generation jobs", removed);
        }

        let job = GenerationJob::new(user_id);
        self.jobs
            .write()
            .await
            .insert(job.job_id.clone(), job.clone());
        job
    }

    pub async fn get(&self, job_id: &str) -> Option<GenerationJob> {
        self.jobs.read().await.get(job_id).cloned()
    }

    async fn update<F>(&self, job_id: &str, f: F) -> AppResult<()>
    where
        F: FnOnce(&mut GenerationJob) -> Result<(), StageTransitionError>,
    {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| AppError::NotFound(format!("Generation job '{}' not found", job_id)))?;
        f(job)?;
        Ok(())
    }

    /// Drops finished jobs created before `cutoff`. Returns how many were removed.
    async fn prune_finished(&self, cutoff: DateTime<Utc>) -> usize {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| !(job.progress.stage.is_terminal() && job.created_at < cutoff));
        before - jobs.len()
    }
}

pub struct QuizGenerationService {
    generator: Arc<dyn QuestionGenerator>,
    quiz_service: Arc<QuizService>,
    cache: Arc<QuestionCache>,
    jobs: GenerationJobRegistry,
    retry_policy: RetryPolicy,
}

impl QuizGenerationService {
    pub fn new(
        generator: Arc<dyn QuestionGenerator>,
        quiz_service: Arc<QuizService>,
        cache: Arc<QuestionCache>,
        jobs: GenerationJobRegistry,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            generator,
            quiz_service,
            cache,
            jobs,
            retry_policy,
        }
    }

    /// Registers a job and runs the pipeline on a background task.
    pub async fn start_job(
        self: &Arc<Self>,
        user_id: &str,
        settings: QuizSettings,
    ) -> GenerationJob {
        let job = self.jobs.create(user_id).await;

        let service = Arc::clone(self);
        let job_id = job.job_id.clone();
        let user_id = user_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = service.run_job(&job_id, &user_id, settings).await {
                log::warn!("Generation job '{}' failed: {}", job_id, e);
            }
        });

        job
    }

    /// Runs the pipeline for an existing job, recording failure on the job before returning it.
    pub async fn run_job(
        &self,
        job_id: &str,
        user_id: &str,
        settings: QuizSettings,
    ) -> AppResult<SavedQuiz> {
        match self.generate_quiz(job_id, user_id, settings).await {
            Ok(saved) => Ok(saved),
            Err(err) => {
                let message = err.to_string();
                let recorded = self
                    .jobs
                    .update(job_id, |job| {
                        job.error = Some(message.clone());
                        job.progress.fail(&message)
                    })
                    .await;
                if let Err(e) = recorded {
                    log::error!("Could not record failure of job '{}': {}", job_id, e);
                }
                Err(err)
            }
        }
    }

    pub async fn job_status(&self, user_id: &str, job_id: &str) -> AppResult<GenerationJob> {
        match self.jobs.get(job_id).await {
            Some(job) if job.user_id == user_id => Ok(job),
            _ => Err(AppError::NotFound(format!(
                "Generation job '{}' not found",
                job_id
            ))),
        }
    }

    async fn generate_quiz(
        &self,
        job_id: &str,
        user_id: &str,
        settings: QuizSettings,
    ) -> AppResult<SavedQuiz> {
        self.jobs
            .update(job_id, |job| {
                job.progress.preparing(None, "Validating quiz settings")
            })
            .await?;

        let topics = settings.normalized_topics();
        validate_settings(&settings, &topics)?;

        self.jobs
            .update(job_id, |job| {
                job.progress.analyzing(None, "Checking for existing questions")
            })
            .await?;

        let key = cache_key(settings.difficulty, &topics, settings.number_of_questions);
        // Source-grounded requests are specific to their text and never shared.
        let cacheable = settings
            .source_text
            .as_deref()
            .map_or(true, |s| s.trim().is_empty());

        let cached = if cacheable {
            self.cache.get(&key).await
        } else {
            None
        };

        let questions = match cached {
            Some(questions) => {
                log::info!("Question cache hit for '{}'", key);
                self.jobs
                    .update(job_id, |job| {
                        job.progress.generating(Some(80), "Reusing recently generated questions")
                    })
                    .await?;
                questions
                    .into_iter()
                    .map(|mut question| {
                        question.id = Uuid::new_v4().to_string();
                        question
                    })
                    .collect::<Vec<_>>()
            }
            None => {
                let request = GenerationRequest {
                    topics: topics.clone(),
                    difficulty: settings.difficulty,
                    number_of_questions: settings.number_of_questions,
                    source_text: settings.source_text.clone(),
                };
                let questions = self.generate_with_retry(job_id, &request).await?;
                if cacheable {
                    self.cache.insert(&key, questions.clone()).await;
                }
                questions
            }
        };

        let questions: Vec<Question> = {
            let mut rng = rand::thread_rng();
            shuffle_all(&questions, &mut rng)
        };

        self.jobs
            .update(job_id, |job| job.progress.saving(None, "Saving quiz"))
            .await?;

        let saved = self
            .quiz_service
            .save_quiz(
                user_id,
                NewQuiz {
                    title: settings.title,
                    duration_minutes: settings.duration_minutes,
                    course_id: settings.course_id,
                    allow_retakes: settings.allow_retakes,
                    difficulty: settings.difficulty,
                    topics,
                    questions,
                },
            )
            .await?;

        let quiz_id = saved.quiz.id.clone();
        self.jobs
            .update(job_id, |job| {
                job.quiz_id = Some(quiz_id);
                job.progress.complete("Quiz ready")
            })
            .await?;

        Ok(saved)
    }

    async fn generate_with_retry(
        &self,
        job_id: &str,
        request: &GenerationRequest,
    ) -> AppResult<Vec<Question>> {
        retry_with_backoff(&self.retry_policy, AppError::is_retryable, |attempt| async move {
            let message = if attempt == 1 {
                "Generating questions".to_string()
            } else {
                format!("Generating questions (attempt {})", attempt)
            };
            let percent = 50 + ((attempt - 1) * 5).min(30) as u8;
            self.jobs
                .update(job_id, |job| job.progress.generating(Some(percent), &message))
                .await?;

            self.generator.generate_questions(request).await
        })
        .await
    }
}

fn validate_settings(settings: &QuizSettings, topics: &[String]) -> AppResult<()> {
    if topics.is_empty() {
        return Err(AppError::ValidationError(
            "At least one topic is required".to_string(),
        ));
    }
    if settings.number_of_questions == 0 || settings.number_of_questions > MAX_QUESTIONS_PER_QUIZ {
        return Err(AppError::ValidationError(format!(
            "Number of questions must be between 1 and {}",
            MAX_QUESTIONS_PER_QUIZ
        )));
    }
    if settings.duration_minutes < 1 {
        return Err(AppError::ValidationError(
            "Duration must be at least one minute".to_string(),
        ));
    }
    Ok(())
}
