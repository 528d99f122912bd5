use std::env;
use secrecy::SecretString;

#[derive(Clone, Debug)]
pub struct Config {
    pub mongo_conn_string: String,
    pub mongo_db_name: String,
    pub web_server_host: String,
    pub web_server_port: u16,
    pub jwt_secret: SecretString,
    pub jwt_expiration_hours: i64,
    pub openai_api_key: SecretString,
    pub openai_api_base: String,
    pub openai_model: String,
    pub generation_max_attempts: u32,
    pub generation_base_delay_ms: u64,
    pub question_cache_capacity: usize,
    pub question_cache_ttl_secs: i64,
    pub default_quiz_duration_minutes: i32,
    pub generation_job_retention_secs: i64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            mongo_conn_string: env::var("MONGO_CONN_STRING")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            mongo_db_name: env::var("MONGO_DB_NAME")
                .unwrap_or_else(|_| "quizforge-local".to_string()),
            web_server_host: env::var("WEB_SERVER_HOST")
                .unwrap_or_else(|_| "localhost".to_string()),
            web_server_port: parse_env("WEB_SERVER_PORT", 8080),
            jwt_secret: SecretString::from(env::var("JWT_SECRET")
                .unwrap_or_else(|_| "dev_secret_key_change_in_production".to_string())),
            jwt_expiration_hours: parse_env("JWT_EXPIRATION_HOURS", 24),
            openai_api_key: SecretString::from(env::var("OPENAI_API_KEY")
                .unwrap_or_else(|_| "openai_api_key".to_string())),
            openai_api_base: env::var("OPENAI_API_BASE")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            generation_max_attempts: parse_env("GENERATION_MAX_ATTEMPTS", 3),
            generation_base_delay_ms: parse_env("GENERATION_BASE_DELAY_MS", 500),
            question_cache_capacity: parse_env("QUESTION_CACHE_CAPACITY", 128),
            question_cache_ttl_secs: parse_env("QUESTION_CACHE_TTL_SECS", 3600),
            default_quiz_duration_minutes: parse_env("DEFAULT_QUIZ_DURATION_MINUTES", 30),
            generation_job_retention_secs: parse_env("GENERATION_JOB_RETENTION_SECS", 3600),
        }
    }

    /// Validate that production-critical configuration is set
    /// Panics if required secrets are using default values
    pub fn validate_for_production(&self) {
        use secrecy::ExposeSecret;

        let jwt_secret = self.jwt_secret.expose_secret();

        if jwt_secret == "dev_secret_key_change_in_production" {
            panic!(
                "FATAL: JWT_SECRET is using default value! Set JWT_SECRET environment variable to a secure random string."
            );
        }

        if jwt_secret.len() < 32 {
            panic!(
                "FATAL: JWT_SECRET is too short ({}). Must be at least 32 characters for security.",
                jwt_secret.len()
            );
        }

        if self.openai_api_key.expose_secret() == "openai_api_key" {
            panic!(
                "FATAL: OPENAI_API_KEY is using default value! Set OPENAI_API_KEY environment variable."
            );
        }

        if self.generation_max_attempts == 0 {
            panic!("FATAL: GENERATION_MAX_ATTEMPTS must be at least 1.");
        }
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            mongo_conn_string: "mongodb://localhost:27017".to_string(),
            mongo_db_name: "quizforge-test".to_string(),
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 8080,
            jwt_secret: SecretString::from("test_jwt_secret_key".to_string()),
            jwt_expiration_hours: 1,
            openai_api_key: SecretString::from("test_openai_key".to_string()),
            openai_api_base: "http://localhost:9999/v1".to_string(),
            openai_model: "test-model".to_string(),
            generation_max_attempts: 2,
            generation_base_delay_ms: 1,
            question_cache_capacity: 4,
            question_cache_ttl_secs: 60,
            default_quiz_duration_minutes: 10,
            generation_job_retention_secs: 60,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
