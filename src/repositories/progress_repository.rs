use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};
use serde::{Deserialize, Serialize};

use crate::{
    db::{Database, PROGRESS_COLLECTION},
    errors::AppResult,
    models::domain::{quiz_progress::progress_key, QuizProgress},
};

/// Key-value store for in-flight progress, one record per user and `quiz_progress_{quizId}` key.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    async fn load(&self, user_id: &str, quiz_id: &str) -> AppResult<Option<QuizProgress>>;
    async fn save(&self, user_id: &str, progress: &QuizProgress) -> AppResult<()>;
    async fn remove(&self, user_id: &str, quiz_id: &str) -> AppResult<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProgressRecord {
    key: String,
    user_id: String,
    payload: String,
    saved_at: DateTime<Utc>,
}

pub struct MongoProgressRepository {
    collection: Collection<ProgressRecord>,
}

impl MongoProgressRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(PROGRESS_COLLECTION);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quiz_progress collection");

        let user_key_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "key": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_key_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(user_key_index).await?;

        log::info!("Successfully created indexes for quiz_progress collection");
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for MongoProgressRepository {
    async fn load(&self, user_id: &str, quiz_id: &str) -> AppResult<Option<QuizProgress>> {
        let record = self
            .collection
            .find_one(doc! { "user_id": user_id, "key": progress_key(quiz_id) })
            .await?;

        match record {
            Some(record) => Ok(Some(serde_json::from_str(&record.payload)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, user_id: &str, progress: &QuizProgress) -> AppResult<()> {
        let key = progress_key(&progress.quiz_id);
        let record = ProgressRecord {
            key: key.clone(),
            user_id: user_id.to_string(),
            payload: serde_json::to_string(progress)?,
            saved_at: progress.saved_at,
        };

        self.collection
            .replace_one(doc! { "user_id": user_id, "key": key }, &record)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn remove(&self, user_id: &str, quiz_id: &str) -> AppResult<()> {
        self.collection
            .delete_one(doc! { "user_id": user_id, "key": progress_key(quiz_id) })
            .await?;
        Ok(())
    }
}
