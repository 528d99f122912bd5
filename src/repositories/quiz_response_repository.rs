use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::{Database, RESPONSES_COLLECTION},
    errors::AppResult,
    models::domain::QuizResponse,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizResponseRepository: Send + Sync {
    async fn create(&self, response: QuizResponse) -> AppResult<QuizResponse>;
    async fn count_for_user_and_quiz(&self, user_id: &str, quiz_id: &str) -> AppResult<usize>;
    /// The attempt shown on the dashboard: the highest attempt number.
    async fn find_latest(&self, user_id: &str, quiz_id: &str) -> AppResult<Option<QuizResponse>>;
    /// Every attempt, newest first.
    async fn find_by_user_and_quiz(
        &self,
        user_id: &str,
        quiz_id: &str,
    ) -> AppResult<Vec<QuizResponse>>;
}

pub struct MongoQuizResponseRepository {
    collection: Collection<QuizResponse>,
}

impl MongoQuizResponseRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(RESPONSES_COLLECTION);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quiz_responses collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        // One row per attempt; a duplicate attempt number means two submits raced.
        let user_quiz_attempt_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "quiz_id": 1, "attempt_number": -1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_quiz_attempt_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(user_quiz_attempt_index).await?;

        log::info!("Successfully created indexes for quiz_responses collection");
        Ok(())
    }
}

#[async_trait]
impl QuizResponseRepository for MongoQuizResponseRepository {
    async fn create(&self, response: QuizResponse) -> AppResult<QuizResponse> {
        self.collection.insert_one(&response).await?;
        Ok(response)
    }

    async fn count_for_user_and_quiz(&self, user_id: &str, quiz_id: &str) -> AppResult<usize> {
        let count = self
            .collection
            .count_documents(doc! {
                "user_id": user_id,
                "quiz_id": quiz_id
            })
            .await?;
        Ok(count as usize)
    }

    async fn find_latest(&self, user_id: &str, quiz_id: &str) -> AppResult<Option<QuizResponse>> {
        let response = self
            .collection
            .find_one(doc! {
                "user_id": user_id,
                "quiz_id": quiz_id
            })
            .sort(doc! { "attempt_number": -1 })
            .await?;
        Ok(response)
    }

    async fn find_by_user_and_quiz(
        &self,
        user_id: &str,
        quiz_id: &str,
    ) -> AppResult<Vec<QuizResponse>> {
        let responses = self
            .collection
            .find(doc! {
                "user_id": user_id,
                "quiz_id": quiz_id
            })
            .sort(doc! { "attempt_number": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(responses)
    }
}
