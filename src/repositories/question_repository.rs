use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::{Database, QUESTIONS_COLLECTION},
    errors::AppResult,
    models::domain::Question,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    async fn insert_many(&self, questions: Vec<Question>) -> AppResult<Vec<Question>>;
    /// Questions of a quiz in display order.
    async fn find_by_quiz(&self, quiz_id: &str) -> AppResult<Vec<Question>>;
    async fn delete_by_quiz(&self, quiz_id: &str) -> AppResult<u64>;
}

pub struct MongoQuestionRepository {
    collection: Collection<Question>,
}

impl MongoQuestionRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(QUESTIONS_COLLECTION);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quiz_questions collection");

        let quiz_order_index = IndexModel::builder()
            .keys(doc! { "quiz_id": 1, "order": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("quiz_order_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(quiz_order_index).await?;

        log::info!("Successfully created indexes for quiz_questions collection");
        Ok(())
    }
}

#[async_trait]
impl QuestionRepository for MongoQuestionRepository {
    async fn insert_many(&self, questions: Vec<Question>) -> AppResult<Vec<Question>> {
        if questions.is_empty() {
            return Ok(questions);
        }
        self.collection.insert_many(&questions).await?;
        Ok(questions)
    }

    async fn find_by_quiz(&self, quiz_id: &str) -> AppResult<Vec<Question>> {
        let questions = self
            .collection
            .find(doc! { "quiz_id": quiz_id })
            .sort(doc! { "order": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(questions)
    }

    async fn delete_by_quiz(&self, quiz_id: &str) -> AppResult<u64> {
        let result = self
            .collection
            .delete_many(doc! { "quiz_id": quiz_id })
            .await?;
        Ok(result.deleted_count)
    }
}
