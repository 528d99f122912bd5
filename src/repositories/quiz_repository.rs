use async_trait::async_trait;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::{Database, QUIZZES_COLLECTION},
    errors::AppResult,
    models::domain::QuizDefinition,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn create(&self, quiz: QuizDefinition) -> AppResult<QuizDefinition>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizDefinition>>;
    async fn update(&self, quiz: QuizDefinition) -> AppResult<QuizDefinition>;
    /// Returns whether a quiz was removed.
    async fn delete(&self, id: &str) -> AppResult<bool>;
}

pub struct MongoQuizRepository {
    collection: Collection<QuizDefinition>,
}

impl MongoQuizRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(QUIZZES_COLLECTION);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quizzes collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let owner_index = IndexModel::builder()
            .keys(doc! { "created_by_user_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("created_by_user_id".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(owner_index).await?;

        log::info!("Successfully created indexes for quizzes collection");
        Ok(())
    }
}

#[async_trait]
impl QuizRepository for MongoQuizRepository {
    async fn create(&self, quiz: QuizDefinition) -> AppResult<QuizDefinition> {
        self.collection.insert_one(&quiz).await?;
        Ok(quiz)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizDefinition>> {
        let quiz = self.collection.find_one(doc! { "id": id }).await?;
        Ok(quiz)
    }

    async fn update(&self, quiz: QuizDefinition) -> AppResult<QuizDefinition> {
        self.collection
            .replace_one(doc! { "id": &quiz.id }, &quiz)
            .await?;
        Ok(quiz)
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        let result = self.collection.delete_one(doc! { "id": id }).await?;
        Ok(result.deleted_count > 0)
    }
}
