pub mod progress_repository;
pub mod question_repository;
pub mod quiz_repository;
pub mod quiz_response_repository;

pub use progress_repository::{MongoProgressRepository, ProgressRepository};
pub use question_repository::{MongoQuestionRepository, QuestionRepository};
pub use quiz_repository::{MongoQuizRepository, QuizRepository};
pub use quiz_response_repository::{MongoQuizResponseRepository, QuizResponseRepository};
