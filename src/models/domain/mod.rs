pub mod quiz;
pub mod quiz_progress;
pub mod quiz_question;
pub mod quiz_response;
pub use quiz::{Difficulty, QuizDefinition};
pub use quiz_progress::QuizProgress;
pub use quiz_question::{OptionLabel, Question, QuestionOptions};
pub use quiz_response::{QuizResponse, SelectedAnswer, TopicPerformance};
