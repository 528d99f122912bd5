use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    errors::{AppError, AppResult},
    models::domain::{
        quiz_question::OptionLabel,
        quiz_response::{answers_to_list, SelectedAnswer},
    },
};

/// In-flight answers and position for one quiz, persisted on every change so a
/// session can be resumed.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuizProgress {
    pub quiz_id: String,
    pub current_question_index: usize,
    /// Sparse: only answered questions are present.
    pub selected_answers: BTreeMap<usize, OptionLabel>,
    pub saved_at: DateTime<Utc>,
}

/// Storage key for a quiz's progress record.
pub fn progress_key(quiz_id: &str) -> String {
    format!("quiz_progress_{}", quiz_id)
}

impl QuizProgress {
    pub fn new(quiz_id: &str) -> Self {
        Self {
            quiz_id: quiz_id.to_string(),
            current_question_index: 0,
            selected_answers: BTreeMap::new(),
            saved_at: Utc::now(),
        }
    }

    /// Moves forward one question. Returns false without changing anything at the last question.
    pub fn next(&mut self, total_questions: usize) -> bool {
        if self.current_question_index + 1 >= total_questions {
            return false;
        }
        self.current_question_index += 1;
        self.touch();
        true
    }

    /// Moves back one question. Returns false without changing anything at question 0.
    pub fn previous(&mut self) -> bool {
        if self.current_question_index == 0 {
            return false;
        }
        self.current_question_index -= 1;
        self.touch();
        true
    }

    pub fn select_answer(
        &mut self,
        question_index: usize,
        answer: OptionLabel,
        total_questions: usize,
    ) -> AppResult<()> {
        if question_index >= total_questions {
            return Err(AppError::ValidationError(format!(
                "Question index {} is out of range for a quiz with {} questions",
                question_index, total_questions
            )));
        }
        self.selected_answers.insert(question_index, answer);
        self.touch();
        Ok(())
    }

    /// Pulls a restored record back inside the quiz bounds and drops answers to
    /// questions that no longer exist.
    pub fn clamp_to(&mut self, total_questions: usize) {
        let last = total_questions.saturating_sub(1);
        if self.current_question_index > last {
            self.current_question_index = last;
        }
        self.selected_answers.retain(|index, _| *index < total_questions);
    }

    pub fn answered_count(&self) -> usize {
        self.selected_answers.len()
    }

    pub fn answers_as_list(&self) -> Vec<SelectedAnswer> {
        answers_to_list(&self.selected_answers)
    }

    fn touch(&mut self) {
        self.saved_at = Utc::now();
    }
}
