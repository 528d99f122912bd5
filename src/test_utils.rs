#[cfg(test)]
pub mod fixtures {
    use crate::models::domain::{
        Difficulty, OptionLabel, Question, QuestionOptions, QuizDefinition,
    };

    /// Creates a one-point question whose correct text is always "correct <order>"
    pub fn question_with_answer(order: i32, correct: OptionLabel) -> Question {
        let mut texts = [
            format!("wrong {} a", order),
            format!("wrong {} b", order),
            format!("wrong {} c", order),
            format!("wrong {} d", order),
        ];
        texts[correct.index()] = format!("correct {}", order);

        Question {
            id: format!("question-{}", order),
            quiz_id: "quiz-1".to_string(),
            order,
            question: format!("Question number {}?", order),
            options: QuestionOptions::from_array(texts),
            correct_answer: correct,
            topic: "general".to_string(),
            points: 1,
            explanation: None,
            created_at: None,
        }
    }

    /// Creates `count` questions that all have `A` as the correct answer
    pub fn test_questions(count: usize) -> Vec<Question> {
        (0..count)
            .map(|i| question_with_answer(i as i32, OptionLabel::A))
            .collect()
    }

    pub fn test_quiz(owner: &str, allow_retakes: bool) -> QuizDefinition {
        let mut quiz = QuizDefinition::new(
            Some("Ownership basics"),
            owner,
            1,
            None,
            allow_retakes,
            Difficulty::Beginner,
            vec!["ownership".to_string()],
            0,
        );
        quiz.id = "quiz-1".to_string();
        quiz
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use crate::models::domain::OptionLabel;

    #[test]
    fn test_fixtures_question_with_answer() {
        let question = question_with_answer(3, OptionLabel::C);
        assert_eq!(question.correct_text(), "correct 3");
        assert_eq!(question.options.a, "wrong 3 a");
    }

    #[test]
    fn test_fixtures_test_questions() {
        let questions = test_questions(4);
        assert_eq!(questions.len(), 4);
        assert!(questions.iter().all(|q| q.correct_answer == OptionLabel::A));
        assert_eq!(questions[3].order, 3);
    }

    #[test]
    fn test_fixtures_test_quiz() {
        let quiz = test_quiz("owner-1", false);
        assert_eq!(quiz.id, "quiz-1");
        assert!(!quiz.allow_retakes);
    }
}
