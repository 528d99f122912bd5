use rand::{seq::SliceRandom, Rng};

use crate::models::domain::{OptionLabel, Question, QuestionOptions};

/// Randomizes the A-D order of a question's options. The correct label is
/// re-pointed at wherever the correct text landed, so the answer itself never changes.
pub fn shuffle_options<R: Rng + ?Sized>(question: &Question, rng: &mut R) -> Question {
    let texts = question.options.to_array();
    let mut order: Vec<usize> = (0..texts.len()).collect();
    order.shuffle(rng);

    let shuffled: [String; 4] = [
        texts[order[0]].clone(),
        texts[order[1]].clone(),
        texts[order[2]].clone(),
        texts[order[3]].clone(),
    ];

    let original_correct = question.correct_answer.index();
    let new_correct = order
        .iter()
        .position(|&source| source == original_correct)
        .and_then(OptionLabel::from_index)
        .unwrap_or(question.correct_answer);

    Question {
        options: QuestionOptions::from_array(shuffled),
        correct_answer: new_correct,
        ..question.clone()
    }
}

pub fn shuffle_all<R: Rng + ?Sized>(questions: &[Question], rng: &mut R) -> Vec<Question> {
    questions.iter().map(|q| shuffle_options(q, rng)).collect()
}
