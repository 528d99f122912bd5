use std::collections::{BTreeMap, HashMap};

use crate::models::domain::{OptionLabel, Question, TopicPerformance};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreSummary {
    pub correct_answers: i32,
    pub total_questions: i32,
    pub total_points: i32,
    pub score: i32,
    pub topic_performance: Vec<TopicPerformance>,
}

/// Rounded percentage. A quiz without questions scores 0.
pub fn percentage(correct: i32, total: i32) -> i32 {
    if total <= 0 {
        return 0;
    }
    (f64::from(correct) * 100.0 / f64::from(total)).round() as i32
}

/// Grades answers keyed by question position against `questions` in display order.
pub fn score_answers(
    questions: &[Question],
    answers: &BTreeMap<usize, OptionLabel>,
) -> ScoreSummary {
    let mut correct_answers = 0;
    let mut total_points = 0;
    let mut topics: Vec<TopicPerformance> = Vec::new();
    let mut topic_index: HashMap<String, usize> = HashMap::new();

    for (index, question) in questions.iter().enumerate() {
        let is_correct = answers
            .get(&index)
            .is_some_and(|selected| question.is_correct(*selected));

        if is_correct {
            correct_answers += 1;
            total_points += question.points;
        }

        let slot = *topic_index
            .entry(question.topic.clone())
            .or_insert_with(|| {
                topics.push(TopicPerformance {
                    topic: question.topic.clone(),
                    correct: 0,
                    total: 0,
                    points_earned: 0,
                    points_possible: 0,
                    percentage: 0,
                });
                topics.len() - 1
            });

        let topic = &mut topics[slot];
        topic.total += 1;
        topic.points_possible += question.points;
        if is_correct {
            topic.correct += 1;
            topic.points_earned += question.points;
        }
    }

    for topic in &mut topics {
        topic.percentage = percentage(topic.correct, topic.total);
    }

    let total_questions = questions.len() as i32;

    ScoreSummary {
        correct_answers,
        total_questions,
        total_points,
        score: percentage(correct_answers, total_questions),
        topic_performance: topics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::{question_with_answer, test_questions};

    fn answers(pairs: &[(usize, OptionLabel)]) -> BTreeMap<usize, OptionLabel> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn seven_of_ten_scores_seventy() {
        let questions = test_questions(10);
        let mut selected = BTreeMap::new();
        for i in 0..10 {
            selected.insert(i, if i < 7 { OptionLabel::A } else { OptionLabel::B });
        }

        let summary = score_answers(&questions, &selected);

        assert_eq!(summary.score, 70);
        assert_eq!(summary.total_points, 7);
        assert_eq!(summary.correct_answers, 7);
        assert_eq!(summary.total_questions, 10);
    }

    #[test]
    fn zero_questions_scores_zero() {
        let summary = score_answers(&[], &BTreeMap::new());

        assert_eq!(summary.score, 0);
        assert_eq!(summary.total_questions, 0);
        assert!(summary.topic_performance.is_empty());
    }

    #[test]
    fn unanswered_questions_count_as_wrong() {
        let questions = test_questions(3);
        let summary = score_answers(&questions, &answers(&[(1, OptionLabel::A)]));

        assert_eq!(summary.correct_answers, 1);
        assert_eq!(summary.score, 33);
    }

    #[test]
    fn points_are_weighted_per_question() {
        let mut questions = test_questions(2);
        questions[0].points = 5;
        questions[1].points = 2;

        let summary = score_answers(
            &questions,
            &answers(&[(0, OptionLabel::A), (1, OptionLabel::C)]),
        );

        assert_eq!(summary.total_points, 5);
        assert_eq!(summary.score, 50);
    }

    #[test]
    fn rounding_goes_half_up() {
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(0, 0), 0);
    }

    #[test]
    fn topic_performance_groups_by_topic_in_first_seen_order() {
        let mut questions = vec![
            question_with_answer(0, OptionLabel::A),
            question_with_answer(1, OptionLabel::B),
            question_with_answer(2, OptionLabel::C),
        ];
        questions[0].topic = "borrowing".to_string();
        questions[1].topic = "traits".to_string();
        questions[2].topic = "borrowing".to_string();
        questions[2].points = 3;

        let summary = score_answers(
            &questions,
            &answers(&[(0, OptionLabel::A), (1, OptionLabel::A), (2, OptionLabel::C)]),
        );

        assert_eq!(summary.topic_performance.len(), 2);
        let borrowing = &summary.topic_performance[0];
        assert_eq!(borrowing.topic, "borrowing");
        assert_eq!(borrowing.correct, 2);
        assert_eq!(borrowing.points_earned, 4);
        assert_eq!(borrowing.points_possible, 4);
        assert_eq!(borrowing.percentage, 100);

        let traits = &summary.topic_performance[1];
        assert_eq!(traits.correct, 0);
        assert_eq!(traits.percentage, 0);
    }
}
