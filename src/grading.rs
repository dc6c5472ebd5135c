// src/grading.rs
//
// Grading for quiz submissions. Comparison is case-insensitive and
// whitespace-insensitive for all question types. Grading never fails:
// unknown question ids and questions with missing or empty answer keys
// grade as incorrect.

use std::collections::HashMap;

use crate::models::quiz::{Question, question_types};
use crate::models::submission::{GradedAnswer, SubmittedAnswer};

/// Result of grading one submission attempt.
#[derive(Debug)]
pub struct GradeOutcome {
    pub score: i64,
    pub answers: Vec<GradedAnswer>,
}

/// Canonical comparison form of an answer: surrounding whitespace
/// trimmed, lower-cased.
pub fn normalize_answer(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// The canonical accepted-answer set for a question.
///
/// MULTIPLE_CHOICE / TRUE_FALSE contribute their single correct answer;
/// FILL_IN_THE_BLANK contributes every non-empty accepted answer. An
/// empty result means the question cannot be answered correctly.
fn accepted_answers(question: &Question) -> Vec<String> {
    match question.question_type.as_str() {
        question_types::MULTIPLE_CHOICE | question_types::TRUE_FALSE => question
            .correct_answer
            .as_deref()
            .map(|a| vec![normalize_answer(a)])
            .unwrap_or_default(),
        question_types::FILL_IN_THE_BLANK => question
            .correct_answers
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|a| normalize_answer(a))
            .filter(|a| !a.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Grades a submission against the quiz's question set.
///
/// Each submitted answer earns the question's full point value on a
/// canonical match and zero otherwise; there is no partial credit.
/// The output preserves the submitted order and has exactly one entry
/// per submitted answer — questions the student skipped are not
/// synthesized into the result.
pub fn grade_quiz(questions: &[Question], answers: &[SubmittedAnswer]) -> GradeOutcome {
    // Answer key: question id -> (points, canonical accepted answers).
    let mut key: HashMap<&str, (i64, Vec<String>)> = HashMap::new();
    for question in questions {
        key.insert(
            question.id.as_str(),
            (question.points, accepted_answers(question)),
        );
    }

    let mut score = 0;
    let graded = answers
        .iter()
        .map(|answer| {
            let is_correct = match key.get(answer.question_id.as_str()) {
                // Unknown question or empty answer key: fail closed.
                None => false,
                Some((_, accepted)) if accepted.is_empty() => false,
                Some((points, accepted)) => {
                    let student = answer
                        .student_answer
                        .as_deref()
                        .map(normalize_answer)
                        .unwrap_or_default();
                    let hit = !student.is_empty() && accepted.contains(&student);
                    if hit {
                        score += points;
                    }
                    hit
                }
            };
            GradedAnswer {
                question_id: answer.question_id.clone(),
                student_answer: answer.student_answer.clone(),
                is_correct,
            }
        })
        .collect();

    GradeOutcome { score, answers: graded }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, question_type: &str, points: i64) -> Question {
        Question {
            id: id.to_string(),
            question_type: question_type.to_string(),
            points,
            correct_answer: None,
            correct_answers: None,
            extra: serde_json::Map::new(),
        }
    }

    fn mc(id: &str, correct: &str, points: i64) -> Question {
        Question {
            correct_answer: Some(correct.to_string()),
            ..question(id, question_types::MULTIPLE_CHOICE, points)
        }
    }

    fn fitb(id: &str, correct: &[&str], points: i64) -> Question {
        Question {
            correct_answers: Some(correct.iter().map(|s| s.to_string()).collect()),
            ..question(id, question_types::FILL_IN_THE_BLANK, points)
        }
    }

    fn answer(question_id: &str, student_answer: Option<&str>) -> SubmittedAnswer {
        SubmittedAnswer {
            question_id: question_id.to_string(),
            student_answer: student_answer.map(|s| s.to_string()),
        }
    }

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_answer("  Paris "), "paris");
        assert_eq!(normalize_answer("TRUE"), "true");
    }

    #[test]
    fn mixed_quiz_scenario_scores_full_points() {
        let questions = vec![mc("q1", "B", 5), fitb("q2", &["Paris", "paris, France"], 5)];
        let answers = vec![answer("q1", Some("b")), answer("q2", Some("PARIS"))];

        let outcome = grade_quiz(&questions, &answers);
        assert_eq!(outcome.score, 10);
        assert!(outcome.answers.iter().all(|a| a.is_correct));
    }

    #[test]
    fn omitted_question_contributes_zero_and_is_not_synthesized() {
        let questions = vec![mc("q1", "B", 5), fitb("q2", &["Paris"], 5)];
        let answers = vec![answer("q1", Some("B"))];

        let outcome = grade_quiz(&questions, &answers);
        assert_eq!(outcome.score, 5);
        assert_eq!(outcome.answers.len(), 1);
        assert_eq!(outcome.answers[0].question_id, "q1");
    }

    #[test]
    fn empty_or_absent_answer_is_never_correct() {
        // Even an accepted answer list containing "" must not match.
        let questions = vec![fitb("q1", &["", "Paris"], 10)];

        for student in [Some(""), Some("   "), None] {
            let outcome = grade_quiz(&questions, &[answer("q1", student)]);
            assert_eq!(outcome.score, 0);
            assert!(!outcome.answers[0].is_correct);
        }
    }

    #[test]
    fn unknown_question_id_fails_closed() {
        let questions = vec![mc("q1", "A", 10)];
        let outcome = grade_quiz(&questions, &[answer("ghost", Some("A"))]);
        assert_eq!(outcome.score, 0);
        assert!(!outcome.answers[0].is_correct);
    }

    #[test]
    fn question_without_answer_key_fails_closed() {
        let mut q = question("q1", question_types::MULTIPLE_CHOICE, 10);
        q.correct_answer = None;
        let missing_key = grade_quiz(&[q], &[answer("q1", Some("anything"))]);
        assert!(!missing_key.answers[0].is_correct);

        // FITB whose accepted answers are all empty after trimming.
        let blank = fitb("q2", &["", "  "], 10);
        let outcome = grade_quiz(&[blank], &[answer("q2", Some(""))]);
        assert_eq!(outcome.score, 0);
    }

    #[test]
    fn unknown_question_type_fails_closed() {
        let mut q = question("q1", "ESSAY", 10);
        q.correct_answer = Some("whatever".to_string());
        let outcome = grade_quiz(&[q], &[answer("q1", Some("whatever"))]);
        assert!(!outcome.answers[0].is_correct);
    }

    #[test]
    fn true_false_matches_case_insensitively() {
        let mut q = question("q1", question_types::TRUE_FALSE, 4);
        q.correct_answer = Some("True".to_string());
        let outcome = grade_quiz(&[q], &[answer("q1", Some(" true "))]);
        assert_eq!(outcome.score, 4);
        assert!(outcome.answers[0].is_correct);
    }

    #[test]
    fn no_partial_credit_and_order_preserved() {
        let questions = vec![mc("q1", "A", 3), mc("q2", "B", 7)];
        let answers = vec![answer("q2", Some("wrong")), answer("q1", Some("a"))];

        let outcome = grade_quiz(&questions, &answers);
        assert_eq!(outcome.score, 3);
        assert_eq!(outcome.answers[0].question_id, "q2");
        assert!(!outcome.answers[0].is_correct);
        assert_eq!(outcome.answers[1].question_id, "q1");
        assert!(outcome.answers[1].is_correct);
    }

    #[test]
    fn missing_points_grade_as_zero() {
        let q = mc("q1", "A", 0); // points absent in the stored document
        let outcome = grade_quiz(&[q], &[answer("q1", Some("A"))]);
        assert!(outcome.answers[0].is_correct);
        assert_eq!(outcome.score, 0);
    }
}
