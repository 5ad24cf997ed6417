//! Answer scoring
//!
//! Multiple choice answers are all or nothing: the selected set must equal
//! the set of correct choices. Long answers are scored linearly from the
//! organiser's grade. Only multiple choice answers can earn the first-correct
//! bonus; who counts as first is decided by the room.

use indexmap::IndexSet;
use serde::Serialize;

use crate::{
    constants::scoring::MAX_GRADE,
    quiz::{Question, QuestionKind},
};

/// Outcome of scoring one answer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    /// Whether the answer earned full marks
    pub is_correct: bool,
    /// Whether the first-correct multiplier was applied
    pub has_bonus: bool,
    /// Points awarded for this answer
    pub points: u64,
    /// Texts of every correct choice, revealed regardless of the outcome
    pub correct_answers: Vec<String>,
}

/// Scores answers against a question
#[derive(Debug, Clone, Copy)]
pub struct Verificator {
    bonus_multiplier: f64,
}

impl Verificator {
    /// Creates a verificator applying `bonus_multiplier` to first correct answers
    pub fn new(bonus_multiplier: f64) -> Self {
        Self { bonus_multiplier }
    }

    /// Scores a multiple choice answer
    ///
    /// `is_first` marks the submission the room saw first; it only matters
    /// when the answer is fully correct.
    pub fn verify_mcq(&self, question: &Question, selected: &IndexSet<usize>, is_first: bool) -> Verdict {
        let correct_answers = question.correct_answers();

        let is_correct = match &question.kind {
            QuestionKind::MultipleChoice { choices } => {
                !choices.is_empty()
                    && selected.iter().all(|index| *index < choices.len())
                    && choices
                        .iter()
                        .enumerate()
                        .all(|(index, choice)| selected.contains(&index) == choice.is_correct)
            }
            QuestionKind::LongAnswer => false,
        };

        let has_bonus = is_correct && is_first;

        let points = match (is_correct, has_bonus) {
            (false, _) => 0,
            (true, false) => question.points,
            (true, true) => (question.points as f64 * self.bonus_multiplier).round() as u64,
        };

        Verdict {
            is_correct,
            has_bonus,
            points,
            correct_answers,
        }
    }

    /// Scores a long answer from its grade out of 100
    ///
    /// Grades above 100 are treated as 100.
    pub fn verify_laq(&self, question: &Question, grade: u8) -> Verdict {
        let grade = grade.min(MAX_GRADE);

        Verdict {
            is_correct: grade == MAX_GRADE,
            has_bonus: false,
            points: (question.points as f64 * f64::from(grade) / f64::from(MAX_GRADE)).round()
                as u64,
            correct_answers: Vec::new(),
        }
    }
}

impl Default for Verificator {
    fn default() -> Self {
        Self::new(crate::constants::scoring::FIRST_CORRECT_BONUS)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::quiz::tests::{laq, mcq};

    fn set(indices: &[usize]) -> IndexSet<usize> {
        indices.iter().copied().collect()
    }

    #[test]
    fn test_exact_match_scores_full_points() {
        let verificator = Verificator::default();
        let question = mcq("Q", 10, &[true, false, true]);

        let verdict = verificator.verify_mcq(&question, &set(&[2, 0]), false);
        assert!(verdict.is_correct);
        assert!(!verdict.has_bonus);
        assert_eq!(verdict.points, 10);
        assert_eq!(verdict.correct_answers, vec!["Choice 0", "Choice 2"]);
    }

    #[test]
    fn test_subset_and_superset_score_nothing() {
        let verificator = Verificator::default();
        let question = mcq("Q", 10, &[true, false, true]);

        let selections: [&[usize]; 5] = [&[], &[0], &[2], &[0, 1, 2], &[1]];
        for selection in selections {
            let verdict = verificator.verify_mcq(&question, &set(selection), false);
            assert!(!verdict.is_correct, "{selection:?}");
            assert_eq!(verdict.points, 0);
        }
    }

    #[test]
    fn test_out_of_range_selection_is_incorrect() {
        let verificator = Verificator::default();
        let question = mcq("Q", 10, &[true]);

        let verdict = verificator.verify_mcq(&question, &set(&[0, 5]), true);
        assert!(!verdict.is_correct);
        assert_eq!(verdict.points, 0);
    }

    #[test]
    fn test_bonus_only_for_first_correct() {
        let verificator = Verificator::default();
        let question = mcq("Q", 10, &[false, true]);

        let verdict = verificator.verify_mcq(&question, &set(&[1]), true);
        assert!(verdict.has_bonus);
        assert_eq!(verdict.points, 12);

        let verdict = verificator.verify_mcq(&question, &set(&[0]), true);
        assert!(!verdict.has_bonus);
        assert_eq!(verdict.points, 0);
        assert_eq!(verdict.correct_answers, vec!["Choice 1"]);
    }

    #[test]
    fn test_custom_bonus_multiplier() {
        let verificator = Verificator::new(2.0);
        let question = mcq("Q", 15, &[true]);

        assert_eq!(verificator.verify_mcq(&question, &set(&[0]), true).points, 30);
    }

    #[test]
    fn test_mcq_verification_of_long_answer_question() {
        let verificator = Verificator::default();
        let verdict = verificator.verify_mcq(&laq("Q", 10), &set(&[]), true);
        assert!(!verdict.is_correct);
        assert_eq!(verdict.points, 0);
    }

    #[test]
    fn test_laq_is_linear_in_grade() {
        let verificator = Verificator::default();
        let question = laq("Q", 20);

        assert_eq!(verificator.verify_laq(&question, 0).points, 0);
        assert_eq!(verificator.verify_laq(&question, 50).points, 10);
        assert_eq!(verificator.verify_laq(&question, 100).points, 20);
        assert_eq!(verificator.verify_laq(&question, 255).points, 20);
    }

    #[test]
    fn test_laq_never_gets_bonus() {
        let verificator = Verificator::new(5.0);
        let verdict = verificator.verify_laq(&laq("Q", 10), 100);
        assert!(verdict.is_correct);
        assert!(!verdict.has_bonus);
        assert_eq!(verdict.points, 10);
    }

    #[test]
    fn test_laq_rounds_points() {
        let verificator = Verificator::default();
        assert_eq!(verificator.verify_laq(&laq("Q", 3), 50).points, 2);
        assert_eq!(verificator.verify_laq(&laq("Q", 10), 33).points, 3);
    }
}
