//! Quiz content
//!
//! A [`Quiz`] is the read-only content a room plays through: an ordered list
//! of questions, each either multiple choice or long answer. Choice order is
//! the index space used by every selection and vote message.

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::constants::quiz::*;

/// A complete quiz with all of its questions
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Quiz {
    /// The title of the quiz, reported in the game summary
    #[garde(length(chars, max = MAX_TITLE_LENGTH))]
    pub title: String,
    /// The questions in play order
    #[garde(length(min = 1, max = MAX_QUESTION_COUNT), dive)]
    pub questions: Vec<Question>,
}

impl Quiz {
    /// Returns the number of questions in this quiz
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Checks if this quiz contains no questions
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// A single question
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Question {
    /// What's being asked
    #[garde(length(chars, max = MAX_QUESTION_LENGTH))]
    pub text: String,
    /// Points awarded for a fully correct answer
    #[garde(range(max = MAX_POINTS))]
    pub points: u64,
    /// Time players have to answer, in timer units
    #[garde(range(min = MIN_TIME_LIMIT, max = MAX_TIME_LIMIT))]
    pub time_limit: u64,
    /// The question type and its type-specific content
    #[garde(dive)]
    pub kind: QuestionKind,
}

/// Type-specific content of a question
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub enum QuestionKind {
    /// Players select any number of choices
    MultipleChoice {
        /// The available choices, at least one
        #[garde(length(min = 1, max = MAX_CHOICE_COUNT), dive)]
        choices: Vec<Choice>,
    },
    /// Players type free text that the organiser grades
    LongAnswer,
}

/// Discriminant of [`QuestionKind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    /// Multiple choice question
    Mcq,
    /// Long answer question
    Laq,
}

/// A single choice of a multiple choice question
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Choice {
    /// Text shown to players
    #[garde(length(chars, max = MAX_CHOICE_LENGTH))]
    pub text: String,
    /// Whether selecting this choice is required for a correct answer
    #[garde(skip)]
    pub is_correct: bool,
}

/// A question as shown to participants, without correctness information
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    /// What's being asked
    pub text: String,
    /// Points awarded for a fully correct answer
    pub points: u64,
    /// Time players have to answer, in timer units
    pub time_limit: u64,
    /// Choice texts, only present for multiple choice questions
    pub choices: Option<Vec<String>>,
}

impl Question {
    /// Returns the type tag of this question
    pub fn question_type(&self) -> QuestionType {
        match self.kind {
            QuestionKind::MultipleChoice { .. } => QuestionType::Mcq,
            QuestionKind::LongAnswer => QuestionType::Laq,
        }
    }

    /// Returns the choices of this question, empty for long answer questions
    pub fn choices(&self) -> &[Choice] {
        match &self.kind {
            QuestionKind::MultipleChoice { choices } => choices,
            QuestionKind::LongAnswer => &[],
        }
    }

    /// Returns the text of every correct choice in choice order
    pub fn correct_answers(&self) -> Vec<String> {
        self.choices()
            .iter()
            .filter(|choice| choice.is_correct)
            .map(|choice| choice.text.clone())
            .collect_vec()
    }

    /// Builds the participant-facing view of this question
    pub fn view(&self) -> QuestionView {
        QuestionView {
            text: self.text.clone(),
            points: self.points,
            time_limit: self.time_limit,
            choices: match &self.kind {
                QuestionKind::MultipleChoice { choices } => {
                    Some(choices.iter().map(|c| c.text.clone()).collect_vec())
                }
                QuestionKind::LongAnswer => None,
            },
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn mcq(text: &str, points: u64, correct: &[bool]) -> Question {
        Question {
            text: text.to_string(),
            points,
            time_limit: 30,
            kind: QuestionKind::MultipleChoice {
                choices: correct
                    .iter()
                    .enumerate()
                    .map(|(i, is_correct)| Choice {
                        text: format!("Choice {i}"),
                        is_correct: *is_correct,
                    })
                    .collect(),
            },
        }
    }

    pub(crate) fn laq(text: &str, points: u64) -> Question {
        Question {
            text: text.to_string(),
            points,
            time_limit: 60,
            kind: QuestionKind::LongAnswer,
        }
    }

    pub(crate) fn quiz(questions: Vec<Question>) -> Quiz {
        Quiz {
            title: "Test Quiz".to_string(),
            questions,
        }
    }

    #[test]
    fn test_quiz_validation() {
        let quiz = quiz(vec![mcq("Q1", 10, &[true, false]), laq("Q2", 20)]);
        assert!(quiz.validate().is_ok());
        assert_eq!(quiz.len(), 2);
        assert!(!quiz.is_empty());
    }

    #[test]
    fn test_points_bounds() {
        assert!(mcq("Q1", MAX_POINTS, &[true]).validate().is_ok());
        assert!(mcq("Q1", MAX_POINTS + 1, &[true]).validate().is_err());
        assert!(quiz(vec![laq("Q1", u64::MAX)]).validate().is_err());
    }

    #[test]
    fn test_quiz_without_questions_is_invalid() {
        let quiz = quiz(vec![]);
        assert!(quiz.validate().is_err());
        assert!(quiz.is_empty());
    }

    #[test]
    fn test_mcq_without_choices_is_invalid() {
        let quiz = quiz(vec![mcq("Q1", 10, &[])]);
        assert!(quiz.validate().is_err());
    }

    #[test]
    fn test_mcq_too_many_choices_is_invalid() {
        let quiz = quiz(vec![mcq("Q1", 10, &[false; MAX_CHOICE_COUNT + 1])]);
        assert!(quiz.validate().is_err());
    }

    #[test]
    fn test_time_limit_bounds() {
        let mut question = mcq("Q1", 10, &[true]);
        question.time_limit = MIN_TIME_LIMIT - 1;
        assert!(question.validate().is_err());

        question.time_limit = MAX_TIME_LIMIT + 1;
        assert!(question.validate().is_err());

        question.time_limit = MIN_TIME_LIMIT;
        assert!(question.validate().is_ok());
    }

    #[test]
    fn test_title_too_long() {
        let mut quiz = quiz(vec![laq("Q1", 10)]);
        quiz.title = "a".repeat(MAX_TITLE_LENGTH + 1);
        assert!(quiz.validate().is_err());
    }

    #[test]
    fn test_question_type_and_choices() {
        let question = mcq("Q1", 10, &[true, false, true]);
        assert_eq!(question.question_type(), QuestionType::Mcq);
        assert_eq!(question.choices().len(), 3);
        assert_eq!(question.correct_answers(), vec!["Choice 0", "Choice 2"]);

        let question = laq("Q2", 10);
        assert_eq!(question.question_type(), QuestionType::Laq);
        assert!(question.choices().is_empty());
        assert!(question.correct_answers().is_empty());
    }

    #[test]
    fn test_view_hides_correctness() {
        let json = serde_json::to_string(&mcq("Q1", 10, &[true, false]).view()).unwrap();
        assert!(json.contains("Choice 0"));
        assert!(!json.contains("is_correct"));

        let json = serde_json::to_string(&laq("Q2", 10).view()).unwrap();
        assert!(!json.contains("choices"));
    }
}
