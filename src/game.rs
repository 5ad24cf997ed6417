//! Quiz content and the progression cursor of a room

use std::{fmt::Debug, sync::Arc};

use crate::{
    error::Error,
    quiz::{Question, Quiz},
    state::State,
};

/// The quiz being played and how far the room has got through it
///
/// `question_index` always points at a question of the quiz; it only moves
/// forward and never past the last question.
pub struct Game {
    quiz: Arc<Quiz>,
    question_index: usize,
    state: State,
    received_start: bool,
    has_next_question: bool,
    is_ready_for_next_question: bool,
}

impl Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("title", &self.quiz.title)
            .field("question_index", &self.question_index)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Game {
    /// Creates a game positioned on the first question
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptyQuiz` if the quiz has no questions.
    pub fn new(quiz: Arc<Quiz>) -> Result<Self, Error> {
        if quiz.is_empty() {
            return Err(Error::EmptyQuiz);
        }
        Ok(Self {
            has_next_question: quiz.len() > 1,
            quiz,
            question_index: 0,
            state: State::Joining,
            received_start: false,
            is_ready_for_next_question: false,
        })
    }

    /// The quiz being played
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    /// Index of the question under the cursor
    pub fn question_index(&self) -> usize {
        self.question_index
    }

    /// Number of questions in the quiz
    pub fn question_count(&self) -> usize {
        self.quiz.len()
    }

    /// The question under the cursor
    pub fn current_question(&self) -> &Question {
        &self.quiz.questions[self.question_index]
    }

    /// A question by index
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.quiz.questions.get(index)
    }

    /// Moves the cursor to the next question if there is one
    ///
    /// Returns whether another question follows the one just played. The
    /// answer is kept for the transition out of the answers screen.
    pub fn advance(&mut self) -> bool {
        self.has_next_question = self.question_index + 1 < self.quiz.len();
        if self.has_next_question {
            self.question_index += 1;
        }
        self.has_next_question
    }

    /// Whether another question follows the round just shown
    pub fn has_next_question(&self) -> bool {
        self.has_next_question
    }

    /// Current phase
    pub fn state(&self) -> State {
        self.state
    }

    /// Moves to a new phase
    pub fn set_state(&mut self, state: State) {
        self.state = state;
    }

    /// Records that the organiser started the game
    pub fn receive_start(&mut self) {
        self.received_start = true;
    }

    /// Whether the organiser started the game
    pub fn received_start(&self) -> bool {
        self.received_start
    }

    /// Allows the room to leave the answers screen
    pub fn mark_ready(&mut self) {
        self.is_ready_for_next_question = true;
    }

    /// Holds the room on the answers screen until marked ready again
    pub fn clear_ready(&mut self) {
        self.is_ready_for_next_question = false;
    }

    /// Whether the room may leave the answers screen
    pub fn is_ready_for_next_question(&self) -> bool {
        self.is_ready_for_next_question
    }
}
