//! Phases of a room and their transition function
//!
//! [`State::next`] is pure: the room gathers a [`Snapshot`] of everything a
//! transition depends on and applies whatever state comes back. Entry side
//! effects live in the room.

use serde::{Deserialize, Serialize};

use crate::quiz::QuestionType;

/// Phase of a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
pub enum State {
    /// Waiting for the organiser to start
    Joining,
    /// Countdown before the first question
    Presentation,
    /// Players are answering the current question
    Answering,
    /// The round ran out of time
    TimedOut,
    /// The organiser is grading long answers
    Evaluation,
    /// Results of the round are on screen
    ShowingAnswers,
    /// The game has finished
    Over,
}

/// Everything a transition depends on, read at one decision point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// The organiser has started the game
    pub received_start: bool,
    /// The current countdown has reached zero
    pub timer_done: bool,
    /// Type of the current question
    pub question_type: QuestionType,
    /// Every live player has submitted
    pub all_submitted: bool,
    /// The organiser has graded this round
    pub graded: bool,
    /// The room may leave the answers screen
    pub ready_for_next: bool,
    /// Another question follows the current one
    pub has_next_question: bool,
}

impl State {
    /// The state to move to, or `self` to stay
    pub fn next(self, snapshot: &Snapshot) -> State {
        let after_round = match snapshot.question_type {
            QuestionType::Mcq => State::ShowingAnswers,
            QuestionType::Laq => State::Evaluation,
        };

        match self {
            State::Joining if snapshot.received_start => State::Presentation,
            State::Presentation if snapshot.timer_done => State::Answering,
            State::Answering if snapshot.all_submitted => after_round,
            State::Answering if snapshot.timer_done => State::TimedOut,
            State::TimedOut => after_round,
            State::Evaluation if snapshot.graded => State::ShowingAnswers,
            State::ShowingAnswers if snapshot.ready_for_next => {
                if snapshot.has_next_question {
                    State::Answering
                } else {
                    State::Over
                }
            }
            state => state,
        }
    }

    /// Whether the game has not started yet
    pub fn is_joining(self) -> bool {
        self == State::Joining
    }

    /// Whether the game has finished
    pub fn is_over(self) -> bool {
        self == State::Over
    }
}
