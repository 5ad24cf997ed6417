//! Crate-level error type
//!
//! Errors only surface at the edges of the engine: constructing a room,
//! loading settings, opening a room in a lobby and admitting a participant.
//! The tick and transition path never fails.

use thiserror::Error;

use crate::{names, watcher};

/// Errors returned when building a room or admitting a participant
#[derive(Error, Debug)]
pub enum Error {
    /// The quiz or settings failed validation
    #[error("invalid configuration: {0}")]
    Invalid(#[from] garde::Report),
    /// The settings input is not valid JSON
    #[error("malformed settings: {0}")]
    Json(#[from] serde_json::Error),
    /// The quiz has no questions to play
    #[error("quiz has no questions")]
    EmptyQuiz,
    /// The room is not accepting new participants
    #[error("room is locked")]
    Locked,
    /// The requested username was rejected
    #[error(transparent)]
    Name(#[from] names::Error),
    /// The participant could not be registered
    #[error(transparent)]
    Membership(#[from] watcher::Error),
    /// Every room code is taken
    #[error("no room code available")]
    LobbyFull,
    /// The room has shut down
    #[error("room is closed")]
    Closed,
}
