//! Configuration constants for the quiz room engine
//!
//! This module contains the default timing values, scoring factors and
//! validation limits used throughout the room engine. Runtime-tunable
//! values are mirrored in [`crate::config::Settings`], which defaults to
//! the constants defined here.

/// Quiz content limits
pub mod quiz {
    /// Maximum number of questions allowed in a single quiz
    pub const MAX_QUESTION_COUNT: usize = 100;
    /// Maximum length of a quiz title in characters
    pub const MAX_TITLE_LENGTH: usize = 200;
    /// Maximum length of a question text in characters
    pub const MAX_QUESTION_LENGTH: usize = 500;
    /// Maximum number of choices in a multiple choice question
    pub const MAX_CHOICE_COUNT: usize = 8;
    /// Maximum length of a choice text in characters
    pub const MAX_CHOICE_LENGTH: usize = 200;
    /// Minimum time limit of a question, in timer units
    pub const MIN_TIME_LIMIT: u64 = 5;
    /// Maximum time limit of a question, in timer units
    pub const MAX_TIME_LIMIT: u64 = 600;
    /// Maximum points a single question can award
    ///
    /// Scores are sums of these across at most [`MAX_QUESTION_COUNT`]
    /// questions, so a bounded value keeps totals far from overflow.
    pub const MAX_POINTS: u64 = 1_000_000;
}

/// Room membership limits
pub mod room {
    /// Maximum number of participants (organiser included) in a single room
    pub const MAX_PLAYER_COUNT: usize = 1000;
    /// Maximum length of a username in bytes
    pub const MAX_USERNAME_LENGTH: usize = 30;
    /// Number of leaderboard entries sent in a single message
    pub const LEADERBOARD_LIMIT: usize = 50;
}

/// Timer defaults
pub mod timer {
    /// Wall-clock length of one timer unit in milliseconds
    pub const TICK_INTERVAL_MS: u64 = 1000;
    /// Minimum accepted tick interval in milliseconds
    pub const MIN_TICK_INTERVAL_MS: u64 = 10;
    /// Maximum accepted tick interval in milliseconds
    pub const MAX_TICK_INTERVAL_MS: u64 = 10_000;
    /// Tick speed multiplier while running normally
    pub const NORMAL_SPEED: u32 = 1;
    /// Tick speed multiplier while panicking
    pub const PANIC_SPEED: u32 = 4;
    /// Maximum accepted speed multiplier
    pub const MAX_SPEED: u32 = 16;
}

/// Game flow defaults
pub mod flow {
    /// Length of the presentation countdown before the first question, in timer units
    pub const PRESENTATION_DELAY: u64 = 3;
    /// Maximum accepted presentation countdown, in timer units
    pub const MAX_PRESENTATION_DELAY: u64 = 60;
    /// Delay before test and random rooms move on after showing answers, in milliseconds
    pub const AUTO_ADVANCE_DELAY_MS: u64 = 5000;
    /// Maximum accepted auto-advance delay in milliseconds
    pub const MAX_AUTO_ADVANCE_DELAY_MS: u64 = 60_000;
    /// Remaining timer units at which a multiple choice round starts panicking
    pub const MCQ_PANIC_THRESHOLD: u64 = 5;
    /// Remaining timer units at which a long answer round starts panicking
    pub const LAQ_PANIC_THRESHOLD: u64 = 15;
}

/// Scoring defaults
pub mod scoring {
    /// Multiplier applied to the first fully correct multiple choice submission
    pub const FIRST_CORRECT_BONUS: f64 = 1.2;
    /// Smallest accepted bonus multiplier
    pub const MIN_BONUS: f64 = 1.0;
    /// Largest accepted bonus multiplier
    pub const MAX_BONUS: f64 = 10.0;
    /// Highest grade an organiser can award a long answer
    pub const MAX_GRADE: u8 = 100;
}
