//! Per-player round state and cumulative score
//!
//! Within a round a player moves from [`PlayerState::NoAction`] through
//! [`PlayerState::Interacted`] to [`PlayerState::Submitted`]. Leaving is
//! terminal and survives round resets. The player performs no submission
//! guard of its own; the room rejects messages from players that already
//! submitted.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use web_time::SystemTime;

use crate::{quiz::QuestionType, verificator::Verdict, votes::Selection};

/// Where a player is in the current round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerState {
    /// Nothing done yet this round
    NoAction,
    /// Selected a choice or typed a draft
    Interacted,
    /// Submitted a final answer
    Submitted,
    /// Left the room
    Left,
}

/// An answer captured at submission or time-out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Answers {
    /// Selected choice indices in selection order
    Choices(IndexSet<usize>),
    /// Free text
    Text(String),
}

/// Snapshot of an answer and when it was taken
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Infos {
    /// When the answer was captured
    pub time: SystemTime,
    /// The captured answer
    pub answers: Answers,
}

/// A participant's answer state and score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    username: String,
    score: u64,
    number_of_bonuses: u64,
    state: PlayerState,
    infos: Option<Infos>,
    selected: IndexSet<usize>,
    unconfirmed_text: String,
    is_muted: bool,
    has_interacted: bool,
}

/// Personal result sent to a player when answers are shown
#[derive(Debug, Clone, Serialize)]
pub struct RoundResult {
    /// How the answer was scored
    #[serde(flatten)]
    pub verdict: Verdict,
    /// Cumulative score after this round
    pub score: u64,
}

/// Messages addressed to a single player
#[derive(Debug, Clone, Serialize)]
pub enum UpdateMessage {
    /// The player's result for the round just shown
    Result(RoundResult),
    /// The organiser changed the player's mute state
    Muted(bool),
    /// The organiser removed the player
    Kicked,
}

impl Player {
    /// Creates a player with no score
    pub fn new(username: String) -> Self {
        Self {
            username,
            score: 0,
            number_of_bonuses: 0,
            state: PlayerState::NoAction,
            infos: None,
            selected: IndexSet::new(),
            unconfirmed_text: String::new(),
            is_muted: false,
            has_interacted: false,
        }
    }

    /// Toggles one choice in the live selection
    ///
    /// Returns whether the selection set changed. The player is marked as
    /// having interacted either way.
    pub fn select_answer(&mut self, selection: Selection) -> bool {
        let changed = if selection.is_selected {
            self.selected.insert(selection.index)
        } else {
            self.selected.shift_remove(&selection.index)
        };
        self.state = PlayerState::Interacted;
        changed
    }

    /// Records the live long answer draft
    pub fn interact_laq(&mut self, is_changed: bool, answer_text: String) {
        self.unconfirmed_text = answer_text;
        self.has_interacted = is_changed;
        if self.state == PlayerState::NoAction {
            self.state = PlayerState::Interacted;
        }
    }

    /// Submits the final multiple choice answer
    pub fn answer_mcq(&mut self, answers: IndexSet<usize>) {
        self.selected.clone_from(&answers);
        self.submit(Answers::Choices(answers));
    }

    /// Submits the final long answer
    pub fn answer_laq(&mut self, text: String) {
        self.unconfirmed_text.clone_from(&text);
        self.submit(Answers::Text(text));
    }

    fn submit(&mut self, answers: Answers) {
        self.infos = Some(Infos {
            time: SystemTime::now(),
            answers,
        });
        self.state = PlayerState::Submitted;
    }

    /// Captures the live draft as the answer without marking a submission
    ///
    /// Does nothing if an answer was already captured this round.
    pub fn capture_draft(&mut self, question_type: QuestionType) {
        if self.infos.is_some() {
            return;
        }
        self.infos = Some(Infos {
            time: SystemTime::now(),
            answers: match question_type {
                QuestionType::Mcq => Answers::Choices(self.selected.clone()),
                QuestionType::Laq => Answers::Text(self.unconfirmed_text.clone()),
            },
        });
    }

    /// Clears all per-round state
    pub fn start_round(&mut self) {
        if self.state != PlayerState::Left {
            self.state = PlayerState::NoAction;
        }
        self.infos = None;
        self.selected.clear();
        self.unconfirmed_text.clear();
        self.has_interacted = false;
    }

    /// The captured long answer, empty if none
    pub fn laq_answer(&self) -> &str {
        match &self.infos {
            Some(Infos {
                answers: Answers::Text(text),
                ..
            }) => text,
            _ => "",
        }
    }

    /// The captured multiple choice answer, falling back to the live selection
    pub fn mcq_answer(&self) -> &IndexSet<usize> {
        match &self.infos {
            Some(Infos {
                answers: Answers::Choices(choices),
                ..
            }) => choices,
            _ => &self.selected,
        }
    }

    /// Marks the player as gone for good
    pub fn leave(&mut self) {
        self.state = PlayerState::Left;
    }

    /// Adds a round's points and counts its bonus
    pub fn add_points(&mut self, verdict: &Verdict) {
        self.score = self.score.saturating_add(verdict.points);
        if verdict.has_bonus {
            self.number_of_bonuses += 1;
        }
    }

    /// Sets the mute flag
    pub fn set_muted(&mut self, is_muted: bool) {
        self.is_muted = is_muted;
    }

    /// The player's display name
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Cumulative score
    pub fn score(&self) -> u64 {
        self.score
    }

    /// Rounds won with the first-correct bonus
    pub fn number_of_bonuses(&self) -> u64 {
        self.number_of_bonuses
    }

    /// Round state
    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Whether the player submitted this round
    pub fn has_submitted(&self) -> bool {
        self.state == PlayerState::Submitted
    }

    /// Whether the player left the room
    pub fn has_left(&self) -> bool {
        self.state == PlayerState::Left
    }

    /// Snapshot captured this round, if any
    pub fn infos(&self) -> Option<&Infos> {
        self.infos.as_ref()
    }

    /// The live choice selection
    pub fn selected(&self) -> &IndexSet<usize> {
        &self.selected
    }

    /// The live long answer draft
    pub fn unconfirmed_text(&self) -> &str {
        &self.unconfirmed_text
    }

    /// Whether the last draft update changed the text
    pub fn has_interacted(&self) -> bool {
        self.has_interacted
    }

    /// Whether the organiser muted this player
    pub fn is_muted(&self) -> bool {
        self.is_muted
    }
}
