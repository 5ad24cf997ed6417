//! Room variants
//!
//! The three variants share one room type and differ only in the capabilities
//! below: who plays, who may start, what happens at start and how the room
//! leaves the answers screen.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{config::Settings, watcher::Role};

/// How a room is played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mode {
    /// The organiser drives the game and does not play
    #[default]
    Normal,
    /// Solo preview where the organiser is the only player
    Test,
    /// The organiser joins the players at start and rounds advance by themselves
    Random,
}

impl Mode {
    /// Role whose members form the answering roster
    pub fn roster_role(self) -> Role {
        match self {
            Mode::Test => Role::Organiser,
            Mode::Normal | Mode::Random => Role::Player,
        }
    }

    /// Role given to participants joining after the organiser
    pub fn joiner_role(self) -> Role {
        match self {
            Mode::Test => Role::Member,
            Mode::Normal | Mode::Random => Role::Player,
        }
    }

    /// Whether a participant with `role` answers in this mode
    pub fn resolve_participant(self, role: Role) -> bool {
        role == self.roster_role()
    }

    /// Whether a participant with `role` may start the game
    pub fn can_start(self, role: Role) -> bool {
        role == Role::Organiser
    }

    /// Role the organiser holds once the game has started
    pub fn post_start(self) -> Role {
        match self {
            Mode::Random => Role::Player,
            Mode::Normal | Mode::Test => Role::Organiser,
        }
    }

    /// Delay after which the answers screen advances by itself
    pub fn auto_advance(self, settings: &Settings) -> Option<Duration> {
        match self {
            Mode::Normal => None,
            Mode::Test | Mode::Random => Some(settings.auto_advance_delay),
        }
    }

    /// Whether the room may be locked or unlocked
    pub fn can_lock(self, started: bool) -> bool {
        !(self == Mode::Random && started)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_roster() {
        assert_eq!(Mode::Normal.roster_role(), Role::Player);
        assert_eq!(Mode::Random.roster_role(), Role::Player);
        assert_eq!(Mode::Test.roster_role(), Role::Organiser);

        assert!(Mode::Test.resolve_participant(Role::Organiser));
        assert!(!Mode::Normal.resolve_participant(Role::Organiser));
        assert!(!Mode::Random.resolve_participant(Role::Member));

        assert_eq!(Mode::Test.joiner_role(), Role::Member);
        assert_eq!(Mode::Normal.joiner_role(), Role::Player);
    }

    #[test]
    fn test_start_gating() {
        for mode in [Mode::Normal, Mode::Test, Mode::Random] {
            assert!(mode.can_start(Role::Organiser));
            assert!(!mode.can_start(Role::Player));
        }
        assert_eq!(Mode::Random.post_start(), Role::Player);
        assert_eq!(Mode::Normal.post_start(), Role::Organiser);
    }

    #[test]
    fn test_auto_advance() {
        let settings = Settings::default();
        assert_eq!(Mode::Normal.auto_advance(&settings), None);
        assert_eq!(
            Mode::Test.auto_advance(&settings),
            Some(settings.auto_advance_delay)
        );
        assert!(Mode::Random.auto_advance(&settings).is_some());
    }

    #[test]
    fn test_locking() {
        assert!(Mode::Normal.can_lock(true));
        assert!(Mode::Random.can_lock(false));
        assert!(!Mode::Random.can_lock(true));
    }
}
