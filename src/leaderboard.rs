//! Standings and per-round score history
//!
//! Standings are computed fresh from the player records each time they are
//! broadcast. The leaderboard itself only remembers what each player earned
//! per round, plus the standings frozen when the last answers were shown.

use itertools::Itertools;
use serde::Serialize;

use super::{
    TruncatedVec, constants::room::LEADERBOARD_LIMIT, player::Player, player::PlayerState,
    watcher::Id,
};

/// One row of the leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standing {
    /// Player username
    pub username: String,
    /// Cumulative score
    pub score: u64,
    /// Round state of the player
    pub state: PlayerState,
    /// Whether the player is muted
    pub is_muted: bool,
    /// Rounds won with the first-correct bonus
    pub number_of_bonuses: u64,
}

impl From<&Player> for Standing {
    fn from(player: &Player) -> Self {
        Self {
            username: player.username().to_owned(),
            score: player.score(),
            state: player.state(),
            is_muted: player.is_muted(),
            number_of_bonuses: player.number_of_bonuses(),
        }
    }
}

/// Records points per round and the final standings
#[derive(Debug, Default)]
pub struct Leaderboard {
    /// Points earned by each player for each round
    points_earned: Vec<Vec<(Id, u64)>>,
    final_standings: Option<TruncatedVec<Standing>>,
}

impl Leaderboard {
    /// Sorts players by score, highest first, ties broken by username
    pub fn standings<'a, I: Iterator<Item = &'a Player>>(players: I) -> TruncatedVec<Standing> {
        let sorted = players
            .map(Standing::from)
            .sorted_by(|a, b| b.score.cmp(&a.score).then_with(|| a.username.cmp(&b.username)))
            .collect_vec();
        let exact_count = sorted.len();
        TruncatedVec::new(sorted.into_iter(), LEADERBOARD_LIMIT, exact_count)
    }

    /// Records the points each player earned in the round just shown
    pub fn add_scores(&mut self, scores: &[(Id, u64)]) {
        self.points_earned.push(scores.to_vec());
    }

    /// Freezes the standings once the last question has been shown
    pub fn finalize(&mut self, standings: TruncatedVec<Standing>) {
        self.final_standings = Some(standings);
    }

    /// Standings frozen at the end of the game
    pub fn final_standings(&self) -> Option<&TruncatedVec<Standing>> {
        self.final_standings.as_ref()
    }

    /// For each round, players who earned points and players who didn't
    pub fn round_stats(&self) -> Vec<(usize, usize)> {
        self.points_earned
            .iter()
            .map(|points_earned| {
                let earned_count = points_earned
                    .iter()
                    .filter(|(_, earned)| *earned > 0)
                    .count();

                (earned_count, points_earned.len() - earned_count)
            })
            .collect_vec()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::verificator::Verdict;

    fn player(name: &str, points: u64) -> Player {
        let mut player = Player::new(name.to_string());
        player.add_points(&Verdict {
            is_correct: points > 0,
            has_bonus: false,
            points,
            correct_answers: Vec::new(),
        });
        player
    }

    #[test]
    fn test_standings_sorted_by_score_then_name() {
        let players = [player("carol", 5), player("alice", 10), player("bob", 5)];
        let standings = Leaderboard::standings(players.iter());

        assert_eq!(standings.exact_count(), 3);
        let names = standings
            .items()
            .iter()
            .map(|standing| standing.username.as_str())
            .collect_vec();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_standings_include_left_players() {
        let mut gone = player("gone", 3);
        gone.leave();
        let players = [gone, player("here", 1)];

        let standings = Leaderboard::standings(players.iter());
        assert_eq!(standings.items()[0].state, PlayerState::Left);
    }

    #[test]
    fn test_standings_truncate() {
        let players = (0..LEADERBOARD_LIMIT + 5)
            .map(|i| player(&format!("p{i}"), i as u64))
            .collect_vec();

        let standings = Leaderboard::standings(players.iter());
        assert_eq!(standings.exact_count(), LEADERBOARD_LIMIT + 5);
        assert_eq!(standings.items().len(), LEADERBOARD_LIMIT);
    }

    #[test]
    fn test_history_and_stats() {
        let mut leaderboard = Leaderboard::default();
        let a = Id::new();
        let b = Id::new();

        leaderboard.add_scores(&[(a, 12), (b, 0)]);
        leaderboard.add_scores(&[(a, 10)]);

        assert_eq!(leaderboard.round_stats(), vec![(1, 1), (1, 0)]);
    }

    #[test]
    fn test_finalize() {
        let mut leaderboard = Leaderboard::default();
        assert!(leaderboard.final_standings().is_none());

        let players = [player("alice", 3)];
        leaderboard.finalize(Leaderboard::standings(players.iter()));
        assert_eq!(
            leaderboard.final_standings().map(TruncatedVec::exact_count),
            Some(1)
        );
    }
}
