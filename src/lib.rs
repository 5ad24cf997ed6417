//! # Quiz Room Library
//!
//! This library provides the engine of a live quiz room: one organiser runs
//! a quiz while players join, answer questions within a countdown, get
//! scored and watch the leaderboard. It handles membership, the game state
//! machine, timing through caller-scheduled alarms, grading of long answers
//! and real-time synchronization between participants.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::ignored_unit_patterns)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]
use derive_where::derive_where;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

pub mod config;
pub mod constants;
pub mod error;
pub mod game;
pub mod grades;
pub mod leaderboard;
pub mod lobby;
pub mod mode;
pub mod names;
pub mod player;
pub mod quiz;
pub mod room;
pub mod room_code;
pub mod session;
pub mod state;
pub mod timer;
pub mod verificator;
pub mod votes;
pub mod watcher;

/// Messages sent to synchronize a participant with the current phase
///
/// A sync message carries everything a freshly (re)connected client needs to
/// render the room without having seen earlier updates.
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum SyncMessage {
    /// Room phase synchronization
    Room(room::SyncMessage),
}

impl SyncMessage {
    /// Converts the sync message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Messages sent to update participants as the game progresses
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum UpdateMessage {
    /// Updates shared by the room
    Room(room::UpdateMessage),
    /// Updates addressed to one player
    Player(player::UpdateMessage),
}

/// Alarm messages for timed events
///
/// The room never sleeps. It hands these to the caller's scheduler together
/// with a delay and expects them back through
/// [`Room::receive_alarm`](room::Room::receive_alarm).
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::From, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// Countdown ticks
    Timer(timer::AlarmMessage),
    /// Room flow alarms
    Room(room::AlarmMessage),
}

impl UpdateMessage {
    /// Converts the update message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// A truncated vector that maintains the exact count while limiting displayed items
///
/// Used for lobbies and leaderboards, which can hold up to a thousand
/// players but only ever show the first few.
#[derive(Debug, Clone, Serialize)]
#[derive_where(Default)]
pub struct TruncatedVec<T> {
    /// The exact total count of items
    exact_count: usize,
    /// The truncated list of items (up to the limit)
    items: Vec<T>,
}

impl<T: Clone> TruncatedVec<T> {
    /// Creates a new truncated vector from an iterator
    ///
    /// # Arguments
    ///
    /// * `list` - An iterator over items to include
    /// * `limit` - Maximum number of items to include in the truncated vector
    /// * `exact_count` - The exact total count of items (may be larger than limit)
    ///
    /// # Returns
    ///
    /// A new `TruncatedVec` containing up to `limit` items from the iterator
    pub fn new<I: Iterator<Item = T>>(list: I, limit: usize, exact_count: usize) -> Self {
        let items = list.take(limit).collect_vec();
        Self { exact_count, items }
    }

    /// Returns the exact count of items
    pub fn exact_count(&self) -> usize {
        self.exact_count
    }

    /// Returns the truncated items
    pub fn items(&self) -> &[T] {
        &self.items
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_vec_new() {
        let data = vec![1, 2, 3, 4, 5];
        let truncated = TruncatedVec::new(data.into_iter(), 3, 5);

        assert_eq!(truncated.exact_count(), 5);
        assert_eq!(truncated.items(), &[1, 2, 3]);
    }

    #[test]
    fn test_truncated_vec_new_limit_larger_than_items() {
        let data = vec![1, 2, 3];
        let truncated = TruncatedVec::new(data.into_iter(), 5, 3);

        assert_eq!(truncated.exact_count(), 3);
        assert_eq!(truncated.items(), &[1, 2, 3]);
    }

    #[test]
    fn test_truncated_vec_new_empty() {
        let data: Vec<i32> = vec![];
        let truncated = TruncatedVec::new(data.into_iter(), 5, 0);

        assert_eq!(truncated.exact_count(), 0);
        let empty: &[i32] = &[];
        assert_eq!(truncated.items(), empty);
    }

    #[test]
    fn test_sync_message_to_message() {
        let players = TruncatedVec::new(
            vec!["Player1".to_string(), "Player2".to_string()].into_iter(),
            10,
            2,
        );
        let sync_msg = SyncMessage::Room(room::SyncMessage::Joining {
            players,
            locked: false,
        });
        let json_str = sync_msg.to_message();

        assert!(json_str.contains("Room"));
        assert!(json_str.contains("Joining"));
        assert!(json_str.contains("Player2"));
    }

    #[test]
    fn test_update_message_to_message() {
        let players = TruncatedVec::new(vec!["Player1".to_string()].into_iter(), 10, 1);
        let update_msg = UpdateMessage::Room(room::UpdateMessage::Lobby(players));
        let json_str = update_msg.to_message();

        assert!(json_str.contains("Room"));
        assert!(json_str.contains("Lobby"));
        assert!(json_str.contains("Player1"));

        let kicked: UpdateMessage = player::UpdateMessage::Kicked.into();
        assert!(kicked.to_message().contains("Kicked"));
    }

    #[test]
    fn test_alarm_message_round_trips_through_json() {
        let alarm: AlarmMessage = timer::AlarmMessage::Tick { generation: 7 }.into();
        let json_str = serde_json::to_string(&alarm).unwrap();
        assert_eq!(serde_json::from_str::<AlarmMessage>(&json_str).unwrap(), alarm);
    }
}
