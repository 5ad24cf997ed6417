//! Room membership registry
//!
//! This module tracks every participant of a room together with their role
//! and player record. Membership is independent from connectivity: a
//! participant whose tunnel is gone stays registered but is skipped by every
//! live roster, so rosters are always read fresh through a `tunnel_finder`.

use std::{fmt::Display, str::FromStr};

use enum_map::{Enum, EnumMap};
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;
use uuid::Uuid;

use super::{SyncMessage, UpdateMessage, player::Player, session::Tunnel};

/// A unique identifier for a participant
///
/// The transport assigns it when a channel connects and keeps it across
/// reconnects.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random participant ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Id {
    type Err = uuid::Error;

    /// Parses an ID from a UUID string
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// What a participant is allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
pub enum Role {
    /// Controls the game flow and grades long answers
    Organiser,
    /// Answers questions and scores points
    Player,
    /// Connected but neither organising nor playing
    Member,
}

/// A registered participant
#[derive(Debug, Clone)]
pub struct Watcher {
    /// Current role
    pub role: Role,
    /// Answer state and score
    pub player: Player,
}

/// Errors that can occur when registering participants
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The room has reached the maximum number of participants
    #[error("maximum number of players reached")]
    MaximumPlayers,
}

/// Every participant of a room, in join order
#[derive(Debug, Default)]
pub struct Watchers {
    /// Primary mapping from participant ID to their registration
    mapping: IndexMap<Id, Watcher>,

    /// Reverse mapping organized by role for efficient filtering
    reverse_mapping: EnumMap<Role, IndexSet<Id>>,
}

impl Watchers {
    /// Creates a registry with the organiser already registered
    pub fn with_organiser(organiser_id: Id, player: Player) -> Self {
        let mut watchers = Self::default();
        watchers.mapping.insert(
            organiser_id,
            Watcher {
                role: Role::Organiser,
                player,
            },
        );
        watchers.reverse_mapping[Role::Organiser].insert(organiser_id);
        watchers
    }

    /// Registers a new participant
    ///
    /// # Errors
    ///
    /// Returns `Error::MaximumPlayers` if the room is full.
    pub fn add_watcher(&mut self, watcher_id: Id, role: Role, player: Player) -> Result<(), Error> {
        if self.mapping.len() >= crate::constants::room::MAX_PLAYER_COUNT {
            return Err(Error::MaximumPlayers);
        }

        self.mapping.insert(watcher_id, Watcher { role, player });
        self.reverse_mapping[role].insert(watcher_id);

        Ok(())
    }

    /// Unregisters a participant, returning their registration
    pub fn remove_watcher(&mut self, watcher_id: Id) -> Option<Watcher> {
        let watcher = self.mapping.shift_remove(&watcher_id)?;
        self.reverse_mapping[watcher.role].shift_remove(&watcher_id);
        Some(watcher)
    }

    /// Moves a participant to another role
    pub fn set_role(&mut self, watcher_id: Id, role: Role) {
        let Some(watcher) = self.mapping.get_mut(&watcher_id) else {
            return;
        };
        if watcher.role != role {
            self.reverse_mapping[watcher.role].shift_remove(&watcher_id);
            self.reverse_mapping[role].insert(watcher_id);
            watcher.role = role;
        }
    }

    /// The role of a participant, if registered
    pub fn role(&self, watcher_id: Id) -> Option<Role> {
        self.mapping.get(&watcher_id).map(|watcher| watcher.role)
    }

    /// Checks if a participant is registered
    pub fn has_watcher(&self, watcher_id: Id) -> bool {
        self.mapping.contains_key(&watcher_id)
    }

    /// The player record of a participant
    pub fn player(&self, watcher_id: Id) -> Option<&Player> {
        self.mapping.get(&watcher_id).map(|watcher| &watcher.player)
    }

    /// Mutable player record of a participant
    pub fn player_mut(&mut self, watcher_id: Id) -> Option<&mut Player> {
        self.mapping
            .get_mut(&watcher_id)
            .map(|watcher| &mut watcher.player)
    }

    /// Every registered participant of a role, connected or not
    pub fn ids(&self, role: Role) -> impl Iterator<Item = Id> + '_ {
        self.reverse_mapping[role].iter().copied()
    }

    /// All registrations in join order
    pub fn iter(&self) -> impl Iterator<Item = (Id, &Watcher)> {
        self.mapping.iter().map(|(id, watcher)| (*id, watcher))
    }

    /// Mutable player records of every participant
    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.mapping.values_mut().map(|watcher| &mut watcher.player)
    }

    /// Participants of a role with a live tunnel, in join order
    pub fn specific_vec<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        role: Role,
        tunnel_finder: F,
    ) -> Vec<(Id, T)> {
        self.reverse_mapping[role]
            .iter()
            .filter_map(|id| tunnel_finder(*id).map(|tunnel| (*id, tunnel)))
            .collect_vec()
    }

    /// IDs of participants of a role with a live tunnel
    pub fn live_ids<T: Tunnel, F: Fn(Id) -> Option<T>>(&self, role: Role, tunnel_finder: F) -> Vec<Id> {
        self.specific_vec(role, tunnel_finder)
            .into_iter()
            .map(|(id, _)| id)
            .collect_vec()
    }

    /// Checks if a participant has an active connection
    pub fn is_alive<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        watcher_id: Id,
        tunnel_finder: F,
    ) -> bool {
        tunnel_finder(watcher_id).is_some()
    }

    /// Closes a participant's tunnel
    pub fn remove_watcher_session<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        watcher_id: Id,
        tunnel_finder: F,
    ) {
        if let Some(x) = tunnel_finder(watcher_id) {
            x.close();
        }
    }

    /// Sends an update message to one participant
    pub fn send_message<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        message: &UpdateMessage,
        watcher_id: Id,
        tunnel_finder: F,
    ) {
        let Some(session) = tunnel_finder(watcher_id) else {
            return;
        };

        session.send_message(message);
    }

    /// Sends a state synchronization message to one participant
    pub fn send_state<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        message: &SyncMessage,
        watcher_id: Id,
        tunnel_finder: F,
    ) {
        let Some(session) = tunnel_finder(watcher_id) else {
            return;
        };

        session.send_state(message);
    }

    /// Sends personalized messages to every connected participant
    ///
    /// The sender is called once per participant and may return `None` to
    /// skip them.
    pub fn announce_with<S, T: Tunnel, F: Fn(Id) -> Option<T>>(&self, sender: S, tunnel_finder: F)
    where
        S: Fn(Id, Role) -> Option<UpdateMessage>,
    {
        for (id, watcher) in &self.mapping {
            let Some(session) = tunnel_finder(*id) else {
                continue;
            };
            let Some(message) = sender(*id, watcher.role) else {
                continue;
            };

            session.send_message(&message);
        }
    }

    /// Broadcasts an update message to every connected participant
    pub fn announce<T: Tunnel, F: Fn(Id) -> Option<T>>(&self, message: &UpdateMessage, tunnel_finder: F) {
        self.announce_with(|_, _| Some(message.to_owned()), tunnel_finder);
    }
}
