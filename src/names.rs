//! Username registry of a room
//!
//! Usernames are trimmed, length-checked, filtered for profanity and unique
//! within a room. A name is released when its owner is kicked so that it can
//! be claimed again.

use std::collections::{HashMap, hash_map::Entry};

use rustrict::CensorStr;
use serde::Serialize;
use thiserror::Error;

use crate::{constants::room::MAX_USERNAME_LENGTH, watcher::Id};

/// Reasons a username is rejected
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The requested name is already in use by another participant
    #[error("name already in-use")]
    Used,
    /// The participant already has a name
    #[error("player has an existing name")]
    Assigned,
    /// The name is empty or whitespace only
    #[error("name cannot be empty")]
    Empty,
    /// The name contains inappropriate content
    #[error("name is inappropriate")]
    Sinful,
    /// The name exceeds the maximum length
    #[error("name is too long")]
    TooLong,
}

/// Bidirectional mapping between participants and their usernames
#[derive(Debug, Default, Clone)]
pub struct Names {
    by_id: HashMap<Id, String>,
    by_name: HashMap<String, Id>,
}

impl Names {
    /// Validates and assigns a username, returning the cleaned name
    ///
    /// # Errors
    ///
    /// * `Error::TooLong` - longer than the maximum before trimming
    /// * `Error::Empty` - nothing left after trimming whitespace
    /// * `Error::Sinful` - flagged as inappropriate
    /// * `Error::Assigned` - the participant already has a name
    /// * `Error::Used` - another participant owns the name
    pub fn set_name(&mut self, id: Id, name: &str) -> Result<String, Error> {
        if name.len() > MAX_USERNAME_LENGTH {
            return Err(Error::TooLong);
        }
        let name = rustrict::trim_whitespace(name);
        if name.is_empty() {
            return Err(Error::Empty);
        }
        if name.is_inappropriate() {
            return Err(Error::Sinful);
        }
        let Entry::Vacant(slot) = self.by_id.entry(id) else {
            return Err(Error::Assigned);
        };
        match self.by_name.entry(name.to_owned()) {
            Entry::Occupied(_) => Err(Error::Used),
            Entry::Vacant(reverse) => {
                reverse.insert(id);
                slot.insert(name.to_owned());
                Ok(name.to_owned())
            }
        }
    }

    /// Frees a participant's username
    pub fn release(&mut self, id: Id) -> Option<String> {
        let name = self.by_id.remove(&id)?;
        self.by_name.remove(&name);
        Some(name)
    }
}
