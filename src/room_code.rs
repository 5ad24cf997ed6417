//! Short codes participants type to find a room
//!
//! Codes are displayed as five octal digits so they are easy to read out
//! loud and never contain 8 or 9.

use std::{fmt::Display, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};

/// Smallest code, `10000` in octal
const MIN_VALUE: u16 = 0o10_000;
/// One past the largest code, `100000` in octal
const MAX_VALUE: u16 = 0o100_000;

/// Number of distinct codes
pub const CODE_SPACE: usize = (MAX_VALUE - MIN_VALUE) as usize;

/// Identifier of a room in a [`Lobby`](crate::lobby::Lobby)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoomCode(u16);

impl RoomCode {
    /// Draws a random code
    pub fn new() -> Self {
        Self(fastrand::u16(MIN_VALUE..MAX_VALUE))
    }
}

impl Default for RoomCode {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:05o}", self.0)
    }
}

impl Serialize for RoomCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RoomCode {
    fn deserialize<D>(deserializer: D) -> Result<RoomCode, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RoomCode::from_str(&s).map_err(|e| serde::de::Error::custom(e.to_string()))
    }
}

impl FromStr for RoomCode {
    type Err = ParseIntError;

    /// Parses an octal code
    ///
    /// # Errors
    ///
    /// Returns a `ParseIntError` if the string is not an octal number that
    /// fits in 16 bits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(u16::from_str_radix(s.trim(), 8)?))
    }
}
