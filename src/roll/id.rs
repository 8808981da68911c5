//! Roll identifiers

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

const ID_PREFIX: &str = "roll_";

/// Milliseconds since the Unix epoch, or 0 if the clock is before it
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Identifier shared by every event of one roll lifecycle
///
/// Ids are minted from the wall clock, so two rolls started within the same
/// millisecond collide. Only one roll is active per channel at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RollId(String);

impl RollId {
    /// Mint an id from the current time
    pub fn mint() -> Self {
        Self::at(epoch_millis())
    }

    /// Mint an id for a given epoch-millis timestamp
    pub fn at(millis: u64) -> Self {
        Self(format!("{}{}", ID_PREFIX, millis))
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is empty (frames from producers that omit it)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for RollId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RollId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl std::fmt::Display for RollId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_prefix() {
        let id = RollId::mint();
        assert!(id.as_str().starts_with("roll_"));
        assert!(id.as_str()["roll_".len()..].parse::<u64>().is_ok());
    }

    #[test]
    fn test_at() {
        assert_eq!(RollId::at(1_700_000_000_000).as_str(), "roll_1700000000000");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = RollId::from("roll_42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"roll_42\"");
    }
}
