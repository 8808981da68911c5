//! Roll events
//!
//! [`RollEvent`] is the unit of broadcast. It serializes to the camelCase
//! JSON shape shared by every transport.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::id::RollId;
use super::payload::{non_empty, RollPayload};

/// Mode used when the payload does not name one
pub const DEFAULT_MODE: &str = "normal";

/// Lifecycle status of a roll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollStatus {
    /// Dice are in the air
    #[default]
    Rolling,
    /// Final outcome is known
    Result,
}

/// State of one roll at one point of its lifecycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RollEvent {
    #[serde(deserialize_with = "null_as_default")]
    pub id: RollId,
    #[serde(deserialize_with = "null_as_default")]
    pub status: RollStatus,
    /// Roll modality (normal, advantage, ...), not validated
    #[serde(deserialize_with = "null_as_default")]
    pub mode: String,
    #[serde(deserialize_with = "null_as_default")]
    pub player_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub label: String,
    /// Individual die results, opaque to this crate
    pub dice: Option<Value>,
    pub value: Option<i64>,
    pub chosen_value: Option<i64>,
    #[serde(deserialize_with = "null_as_default")]
    pub modifier: i64,
    pub total: Option<i64>,
    #[serde(deserialize_with = "null_as_default")]
    pub is_nat1: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub is_nat20: bool,
    pub difficulty_class: Option<i64>,
}

/// Read an explicit `null` the same as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl RollEvent {
    /// Build the `rolling` event that opens a new roll
    ///
    /// Outcome fields are cleared and a fresh id is minted.
    pub fn rolling(payload: &RollPayload) -> Self {
        Self::rolling_with_id(RollId::mint(), payload)
    }

    pub(crate) fn rolling_with_id(id: RollId, payload: &RollPayload) -> Self {
        Self {
            id,
            status: RollStatus::Rolling,
            mode: mode_or_default(payload),
            player_name: non_empty(&payload.player_name).unwrap_or_default().to_owned(),
            label: non_empty(&payload.label).unwrap_or_default().to_owned(),
            dice: None,
            value: None,
            chosen_value: None,
            modifier: payload.modifier.unwrap_or(0),
            total: None,
            is_nat1: false,
            is_nat20: false,
            difficulty_class: payload.difficulty_class,
        }
    }

    /// Build the `result` event that follows `previous`
    ///
    /// The id of `previous` is kept when there is one. `player_name`, `label`,
    /// `modifier` and `difficulty_class` fall back to the previous event when
    /// the payload leaves them out (an empty name or label counts as left
    /// out). `chosen_value` falls back to the payload's `value`. Everything
    /// else comes from the payload alone.
    pub fn result(payload: &RollPayload, previous: Option<&RollEvent>) -> Self {
        let id = previous
            .map(|prev| prev.id.clone())
            .unwrap_or_else(RollId::mint);

        let inherited_name = previous.map(|p| p.player_name.as_str()).filter(|s| !s.is_empty());
        let inherited_label = previous.map(|p| p.label.as_str()).filter(|s| !s.is_empty());

        Self {
            id,
            status: RollStatus::Result,
            mode: mode_or_default(payload),
            player_name: non_empty(&payload.player_name)
                .or(inherited_name)
                .unwrap_or_default()
                .to_owned(),
            label: non_empty(&payload.label)
                .or(inherited_label)
                .unwrap_or_default()
                .to_owned(),
            dice: payload.dice.clone().filter(|d| !d.is_null()),
            value: payload.value,
            chosen_value: payload.chosen_value.or(payload.value),
            modifier: payload
                .modifier
                .or(previous.map(|p| p.modifier))
                .unwrap_or(0),
            total: payload.total,
            is_nat1: payload.is_nat1.unwrap_or(false),
            is_nat20: payload.is_nat20.unwrap_or(false),
            difficulty_class: payload
                .difficulty_class
                .or(previous.and_then(|p| p.difficulty_class)),
        }
    }

    /// Check if the dice are still rolling
    pub fn is_rolling(&self) -> bool {
        self.status == RollStatus::Rolling
    }

    /// Check if the event carries a final result
    pub fn is_result(&self) -> bool {
        self.status == RollStatus::Result
    }

    /// Whether the total meets the difficulty class, when both are known
    pub fn meets_difficulty(&self) -> Option<bool> {
        match (self.total, self.difficulty_class) {
            (Some(total), Some(dc)) => Some(total >= dc),
            _ => None,
        }
    }
}

fn mode_or_default(payload: &RollPayload) -> String {
    non_empty(&payload.mode).unwrap_or(DEFAULT_MODE).to_owned()
}
