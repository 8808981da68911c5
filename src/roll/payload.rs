//! Caller-side roll input

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fields a master view supplies when starting a roll or showing its result
///
/// Every field is optional. Which ones are read, and what a missing field
/// falls back to, depends on the lifecycle step; see
/// [`RollEvent::rolling`](super::RollEvent::rolling) and
/// [`RollEvent::result`](super::RollEvent::result).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RollPayload {
    pub mode: Option<String>,
    pub player_name: Option<String>,
    pub label: Option<String>,
    pub dice: Option<Value>,
    pub value: Option<i64>,
    pub chosen_value: Option<i64>,
    pub modifier: Option<i64>,
    pub total: Option<i64>,
    pub is_nat1: Option<bool>,
    pub is_nat20: Option<bool>,
    pub difficulty_class: Option<i64>,
}

impl RollPayload {
    /// Create an empty payload
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn player_name(mut self, name: impl Into<String>) -> Self {
        self.player_name = Some(name.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the individual die results (passed through untouched)
    pub fn dice(mut self, dice: Value) -> Self {
        self.dice = Some(dice);
        self
    }

    pub fn value(mut self, value: i64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn chosen_value(mut self, value: i64) -> Self {
        self.chosen_value = Some(value);
        self
    }

    pub fn modifier(mut self, modifier: i64) -> Self {
        self.modifier = Some(modifier);
        self
    }

    pub fn total(mut self, total: i64) -> Self {
        self.total = Some(total);
        self
    }

    pub fn nat1(mut self, is_nat1: bool) -> Self {
        self.is_nat1 = Some(is_nat1);
        self
    }

    pub fn nat20(mut self, is_nat20: bool) -> Self {
        self.is_nat20 = Some(is_nat20);
        self
    }

    pub fn difficulty_class(mut self, dc: i64) -> Self {
        self.difficulty_class = Some(dc);
        self
    }
}

/// Non-empty string field, treating `Some("")` as missing
pub(super) fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}
