//! Subscription frames
//!
//! The relay streams JSON text frames tagged by `type`:
//!
//! ```text
//!   {"type": "roll", "data": { ...RollEvent }}
//!   {"type": "clear"}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::roll::{RollEvent, RollSlot};

/// A frame on the `/ws/roll` stream
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum RollFrame {
    /// Replace the current roll
    Roll(RollEvent),
    /// No active roll
    Clear,
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

impl RollFrame {
    /// Parse a text frame
    ///
    /// Returns `Ok(None)` for frames that are well-formed but carry nothing
    /// to apply: unknown types, and `roll` frames without data. Invalid JSON
    /// and `roll` data that is not a roll event are errors.
    pub fn parse(text: &str) -> Result<Option<Self>> {
        let raw: RawFrame = serde_json::from_str(text)?;

        match raw.kind.as_deref() {
            Some("roll") => match raw.data {
                Some(data) if !data.is_null() => {
                    Ok(Some(RollFrame::Roll(serde_json::from_value(data)?)))
                }
                _ => Ok(None),
            },
            Some("clear") => Ok(Some(RollFrame::Clear)),
            _ => Ok(None),
        }
    }

    /// Encode as a text frame
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// The slot state this frame produces
    pub fn into_slot(self) -> RollSlot {
        match self {
            RollFrame::Roll(event) => RollSlot::Active(event),
            RollFrame::Clear => RollSlot::Cleared,
        }
    }
}
