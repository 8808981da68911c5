//! Current-roll slot

use super::event::RollEvent;

/// The current roll of one channel
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RollSlot {
    /// Nothing has been rolled on this channel yet
    #[default]
    Empty,
    /// The last roll was cleared
    Cleared,
    /// A roll is in progress or showing its result
    Active(RollEvent),
}

impl RollSlot {
    /// Get the active event, if any
    pub fn event(&self) -> Option<&RollEvent> {
        match self {
            RollSlot::Active(event) => Some(event),
            RollSlot::Empty | RollSlot::Cleared => None,
        }
    }

    /// Take the active event, if any
    pub fn into_event(self) -> Option<RollEvent> {
        match self {
            RollSlot::Active(event) => Some(event),
            RollSlot::Empty | RollSlot::Cleared => None,
        }
    }

    /// Check if there is no active roll
    pub fn is_absent(&self) -> bool {
        !matches!(self, RollSlot::Active(_))
    }

    /// Check if this channel has seen any roll lifecycle
    pub fn has_rolled(&self) -> bool {
        !matches!(self, RollSlot::Empty)
    }
}

impl From<Option<RollEvent>> for RollSlot {
    /// `None` maps to `Cleared`: an explicit "no roll" from a transport
    fn from(event: Option<RollEvent>) -> Self {
        match event {
            Some(event) => RollSlot::Active(event),
            None => RollSlot::Cleared,
        }
    }
}
