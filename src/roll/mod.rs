//! Roll lifecycle data model
//!
//! A roll starts as a `rolling` event, is replaced by a `result` event with
//! the same id, and ends when the channel is cleared.
//!
//! ```text
//!   Empty ──start_rolling──► Active(rolling) ──show_result──► Active(result)
//!                                 │                                │
//!                                 └──────────clear_roll────────────┴──► Cleared
//! ```

pub mod event;
pub mod id;
pub mod payload;
pub mod slot;

pub use event::{RollEvent, RollStatus, DEFAULT_MODE};
pub use id::{epoch_millis, RollId};
pub use payload::RollPayload;
pub use slot::RollSlot;
