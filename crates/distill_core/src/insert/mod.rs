//! Streaming insert contract: `Idle -> Streaming -> {Completed | Cancelled | Failed}`.
//!
//! The host feeds [`InsertMsg`]s and executes the returned [`InsertEffect`]s.
//! Every streaming insert that registers a cancel listener also removes it,
//! whichever terminal state it reaches.
mod effect;
mod msg;
mod state;
mod update;

pub use effect::InsertEffect;
pub use msg::InsertMsg;
pub use state::{InsertPhase, InsertState, Position};
pub use update::update;
