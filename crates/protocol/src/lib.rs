//! Wire types for the workout peer protocol.
//!
//! This crate contains the serde-serializable types exchanged between the
//! session device (the wearable running the workout) and its companion
//! device. These types represent the "protocol layer" - the shapes of data
//! as they appear on the wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond construction and (de)serialization
//! * Flat on the wire: Every message serializes to a single key-value map
//! * Stable: Changes only when the wire protocol changes
//!
//! The session state machine and the message relay are built on top of
//! these types in `wk-runtime` and `wk-rs`.

pub mod message;
pub mod quantity;
pub mod state;
pub mod taxonomy;

pub use message::*;
pub use quantity::*;
pub use state::*;
pub use taxonomy::*;
