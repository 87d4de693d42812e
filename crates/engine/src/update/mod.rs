//! Deferred structural updates.
//!
//! Query evaluation only records [`UpdatePrimitive`]s; they are applied to the
//! table in a second phase, once nothing reads it anymore.

mod pending;
mod primitive;

pub use pending::PendingUpdates;
pub use primitive::{UpdateOp, UpdatePrimitive, UpdateState, adjacent_texts};
