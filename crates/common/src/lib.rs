//! Identity types shared by the entity store and the domain layer.

mod types;

pub use types::{AggregateId, InvalidUserId, UserId};
