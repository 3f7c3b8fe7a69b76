//! Plain data shared between the tasks and the outside world.

pub mod error;
pub mod status;
