//! Core change-tracking types.

mod builder;
mod changes;
mod configuration;
mod control;
pub mod diff;

pub use builder::ControlBuilder;
pub use changes::{ALL, ChangeSet};
pub use configuration::Configuration;
pub use control::{Control, DiffFallback};
