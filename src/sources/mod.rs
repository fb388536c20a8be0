//! Configuration source implementations.

mod config_source;
mod file;
mod memory;

pub use config_source::ConfigSource;
pub use file::FileSource;
pub use memory::MemorySource;
