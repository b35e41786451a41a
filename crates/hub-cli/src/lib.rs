//! Command-line mapping console over a local file-backed hub.

pub mod cli;
pub mod commands;
pub mod local;
pub mod logging;
pub mod summary;

pub use local::LocalHub;
