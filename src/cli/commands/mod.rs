//! Command implementations.

pub mod init;
pub mod resources;
pub mod settings;
pub mod update;
