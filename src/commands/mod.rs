//! Command handlers.

pub mod ci;
pub mod entrypoint;
pub mod stage;
pub mod version;
