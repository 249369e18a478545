//! Domain layer - Pure business logic.

// Producer commands and their wire format
pub mod commands;
// Playlist rendering
pub mod hls;
pub mod naming;
pub mod profile;
pub mod retention;
