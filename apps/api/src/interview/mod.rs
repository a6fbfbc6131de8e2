//! Interview Session Manager — owns session lifecycle and sequences question
//! generation, answer evaluation, report synthesis, and anti-cheat tracking.

pub mod handlers;
pub mod manager;

pub use manager::SessionManager;
