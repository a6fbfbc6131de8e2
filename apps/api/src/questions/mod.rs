//! Question Generation Adapter — turns a job description into a structured
//! question set, with a deterministic fallback when the external call fails.

pub mod generator;
pub mod prompts;

pub use generator::generate_questions;
