//! Answer Evaluator and Report Synthesizer.
//!
//! Both are total: external-service failure degrades to documented defaults
//! rather than blocking the interview.

pub mod evaluator;
pub mod prompts;
pub mod report;

pub use evaluator::evaluate_answer;
pub use report::synthesize_report;
