//! Question generation pipeline: prompt build → strict labeled-block parse →
//! lenient numbered-list salvage → deterministic fallback set.
//!
//! This adapter is total: upstream errors, timeouts, and garbled output all
//! resolve to the fallback inside this module. The interview can always start.

use tracing::{info, warn};

use crate::llm_client::TextGenerator;
use crate::models::records::JobContext;
use crate::models::session::{Difficulty, Question, QuestionCategory};
use crate::questions::prompts::{QUESTION_GENERATION_SYSTEM, QUESTION_GENERATION_TEMPLATE};

/// Requested question counts are clamped to this range.
pub const MIN_QUESTIONS: usize = 5;
pub const MAX_QUESTIONS: usize = 50;

/// Generates the question set for one interview.
///
/// Never fails: if the external call errors or its output parses to zero
/// questions, returns [`fallback_questions`] instead.
pub async fn generate_questions(
    llm: &dyn TextGenerator,
    job: &JobContext,
    category: QuestionCategory,
    count: usize,
) -> Vec<Question> {
    let count = count.clamp(MIN_QUESTIONS, MAX_QUESTIONS);
    let prompt = build_prompt(job, category, count);

    let text = match llm.generate(&prompt, QUESTION_GENERATION_SYSTEM).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Question generation call failed, using fallback set: {e}");
            return fallback_questions(category, count);
        }
    };

    let questions = parse_question_text(&text, count);
    if questions.is_empty() {
        warn!(
            "Question generation output parsed to zero questions ({} chars), using fallback set",
            text.len()
        );
        return fallback_questions(category, count);
    }

    info!("Generated {} questions for role '{}'", questions.len(), job.title);
    questions
}

fn build_prompt(job: &JobContext, category: QuestionCategory, count: usize) -> String {
    QUESTION_GENERATION_TEMPLATE
        .replace("{count}", &count.to_string())
        .replace("{category}", category.as_str())
        .replace("{title}", &job.title)
        .replace("{experience_level}", &job.experience_level)
        .replace("{skills}", &job.required_skills.join(", "))
        .replace("{description}", &job.description)
}

/// Strict-then-lenient parse of the generation output. Pure function.
pub fn parse_question_text(text: &str, max: usize) -> Vec<Question> {
    let mut questions = parse_labeled_blocks(text);
    if questions.is_empty() {
        questions = parse_numbered_lines(text);
    }
    questions.truncate(max);
    // Reindex: parse order is authoritative regardless of any model numbering.
    for (i, q) in questions.iter_mut().enumerate() {
        q.index = i;
    }
    questions
}

/// Strict stage: QUESTION/TYPE/DIFFICULTY labeled lines. Missing optional
/// lines default to `general` / `medium`.
pub fn parse_labeled_blocks(text: &str) -> Vec<Question> {
    let mut questions: Vec<Question> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if let Some(rest) = strip_label(line, "QUESTION") {
            if !rest.is_empty() {
                questions.push(Question {
                    index: questions.len(),
                    text: rest.to_string(),
                    category: QuestionCategory::General,
                    difficulty: Difficulty::Medium,
                    follow_up_reason: None,
                });
            }
        } else if let Some(rest) = strip_label(line, "TYPE") {
            if let (Some(q), Some(category)) = (questions.last_mut(), QuestionCategory::parse(rest))
            {
                q.category = category;
            }
        } else if let Some(rest) = strip_label(line, "DIFFICULTY") {
            if let (Some(q), Some(difficulty)) = (questions.last_mut(), Difficulty::parse(rest)) {
                q.difficulty = difficulty;
            }
        }
    }

    questions
}

/// Lenient stage: salvage numbered or bulleted lines as bare questions.
pub fn parse_numbered_lines(text: &str) -> Vec<Question> {
    let mut questions = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        let Some(body) = strip_list_marker(line) else {
            continue;
        };
        // Too short to be a real question; drops stray list artifacts.
        if body.len() < 12 {
            continue;
        }
        questions.push(Question {
            index: questions.len(),
            text: body.to_string(),
            category: QuestionCategory::General,
            difficulty: Difficulty::Medium,
            follow_up_reason: None,
        });
    }

    questions
}

/// Case-insensitive `LABEL:` prefix strip.
fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let lower = line.to_lowercase();
    let prefix = format!("{}:", label.to_lowercase());
    if lower.starts_with(&prefix) {
        Some(line[prefix.len()..].trim())
    } else {
        None
    }
}

/// Strips `1.`-, `1)`-, or `-`-style list markers; `None` for unmarked lines.
fn strip_list_marker(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix("- ") {
        return Some(rest.trim());
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let rest = &line[digits..];
    rest.strip_prefix('.')
        .or_else(|| rest.strip_prefix(')'))
        .map(str::trim)
}

/// Deterministic fallback set used when no usable output can be obtained.
pub fn fallback_questions(category: QuestionCategory, count: usize) -> Vec<Question> {
    let bank: &[(&str, QuestionCategory, Difficulty)] = &[
        (
            "Walk me through a project you are proud of. What was your specific contribution?",
            QuestionCategory::Behavioral,
            Difficulty::Easy,
        ),
        (
            "Describe a time you disagreed with a teammate about a technical decision. How was it resolved?",
            QuestionCategory::Behavioral,
            Difficulty::Medium,
        ),
        (
            "How do you approach debugging an issue you have never seen before?",
            QuestionCategory::Technical,
            Difficulty::Medium,
        ),
        (
            "Explain a technical concept from your field to someone without a technical background.",
            QuestionCategory::Technical,
            Difficulty::Medium,
        ),
        (
            "You inherit a system with no documentation and a production incident in progress. What do you do first?",
            QuestionCategory::Situational,
            Difficulty::Hard,
        ),
        (
            "Describe how you would design a rate limiter for a public API.",
            QuestionCategory::Coding,
            Difficulty::Hard,
        ),
        (
            "What do you do when requirements change halfway through a deliverable?",
            QuestionCategory::Situational,
            Difficulty::Medium,
        ),
        (
            "Tell me about a time you had to learn a new technology quickly. How did you approach it?",
            QuestionCategory::Behavioral,
            Difficulty::Easy,
        ),
    ];

    // Lead with questions matching the requested focus, then fill in order.
    let mut ordered: Vec<_> = bank.iter().filter(|(_, c, _)| *c == category).collect();
    ordered.extend(bank.iter().filter(|(_, c, _)| *c != category));

    ordered
        .into_iter()
        .take(count.min(bank.len()))
        .enumerate()
        .map(|(index, (text, category, difficulty))| Question {
            index,
            text: text.to_string(),
            category: *category,
            difficulty: *difficulty,
            follow_up_reason: None,
        })
        .collect()
}
