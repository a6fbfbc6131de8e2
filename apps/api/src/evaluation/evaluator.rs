//! Answer Evaluator — scores one answer across four dimensions.
//!
//! Parsing is strict-then-lenient: embedded JSON payload, then `label: number`
//! line extraction, then a neutral default band. Each stage is a pure
//! function. The evaluator never raises past its boundary.

use serde::Deserialize;
use tracing::warn;

use crate::llm_client::{strip_json_fences, TextGenerator};
use crate::models::records::JobContext;
use crate::models::session::Question;
use crate::evaluation::prompts::{ANSWER_EVALUATION_SYSTEM, ANSWER_EVALUATION_TEMPLATE};

/// Default band applied when nothing usable can be extracted from the reply.
pub const NEUTRAL_SCORE: u8 = 70;
/// Band applied to empty answers without consulting the external service.
pub const EMPTY_ANSWER_SCORE: u8 = 20;

/// Four-dimension score for one answer, each 0–100.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerScore {
    pub technical: u8,
    pub communication: u8,
    pub confidence: u8,
    pub problem_solving: u8,
    pub feedback: String,
}

impl AnswerScore {
    pub fn uniform(score: u8, feedback: &str) -> Self {
        Self {
            technical: score,
            communication: score,
            confidence: score,
            problem_solving: score,
            feedback: feedback.to_string(),
        }
    }

    /// Mean of the four dimensions, rounded.
    pub fn overall(&self) -> u8 {
        let sum = self.technical as u32
            + self.communication as u32
            + self.confidence as u32
            + self.problem_solving as u32;
        ((sum as f64) / 4.0).round() as u8
    }
}

/// Scores a single answer. Total: every failure path resolves to a
/// schema-conformant default inside this function.
pub async fn evaluate_answer(
    llm: &dyn TextGenerator,
    question: &Question,
    answer: &str,
    job: &JobContext,
) -> AnswerScore {
    if answer.trim().is_empty() {
        return AnswerScore::uniform(
            EMPTY_ANSWER_SCORE,
            "No answer was provided for this question.",
        );
    }

    let prompt = build_prompt(question, answer, job);

    let text = match llm.generate(&prompt, ANSWER_EVALUATION_SYSTEM).await {
        Ok(text) => text,
        Err(e) => {
            warn!(
                "Answer evaluation call failed for question {}, applying neutral score: {e}",
                question.index
            );
            return AnswerScore::uniform(
                NEUTRAL_SCORE,
                "Automated scoring was unavailable; a neutral score was applied.",
            );
        }
    };

    parse_score_text(&text).unwrap_or_else(|| {
        warn!(
            "Answer evaluation output unparsable for question {} ({} chars), applying neutral score",
            question.index,
            text.len()
        );
        AnswerScore::uniform(
            NEUTRAL_SCORE,
            "Automated scoring was unavailable; a neutral score was applied.",
        )
    })
}

fn build_prompt(question: &Question, answer: &str, job: &JobContext) -> String {
    ANSWER_EVALUATION_TEMPLATE
        .replace("{category}", question.category.as_str())
        .replace(
            "{difficulty}",
            &format!("{:?}", question.difficulty).to_lowercase(),
        )
        .replace("{question}", &question.text)
        .replace("{answer}", answer)
        .replace("{title}", &job.title)
        .replace("{experience_level}", &job.experience_level)
}

/// Strict-then-lenient parse of a scoring reply. Pure function.
pub fn parse_score_text(text: &str) -> Option<AnswerScore> {
    extract_json_payload(text).or_else(|| extract_labeled_scores(text))
}

#[derive(Debug, Deserialize)]
struct RawScorePayload {
    #[serde(alias = "technical_score")]
    technical: Option<f64>,
    #[serde(alias = "communication_score")]
    communication: Option<f64>,
    #[serde(alias = "confidence_score")]
    confidence: Option<f64>,
    #[serde(alias = "problem_solving_score")]
    problem_solving: Option<f64>,
    feedback: Option<String>,
}

/// Strict stage: locate an embedded JSON object and deserialize it.
/// Requires at least one numeric dimension; the rest default to neutral.
pub fn extract_json_payload(text: &str) -> Option<AnswerScore> {
    let text = strip_json_fences(text);
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }

    let payload: RawScorePayload = serde_json::from_str(&text[start..=end]).ok()?;

    let dims = [
        payload.technical,
        payload.communication,
        payload.confidence,
        payload.problem_solving,
    ];
    if dims.iter().all(Option::is_none) {
        return None;
    }

    Some(AnswerScore {
        technical: clamp_score(payload.technical.unwrap_or(NEUTRAL_SCORE as f64)),
        communication: clamp_score(payload.communication.unwrap_or(NEUTRAL_SCORE as f64)),
        confidence: clamp_score(payload.confidence.unwrap_or(NEUTRAL_SCORE as f64)),
        problem_solving: clamp_score(payload.problem_solving.unwrap_or(NEUTRAL_SCORE as f64)),
        feedback: payload
            .feedback
            .unwrap_or_else(|| "No feedback provided.".to_string()),
    })
}

/// Lenient stage: scan lines for `label: number` pairs.
pub fn extract_labeled_scores(text: &str) -> Option<AnswerScore> {
    let mut technical = None;
    let mut communication = None;
    let mut confidence = None;
    let mut problem_solving = None;
    let mut feedback = None;

    for line in text.lines() {
        let Some((label, rest)) = line.split_once(':') else {
            continue;
        };
        let label = label.trim().to_lowercase();
        if label.ends_with("feedback") {
            let rest = rest.trim();
            if !rest.is_empty() {
                feedback = Some(rest.to_string());
            }
            continue;
        }
        let Some(value) = first_number(rest) else {
            continue;
        };
        if label.contains("technical") {
            technical = Some(value);
        } else if label.contains("communication") {
            communication = Some(value);
        } else if label.contains("confidence") {
            confidence = Some(value);
        } else if label.contains("problem") {
            problem_solving = Some(value);
        }
    }

    if [technical, communication, confidence, problem_solving]
        .iter()
        .all(Option::is_none)
    {
        return None;
    }

    Some(AnswerScore {
        technical: clamp_score(technical.unwrap_or(NEUTRAL_SCORE as f64)),
        communication: clamp_score(communication.unwrap_or(NEUTRAL_SCORE as f64)),
        confidence: clamp_score(confidence.unwrap_or(NEUTRAL_SCORE as f64)),
        problem_solving: clamp_score(problem_solving.unwrap_or(NEUTRAL_SCORE as f64)),
        feedback: feedback.unwrap_or_else(|| "No feedback provided.".to_string()),
    })
}

/// First numeric token in a fragment, e.g. `" 85 / 100"` → 85.
fn first_number(s: &str) -> Option<f64> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let rest = &s[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

pub fn clamp_score(value: f64) -> u8 {
    value.clamp(0.0, 100.0).round() as u8
}
