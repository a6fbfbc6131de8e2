//! Report Synthesizer — aggregates all per-answer scores into the final
//! Evaluation and hiring decision.
//!
//! Primary path is one holistic call over the full transcript; any failure
//! there falls back to pure averaging. Always returns a usable Evaluation.

use serde::Deserialize;
use tracing::{info, warn};

use crate::config::DecisionThresholds;
use crate::evaluation::evaluator::clamp_score;
use crate::evaluation::prompts::{REPORT_SYNTHESIS_SYSTEM, REPORT_SYNTHESIS_TEMPLATE};
use crate::llm_client::{strip_json_fences, TextGenerator};
use crate::models::records::JobContext;
use crate::models::session::{Evaluation, HiringDecision, Question, ResponseRecord};

/// Responses scoring at or above this feed the averaged-path strengths list.
const STRENGTH_FLOOR: u8 = 85;
/// Responses scoring at or below this feed the averaged-path weaknesses list.
const WEAKNESS_CEILING: u8 = 40;

/// Synthesizes the final evaluation for a completed session. Total function.
pub async fn synthesize_report(
    llm: &dyn TextGenerator,
    questions: &[Question],
    responses: &[ResponseRecord],
    job: &JobContext,
    thresholds: &DecisionThresholds,
) -> Evaluation {
    if responses.is_empty() {
        return minimal_evaluation(thresholds);
    }

    match holistic_evaluation(llm, questions, responses, job, thresholds).await {
        Some(evaluation) => evaluation,
        None => {
            warn!("Holistic report synthesis unavailable, falling back to averaged scores");
            average_evaluation(questions, responses, thresholds)
        }
    }
}

/// Holistic path: one call over the transcript, parsed strictly.
async fn holistic_evaluation(
    llm: &dyn TextGenerator,
    questions: &[Question],
    responses: &[ResponseRecord],
    job: &JobContext,
    thresholds: &DecisionThresholds,
) -> Option<Evaluation> {
    let prompt = REPORT_SYNTHESIS_TEMPLATE
        .replace("{title}", &job.title)
        .replace("{experience_level}", &job.experience_level)
        .replace("{transcript}", &build_transcript(questions, responses));

    let text = match llm.generate(&prompt, REPORT_SYNTHESIS_SYSTEM).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Report synthesis call failed: {e}");
            return None;
        }
    };

    let payload = extract_report_payload(&text)?;

    let technical = clamp_score(payload.technical_score?);
    let communication = clamp_score(payload.communication_score?);
    let confidence = clamp_score(payload.confidence_score?);
    let problem_solving = clamp_score(payload.problem_solving_score?);
    let overall = mean_of(&[technical, communication, confidence, problem_solving]);
    let hiring_decision = thresholds.decide(overall);

    info!("Holistic report synthesized: overall={overall}, decision={hiring_decision:?}");

    Some(Evaluation {
        overall_score: overall,
        technical_score: technical,
        communication_score: communication,
        confidence_score: confidence,
        problem_solving_score: problem_solving,
        strengths: payload.strengths,
        weaknesses: payload.weaknesses,
        recommendation: payload
            .recommendation
            .unwrap_or_else(|| decision_summary(overall, hiring_decision)),
        hiring_decision,
    })
}

/// Fallback path: pure averaging of per-answer scores. Each dimension carries
/// the same average — per-dimension detail is only available holistically.
pub fn average_evaluation(
    questions: &[Question],
    responses: &[ResponseRecord],
    thresholds: &DecisionThresholds,
) -> Evaluation {
    if responses.is_empty() {
        return minimal_evaluation(thresholds);
    }

    let overall = mean_of(&responses.iter().map(|r| r.score).collect::<Vec<_>>());
    let hiring_decision = thresholds.decide(overall);

    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();
    for response in responses {
        let Some(question) = questions.get(response.question_index) else {
            continue;
        };
        let topic = truncate(&question.text, 80);
        if response.score >= STRENGTH_FLOOR {
            strengths.push(format!("Strong answer ({}): {topic}", response.score));
        } else if response.score <= WEAKNESS_CEILING {
            weaknesses.push(format!("Weak answer ({}): {topic}", response.score));
        }
    }

    Evaluation {
        overall_score: overall,
        technical_score: overall,
        communication_score: overall,
        confidence_score: overall,
        problem_solving_score: overall,
        strengths,
        weaknesses,
        recommendation: decision_summary(overall, hiring_decision),
        hiring_decision,
    }
}

/// Minimal evaluation for a session completed with no recorded responses.
fn minimal_evaluation(thresholds: &DecisionThresholds) -> Evaluation {
    let hiring_decision = thresholds.decide(0);
    Evaluation {
        overall_score: 0,
        technical_score: 0,
        communication_score: 0,
        confidence_score: 0,
        problem_solving_score: 0,
        strengths: vec![],
        weaknesses: vec![],
        recommendation: "No answers were recorded for this interview.".to_string(),
        hiring_decision,
    }
}

fn build_transcript(questions: &[Question], responses: &[ResponseRecord]) -> String {
    responses
        .iter()
        .map(|r| {
            let question_text = questions
                .get(r.question_index)
                .map(|q| q.text.as_str())
                .unwrap_or("(question unavailable)");
            format!(
                "Q{}: {}\nA: {}\nPer-answer score: {}",
                r.question_index + 1,
                question_text,
                r.answer,
                r.score
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Debug, Deserialize)]
struct RawReportPayload {
    #[serde(alias = "technical")]
    technical_score: Option<f64>,
    #[serde(alias = "communication")]
    communication_score: Option<f64>,
    #[serde(alias = "confidence")]
    confidence_score: Option<f64>,
    #[serde(alias = "problem_solving")]
    problem_solving_score: Option<f64>,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
    recommendation: Option<String>,
}

fn extract_report_payload(text: &str) -> Option<RawReportPayload> {
    let text = strip_json_fences(text);
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn mean_of(scores: &[u8]) -> u8 {
    if scores.is_empty() {
        return 0;
    }
    let sum: u32 = scores.iter().map(|&s| s as u32).sum();
    ((sum as f64) / (scores.len() as f64)).round() as u8
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}…")
    }
}

fn decision_summary(overall: u8, decision: HiringDecision) -> String {
    match decision {
        HiringDecision::StronglyRecommend => format!(
            "Excellent performance ({overall}/100). The candidate exceeded the bar across the interview."
        ),
        HiringDecision::Recommend => format!(
            "Good performance ({overall}/100). The candidate met the bar for the role."
        ),
        HiringDecision::Neutral => format!(
            "Mixed performance ({overall}/100). Consider a follow-up interview before deciding."
        ),
        HiringDecision::NotRecommend => format!(
            "Below-bar performance ({overall}/100). The interview does not support moving forward."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::{FailingGenerator, RepeatingGenerator};
    use crate::models::session::{Difficulty, QuestionCategory};

    fn questions(n: usize) -> Vec<Question> {
        (0..n)
            .map(|index| Question {
                index,
                text: format!("Question number {index}?"),
                category: QuestionCategory::General,
                difficulty: Difficulty::Medium,
                follow_up_reason: None,
            })
            .collect()
    }

    fn responses(scores: &[u8]) -> Vec<ResponseRecord> {
        scores
            .iter()
            .enumerate()
            .map(|(question_index, &score)| ResponseRecord {
                question_index,
                answer: format!("Answer {question_index}"),
                time_taken_secs: 60,
                score,
                feedback: "ok".to_string(),
            })
            .collect()
    }

    fn job() -> JobContext {
        JobContext {
            title: "Data Engineer".to_string(),
            description: String::new(),
            required_skills: vec![],
            experience_level: "mid".to_string(),
        }
    }

    #[test]
    fn test_average_five_eighties_is_recommend() {
        let t = DecisionThresholds::default();
        let evaluation = average_evaluation(&questions(5), &responses(&[80; 5]), &t);
        assert_eq!(evaluation.overall_score, 80);
        assert_eq!(evaluation.technical_score, 80);
        assert_eq!(evaluation.hiring_decision, HiringDecision::Recommend);
    }

    #[test]
    fn test_average_collects_strengths_and_weaknesses() {
        let t = DecisionThresholds::default();
        let evaluation = average_evaluation(&questions(3), &responses(&[90, 70, 30]), &t);
        assert_eq!(evaluation.strengths.len(), 1);
        assert_eq!(evaluation.weaknesses.len(), 1);
        assert!(evaluation.strengths[0].contains("Question number 0"));
    }

    #[test]
    fn test_empty_responses_minimal_evaluation() {
        let t = DecisionThresholds::default();
        let evaluation = average_evaluation(&[], &[], &t);
        assert_eq!(evaluation.overall_score, 0);
        assert_eq!(evaluation.hiring_decision, HiringDecision::NotRecommend);
        assert!(evaluation.strengths.is_empty());
        assert!(evaluation.weaknesses.is_empty());
    }

    #[tokio::test]
    async fn test_synthesize_uses_holistic_payload() {
        let t = DecisionThresholds::default();
        let gen = RepeatingGenerator(
            r#"{"technical_score": 90, "communication_score": 86, "confidence_score": 88, "problem_solving_score": 92,
                "strengths": ["Deep systems knowledge"], "weaknesses": [], "recommendation": "Hire."}"#
                .to_string(),
        );
        let evaluation =
            synthesize_report(&gen, &questions(2), &responses(&[50, 50]), &job(), &t).await;
        // Holistic dims override the per-answer average.
        assert_eq!(evaluation.overall_score, 89);
        assert_eq!(evaluation.hiring_decision, HiringDecision::StronglyRecommend);
        assert_eq!(evaluation.strengths, vec!["Deep systems knowledge".to_string()]);
        assert_eq!(evaluation.recommendation, "Hire.");
    }

    #[tokio::test]
    async fn test_synthesize_falls_back_to_averaging_on_failure() {
        let t = DecisionThresholds::default();
        let evaluation =
            synthesize_report(&FailingGenerator, &questions(5), &responses(&[80; 5]), &job(), &t)
                .await;
        assert_eq!(evaluation.overall_score, 80);
        assert_eq!(evaluation.hiring_decision, HiringDecision::Recommend);
    }

    #[tokio::test]
    async fn test_synthesize_falls_back_on_incomplete_payload() {
        let t = DecisionThresholds::default();
        let gen = RepeatingGenerator(r#"{"technical_score": 90}"#.to_string());
        let evaluation =
            synthesize_report(&gen, &questions(2), &responses(&[60, 62]), &job(), &t).await;
        assert_eq!(evaluation.overall_score, 61);
    }

    #[tokio::test]
    async fn test_synthesize_empty_responses_skips_llm() {
        let t = DecisionThresholds::default();
        let evaluation = synthesize_report(&FailingGenerator, &[], &[], &job(), &t).await;
        assert_eq!(evaluation.overall_score, 0);
    }

    #[test]
    fn test_mean_rounds_half_up() {
        assert_eq!(mean_of(&[80, 81]), 81);
        assert_eq!(mean_of(&[]), 0);
    }
}
