// LLM prompt constants for answer evaluation and report synthesis.

/// System prompt for single-answer scoring — enforces JSON-only output.
pub const ANSWER_EVALUATION_SYSTEM: &str =
    "You are a rigorous, fair interview assessor. Score one candidate answer. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Single-answer evaluation template.
/// Replace: {category}, {difficulty}, {question}, {answer}, {title}, {experience_level}
pub const ANSWER_EVALUATION_TEMPLATE: &str = r#"Score the candidate's answer to one interview question for the role "{title}" ({experience_level}).

QUESTION ({category}, {difficulty}):
{question}

CANDIDATE ANSWER:
{answer}

Return a JSON object with this EXACT schema, every score an integer 0-100:
{
  "technical": 70,
  "communication": 70,
  "confidence": 70,
  "problem_solving": 70,
  "feedback": "Two or three sentences of specific, constructive feedback."
}

Scoring guidance:
- technical: correctness and depth relative to the stated difficulty
- communication: clarity, structure, and precision of the answer
- confidence: decisiveness and ownership of the reasoning
- problem_solving: approach quality — tradeoffs, edge cases, method
- An empty or off-topic answer scores low across all dimensions"#;

/// System prompt for holistic report synthesis — enforces JSON-only output.
pub const REPORT_SYNTHESIS_SYSTEM: &str =
    "You are a hiring committee assistant producing a final interview report \
    from a full transcript. You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Holistic report template.
/// Replace: {title}, {experience_level}, {transcript}
pub const REPORT_SYNTHESIS_TEMPLATE: &str = r#"Produce a final evaluation for a completed automated interview for the role "{title}" ({experience_level}).

TRANSCRIPT (question, answer, and per-answer score):
{transcript}

Return a JSON object with this EXACT schema, every score an integer 0-100:
{
  "technical_score": 70,
  "communication_score": 70,
  "confidence_score": 70,
  "problem_solving_score": 70,
  "strengths": ["..."],
  "weaknesses": ["..."],
  "recommendation": "Three or four sentences summarizing the candidate."
}

Rules:
1. Ground every strength and weakness in specific answers from the transcript
2. Keep strengths and weaknesses to at most 4 entries each
3. Do NOT output a hiring decision — that is derived from scores downstream"#;
