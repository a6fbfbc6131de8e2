// LLM prompt constants for question generation.

/// System prompt for interview question generation — enforces the labeled-line
/// layout the parser expects.
pub const QUESTION_GENERATION_SYSTEM: &str =
    "You are an experienced technical interviewer designing an automated \
    screening interview. You MUST respond using the exact line format \
    requested. Do NOT include numbering, markdown, commentary, or any text \
    outside the question blocks.";

/// Question generation prompt template.
/// Replace: {count}, {category}, {title}, {experience_level}, {skills}, {description}
pub const QUESTION_GENERATION_TEMPLATE: &str = r#"Generate exactly {count} interview questions for the role below. Focus on {category} questions, mixing in other categories where they probe the role better.

ROLE: {title} ({experience_level})
REQUIRED SKILLS: {skills}

JOB DESCRIPTION:
{description}

Output each question as a block of exactly three lines, blocks separated by a blank line:

QUESTION: <the full question text on one line>
TYPE: <behavioral|technical|coding|situational>
DIFFICULTY: <easy|medium|hard>

Rules:
1. One QUESTION line per block — never wrap question text across lines
2. TYPE and DIFFICULTY lines are lowercase, single word
3. Questions must be answerable in speech or a short text answer
4. Scale difficulty to the stated experience level
5. No duplicate or near-duplicate questions"#;
