// All LLM prompt templates for the study and career tasks.
// Reuses cross-cutting fragments from llm_client::prompts.

/// Smart notes prompt template.
/// Replace: {page_count}, {diagram_tag}, {text}
pub const SMART_NOTES_PROMPT_TEMPLATE: &str = r#"You are an expert educator. Transform this PDF content (approx {page_count} pages) into "Smart Notes".

REQUIREMENTS:
- Style: "Explain Like I'm 5" (ELI5) but detailed.
- Structure: Use clear Markdown headings (##), subheadings (###), and bullet points.
- Visuals: Assess if the reader would understand the material better with diagrams. Only when a visually complex topic is discussed (like a biological system, machine part, or physics cycle), insert a diagram tag in the format {diagram_tag}, e.g. [Image of the human digestive system] or [Image of hydrogen fuel cell]. Be economical but strategic. Place the tag on its own line immediately after the concept is introduced.
- Content: Include Definitions, Key Concepts, and Real-World Analogies.
- Length: Comprehensive (approx 1000-2000 words).

CONTENT:
{text}"#;

/// MCQ generation prompt template.
/// Replace: {json_only_instruction}, {text}
pub const MCQ_PROMPT_TEMPLATE: &str = r#"Generate exactly 5 Multiple Choice Questions based on this text.

OUTPUT FORMAT:
{json_only_instruction}
[
  {
    "question": "Question text?",
    "options": { "A": "...", "B": "...", "C": "...", "D": "..." },
    "correct": "A",
    "explanation": "Why A is correct."
  }
]

HARD RULES:
1. Exactly 5 objects in the array
2. Every "options" object has exactly the keys "A", "B", "C", "D"
3. "correct" is one of "A", "B", "C", "D"

CONTENT:
{text}"#;

/// ATS career report prompt template.
/// Replace: {role}, {html_only_instruction}, {resume_text}
pub const CAREER_REPORT_PROMPT_TEMPLATE: &str = r#"You are an ATS Resume Expert analyzing a resume for the role of: {role}.

OUTPUT FORMAT:
{html_only_instruction}

SECTIONS (in this exact order):
1. <h3>Match Score</h3>: Give a score out of 100.
2. <h3>Executive Summary</h3>: 2-3 sentences.
3. <h3>Key Strengths</h3>: Bullet points.
4. <h3>Missing Keywords</h3>: Critical skills missing for {role}.
5. <h3>Actionable Tips</h3>: 3 specific improvements.

RESUME CONTENT:
{resume_text}"#;

/// Tutor persona sent as the system instruction of every chat turn.
/// Replace: {diagram_tag}
pub const CHAT_PERSONA_TEMPLATE: &str = "You are EduProAI, a helpful tutor.
- If the user asks for a diagram, or if a visual would help explain a complex concept (like anatomy, engineering schematics, or geography), use the format {diagram_tag} in your response.
- Explain concepts clearly and concisely.";
