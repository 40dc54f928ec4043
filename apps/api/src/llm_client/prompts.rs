// Shared prompt constants and prompt-building utilities.
// Each task defines its own templates in tasks/prompts.rs.
// This file contains cross-cutting prompt fragments.

/// Anti-hallucination directive appended to every generated prompt.
pub const SAFETY_LINE: &str = "\n\nIMPORTANT: Do not invent facts. \
    If information is missing, explicitly state what is missing.";

/// Output constraint for tasks whose answer is parsed as JSON.
pub const JSON_ONLY_INSTRUCTION: &str = "Return ONLY a raw JSON array. \
    Do not wrap in markdown code blocks. \
    Do not include any text before or after the JSON.";

/// Output constraint for tasks whose answer is rendered as HTML.
pub const HTML_ONLY_INSTRUCTION: &str = "Return raw HTML (no markdown, no ``` tags). \
    Use <h3>, <ul>, <li>, <strong>, <p>.";

/// How the model should request a diagram. The front end swaps these tags for images.
pub const DIAGRAM_TAG_FORMAT: &str = "[Image of X]";

/// Appends the safety directive to a finished prompt body.
pub fn with_safety_line(mut prompt: String) -> String {
    prompt.push_str(SAFETY_LINE);
    prompt
}

/// Fills `{name}` placeholders in a single left-to-right pass.
///
/// Substituted values are copied as-is and never scanned again, so braces in
/// user text stay literal. Braces that do not name a known placeholder (such
/// as a JSON example inside the template) are left untouched.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(
        template.len() + values.iter().map(|(_, v)| v.len()).sum::<usize>(),
    );
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let value = after.find('}').and_then(|end| {
            let name = &after[..end];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, end))
        });
        match value {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_safety_line_appends_once_at_end() {
        let prompt = with_safety_line("Summarize this.".to_string());
        assert!(prompt.starts_with("Summarize this."));
        assert!(prompt.ends_with("explicitly state what is missing."));
        assert_eq!(prompt.matches("Do not invent facts").count(), 1);
    }

    #[test]
    fn test_with_safety_line_keeps_trailing_whitespace() {
        let prompt = with_safety_line("notes   \n\t".to_string());
        assert!(prompt.starts_with("notes   \n\t\n\nIMPORTANT"));
    }

    #[test]
    fn test_fill_template_substitutes_every_placeholder() {
        let filled = fill_template("{a} and {b}, again {a}", &[("a", "x"), ("b", "y")]);
        assert_eq!(filled, "x and y, again x");
    }

    #[test]
    fn test_fill_template_never_rescans_values() {
        let filled = fill_template(
            "role={role}; text={text}",
            &[("role", "{text}"), ("text", "T")],
        );
        assert_eq!(filled, "role={text}; text=T");
    }

    #[test]
    fn test_fill_template_leaves_unknown_braces() {
        let template = "{ \"correct\": \"A\" } then {name} and {unclosed";
        let filled = fill_template(template, &[("name", "N")]);
        assert_eq!(filled, "{ \"correct\": \"A\" } then N and {unclosed");
    }
}
