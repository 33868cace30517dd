use crate::types::Variables;
use serde_json::Value;

/// Placeholder replaced by the run's initial prompt.
pub const INPUT: &str = "input";
/// Alias of [`INPUT`].
pub const INITIAL_PROMPT: &str = "initialPrompt";
/// Placeholder replaced by the preceding step's response.
pub const PREVIOUS_RESPONSE: &str = "previousResponse";

/// Build a step's concrete prompt from its template.
///
/// Replaces `{input}` and `{initialPrompt}` with `initial_prompt`,
/// `{previousResponse}` with `previous_response`, and `{name}` with the
/// matching entry of `variables`. The fixed placeholders win over variables
/// of the same name.
///
/// A placeholder naming something neither fixed nor in `variables` renders
/// as empty text. Braces that do not wrap an identifier (JSON literals,
/// `{ spaced }` text) are kept as written. Use `{{` and `}}` for literal
/// braces around an identifier.
///
/// The template is scanned once, left to right. Substituted text is never
/// rescanned, so a value containing `{something}` is inserted verbatim.
///
/// # Example
///
/// ```
/// use prompt_bridge::prompt::render;
/// use prompt_bridge::types::Variables;
/// use serde_json::json;
///
/// let mut vars = Variables::new();
/// vars.insert("tone".into(), json!("formal"));
/// let result = render("Rewrite ({tone}): {previousResponse}", "ignored", "hi there", &vars);
/// assert_eq!(result, "Rewrite (formal): hi there");
/// ```
pub fn render(
    template: &str,
    initial_prompt: &str,
    previous_response: &str,
    variables: &Variables,
) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        rendered.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            rendered.push('{');
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with("}}") {
            rendered.push('}');
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with('}') {
            rendered.push('}');
            rest = &tail[1..];
            continue;
        }

        match placeholder_name(tail) {
            Some(name) => {
                match name {
                    INPUT | INITIAL_PROMPT => rendered.push_str(initial_prompt),
                    PREVIOUS_RESPONSE => rendered.push_str(previous_response),
                    other => {
                        if let Some(value) = variables.get(other) {
                            rendered.push_str(&value_to_text(value));
                        }
                    }
                }
                rest = &tail[name.len() + 2..];
            }
            None => {
                rendered.push('{');
                rest = &tail[1..];
            }
        }
    }

    rendered.push_str(rest);
    rendered
}

/// If `text` starts with `{identifier}`, return the identifier.
fn placeholder_name(text: &str) -> Option<&str> {
    let body = text.strip_prefix('{')?;
    let end = body.find('}')?;
    let name = &body[..end];
    let mut chars = name.chars();
    let first = chars.next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.') {
        Some(name)
    } else {
        None
    }
}

/// Text form of a variable value: strings raw, `null` empty, anything else
/// as compact JSON.
fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
