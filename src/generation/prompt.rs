//! Prompt construction and response cleanup.

use crate::types::Job;

const INSTRUCTIONS: &str = "You are a senior software engineer working in an existing repository. \
Write the code that completes the task below as the full contents of a single source file. \
Respond with the code only: no explanation before or after it.";

/// Builds the generation prompt for a job.
///
/// The instructions are fixed; only the task text and, when present, the style guide
/// vary between jobs.
pub fn build_prompt(job: &Job) -> String {
    let mut prompt = format!("{}\n\nTask: {}\n", INSTRUCTIONS, job.task_text.trim());
    if let Some(style) = job.style_guide.as_deref().map(str::trim)
        && !style.is_empty()
    {
        prompt.push_str(&format!("Style guide: {}\n", style));
    }
    prompt
}

/// Strips a surrounding Markdown code fence from a model response.
///
/// If the response contains a fenced block, the body of the first one is returned
/// (the language tag on the opening fence is dropped). Otherwise the response is
/// returned with surrounding whitespace trimmed. The result ends with a newline unless
/// it is empty.
pub fn extract_code(response: &str) -> String {
    let body = fenced_body(response).unwrap_or_else(|| response.trim());
    if body.is_empty() {
        return String::new();
    }
    let mut code = body.trim_end().to_string();
    code.push('\n');
    code
}

fn fenced_body(response: &str) -> Option<&str> {
    let open = response.find("```")?;
    let after_open = &response[open + 3..];
    // Skip the info string (e.g. "python") up to the end of the opening line
    let body_start = after_open.find('\n')? + 1;
    let body = &after_open[body_start..];
    let close = body.find("```").unwrap_or(body.len());
    Some(&body[..close])
}
