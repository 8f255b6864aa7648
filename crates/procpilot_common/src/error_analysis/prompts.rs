//! Prompts for AI diagnosis and quick fixes

use procpilot_shared::ParsedError;

/// Errors included in a diagnosis prompt
pub const MAX_PROMPT_ERRORS: usize = 10;

const DIAGNOSIS_SYSTEM: &str = r#"You are a Node.js production support engineer.
Diagnose the errors below from a PM2-managed application.

Reply with JSON only, no prose, in exactly this shape:
{
  "summary": "<one sentence>",
  "rootCause": "<most likely cause>",
  "actionableSuggestions": ["<step>", "..."],
  "followUpCommands": ["<shell or /slash command>", "..."],
  "severity": "low" | "medium" | "high" | "critical",
  "confidence": <number 0..1>
}

At most 5 suggestions and 5 commands. Be specific to the errors shown."#;

pub fn diagnosis_prompt(errors: &[ParsedError]) -> String {
    let mut prompt = String::from(DIAGNOSIS_SYSTEM);
    prompt.push_str("\n\nERRORS (newest first):\n");
    for (i, error) in errors.iter().take(MAX_PROMPT_ERRORS).enumerate() {
        prompt.push_str(&format_error(i + 1, error));
    }
    if errors.len() > MAX_PROMPT_ERRORS {
        prompt.push_str(&format!(
            "... and {} more\n",
            errors.len() - MAX_PROMPT_ERRORS
        ));
    }
    prompt
}

pub fn quick_fix_prompt(error: &ParsedError) -> String {
    format!(
        "Give ONE short fix (a single line, no explanation) for this Node.js error.\n\
         Type: {}\nMessage: {}\n{}",
        error.error_type,
        error.message,
        error
            .file_path
            .as_ref()
            .map(|p| format!("File: {}\n", p))
            .unwrap_or_default()
    )
}

fn format_error(n: usize, error: &ParsedError) -> String {
    let mut out = format!(
        "{}. [{}] {} ({}/{})\n   {}\n",
        n,
        error.timestamp.format("%Y-%m-%d %H:%M:%S"),
        error.error_type,
        error.severity,
        error.category,
        error.message
    );
    if let Some(process) = &error.process {
        out.push_str(&format!("   process: {}\n", process));
    }
    if let Some(path) = &error.file_path {
        out.push_str(&format!("   file: {}\n", path));
    }
    if let Some(line) = error.line_number {
        out.push_str(&format!("   line: {}\n", line));
    }
    if let Some(stack) = &error.stack_trace {
        for frame in stack.lines().take(3) {
            out.push_str(&format!("   {}\n", frame));
        }
    }
    out
}
