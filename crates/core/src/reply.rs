//! Helpers for oracle replies that are expected to carry JSON.

/// Remove markdown code fences (```` ```json ```` / ```` ``` ````) and surrounding whitespace.
pub fn strip_code_fences(reply: &str) -> String {
    reply
        .replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .to_string()
}
