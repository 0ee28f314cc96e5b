//! Strict extraction of JSON payloads from model output.
//!
//! Models often wrap JSON in markdown code fences. This strips one
//! fence layer and nothing more; any remaining shape mismatch is the
//! caller's cue to fail closed to its local fallback.

/// Strip a single surrounding markdown code fence, if present.
/// Returns the trimmed inner text.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = inner.strip_suffix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence.
    let inner = match inner.split_once('\n') {
        Some((first_line, rest)) if first_line.trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
            rest
        }
        _ => inner,
    };
    inner.trim()
}
