//! Stable identifiers for formal process steps and informal practices.
//!
//! A step identifier joins a process-type slug and a zero-padded ordinal so
//! that `ORDER BY step_id` recovers catalog order:
//!
//! - "ABC Review", step 2 → `abc-review.002`
//! - "Stock Assessment Review", step 10 → `stock-assessment-review.010`
//!
//! Informal practice labels ("Public Comment Period") are slugged the same
//! way but carry no ordinal.

use crate::CoreError;

/// Lowercase a label and collapse every run of non-alphanumerics into one `-`.
///
/// "ABC Review" → "abc-review", "  Plan Team / SSC  " → "plan-team-ssc".
pub fn slugify(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut pending_dash = false;

    for c in label.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    out
}

/// Build the identifier for step `ordinal` of `process_type`.
pub fn step_id(process_type: &str, ordinal: u32) -> String {
    format!("{}.{:03}", slugify(process_type), ordinal)
}

/// Split a step identifier back into `(process_slug, ordinal)`.
pub fn parse_step_id(id: &str) -> Result<(&str, u32), CoreError> {
    let (slug, ordinal) = id
        .rsplit_once('.')
        .ok_or_else(|| CoreError::InvalidStepId(id.to_string()))?;
    if slug.is_empty() {
        return Err(CoreError::InvalidStepId(id.to_string()));
    }
    let ordinal = ordinal
        .parse::<u32>()
        .map_err(|_| CoreError::InvalidStepId(id.to_string()))?;
    Ok((slug, ordinal))
}
