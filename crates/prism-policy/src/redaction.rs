//! Redaction of field values for under-tier viewers.

use prism_core::{CoreError, FieldValue};

use crate::policy::RedactionStrategy;

/// Apply a redaction strategy to a field value.
///
/// Returns `Ok(None)` for [`RedactionStrategy::Omit`] — the caller must drop
/// the key from the projection entirely. Returns an error when the strategy
/// cannot apply to the value's shape (e.g. masking a document reference);
/// the resolver degrades such fields to absent rather than failing the view.
pub fn redact(
    value: &FieldValue,
    strategy: &RedactionStrategy,
) -> Result<Option<String>, CoreError> {
    match strategy {
        RedactionStrategy::Omit => Ok(None),
        RedactionStrategy::Placeholder(text) => Ok(Some(text.clone())),
        RedactionStrategy::Mask => match value {
            FieldValue::Text(s) | FieldValue::Choice(s) => Ok(Some(mask_text(s))),
            FieldValue::Document(_) => Err(CoreError::ValidationError(
                "cannot mask a document reference".into(),
            )),
        },
    }
}

/// Mask text while preserving its coarse structure.
///
/// Email-shaped values keep the '@' and the final domain suffix
/// ("a@b.org" → "••••@••••.org"); anything else keeps punctuation and
/// whitespace with alphanumerics replaced.
fn mask_text(s: &str) -> String {
    if let Some((_, domain)) = s.rsplit_once('@') {
        let suffix = domain.rfind('.').map(|i| &domain[i..]).unwrap_or("");
        return format!("••••@••••{}", suffix);
    }
    s.chars()
        .map(|c| if c.is_alphanumeric() { '•' } else { c })
        .collect()
}
