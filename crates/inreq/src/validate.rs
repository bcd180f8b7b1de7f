//! Exhaustiveness checks run after all fields were decoded.

use crate::error::{DecodeError, DecodeResult};
use std::collections::BTreeSet;

/// Checks that every key present in a request source was consumed.
///
/// Raises [`DecodeError::ValuesNotUsed`] naming `source` and listing the
/// present keys no field consumed.
///
/// # Example
///
/// ```rust
/// use inreq::validate::ensure_all_used;
/// use std::collections::BTreeSet;
///
/// let used: BTreeSet<String> = ["a".to_string()].into();
/// assert!(ensure_all_used("query", ["a"], Some(&used)).is_ok());
/// assert!(ensure_all_used("query", ["a", "b"], Some(&used)).is_err());
/// ```
pub fn ensure_all_used<'a>(
    source: &str,
    present: impl IntoIterator<Item = &'a str>,
    used: Option<&BTreeSet<String>>,
) -> DecodeResult<()> {
    let unused: Vec<String> = present
        .into_iter()
        .filter(|key| !used.is_some_and(|used| used.contains(*key)))
        .map(str::to_owned)
        .collect();

    if unused.is_empty() {
        return Ok(());
    }

    tracing::debug!(source, unused = unused.len(), "request values not consumed");
    Err(DecodeError::values_not_used(source, unused))
}
