//! Pure pieces of candidate generation: truncation, the last-resort form and
//! blacklist filtering. Nothing here touches the database.

use std::collections::HashSet;

/// Keeps at most `max` characters.
pub fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Builds `prefix{separator}{id}` within `max` characters.
///
/// The separator and id are kept whole and the prefix is shortened to fit,
/// down to a single character. Returns `None` when not even one prefix
/// character fits next to the suffix.
pub fn last_resort(first: &str, separator: &str, owner_id: i64, max: usize) -> Option<String> {
    let suffix = format!("{separator}{owner_id}");
    let budget = max.checked_sub(suffix.chars().count())?;
    if budget == 0 {
        return None;
    }

    let mut candidate = truncate(first, budget);
    candidate.push_str(&suffix);
    Some(candidate)
}

/// Appends the last-resort candidate, then drops blacklisted and repeated
/// entries while keeping priority order.
pub fn finalize(
    mut candidates: Vec<String>,
    separator: &str,
    owner_id: i64,
    max: usize,
    blacklist: &[String],
) -> Vec<String> {
    if let Some(fallback) = candidates
        .first()
        .and_then(|first| last_resort(first, separator, owner_id, max))
    {
        candidates.push(fallback);
    }

    let mut seen = HashSet::new();
    candidates.retain(|candidate| {
        !blacklist.iter().any(|banned| banned == candidate) && seen.insert(candidate.clone())
    });
    candidates
}
