// ABOUTME: Approximate name matching used to resolve user-supplied station,
// ABOUTME: reservoir and district names against the names in fetched data.

use similar::TextDiff;

use super::Record;

/// Minimum similarity ratio for a candidate to count as a match.
pub const MATCH_CUTOFF: f32 = 0.6;

/// Similarity of two strings as `2 * matches / total_chars`, in `0.0..=1.0`.
pub fn similarity(a: &str, b: &str) -> f32 {
    TextDiff::from_chars(a, b).ratio()
}

/// Return the candidate most similar to `input`, if any reaches
/// [`MATCH_CUTOFF`]. On equal scores the earliest candidate wins.
pub fn best_match<'a, I>(input: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&'a str, f32)> = None;
    for candidate in candidates {
        let score = similarity(input, candidate);
        if score < MATCH_CUTOFF {
            continue;
        }
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((candidate, score));
        }
    }
    best.map(|(candidate, _)| candidate)
}

/// Resolve a user-supplied name against the `field` values in `records`.
///
/// `None` when no name was supplied or nothing is close enough.
pub fn resolve_name(records: &[Record], field: &str, wanted: Option<&str>) -> Option<String> {
    let wanted = wanted?;
    let resolved = best_match(
        wanted,
        records.iter().filter_map(|r| r.get(field).and_then(|v| v.as_str())),
    )
    .map(str::to_string);
    tracing::debug!(field, wanted, resolved = ?resolved, "resolved name");
    resolved
}

/// Keep only records whose `field` equals `name`; no-op when `name` is `None`.
pub fn retain_named(records: &mut Vec<Record>, field: &str, name: Option<&str>) {
    if let Some(name) = name {
        records.retain(|r| r.get(field).and_then(|v| v.as_str()) == Some(name));
    }
}
