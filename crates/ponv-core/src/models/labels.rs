//! Near-miss suggestions for unrecognized labels and column names.

use strsim::{jaro_winkler, normalized_levenshtein};

/// Minimum similarity before a known label is offered as a hint.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Find the known label closest to `value`, if any is close enough.
///
/// The result is only ever shown to the user. Callers must still reject `value`.
pub fn closest_label<'a, I>(value: &str, known: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let needle = value.trim().to_lowercase();
    known
        .into_iter()
        .map(|label| (label, similarity(&needle, &label.to_lowercase())))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(label, _)| label.to_string())
}

fn similarity(a: &str, b: &str) -> f64 {
    // Jaro-Winkler rewards shared prefixes ("Induction" vs "Induction Only")
    jaro_winkler(a, b) * 0.6 + normalized_levenshtein(a, b) * 0.4
}
