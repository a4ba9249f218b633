//! Description search and macro-completeness ranking over a catalog
//! snapshot. Both functions are pure: they borrow the snapshot, never
//! mutate it, and depend on nothing else.

use crate::models::Food;

/// Multi-word, case-insensitive substring filter.
///
/// The query is split on whitespace and a food survives only when its
/// lower-cased description contains every token as a substring (AND
/// semantics, not word-boundary matching). An empty or whitespace-only
/// query produces no tokens and therefore matches every record. Snapshot
/// order is preserved.
#[must_use]
pub fn filter_by_words<'a>(foods: &'a [Food], query: &str) -> Vec<&'a Food> {
    let words: Vec<String> = query
        .to_lowercase()
        .split_whitespace()
        .map(String::from)
        .collect();

    foods
        .iter()
        .filter(|food| {
            let description = food.description.to_lowercase();
            words.iter().all(|word| description.contains(word.as_str()))
        })
        .collect()
}

/// The food whose calorie conversion is most nutritionally complete among
/// everything matching `query`.
///
/// Flattens the conversion factors of every matching food, drops factors
/// without a calorie conversion, scores the rest by how many of the three
/// macro values are present, and returns the food owning the winner.
/// Ties keep the first candidate in snapshot order, so the result is
/// deterministic. `None` when nothing matches or no match carries a
/// calorie conversion.
#[must_use]
pub fn best_match<'a>(foods: &'a [Food], query: &str) -> Option<&'a Food> {
    let mut best: Option<(&Food, usize)> = None;

    for food in filter_by_words(foods, query) {
        for factor in &food.conversion_factors {
            let Some(conversion) = factor.calorie_conversion.as_ref() else {
                continue;
            };
            let score = conversion.macro_count();
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((food, score));
            }
        }
    }

    best.map(|(food, _)| food)
}
