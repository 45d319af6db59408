//! Frequency aggregation of hierarchy-walk output into a ranked table.

use std::collections::HashMap;

use crate::types::RankedConcept;

/// Merge (label, definition) pairs from every hierarchy walk of a retrieval
/// into a deduplicated, frequency-ranked table.
///
/// Counts occurrences per label; the first-seen definition wins (duplicate
/// labels never overwrite it). Sorted by descending count, ties broken by
/// first-seen order, truncated to `top_n`.
pub fn aggregate(pairs: &[(String, String)], top_n: usize) -> Vec<RankedConcept> {
    struct Entry {
        count: usize,
        definition: String,
        first_seen: usize,
    }

    let mut by_label: HashMap<&str, Entry> = HashMap::new();

    for (order, (label, definition)) in pairs.iter().enumerate() {
        by_label
            .entry(label)
            .and_modify(|e| e.count += 1)
            .or_insert(Entry {
                count: 1,
                definition: definition.clone(),
                first_seen: order,
            });
    }

    let mut ranked: Vec<(&str, Entry)> = by_label.into_iter().collect();
    ranked.sort_by(|a, b| b.1.count.cmp(&a.1.count).then(a.1.first_seen.cmp(&b.1.first_seen)));
    ranked.truncate(top_n);

    ranked
        .into_iter()
        .map(|(label, entry)| RankedConcept {
            label: label.to_string(),
            count: entry.count,
            definition: entry.definition,
        })
        .collect()
}
