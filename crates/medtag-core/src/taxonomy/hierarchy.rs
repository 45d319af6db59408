//! Breadth-first ancestor traversal over the concept hierarchy.

use std::collections::{HashSet, VecDeque};

use crate::error::PipelineError;

use super::vocabulary::Vocabulary;

/// Walk the hierarchy from `start_id` toward the roots.
///
/// Emits the concept's own (label, definition) pair first, then ancestors in
/// breadth-first order, following every parent edge of multi-parent
/// concepts. A visited set guarantees termination even if a malformed
/// taxonomy introduces a cycle; the published data is a DAG and each concept
/// contributes at most one pair per walk.
///
/// Fails with `UnknownConcept` when an id is absent from the vocabulary —
/// that means the index and vocabulary are out of sync, so the current
/// retrieval must abort rather than return a partial chain.
pub fn walk(vocabulary: &Vocabulary, start_id: &str) -> Result<Vec<(String, String)>, PipelineError> {
    let mut path = Vec::new();
    let mut queue: VecDeque<String> = VecDeque::from([start_id.to_string()]);
    let mut visited: HashSet<String> = HashSet::from([start_id.to_string()]);

    while let Some(id) = queue.pop_front() {
        let concept = vocabulary
            .get(&id)
            .ok_or_else(|| PipelineError::UnknownConcept { id: id.clone() })?;

        path.push((concept.label.clone(), concept.definition.clone()));

        for parent in &concept.parent_ids {
            if visited.insert(parent.clone()) {
                queue.push_back(parent.clone());
            }
        }
    }

    Ok(path)
}
