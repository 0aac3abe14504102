use std::{
    collections::{HashMap, HashSet},
    hash::Hash,
};

/// Mapping from each annotation term to the identifiers carrying it
///
/// The index is always derived from a specific identifier set and carries no
/// ordering guarantee over its terms or identifiers.
#[derive(Debug, Clone)]
pub struct TermIndex<I, T> {
    term_to_ids: HashMap<T, HashSet<I>>,
}

impl<I, T> TermIndex<I, T>
where
    I: Eq + Hash + Clone,
    T: Eq + Hash + Clone,
{
    /// Indexes the terms of every identifier in `ids` that appears in `associations`
    pub fn build(ids: &HashSet<I>, associations: &HashMap<I, HashSet<T>>) -> Self {
        let mut term_to_ids: HashMap<T, HashSet<I>> = HashMap::new();
        for id in ids {
            let Some(terms) = associations.get(id) else {
                continue;
            };
            for term in terms {
                term_to_ids
                    .entry(term.clone())
                    .or_default()
                    .insert(id.clone());
            }
        }
        Self { term_to_ids }
    }

    /// Identifiers carrying `term`, if any
    pub fn ids(&self, term: &T) -> Option<&HashSet<I>> {
        self.term_to_ids.get(term)
    }

    /// Number of identifiers carrying `term`
    pub fn count(&self, term: &T) -> usize {
        self.ids(term).map_or(0, HashSet::len)
    }

    pub fn terms(&self) -> impl Iterator<Item = &T> {
        self.term_to_ids.keys()
    }

    /// Number of distinct terms
    pub fn len(&self) -> usize {
        self.term_to_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.term_to_ids.is_empty()
    }
}
