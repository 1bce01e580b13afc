use std::collections::HashSet;

use uuid::Uuid;

/// Product identifiers that must never be recommended during one cascade run.
///
/// Starts from the caller's exclusions and only ever grows as tiers add the
/// products implicated by their signal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    ids: HashSet<Uuid>,
}

impl ExclusionSet {
    /// Union of caller exclusions and signal-implicated products
    pub fn build(
        caller_exclusions: impl IntoIterator<Item = Uuid>,
        implicated: impl IntoIterator<Item = Uuid>,
    ) -> Self {
        let mut set = Self::default();
        set.extend(caller_exclusions);
        set.extend(implicated);
        set
    }

    pub fn extend(&mut self, ids: impl IntoIterator<Item = Uuid>) {
        self.ids.extend(ids);
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Sorted copy, for binding into store queries deterministically
    pub fn to_sorted_vec(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.ids.iter().copied().collect();
        ids.sort();
        ids
    }
}
