use std::collections::HashSet;

use encounter_director_core::DropCategory;

/// Session state consulted before a unique category is dropped.
pub trait UniqueDropLedger {
    /// Reports whether the category was already granted this session.
    fn is_distributed(&self, item: DropCategory) -> bool;

    /// Records that the category was granted.
    fn record_distributed(&mut self, item: DropCategory);

    /// Forgets every granted category, typically when a new session starts.
    fn clear(&mut self);
}

/// In-memory ledger of the unique categories granted in the current session.
#[derive(Clone, Debug, Default)]
pub struct SessionInventory {
    distributed: HashSet<DropCategory>,
}

impl SessionInventory {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unique categories granted so far.
    #[must_use]
    pub fn distributed_count(&self) -> usize {
        self.distributed.len()
    }
}

impl UniqueDropLedger for SessionInventory {
    fn is_distributed(&self, item: DropCategory) -> bool {
        self.distributed.contains(&item)
    }

    fn record_distributed(&mut self, item: DropCategory) {
        let _ = self.distributed.insert(item);
    }

    fn clear(&mut self) {
        self.distributed.clear();
    }
}
