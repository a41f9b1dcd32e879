use std::sync::OnceLock;

use encounter_director_core::DropCategory;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Single weighted row of a [`LootTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootEntry {
    /// Category dropped when this row is picked. Rows without a category are
    /// malformed and never picked.
    #[serde(default)]
    pub item: Option<DropCategory>,
    /// Relative weight of the row. Rows with a weight of zero or less are
    /// malformed and never picked.
    pub weight: i32,
}

impl LootEntry {
    /// Creates a well-formed row.
    #[must_use]
    pub const fn new(item: DropCategory, weight: i32) -> Self {
        Self {
            item: Some(item),
            weight,
        }
    }

    /// Category and weight of the row when it can take part in a pick.
    #[must_use]
    pub fn pickable(&self) -> Option<(DropCategory, i64)> {
        match self.item {
            Some(item) if self.weight > 0 => Some((item, i64::from(self.weight))),
            _ => None,
        }
    }
}

/// Weighted list of droppable categories.
///
/// The total weight is computed on first use and cached until the entries
/// change.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LootTable {
    name: String,
    #[serde(default)]
    entries: Vec<LootEntry>,
    #[serde(skip)]
    total_weight: OnceLock<i64>,
}

impl LootTable {
    /// Creates a table from the provided rows.
    #[must_use]
    pub fn new(name: impl Into<String>, entries: Vec<LootEntry>) -> Self {
        Self {
            name: name.into(),
            entries,
            total_weight: OnceLock::new(),
        }
    }

    /// Human readable name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rows of the table in configuration order.
    #[must_use]
    pub fn entries(&self) -> &[LootEntry] {
        &self.entries
    }

    /// Appends a row and invalidates the cached total weight.
    pub fn push(&mut self, entry: LootEntry) {
        self.entries.push(entry);
        let _ = self.total_weight.take();
    }

    /// Replaces every row and invalidates the cached total weight.
    pub fn set_entries(&mut self, entries: Vec<LootEntry>) {
        self.entries = entries;
        let _ = self.total_weight.take();
    }

    /// Sum of the weights of every pickable row.
    #[must_use]
    pub fn total_weight(&self) -> i64 {
        *self.total_weight.get_or_init(|| {
            self.entries
                .iter()
                .filter_map(LootEntry::pickable)
                .map(|(_, weight)| weight)
                .sum()
        })
    }

    /// Indices of rows that can never be picked.
    pub fn malformed_entries(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.pickable().is_none())
            .map(|(index, _)| index)
    }

    /// Picks a single category with probability proportional to its weight.
    ///
    /// Returns `None` when the table is empty or carries no positive weight.
    pub fn pick_drop<R>(&self, rng: &mut R) -> Option<DropCategory>
    where
        R: Rng + ?Sized,
    {
        let total = self.total_weight();
        if total <= 0 {
            return None;
        }

        let draw = rng.gen_range(0..total);
        let mut cumulative = 0i64;
        for (item, weight) in self.entries.iter().filter_map(LootEntry::pickable) {
            cumulative += weight;
            if draw < cumulative {
                return Some(item);
            }
        }
        None
    }
}
