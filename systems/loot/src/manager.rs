use encounter_director_core::{Command, LootTableId, Position};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, UnitDisc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{LootTable, SessionInventory, UniqueDropLedger};

/// Policy knobs applied on top of the loot tables.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LootConfig {
    /// Probability in `[0, 1]` that a request produces any drop at all.
    pub drop_chance: f32,
    /// Radius of the disk each drop is scattered inside around the request position.
    pub scatter_radius: f32,
}

impl Default for LootConfig {
    fn default() -> Self {
        Self {
            drop_chance: 1.0,
            scatter_radius: 0.0,
        }
    }
}

/// Session-wide loot policy layer wrapping the registered loot tables.
#[derive(Debug)]
pub struct LootManager<L = SessionInventory> {
    config: LootConfig,
    tables: Vec<LootTable>,
    active: Option<LootTableId>,
    ledger: L,
    rng: ChaCha8Rng,
}

impl LootManager<SessionInventory> {
    /// Creates a manager that tracks unique drops in a fresh [`SessionInventory`].
    #[must_use]
    pub fn new(
        config: LootConfig,
        tables: Vec<LootTable>,
        default_table: Option<LootTableId>,
        seed: u64,
    ) -> Self {
        Self::with_ledger(config, tables, default_table, seed, SessionInventory::new())
    }
}

impl<L: UniqueDropLedger> LootManager<L> {
    /// Creates a manager backed by the provided unique-drop ledger.
    #[must_use]
    pub fn with_ledger(
        config: LootConfig,
        tables: Vec<LootTable>,
        default_table: Option<LootTableId>,
        seed: u64,
        ledger: L,
    ) -> Self {
        for table in &tables {
            for index in table.malformed_entries() {
                warn!(
                    table = table.name(),
                    entry = index,
                    "loot entry has no item or a non-positive weight; it will never drop"
                );
            }
            if !table.entries().is_empty() && table.total_weight() <= 0 {
                warn!(
                    table = table.name(),
                    "loot table has entries but no positive weight"
                );
            }
        }

        let mut manager = Self {
            config,
            tables,
            active: None,
            ledger,
            rng: ChaCha8Rng::seed_from_u64(seed),
        };
        manager.update_default_table(default_table);
        manager
    }

    /// Policy knobs the manager was created with.
    #[must_use]
    pub fn config(&self) -> LootConfig {
        self.config
    }

    /// Table used when a request does not name one.
    #[must_use]
    pub fn active_table(&self) -> Option<LootTableId> {
        self.active
    }

    /// Looks up a registered table.
    #[must_use]
    pub fn table(&self, id: LootTableId) -> Option<&LootTable> {
        usize::try_from(id.get())
            .ok()
            .and_then(|index| self.tables.get(index))
    }

    /// Number of registered tables.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Ledger of unique categories granted this session.
    #[must_use]
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Replaces the default table. Unknown identifiers leave the current table in place.
    pub fn update_default_table(&mut self, table: Option<LootTableId>) {
        match table {
            Some(id) if self.table(id).is_none() => {
                warn!(
                    table = id.get(),
                    registered = self.tables.len(),
                    "ignoring unknown default loot table"
                );
            }
            _ => {
                if self.active != table {
                    debug!(table = ?table.map(|id| id.get()), "default loot table updated");
                }
                self.active = table;
            }
        }
    }

    /// Forgets every unique category granted so far.
    pub fn reset_session(&mut self) {
        self.ledger.clear();
    }

    /// Rolls for loot at `position` and emits `Command::SpawnDrop` for each drop.
    ///
    /// Returns the number of drops emitted.
    pub fn request_drop(
        &mut self,
        position: Position,
        min_count: i32,
        max_count: i32,
        override_table: Option<LootTableId>,
        out: &mut Vec<Command>,
    ) -> usize {
        let roll: f32 = self.rng.gen();
        if roll >= self.config.drop_chance {
            return 0;
        }

        let Some(table_id) = self.resolve_table(override_table) else {
            warn!("loot drop requested without an override or default loot table");
            return 0;
        };

        if max_count < min_count {
            warn!(min_count, max_count, "loot drop range is inverted");
            return 0;
        }
        let count = self.rng.gen_range(min_count..=max_count);
        if count <= 0 {
            return 0;
        }

        let mut emitted = 0;
        for _ in 0..count {
            let Some(item) = self.tables[table_id].pick_drop(&mut self.rng) else {
                warn!(
                    table = self.tables[table_id].name(),
                    "loot table produced no pick"
                );
                continue;
            };

            if item.is_unique() && self.ledger.is_distributed(item) {
                debug!(?item, "suppressing unique loot already granted this session");
                continue;
            }

            let position = self.scatter(position);
            if item.is_unique() {
                self.ledger.record_distributed(item);
            }
            debug!(?item, x = position.x, y = position.y, "loot dropped");
            out.push(Command::SpawnDrop { item, position });
            emitted += 1;
        }
        emitted
    }

    fn resolve_table(&self, override_table: Option<LootTableId>) -> Option<usize> {
        let resolve = |id: LootTableId| {
            usize::try_from(id.get())
                .ok()
                .filter(|index| *index < self.tables.len())
        };

        if let Some(id) = override_table {
            if let Some(index) = resolve(id) {
                return Some(index);
            }
            warn!(table = id.get(), "override loot table is unknown; using default");
        }
        self.active.and_then(resolve)
    }

    fn scatter(&mut self, position: Position) -> Position {
        if self.config.scatter_radius <= 0.0 {
            return position;
        }
        let [x, y]: [f32; 2] = UnitDisc.sample(&mut self.rng);
        position + Position::new(x, y) * self.config.scatter_radius
    }
}
