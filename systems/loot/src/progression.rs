use encounter_director_core::LootTableId;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Switches to `table` once `after_wave` waves have completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootMilestone {
    /// Number of completed waves at which the milestone applies.
    pub after_wave: u32,
    /// Table that becomes the default.
    pub table: LootTableId,
}

/// Maps the number of completed waves to the loot table that should be active.
#[derive(Clone, Debug, Default)]
pub struct LootProgression {
    milestones: Vec<LootMilestone>,
    waves_completed: u32,
    active: Option<LootTableId>,
}

impl LootProgression {
    /// Creates a selector positioned before the first completed wave.
    #[must_use]
    pub fn new(mut milestones: Vec<LootMilestone>) -> Self {
        milestones.sort_by_key(|milestone| milestone.after_wave);
        let mut progression = Self {
            milestones,
            waves_completed: 0,
            active: None,
        };
        let _ = progression.reselect();
        progression
    }

    /// Number of waves completed since the last reset.
    #[must_use]
    pub fn waves_completed(&self) -> u32 {
        self.waves_completed
    }

    /// Table selected for the current wave count.
    #[must_use]
    pub fn active_table(&self) -> Option<LootTableId> {
        self.active
    }

    /// Records a completed wave.
    ///
    /// Returns the newly selected table when the selection changed.
    pub fn on_wave_completed(&mut self) -> Option<LootTableId> {
        self.waves_completed = self.waves_completed.saturating_add(1);
        self.reselect()
    }

    /// Zeroes the completed-wave counter and re-derives the table for it.
    ///
    /// The previous selection is forgotten, so the return value is the table
    /// selected for zero completed waves, or `None` when no milestone applies.
    pub fn reset_progression_count(&mut self) -> Option<LootTableId> {
        self.waves_completed = 0;
        self.active = None;
        self.reselect()
    }

    fn reselect(&mut self) -> Option<LootTableId> {
        if self.milestones.is_empty() {
            return None;
        }

        let selected = self
            .milestones
            .iter()
            .filter(|milestone| milestone.after_wave <= self.waves_completed)
            .last()
            .map(|milestone| milestone.table);

        let Some(table) = selected else {
            warn!(
                waves_completed = self.waves_completed,
                "no loot milestone applies; keeping the active table"
            );
            return None;
        };

        if self.active == Some(table) {
            return None;
        }

        debug!(
            waves_completed = self.waves_completed,
            table = table.get(),
            "loot milestone reached"
        );
        self.active = Some(table);
        Some(table)
    }
}
