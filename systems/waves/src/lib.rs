#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave execution engine and orchestrator.
//!
//! Each running wave is a cooperative task resumed once per
//! [`Event::TimeAdvanced`]. A resumed task either keeps waiting for its
//! throttle interval or issues one complete burst of
//! [`Command::SpawnEnemy`] requests. Cancelled tasks are dropped by the
//! orchestrator and never resume again.

mod composition;
mod placement;
mod task;

use std::time::Duration;

use encounter_director_core::{
    derive_wave_seed, Command, ContainerId, EnemyCategory, Event, Position, SessionMode,
    SpawnStrategy, WaveKind, WaveRunId,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use composition::{burst_size, composition, HIGHEST_TUNED_TIER, MAX_BURST_SIZE};
pub use placement::{resolve_spawn_position, PlacementArea, MAX_PLACEMENT_ATTEMPTS};

use task::{SpawnContext, TaskStatus, WaveTask};

/// Shared configuration injected into every wave the orchestrator starts.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveSettings {
    /// Delay between two bursts of the same wave, in milliseconds.
    pub spawn_throttle_ms: u64,
    /// Radius of the disk the area strategies sample in.
    pub spawn_radius: f32,
    /// Minimum distance area spawns try to keep from every player.
    pub min_player_distance: f32,
    /// Container new hostiles are parented under.
    pub container: ContainerId,
}

impl WaveSettings {
    /// Delay between two bursts of the same wave.
    #[must_use]
    pub const fn spawn_throttle(&self) -> Duration {
        Duration::from_millis(self.spawn_throttle_ms)
    }

    /// Geometry used by the area placement strategies.
    #[must_use]
    pub const fn placement_area(&self) -> PlacementArea {
        PlacementArea {
            radius: self.spawn_radius,
            min_player_distance: self.min_player_distance,
        }
    }
}

impl Default for WaveSettings {
    fn default() -> Self {
        Self {
            spawn_throttle_ms: 1_000,
            spawn_radius: 12.0,
            min_player_distance: 4.0,
            container: ContainerId::new(0),
        }
    }
}

/// Prefab names the entity factory instantiates for each category.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyRoster {
    /// Prefab spawned for normal hostiles.
    pub normal: Option<String>,
    /// Prefab spawned for melee hostiles.
    pub melee: Option<String>,
    /// Prefab spawned for slow hostiles.
    pub slow: Option<String>,
    /// Prefab spawned for ranged hostiles.
    pub range: Option<String>,
}

impl EnemyRoster {
    /// Prefab configured for `category`, if any.
    #[must_use]
    pub fn prefab(&self, category: EnemyCategory) -> Option<&str> {
        let prefab = match category {
            EnemyCategory::Normal => &self.normal,
            EnemyCategory::Melee => &self.melee,
            EnemyCategory::Slow => &self.slow,
            EnemyCategory::Range => &self.range,
        };
        prefab.as_deref()
    }

    /// Categories without a configured prefab.
    pub fn missing(&self) -> impl Iterator<Item = EnemyCategory> + '_ {
        EnemyCategory::ALL
            .into_iter()
            .filter(move |category| self.prefab(*category).is_none())
    }
}

/// Handle identifying a wave started by the orchestrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RunningWaveHandle {
    id: WaveRunId,
}

impl RunningWaveHandle {
    /// Identifier carried by every spawn and completion the wave reports.
    #[must_use]
    pub const fn id(&self) -> WaveRunId {
        self.id
    }
}

/// Starts, tracks and cancels wave tasks.
///
/// The orchestrator does not bound how many waves run at once; callers
/// decide when to start more.
#[derive(Debug)]
pub struct WaveOrchestrator {
    settings: WaveSettings,
    roster: EnemyRoster,
    seed: u64,
    next_run: u32,
    waves: Vec<WaveTask>,
}

impl WaveOrchestrator {
    /// Creates an orchestrator whose waves derive their RNG streams from `seed`.
    #[must_use]
    pub fn new(settings: WaveSettings, roster: EnemyRoster, seed: u64) -> Self {
        Self {
            settings,
            roster,
            seed,
            next_run: 0,
            waves: Vec::new(),
        }
    }

    /// Shared configuration injected into every wave.
    #[must_use]
    pub fn settings(&self) -> &WaveSettings {
        &self.settings
    }

    /// Prefab roster consulted by every wave.
    #[must_use]
    pub fn roster(&self) -> &EnemyRoster {
        &self.roster
    }

    /// Starts a wave of `kind` at `difficulty`.
    ///
    /// `reference_points` feeds the fixed and area-around-position
    /// strategies. The wave issues its first burst on the next tick it
    /// observes.
    pub fn start_wave(
        &mut self,
        kind: WaveKind,
        strategy: SpawnStrategy,
        difficulty: u32,
        reference_points: &[Position],
    ) -> RunningWaveHandle {
        let id = WaveRunId::new(self.next_run);
        self.next_run = self.next_run.wrapping_add(1);

        let task = WaveTask::new(
            id,
            kind,
            strategy,
            difficulty,
            reference_points.to_vec(),
            derive_wave_seed(self.seed, id),
        );
        info!(
            wave = id.get(),
            %kind,
            difficulty,
            quota = task.remaining().total(),
            "wave started"
        );
        self.waves.push(task);
        RunningWaveHandle { id }
    }

    /// Cancels every running wave and returns how many were cancelled.
    pub fn end_all_waves(&mut self) -> usize {
        let cancelled = self.waves.len();
        self.waves.clear();
        if cancelled > 0 {
            info!(cancelled, "ended all running waves");
        }
        cancelled
    }

    /// Cancels a single wave. Returns `false` when it was no longer running.
    pub fn cancel(&mut self, handle: RunningWaveHandle) -> bool {
        let before = self.waves.len();
        self.waves.retain(|task| task.id() != handle.id);
        let cancelled = self.waves.len() != before;
        if cancelled {
            info!(wave = handle.id.get(), "wave cancelled");
        }
        cancelled
    }

    /// Number of waves still spawning.
    #[must_use]
    pub fn running_count(&self) -> usize {
        self.waves.len()
    }

    /// Reports whether the wave is still spawning.
    #[must_use]
    pub fn is_running(&self, handle: RunningWaveHandle) -> bool {
        self.waves.iter().any(|task| task.id() == handle.id)
    }

    /// Total quota the wave still has to spawn.
    #[must_use]
    pub fn remaining_quota(&self, handle: RunningWaveHandle) -> Option<u32> {
        self.waves
            .iter()
            .find(|task| task.id() == handle.id)
            .map(|task| task.remaining().total())
    }

    /// Resumes every running wave once per observed tick.
    ///
    /// Emits [`Command::SpawnEnemy`] for each placed spawn and
    /// [`Command::ReportWaveCompleted`] when a wave exhausts its quota.
    pub fn handle(
        &mut self,
        events: &[Event],
        mode: SessionMode,
        players: &[Position],
        out: &mut Vec<Command>,
    ) {
        if mode == SessionMode::Paused || self.waves.is_empty() {
            return;
        }

        let context = SpawnContext {
            settings: &self.settings,
            roster: &self.roster,
            players,
        };

        for event in events {
            let Event::TimeAdvanced { dt } = event else {
                continue;
            };
            self.waves
                .retain_mut(|task| match task.resume(*dt, &context, out) {
                    TaskStatus::Suspended => true,
                    TaskStatus::Completed => {
                        info!(wave = task.id().get(), kind = %task.kind(), "wave completed");
                        out.push(Command::ReportWaveCompleted { wave: task.id() });
                        false
                    }
                });
        }

        debug!(running = self.waves.len(), "waves resumed");
    }
}
