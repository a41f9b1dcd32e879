#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Session controller for the encounter director.
//!
//! [`Director`] owns the progression state machine, the wave orchestrator and
//! the loot systems for one session. Adapters feed it the events the world
//! broadcast for a tick together with the current player positions; the
//! director answers with spawn, drop and completion commands.

mod config;

use std::{collections::HashMap, time::Duration};

use encounter_director_core::{
    derive_labeled_seed, Command, DropRange, Event, LootTableId, Position, SessionMode,
    SpawnStrategy, WaveKind, WaveRunId, RNG_STREAM_LOOT,
};
use encounter_director_system_loot::{
    LootManager, LootProgression, SessionInventory, UniqueDropLedger,
};
use encounter_director_system_progression::{ProgressionStateMachine, WaveEntry};
use encounter_director_system_waves::{RunningWaveHandle, WaveOrchestrator};
use tracing::{info, warn};

pub use config::{
    ConfigError, ConfigIssue, DirectorConfig, LootSettings, SessionSettings,
    SUPPORTED_CONFIG_VERSION,
};

/// Per-wave settings the director still needs after dispatch.
///
/// A record lives while its wave runs or any hostile it spawned is alive.
#[derive(Clone, Copy, Debug)]
struct WaveRecord {
    drops: Option<DropRange>,
    completion_table: Option<LootTableId>,
    running: bool,
    live_enemies: u32,
}

impl WaveRecord {
    fn is_settled(&self) -> bool {
        !self.running && self.live_enemies == 0
    }
}

/// Explicitly owned session controller.
#[derive(Debug)]
pub struct Director<L = SessionInventory> {
    session: SessionSettings,
    spawn_points: HashMap<String, Vec<Position>>,
    default_loot_table: Option<LootTableId>,
    progression: ProgressionStateMachine,
    orchestrator: WaveOrchestrator,
    loot: LootManager<L>,
    loot_progression: LootProgression,
    waves: HashMap<WaveRunId, WaveRecord>,
    dispatch_cooldown: Duration,
    progression_ended: bool,
}

impl Director<SessionInventory> {
    /// Creates a director that tracks unique drops in a fresh [`SessionInventory`].
    #[must_use]
    pub fn new(config: DirectorConfig) -> Self {
        Self::with_ledger(config, SessionInventory::new())
    }
}

impl<L: UniqueDropLedger> Director<L> {
    /// Creates a director backed by the provided unique-drop ledger.
    ///
    /// Every validation issue is logged as a warning; none of them prevents
    /// the session from running.
    #[must_use]
    pub fn with_ledger(config: DirectorConfig, ledger: L) -> Self {
        for issue in config.validate() {
            warn!(%issue, "encounter configuration issue");
        }

        let DirectorConfig {
            seed,
            session,
            waves,
            roster,
            spawn_points,
            loot,
            progression,
            ..
        } = config;

        let loot_progression = LootProgression::new(loot.milestones.clone());
        let initial_table = loot_progression.active_table().or(loot.default_table);
        let policy = loot.policy();
        let progression = ProgressionStateMachine::new(progression, loot.tables.len());
        let manager = LootManager::with_ledger(
            policy,
            loot.tables,
            initial_table,
            derive_labeled_seed(seed, RNG_STREAM_LOOT),
            ledger,
        );

        Self {
            session,
            spawn_points: spawn_points.into_iter().collect(),
            default_loot_table: loot.default_table,
            progression,
            orchestrator: WaveOrchestrator::new(waves, roster, seed),
            loot: manager,
            loot_progression,
            waves: HashMap::new(),
            dispatch_cooldown: Duration::ZERO,
            progression_ended: false,
        }
    }

    /// Dispatch policy of the session.
    #[must_use]
    pub fn session(&self) -> &SessionSettings {
        &self.session
    }

    /// Wave orchestrator owned by the session.
    #[must_use]
    pub fn orchestrator(&self) -> &WaveOrchestrator {
        &self.orchestrator
    }

    /// Loot manager owned by the session.
    #[must_use]
    pub fn loot(&self) -> &LootManager<L> {
        &self.loot
    }

    /// Progression state machine owned by the session.
    #[must_use]
    pub fn progression(&self) -> &ProgressionStateMachine {
        &self.progression
    }

    /// Number of dispatched waves whose drop range or completion table is
    /// still held.
    #[must_use]
    pub fn tracked_wave_count(&self) -> usize {
        self.waves.len()
    }

    /// Reports whether automatic dispatch stopped because progression ended.
    #[must_use]
    pub fn has_progression_ended(&self) -> bool {
        self.progression_ended
    }

    /// Starts a wave outside the progression.
    pub fn start_wave(
        &mut self,
        kind: WaveKind,
        strategy: SpawnStrategy,
        difficulty: u32,
        reference_points: &[Position],
    ) -> RunningWaveHandle {
        self.orchestrator
            .start_wave(kind, strategy, difficulty, reference_points)
    }

    /// Starts a wave described by a progression entry.
    ///
    /// Resolves the entry's spawn-point set, remembers its drop range and
    /// completion loot table, and ends every running wave first when the
    /// entry interrupts them.
    pub fn start_entry(&mut self, entry: &WaveEntry) -> RunningWaveHandle {
        if entry.interrupt_running {
            let _ = self.end_all_waves();
        }

        let reference_points: &[Position] = match entry.spawn_points.as_deref() {
            Some(set) => match self.spawn_points.get(set) {
                Some(points) => points.as_slice(),
                None => {
                    warn!(set, "wave entry references an unknown spawn-point set");
                    &[]
                }
            },
            None => &[],
        };

        let handle = self.orchestrator.start_wave(
            entry.kind,
            entry.spawn_strategy,
            entry.difficulty,
            reference_points,
        );
        if entry.drops.is_some() || entry.loot_table.is_some() {
            let _ = self.waves.insert(
                handle.id(),
                WaveRecord {
                    drops: entry.drops,
                    completion_table: entry.loot_table,
                    running: true,
                    live_enemies: 0,
                },
            );
        }
        handle
    }

    /// Cancels every running wave and returns how many were cancelled.
    ///
    /// Cancelled waves never complete, so their completion tables are
    /// discarded.
    pub fn end_all_waves(&mut self) -> usize {
        let cancelled = self.orchestrator.end_all_waves();
        self.waves.retain(|_, record| {
            record.running = false;
            record.completion_table = None;
            !record.is_settled()
        });
        cancelled
    }

    /// Pulls the next wave entry from the progression without starting it.
    pub fn try_next_wave_entry(&mut self) -> Option<WaveEntry> {
        self.progression.try_next_wave_entry()
    }

    /// Starts a new session.
    ///
    /// Rewinds the progression and the loot milestones, forgets every unique
    /// drop and ends all running waves.
    pub fn reset_progression(&mut self) {
        let _ = self.end_all_waves();
        self.progression.reset_progression();
        self.progression_ended = false;
        self.dispatch_cooldown = Duration::ZERO;
        self.waves.clear();

        let table = self
            .loot_progression
            .reset_progression_count()
            .or(self.default_loot_table);
        self.loot.update_default_table(table);
        self.loot.reset_session();
    }

    /// Rolls loot at `position`, emitting one [`Command::SpawnDrop`] per drop.
    pub fn request_loot_drop(
        &mut self,
        position: Position,
        min_count: i32,
        max_count: i32,
        override_table: Option<LootTableId>,
        out: &mut Vec<Command>,
    ) -> usize {
        self.loot
            .request_drop(position, min_count, max_count, override_table, out)
    }

    /// Replaces the loot table used when a drop request names none.
    pub fn update_default_loot_table(&mut self, table: Option<LootTableId>) {
        self.loot.update_default_table(table);
    }

    /// Consumes world events for one tick.
    ///
    /// Kills roll loot, completed waves advance the loot milestones, and
    /// ticks dispatch new waves and resume the running ones.
    pub fn handle(
        &mut self,
        events: &[Event],
        mode: SessionMode,
        players: &[Position],
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::EnemySpawned { wave: Some(wave), .. } => {
                    if let Some(record) = self.waves.get_mut(wave) {
                        record.live_enemies = record.live_enemies.saturating_add(1);
                    }
                }
                Event::EnemyDied { position, wave, .. } => {
                    let drops = wave
                        .and_then(|wave| self.waves.get(&wave))
                        .and_then(|record| record.drops)
                        .unwrap_or(self.session.default_drops);
                    let _ = self.loot.request_drop(*position, drops.min, drops.max, None, out);
                    if let Some(wave) = wave {
                        self.release_enemy(*wave);
                    }
                }
                Event::EnemyDespawned { wave: Some(wave), .. } => self.release_enemy(*wave),
                Event::WaveCompleted { wave } => self.on_wave_completed(*wave),
                Event::TimeAdvanced { dt } => {
                    if mode == SessionMode::Running && self.session.auto_dispatch {
                        self.dispatch(*dt);
                    }
                }
                _ => {}
            }
        }

        self.orchestrator.handle(events, mode, players, out);
    }

    fn on_wave_completed(&mut self, wave: WaveRunId) {
        if let Some(table) = self.loot_progression.on_wave_completed() {
            self.loot.update_default_table(Some(table));
        }

        let Some(record) = self.waves.get_mut(&wave) else {
            return;
        };
        record.running = false;
        if let Some(table) = record.completion_table.take() {
            self.loot.update_default_table(Some(table));
        }
        self.forget_if_settled(wave);
    }

    fn release_enemy(&mut self, wave: WaveRunId) {
        if let Some(record) = self.waves.get_mut(&wave) {
            record.live_enemies = record.live_enemies.saturating_sub(1);
            self.forget_if_settled(wave);
        }
    }

    fn forget_if_settled(&mut self, wave: WaveRunId) {
        if self.waves.get(&wave).is_some_and(WaveRecord::is_settled) {
            let _ = self.waves.remove(&wave);
        }
    }

    fn dispatch(&mut self, dt: Duration) {
        if self.progression_ended {
            return;
        }

        self.dispatch_cooldown = self.dispatch_cooldown.saturating_sub(dt);
        if !self.dispatch_cooldown.is_zero()
            || self.orchestrator.running_count() >= self.session.max_concurrent_waves
        {
            return;
        }

        let Some(entry) = self.progression.try_next_wave_entry() else {
            self.progression_ended = true;
            info!("progression exhausted; automatic dispatch stopped");
            return;
        };
        let handle = self.start_entry(&entry);
        info!(
            wave = handle.id().get(),
            phase = entry.phase_index,
            repeat = entry.phase_repeat,
            difficulty = entry.difficulty,
            "dispatched wave entry"
        );
        self.dispatch_cooldown = Duration::from_millis(self.session.inter_wave_delay_ms);
    }
}
