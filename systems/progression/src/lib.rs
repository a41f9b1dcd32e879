#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Campaign progression state machine.
//!
//! Walks an ordered list of phases, each an ordered list of wave entries,
//! tracking how many times the current phase has repeated along with the
//! per-phase and global difficulty amplifiers. Every call to
//! [`ProgressionStateMachine::try_next_wave_entry`] is a pure function of the
//! progression state and the static configuration.

use encounter_director_core::{DropRange, LootTableId, RepeatCount, SpawnStrategy, WaveKind};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Loot table index meaning "leave the default table unchanged".
pub const NO_LOOT_TABLE_CHANGE: i32 = -1;

const fn no_loot_table_change() -> i32 {
    NO_LOOT_TABLE_CHANGE
}

const fn single_run() -> RepeatCount {
    RepeatCount::Finite(1)
}

/// Static description of a single wave inside a phase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveEntryConfig {
    /// Wave variant to run.
    pub wave: WaveKind,
    /// Difficulty before amplifiers are applied.
    #[serde(default)]
    pub base_difficulty: i32,
    /// Loot table activated once the wave completes, or `-1` for no change.
    #[serde(default = "no_loot_table_change")]
    pub loot_table_after_completion: i32,
    /// Placement strategy used for every spawn of the wave.
    #[serde(default)]
    pub spawn_strategy: SpawnStrategy,
    /// Named spawn-point set used by the fixed and area-around-position strategies.
    #[serde(default)]
    pub spawn_points: Option<String>,
    /// Drops rolled per kill, overriding the session default.
    #[serde(default)]
    pub drops: Option<DropRange>,
    /// Ends every running wave before this one starts.
    #[serde(default)]
    pub interrupt_running: bool,
}

impl WaveEntryConfig {
    /// Creates an entry with default placement and no loot change.
    #[must_use]
    pub fn new(wave: WaveKind, base_difficulty: i32) -> Self {
        Self {
            wave,
            base_difficulty,
            loot_table_after_completion: NO_LOOT_TABLE_CHANGE,
            spawn_strategy: SpawnStrategy::default(),
            spawn_points: None,
            drops: None,
            interrupt_running: false,
        }
    }
}

/// Ordered group of wave entries that may repeat.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDefinition {
    /// Name used in diagnostics.
    pub name: String,
    /// Wave entries run in order on every repeat.
    #[serde(default)]
    pub waves: Vec<WaveEntryConfig>,
    /// Number of runs; `0` skips the phase and `-1` repeats it forever.
    #[serde(default = "single_run")]
    pub repeat: RepeatCount,
    /// Raises the phase amplifier by one before every further repeat.
    #[serde(default)]
    pub increment_difficulty_on_repeat: bool,
    /// Cap applied to the phase amplifier.
    #[serde(default)]
    pub max_difficulty_amplifier: u32,
    /// Zeroes the phase amplifier when progression enters the phase.
    #[serde(default)]
    pub reset_amplifier_on_phase_start: bool,
}

impl PhaseDefinition {
    /// Creates a phase that runs the provided entries `repeat` times.
    #[must_use]
    pub fn new(name: impl Into<String>, waves: Vec<WaveEntryConfig>, repeat: RepeatCount) -> Self {
        Self {
            name: name.into(),
            waves,
            repeat,
            increment_difficulty_on_repeat: false,
            max_difficulty_amplifier: 0,
            reset_amplifier_on_phase_start: false,
        }
    }
}

/// Static configuration of the whole campaign.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    /// Phases in the order they are visited.
    pub phases: Vec<PhaseDefinition>,
    /// Wraps back to the first phase after the last one instead of ending.
    pub loop_all_phases: bool,
    /// Raises the global amplifier by one every time the phase list wraps.
    pub increment_difficulty_on_global_loop: bool,
    /// Optional cap applied to the global amplifier.
    pub max_global_difficulty_amplifier: Option<u32>,
}

/// Wave entry resolved at dispatch time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WaveEntry {
    /// Wave variant to run.
    pub kind: WaveKind,
    /// Final difficulty including every amplifier.
    pub difficulty: u32,
    /// Loot table to activate once the wave completes.
    pub loot_table: Option<LootTableId>,
    /// Placement strategy used for every spawn of the wave.
    pub spawn_strategy: SpawnStrategy,
    /// Named spawn-point set used by the wave.
    pub spawn_points: Option<String>,
    /// Drops rolled per kill, overriding the session default.
    pub drops: Option<DropRange>,
    /// Ends every running wave before this one starts.
    pub interrupt_running: bool,
    /// Index of the phase the entry came from.
    pub phase_index: usize,
    /// Repeat of the phase the entry belongs to.
    pub phase_repeat: u32,
    /// Position of the entry within its phase.
    pub wave_index: usize,
}

/// Mutable cursor of the progression state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ProgressionState {
    /// Phase currently being walked.
    pub current_phase_index: usize,
    /// Completed runs of the current phase.
    pub current_phase_repeat_counter: u32,
    /// Next wave entry within the current phase.
    pub current_wave_index_in_phase: usize,
    /// Amplifier accumulated by repeating the current phase.
    pub current_phase_difficulty_amplifier: u32,
    /// Amplifier accumulated by looping the whole phase list.
    pub global_loop_difficulty_amplifier: u32,
}

/// Top-level driver handing out wave entries one at a time.
#[derive(Clone, Debug)]
pub struct ProgressionStateMachine {
    config: ProgressionConfig,
    loot_table_count: usize,
    state: ProgressionState,
    ended: bool,
}

impl ProgressionStateMachine {
    /// Creates a state machine positioned at the start of the first phase.
    ///
    /// `loot_table_count` is the number of registered loot tables and bounds
    /// the loot indices wave entries may reference.
    #[must_use]
    pub fn new(config: ProgressionConfig, loot_table_count: usize) -> Self {
        if config.phases.is_empty() {
            warn!("progression configured without phases; no waves will be dispatched");
        }
        Self {
            config,
            loot_table_count,
            state: ProgressionState::default(),
            ended: false,
        }
    }

    /// Static configuration the machine walks.
    #[must_use]
    pub fn config(&self) -> &ProgressionConfig {
        &self.config
    }

    /// Snapshot of the progression cursor.
    #[must_use]
    pub fn state(&self) -> ProgressionState {
        self.state
    }

    /// Reports whether progression has permanently ended.
    #[must_use]
    pub fn has_ended(&self) -> bool {
        self.ended
    }

    /// Returns every counter to its initial value.
    pub fn reset_progression(&mut self) {
        self.state = ProgressionState::default();
        self.ended = false;
        info!("progression reset");
    }

    /// Produces the next wave entry, traversing as many phase and repeat
    /// boundaries as needed.
    ///
    /// Returns `None` once progression has ended; callers must stop
    /// requesting waves until [`Self::reset_progression`] is called.
    pub fn try_next_wave_entry(&mut self) -> Option<WaveEntry> {
        if self.ended {
            return None;
        }
        if self.config.phases.is_empty() {
            return self.end("no phases configured");
        }

        let mut wrapped_without_wave = false;
        loop {
            let phase_count = self.config.phases.len();
            if self.state.current_phase_index >= phase_count {
                if !self.config.loop_all_phases {
                    return self.end("last phase completed");
                }
                if wrapped_without_wave {
                    warn!("no phase can produce a wave; progression cannot continue");
                    return self.end("looping phases produce no waves");
                }
                wrapped_without_wave = true;
                self.wrap_global_loop();
                continue;
            }

            let phase = &self.config.phases[self.state.current_phase_index];
            if phase.repeat.is_skipped()
                || !phase.repeat.has_remaining(self.state.current_phase_repeat_counter)
            {
                self.enter_phase(self.state.current_phase_index + 1);
                continue;
            }

            if phase.waves.is_empty() && phase.repeat == RepeatCount::Infinite {
                warn!(
                    phase = %phase.name,
                    "phase repeats forever without wave entries; skipping it"
                );
                self.enter_phase(self.state.current_phase_index + 1);
                continue;
            }

            if self.state.current_wave_index_in_phase >= phase.waves.len() {
                self.complete_phase_repeat();
                continue;
            }

            let entry = self.resolve_entry();
            self.state.current_wave_index_in_phase += 1;
            return Some(entry);
        }
    }

    fn resolve_entry(&self) -> WaveEntry {
        let phase = &self.config.phases[self.state.current_phase_index];
        let config = &phase.waves[self.state.current_wave_index_in_phase];
        let difficulty = i64::from(config.base_difficulty)
            + i64::from(self.state.current_phase_difficulty_amplifier)
            + i64::from(self.state.global_loop_difficulty_amplifier);
        let difficulty = u32::try_from(difficulty.max(0)).unwrap_or(u32::MAX);

        WaveEntry {
            kind: config.wave,
            difficulty,
            loot_table: self.resolve_loot_table(&phase.name, config.loot_table_after_completion),
            spawn_strategy: config.spawn_strategy,
            spawn_points: config.spawn_points.clone(),
            drops: config.drops,
            interrupt_running: config.interrupt_running,
            phase_index: self.state.current_phase_index,
            phase_repeat: self.state.current_phase_repeat_counter,
            wave_index: self.state.current_wave_index_in_phase,
        }
    }

    fn resolve_loot_table(&self, phase: &str, index: i32) -> Option<LootTableId> {
        if index == NO_LOOT_TABLE_CHANGE {
            return None;
        }
        match usize::try_from(index) {
            Ok(position) if position < self.loot_table_count => {
                u32::try_from(position).ok().map(LootTableId::new)
            }
            _ => {
                warn!(
                    phase,
                    index,
                    registered = self.loot_table_count,
                    "wave entry references an unknown loot table"
                );
                None
            }
        }
    }

    fn complete_phase_repeat(&mut self) {
        let phase = &self.config.phases[self.state.current_phase_index];
        self.state.current_phase_repeat_counter =
            self.state.current_phase_repeat_counter.saturating_add(1);
        self.state.current_wave_index_in_phase = 0;

        if phase
            .repeat
            .has_remaining(self.state.current_phase_repeat_counter)
            && phase.increment_difficulty_on_repeat
        {
            self.state.current_phase_difficulty_amplifier = self
                .state
                .current_phase_difficulty_amplifier
                .saturating_add(1)
                .min(phase.max_difficulty_amplifier);
        }
    }

    fn enter_phase(&mut self, index: usize) {
        self.state.current_phase_index = index;
        self.state.current_phase_repeat_counter = 0;
        self.state.current_wave_index_in_phase = 0;

        if let Some(phase) = self.config.phases.get(index) {
            if phase.reset_amplifier_on_phase_start {
                self.state.current_phase_difficulty_amplifier = 0;
            }
            if !phase.repeat.is_skipped() {
                info!(phase = %phase.name, index, "entering phase");
            }
        }
    }

    fn wrap_global_loop(&mut self) {
        self.state.current_phase_index = 0;
        self.state.current_phase_repeat_counter = 0;
        self.state.current_wave_index_in_phase = 0;
        self.state.current_phase_difficulty_amplifier = 0;

        if self.config.increment_difficulty_on_global_loop {
            let raised = self.state.global_loop_difficulty_amplifier.saturating_add(1);
            self.state.global_loop_difficulty_amplifier = match self
                .config
                .max_global_difficulty_amplifier
            {
                Some(cap) => raised.min(cap),
                None => raised,
            };
        }
        info!(
            global_amplifier = self.state.global_loop_difficulty_amplifier,
            "phase list looped"
        );
    }

    fn end(&mut self, reason: &'static str) -> Option<WaveEntry> {
        self.ended = true;
        self.state.current_phase_index = self.config.phases.len();
        info!(reason, "progression ended");
        None
    }
}
