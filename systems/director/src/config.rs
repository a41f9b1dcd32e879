use std::collections::BTreeMap;

use encounter_director_core::{DropRange, EnemyCategory, LootTableId, Position, SpawnStrategy};
use encounter_director_system_loot::{LootConfig, LootMilestone, LootTable};
use encounter_director_system_progression::{ProgressionConfig, NO_LOOT_TABLE_CHANGE};
use encounter_director_system_waves::{EnemyRoster, WaveSettings};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration format version understood by [`DirectorConfig::from_toml_str`].
pub const SUPPORTED_CONFIG_VERSION: u32 = 1;

/// Failure to load an encounter configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid TOML or does not match the schema.
    #[error("failed to parse encounter configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// The document declares a format version this build cannot read.
    #[error("unsupported encounter configuration version {found}; expected {expected}")]
    UnsupportedVersion {
        /// Version declared by the document.
        found: u32,
        /// Version this build reads.
        expected: u32,
    },
}

/// Problem found while validating a parsed configuration.
///
/// None of these stop a session; the affected operation degrades to spawning
/// or dropping less than intended.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigIssue {
    /// The progression has no phases, so no wave will ever be dispatched.
    #[error("progression has no phases")]
    EmptyProgression,
    /// Every phase is skipped or empty while the phase list loops.
    #[error("phase list loops but no phase can produce a wave")]
    LoopWithoutWaves,
    /// A phase that runs has no wave entries.
    #[error("phase `{phase}` runs but has no wave entries")]
    EmptyPhase {
        /// Name of the phase.
        phase: String,
    },
    /// A wave entry names a loot table that is not registered.
    #[error(
        "phase `{phase}` wave {wave} references loot table {index}, \
         but only {registered} are registered"
    )]
    LootTableOutOfRange {
        /// Name of the phase.
        phase: String,
        /// Position of the entry within the phase.
        wave: usize,
        /// Index the entry references.
        index: i32,
        /// Number of registered loot tables.
        registered: usize,
    },
    /// A wave entry names a spawn-point set that does not exist.
    #[error("phase `{phase}` wave {wave} references unknown spawn-point set `{set}`")]
    UnknownSpawnPointSet {
        /// Name of the phase.
        phase: String,
        /// Position of the entry within the phase.
        wave: usize,
        /// Name of the missing set.
        set: String,
    },
    /// A wave entry uses a point-based strategy without naming a spawn-point set.
    #[error("phase `{phase}` wave {wave} uses {strategy:?} placement without spawn points")]
    MissingSpawnPoints {
        /// Name of the phase.
        phase: String,
        /// Position of the entry within the phase.
        wave: usize,
        /// Strategy that needs reference points.
        strategy: SpawnStrategy,
    },
    /// A spawn-point set contains no points.
    #[error("spawn-point set `{set}` is empty")]
    EmptySpawnPointSet {
        /// Name of the set.
        set: String,
    },
    /// No prefab is configured for a category; its spawns are skipped.
    #[error("no prefab configured for {category} hostiles")]
    MissingPrefab {
        /// Category without a prefab.
        category: EnemyCategory,
    },
    /// A loot table has rows but no positive weight.
    #[error("loot table `{table}` has entries but no positive weight")]
    ZeroWeightTable {
        /// Name of the table.
        table: String,
    },
    /// A loot row has no item or a non-positive weight.
    #[error("loot table `{table}` entry {entry} has no item or a non-positive weight")]
    MalformedLootEntry {
        /// Name of the table.
        table: String,
        /// Position of the row within the table.
        entry: usize,
    },
    /// The default table or a milestone names an unregistered loot table.
    #[error("{context} references unknown loot table {table}")]
    UnknownLootTable {
        /// Setting holding the reference.
        context: String,
        /// Identifier that is not registered.
        table: u32,
    },
    /// A drop range has its bounds swapped; it never drops anything.
    #[error("{context} drop range is inverted ({min} > {max})")]
    InvertedDropRange {
        /// Setting holding the range.
        context: String,
        /// Lower bound.
        min: i32,
        /// Upper bound.
        max: i32,
    },
    /// The overall drop chance lies outside `[0, 1]`.
    #[error("loot drop chance {value} lies outside [0, 1]")]
    DropChanceOutOfRange {
        /// Configured chance.
        value: f32,
    },
    /// The director may never run a wave at once.
    #[error("max_concurrent_waves is zero; automatic dispatch never starts a wave")]
    NoConcurrentWaves,
}

/// Session-level dispatch policy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Automatic dispatch keeps at most this many waves running.
    pub max_concurrent_waves: usize,
    /// Delay between two automatic dispatches, in milliseconds.
    pub inter_wave_delay_ms: u64,
    /// Pulls wave entries from the progression on every tick.
    pub auto_dispatch: bool,
    /// Drops rolled per kill when the owning wave does not override them.
    pub default_drops: DropRange,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_concurrent_waves: 1,
            inter_wave_delay_ms: 2_000,
            auto_dispatch: true,
            default_drops: DropRange::default(),
        }
    }
}

/// Loot policy, tables and milestones.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LootSettings {
    /// Probability in `[0, 1]` that a kill drops anything.
    pub drop_chance: f32,
    /// Radius drops are scattered in around the kill.
    pub scatter_radius: f32,
    /// Table active before any milestone applies.
    pub default_table: Option<LootTableId>,
    /// Registered tables, addressed by position.
    pub tables: Vec<LootTable>,
    /// Completed-wave thresholds that switch the default table.
    pub milestones: Vec<LootMilestone>,
}

impl LootSettings {
    /// Policy knobs handed to the loot manager.
    #[must_use]
    pub fn policy(&self) -> LootConfig {
        LootConfig {
            drop_chance: self.drop_chance,
            scatter_radius: self.scatter_radius,
        }
    }
}

impl Default for LootSettings {
    fn default() -> Self {
        let policy = LootConfig::default();
        Self {
            drop_chance: policy.drop_chance,
            scatter_radius: policy.scatter_radius,
            default_table: None,
            tables: Vec::new(),
            milestones: Vec::new(),
        }
    }
}

/// Complete configuration of an encounter director session.
///
/// Every section is optional except `version`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DirectorConfig {
    /// Format version of the document.
    pub version: u32,
    /// Session seed every RNG stream derives from.
    #[serde(default)]
    pub seed: u64,
    /// Dispatch policy.
    #[serde(default)]
    pub session: SessionSettings,
    /// Settings injected into every wave.
    #[serde(default)]
    pub waves: WaveSettings,
    /// Prefab per hostile category.
    #[serde(default)]
    pub roster: EnemyRoster,
    /// Named sets of reference points for point-based placement.
    #[serde(default)]
    pub spawn_points: BTreeMap<String, Vec<Position>>,
    /// Loot policy and tables.
    #[serde(default)]
    pub loot: LootSettings,
    /// Campaign phases.
    #[serde(default)]
    pub progression: ProgressionConfig,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            version: SUPPORTED_CONFIG_VERSION,
            seed: 0,
            session: SessionSettings::default(),
            waves: WaveSettings::default(),
            roster: EnemyRoster::default(),
            spawn_points: BTreeMap::new(),
            loot: LootSettings::default(),
            progression: ProgressionConfig::default(),
        }
    }
}

impl DirectorConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        if config.version != SUPPORTED_CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: config.version,
                expected: SUPPORTED_CONFIG_VERSION,
            });
        }
        Ok(config)
    }

    /// Lists every problem that would degrade a session run with this configuration.
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        self.validate_session(&mut issues);
        self.validate_loot(&mut issues);
        self.validate_progression(&mut issues);
        issues
    }

    fn validate_session(&self, issues: &mut Vec<ConfigIssue>) {
        if self.session.max_concurrent_waves == 0 {
            issues.push(ConfigIssue::NoConcurrentWaves);
        }
        check_drop_range(issues, "session default", self.session.default_drops);
        issues.extend(
            self.roster
                .missing()
                .map(|category| ConfigIssue::MissingPrefab { category }),
        );
        for (set, points) in &self.spawn_points {
            if points.is_empty() {
                issues.push(ConfigIssue::EmptySpawnPointSet { set: set.clone() });
            }
        }
    }

    fn validate_loot(&self, issues: &mut Vec<ConfigIssue>) {
        let loot = &self.loot;
        if !(0.0..=1.0).contains(&loot.drop_chance) {
            issues.push(ConfigIssue::DropChanceOutOfRange {
                value: loot.drop_chance,
            });
        }

        for table in &loot.tables {
            issues.extend(
                table
                    .malformed_entries()
                    .map(|entry| ConfigIssue::MalformedLootEntry {
                        table: table.name().to_owned(),
                        entry,
                    }),
            );
            if !table.entries().is_empty() && table.total_weight() <= 0 {
                issues.push(ConfigIssue::ZeroWeightTable {
                    table: table.name().to_owned(),
                });
            }
        }

        let registered = loot.tables.len();
        let is_known = |table: LootTableId| {
            usize::try_from(table.get()).map_or(false, |index| index < registered)
        };
        if let Some(table) = loot.default_table.filter(|table| !is_known(*table)) {
            issues.push(ConfigIssue::UnknownLootTable {
                context: "default loot table".to_owned(),
                table: table.get(),
            });
        }
        for milestone in loot.milestones.iter().filter(|m| !is_known(m.table)) {
            issues.push(ConfigIssue::UnknownLootTable {
                context: format!("loot milestone after wave {}", milestone.after_wave),
                table: milestone.table.get(),
            });
        }
    }

    fn validate_progression(&self, issues: &mut Vec<ConfigIssue>) {
        let progression = &self.progression;
        if progression.phases.is_empty() {
            issues.push(ConfigIssue::EmptyProgression);
            return;
        }

        let registered = self.loot.tables.len();
        let mut playable = false;
        for phase in &progression.phases {
            if phase.repeat.is_skipped() {
                continue;
            }
            if phase.waves.is_empty() {
                issues.push(ConfigIssue::EmptyPhase {
                    phase: phase.name.clone(),
                });
                continue;
            }
            playable = true;

            for (wave, entry) in phase.waves.iter().enumerate() {
                let index = entry.loot_table_after_completion;
                let in_range = usize::try_from(index).map_or(false, |index| index < registered);
                if index != NO_LOOT_TABLE_CHANGE && !in_range {
                    issues.push(ConfigIssue::LootTableOutOfRange {
                        phase: phase.name.clone(),
                        wave,
                        index,
                        registered,
                    });
                }

                match (&entry.spawn_points, entry.spawn_strategy) {
                    (Some(set), _) if !self.spawn_points.contains_key(set) => {
                        issues.push(ConfigIssue::UnknownSpawnPointSet {
                            phase: phase.name.clone(),
                            wave,
                            set: set.clone(),
                        });
                    }
                    (None, SpawnStrategy::Fixed | SpawnStrategy::AreaAroundPosition) => {
                        issues.push(ConfigIssue::MissingSpawnPoints {
                            phase: phase.name.clone(),
                            wave,
                            strategy: entry.spawn_strategy,
                        });
                    }
                    _ => {}
                }

                if let Some(drops) = entry.drops {
                    check_drop_range(
                        issues,
                        &format!("phase `{}` wave {wave}", phase.name),
                        drops,
                    );
                }
            }
        }

        if progression.loop_all_phases && !playable {
            issues.push(ConfigIssue::LoopWithoutWaves);
        }
    }
}

fn check_drop_range(issues: &mut Vec<ConfigIssue>, context: &str, range: DropRange) {
    if range.min > range.max {
        issues.push(ConfigIssue::InvertedDropRange {
            context: context.to_owned(),
            min: range.min,
            max: range.max,
        });
    }
}
