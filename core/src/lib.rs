#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the encounter director.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to deterministically. Systems consume event streams,
//! query immutable snapshots, and respond exclusively with new command batches.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Location on the encounter plane expressed in world units.
pub type Position = glam::Vec2;

/// RNG stream label used by the loot manager.
pub const RNG_STREAM_LOOT: &str = "loot";
/// RNG stream label prefix used by individual wave tasks.
pub const RNG_STREAM_WAVE_PREFIX: &str = "wave:";

/// Derives an independent RNG seed for the stream identified by `label`.
#[must_use]
pub fn derive_labeled_seed(base: u64, label: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(base.to_le_bytes());
    hasher.update(label.as_bytes());
    finalize_seed(hasher)
}

/// Derives the RNG seed of a single wave task.
#[must_use]
pub fn derive_wave_seed(base: u64, wave: WaveRunId) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(base.to_le_bytes());
    hasher.update(RNG_STREAM_WAVE_PREFIX.as_bytes());
    hasher.update(wave.get().to_le_bytes());
    finalize_seed(hasher)
}

fn finalize_seed(hasher: Sha256) -> u64 {
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[0..8]);
    u64::from_le_bytes(bytes)
}

/// Describes whether the session clock currently drives hostile logic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Waves advance and the director dispatches new work.
    #[default]
    Running,
    /// Every wave task and dispatch timer is suspended.
    Paused,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the session clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that the session transition to the provided mode.
    SetSessionMode {
        /// Mode the session should activate.
        mode: SessionMode,
    },
    /// Registers a player at the provided location.
    JoinPlayer {
        /// Identifier chosen by the adapter for the joining player.
        player: PlayerId,
        /// Initial location of the player.
        position: Position,
    },
    /// Moves an already registered player.
    MovePlayer {
        /// Player being moved.
        player: PlayerId,
        /// New location of the player.
        position: Position,
    },
    /// Removes a player from the registry.
    LeavePlayer {
        /// Player leaving the session.
        player: PlayerId,
    },
    /// Requests that the entity factory create a hostile entity.
    SpawnEnemy {
        /// Category of hostile to create.
        category: EnemyCategory,
        /// Prefab resolved from the enemy roster.
        prefab: String,
        /// Location the hostile appears at.
        position: Position,
        /// Container the new entity is parented under.
        container: ContainerId,
        /// Wave that requested the spawn, if any.
        wave: Option<WaveRunId>,
    },
    /// Removes a hostile entity without triggering its death pipeline.
    DespawnEnemy {
        /// Entity to remove.
        enemy: EnemyId,
    },
    /// Kills a hostile entity, triggering its death pipeline.
    KillEnemy {
        /// Entity that died.
        enemy: EnemyId,
    },
    /// Materializes a loot drop.
    SpawnDrop {
        /// Category of item dropped.
        item: DropCategory,
        /// Location the drop appears at.
        position: Position,
    },
    /// Reports that a wave task exhausted its quota.
    ReportWaveCompleted {
        /// Wave that completed.
        wave: WaveRunId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the session clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces that the session entered a new mode.
    SessionModeChanged {
        /// Mode that became active after processing commands.
        mode: SessionMode,
    },
    /// Confirms that a player joined the session.
    PlayerJoined {
        /// Identifier of the joining player.
        player: PlayerId,
        /// Location the player joined at.
        position: Position,
    },
    /// Confirms that a player left the session.
    PlayerLeft {
        /// Identifier of the departing player.
        player: PlayerId,
    },
    /// Confirms that the entity factory created a hostile entity.
    EnemySpawned {
        /// Handle assigned to the new entity.
        enemy: EnemyId,
        /// Category of the new entity.
        category: EnemyCategory,
        /// Location the entity appeared at.
        position: Position,
        /// Container the entity was parented under.
        container: ContainerId,
        /// Wave that requested the spawn, if any.
        wave: Option<WaveRunId>,
    },
    /// Confirms that a hostile entity was removed without dying.
    EnemyDespawned {
        /// Entity that was removed.
        enemy: EnemyId,
        /// Wave that spawned the entity, if any.
        wave: Option<WaveRunId>,
    },
    /// Reports that a hostile entity died.
    EnemyDied {
        /// Entity that died.
        enemy: EnemyId,
        /// Category of the entity.
        category: EnemyCategory,
        /// Location of the entity at the time of death.
        position: Position,
        /// Wave that spawned the entity, if any.
        wave: Option<WaveRunId>,
    },
    /// Confirms that a loot drop was materialized.
    DropSpawned {
        /// Handle assigned to the drop.
        drop: DropId,
        /// Category of item dropped.
        item: DropCategory,
        /// Location of the drop.
        position: Position,
    },
    /// Reports that a wave task exhausted its quota.
    WaveCompleted {
        /// Wave that completed.
        wave: WaveRunId,
    },
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Creates a new identifier with the provided numeric value.
            #[must_use]
            pub const fn new(value: u32) -> Self {
                Self(value)
            }

            /// Retrieves the numeric representation of the identifier.
            #[must_use]
            pub const fn get(&self) -> u32 {
                self.0
            }
        }
    };
}

numeric_id!(
    /// Unique identifier assigned to a player by the adapter.
    PlayerId
);
numeric_id!(
    /// Handle assigned to a hostile entity by the entity factory.
    EnemyId
);
numeric_id!(
    /// Handle assigned to a materialized loot drop.
    DropId
);
numeric_id!(
    /// Identifier of a single running wave task.
    WaveRunId
);
numeric_id!(
    /// Scene container hostile entities are parented under.
    ContainerId
);
numeric_id!(
    /// Index of a loot table inside the loot registry.
    LootTableId
);
numeric_id!(
    /// Identifier of a named weapon that can drop as loot.
    WeaponId
);

/// Categories of hostile entity a wave can request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyCategory {
    /// Baseline hostile.
    Normal,
    /// Close-quarters attacker.
    Melee,
    /// Slow, durable hostile.
    Slow,
    /// Ranged attacker.
    Range,
}

impl EnemyCategory {
    /// Every category in canonical order.
    pub const ALL: [EnemyCategory; 4] = [Self::Normal, Self::Melee, Self::Slow, Self::Range];

    /// Stable lowercase label used in diagnostics and configuration.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Melee => "melee",
            Self::Slow => "slow",
            Self::Range => "range",
        }
    }
}

impl fmt::Display for EnemyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Number of hostiles of each category a wave must emit in total.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnemyComposition {
    normal: u32,
    melee: u32,
    slow: u32,
    range: u32,
}

impl EnemyComposition {
    /// Creates a composition from explicit per-category counts.
    #[must_use]
    pub const fn new(normal: u32, melee: u32, slow: u32, range: u32) -> Self {
        Self {
            normal,
            melee,
            slow,
            range,
        }
    }

    /// Number of hostiles of the provided category.
    #[must_use]
    pub const fn count(&self, category: EnemyCategory) -> u32 {
        match category {
            EnemyCategory::Normal => self.normal,
            EnemyCategory::Melee => self.melee,
            EnemyCategory::Slow => self.slow,
            EnemyCategory::Range => self.range,
        }
    }

    /// Total number of hostiles across every category.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.normal
            .saturating_add(self.melee)
            .saturating_add(self.slow)
            .saturating_add(self.range)
    }

    /// Reports whether every category has been exhausted.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.total() == 0
    }

    /// Categories that still have remaining quota, in canonical order.
    pub fn available(&self) -> impl Iterator<Item = EnemyCategory> + '_ {
        EnemyCategory::ALL
            .into_iter()
            .filter(move |category| self.count(*category) > 0)
    }

    /// Removes one hostile of the provided category.
    ///
    /// Returns `false` when the category was already exhausted.
    pub fn decrement(&mut self, category: EnemyCategory) -> bool {
        let slot = self.slot_mut(category);
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        true
    }

    fn slot_mut(&mut self, category: EnemyCategory) -> &mut u32 {
        match category {
            EnemyCategory::Normal => &mut self.normal,
            EnemyCategory::Melee => &mut self.melee,
            EnemyCategory::Slow => &mut self.slow,
            EnemyCategory::Range => &mut self.range,
        }
    }
}

/// Wave variants, each supplying its own composition curve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveKind {
    /// Balanced mix weighted toward normal hostiles.
    Standard,
    /// Ranged-heavy mix.
    Ranged,
    /// Aggressive melee-heavy mix.
    Aggressive,
    /// Large numbers of slow, durable hostiles.
    Siege,
}

impl fmt::Display for WaveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Standard => "standard",
            Self::Ranged => "ranged",
            Self::Aggressive => "aggressive",
            Self::Siege => "siege",
        };
        f.write_str(label)
    }
}

/// Strategies used to choose where a wave places each spawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnStrategy {
    /// Spawn exactly on one of the supplied reference points.
    Fixed,
    /// Spawn inside a disk around one of the supplied reference points.
    AreaAroundPosition,
    /// Spawn inside a disk around one of the live players.
    #[default]
    AreaAroundPlayers,
}

/// Categories of loot the director can drop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropCategory {
    /// Ammunition pickup.
    Ammo,
    /// Health pickup.
    Health,
    /// Armor pickup.
    Armor,
    /// Currency pickup.
    Currency,
    /// Named weapon, granted at most once per session.
    Weapon(WeaponId),
}

impl DropCategory {
    /// Reports whether the category may only be distributed once per session.
    #[must_use]
    pub const fn is_unique(&self) -> bool {
        matches!(self, Self::Weapon(_))
    }
}

/// Inclusive range of loot drops rolled when a hostile dies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DropRange {
    /// Smallest number of drops.
    pub min: i32,
    /// Largest number of drops.
    pub max: i32,
}

impl DropRange {
    /// Creates a new drop range.
    #[must_use]
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }
}

impl Default for DropRange {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

/// Number of times a phase runs before progression moves on.
///
/// Configuration expresses this as an integer: `-1` repeats forever, `0`
/// skips the phase, and any positive value repeats that many times.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum RepeatCount {
    /// The phase runs the given number of times.
    Finite(u32),
    /// The phase repeats forever.
    Infinite,
}

impl RepeatCount {
    /// Reports whether the phase is skipped entirely.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Finite(0))
    }

    /// Reports whether another run follows after `completed` runs.
    #[must_use]
    pub const fn has_remaining(&self, completed: u32) -> bool {
        match self {
            Self::Finite(limit) => completed < *limit,
            Self::Infinite => true,
        }
    }
}

impl TryFrom<i64> for RepeatCount {
    type Error = InvalidRepeatCount;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Infinite),
            _ => u32::try_from(value)
                .map(Self::Finite)
                .map_err(|_| InvalidRepeatCount(value)),
        }
    }
}

impl From<RepeatCount> for i64 {
    fn from(value: RepeatCount) -> Self {
        match value {
            RepeatCount::Finite(count) => i64::from(count),
            RepeatCount::Infinite => -1,
        }
    }
}

/// Error returned when an integer cannot represent a [`RepeatCount`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidRepeatCount(i64);

impl fmt::Display for InvalidRepeatCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "repeat count {} is invalid; expected -1 (infinite) or a non-negative count",
            self.0
        )
    }
}

impl std::error::Error for InvalidRepeatCount {}
