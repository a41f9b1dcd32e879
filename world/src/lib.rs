#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative session state for the encounter director.
//!
//! The world plays the part of every collaborator the director talks to: it
//! is the entity factory that materializes hostiles and loot, the player
//! registry that spawn placement samples from, and the clock that paces wave
//! tasks. It never makes encounter decisions of its own.

use std::time::Duration;

use encounter_director_core::{
    Command, ContainerId, DropCategory, DropId, EnemyCategory, EnemyId, Event, PlayerId,
    Position, SessionMode, WaveRunId,
};

/// Represents the authoritative encounter session state.
#[derive(Debug, Default)]
pub struct World {
    mode: SessionMode,
    elapsed: Duration,
    tick_index: u64,
    players: Vec<Player>,
    enemies: Vec<Enemy>,
    drops: Vec<LootDrop>,
    next_enemy: u32,
    next_drop: u32,
    completed_waves: u32,
}

impl World {
    /// Creates an empty session with no players, hostiles or drops.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn player_index(&self, player: PlayerId) -> Result<usize, usize> {
        self.players
            .binary_search_by_key(&player, |candidate| candidate.id)
    }

    fn enemy_index(&self, enemy: EnemyId) -> Option<usize> {
        self.enemies
            .binary_search_by_key(&enemy, |candidate| candidate.id)
            .ok()
    }

    fn allocate_enemy(&mut self) -> EnemyId {
        let id = EnemyId::new(self.next_enemy);
        self.next_enemy = self.next_enemy.wrapping_add(1);
        id
    }

    fn allocate_drop(&mut self) -> DropId {
        let id = DropId::new(self.next_drop);
        self.next_drop = self.next_drop.wrapping_add(1);
        id
    }
}

#[derive(Clone, Debug)]
struct Player {
    id: PlayerId,
    position: Position,
}

#[derive(Clone, Debug)]
struct Enemy {
    id: EnemyId,
    category: EnemyCategory,
    prefab: String,
    position: Position,
    container: ContainerId,
    wave: Option<WaveRunId>,
}

#[derive(Clone, Debug)]
struct LootDrop {
    id: DropId,
    item: DropCategory,
    position: Position,
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            world.elapsed = world.elapsed.saturating_add(dt);
            out_events.push(Event::TimeAdvanced { dt });
        }
        Command::SetSessionMode { mode } => {
            if world.mode != mode {
                world.mode = mode;
                out_events.push(Event::SessionModeChanged { mode });
            }
        }
        Command::JoinPlayer { player, position } => match world.player_index(player) {
            Ok(index) => world.players[index].position = position,
            Err(index) => {
                world.players.insert(
                    index,
                    Player {
                        id: player,
                        position,
                    },
                );
                out_events.push(Event::PlayerJoined { player, position });
            }
        },
        Command::MovePlayer { player, position } => {
            if let Ok(index) = world.player_index(player) {
                world.players[index].position = position;
            }
        }
        Command::LeavePlayer { player } => {
            if let Ok(index) = world.player_index(player) {
                let _ = world.players.remove(index);
                out_events.push(Event::PlayerLeft { player });
            }
        }
        Command::SpawnEnemy {
            category,
            prefab,
            position,
            container,
            wave,
        } => {
            let enemy = world.allocate_enemy();
            world.enemies.push(Enemy {
                id: enemy,
                category,
                prefab,
                position,
                container,
                wave,
            });
            out_events.push(Event::EnemySpawned {
                enemy,
                category,
                position,
                container,
                wave,
            });
        }
        Command::DespawnEnemy { enemy } => {
            if let Some(index) = world.enemy_index(enemy) {
                let removed = world.enemies.remove(index);
                out_events.push(Event::EnemyDespawned {
                    enemy,
                    wave: removed.wave,
                });
            }
        }
        Command::KillEnemy { enemy } => {
            if let Some(index) = world.enemy_index(enemy) {
                let removed = world.enemies.remove(index);
                out_events.push(Event::EnemyDied {
                    enemy,
                    category: removed.category,
                    position: removed.position,
                    wave: removed.wave,
                });
            }
        }
        Command::SpawnDrop { item, position } => {
            let drop = world.allocate_drop();
            world.drops.push(LootDrop {
                id: drop,
                item,
                position,
            });
            out_events.push(Event::DropSpawned {
                drop,
                item,
                position,
            });
        }
        Command::ReportWaveCompleted { wave } => {
            world.completed_waves = world.completed_waves.saturating_add(1);
            out_events.push(Event::WaveCompleted { wave });
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use super::World;
    use encounter_director_core::{
        ContainerId, DropCategory, DropId, EnemyCategory, EnemyId, PlayerId, Position,
        SessionMode, WaveRunId,
    };

    /// Mode the session is currently in.
    #[must_use]
    pub fn session_mode(world: &World) -> SessionMode {
        world.mode
    }

    /// Total simulated time that elapsed since the session started.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.elapsed
    }

    /// Number of ticks applied since the session started.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Number of waves that reported completion.
    #[must_use]
    pub fn completed_waves(world: &World) -> u32 {
        world.completed_waves
    }

    /// Locations of every active player ordered by player identifier.
    #[must_use]
    pub fn player_positions(world: &World) -> Vec<Position> {
        world.players.iter().map(|player| player.position).collect()
    }

    /// Identifiers of every active player in ascending order.
    #[must_use]
    pub fn player_ids(world: &World) -> Vec<PlayerId> {
        world.players.iter().map(|player| player.id).collect()
    }

    /// Captures a read-only view of the hostiles currently alive.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        let snapshots = world
            .enemies
            .iter()
            .map(|enemy| EnemySnapshot {
                id: enemy.id,
                category: enemy.category,
                prefab: enemy.prefab.clone(),
                position: enemy.position,
                container: enemy.container,
                wave: enemy.wave,
            })
            .collect();
        EnemyView { snapshots }
    }

    /// Captures a read-only view of the loot drops materialized so far.
    #[must_use]
    pub fn drops(world: &World) -> Vec<DropSnapshot> {
        world
            .drops
            .iter()
            .map(|drop| DropSnapshot {
                id: drop.id,
                item: drop.item,
                position: drop.position,
            })
            .collect()
    }

    /// Read-only snapshot describing all hostiles alive in the session.
    #[derive(Clone, Debug, Default)]
    pub struct EnemyView {
        snapshots: Vec<EnemySnapshot>,
    }

    impl EnemyView {
        /// Iterator over the captured snapshots in spawn order.
        pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
            self.snapshots.iter()
        }

        /// Number of hostiles captured by the view.
        #[must_use]
        pub fn len(&self) -> usize {
            self.snapshots.len()
        }

        /// Reports whether the view is empty.
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.snapshots.is_empty()
        }

        /// Consumes the view, yielding the underlying snapshots.
        #[must_use]
        pub fn into_vec(self) -> Vec<EnemySnapshot> {
            self.snapshots
        }
    }

    /// Immutable representation of a single hostile used for queries.
    #[derive(Clone, Debug, PartialEq)]
    pub struct EnemySnapshot {
        /// Handle assigned by the entity factory.
        pub id: EnemyId,
        /// Category of the hostile.
        pub category: EnemyCategory,
        /// Prefab the hostile was created from.
        pub prefab: String,
        /// Location of the hostile.
        pub position: Position,
        /// Container the hostile is parented under.
        pub container: ContainerId,
        /// Wave that spawned the hostile, if any.
        pub wave: Option<WaveRunId>,
    }

    /// Immutable representation of a single loot drop.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct DropSnapshot {
        /// Handle assigned to the drop.
        pub id: DropId,
        /// Category of item dropped.
        pub item: DropCategory,
        /// Location of the drop.
        pub position: Position,
    }
}
