use std::time::Duration;

use encounter_director_core::{
    Command, EnemyCategory, EnemyComposition, Position, SpawnStrategy, WaveKind, WaveRunId,
};
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use crate::{burst_size, composition, resolve_spawn_position, EnemyRoster, WaveSettings};

/// Outcome of resuming a wave task for one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TaskStatus {
    /// The task is waiting for its throttle interval to elapse.
    Suspended,
    /// The task spawned its whole quota.
    Completed,
}

/// Read-only collaborators a wave task consults while spawning.
pub(crate) struct SpawnContext<'a> {
    pub(crate) settings: &'a WaveSettings,
    pub(crate) roster: &'a EnemyRoster,
    pub(crate) players: &'a [Position],
}

/// Cooperative task that spawns one wave's quota in throttled bursts.
#[derive(Debug)]
pub(crate) struct WaveTask {
    id: WaveRunId,
    kind: WaveKind,
    strategy: SpawnStrategy,
    reference_points: Vec<Position>,
    remaining: EnemyComposition,
    burst_size: u32,
    cooldown: Duration,
    rng: ChaCha8Rng,
}

impl WaveTask {
    pub(crate) fn new(
        id: WaveRunId,
        kind: WaveKind,
        strategy: SpawnStrategy,
        difficulty: u32,
        reference_points: Vec<Position>,
        seed: u64,
    ) -> Self {
        Self {
            id,
            kind,
            strategy,
            reference_points,
            remaining: composition(kind, difficulty),
            burst_size: burst_size(difficulty),
            cooldown: Duration::ZERO,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub(crate) fn id(&self) -> WaveRunId {
        self.id
    }

    pub(crate) fn kind(&self) -> WaveKind {
        self.kind
    }

    pub(crate) fn remaining(&self) -> EnemyComposition {
        self.remaining
    }

    /// Advances the task by one tick of `dt`, issuing at most one burst.
    pub(crate) fn resume(
        &mut self,
        dt: Duration,
        context: &SpawnContext<'_>,
        out: &mut Vec<Command>,
    ) -> TaskStatus {
        if !self.cooldown.is_zero() {
            self.cooldown = self.cooldown.saturating_sub(dt);
            if !self.cooldown.is_zero() {
                return TaskStatus::Suspended;
            }
        }

        self.spawn_burst(context, out);

        if self.remaining.is_exhausted() {
            return TaskStatus::Completed;
        }
        self.cooldown = context.settings.spawn_throttle();
        TaskStatus::Suspended
    }

    fn spawn_burst(&mut self, context: &SpawnContext<'_>, out: &mut Vec<Command>) {
        let mut available: Vec<EnemyCategory> = Vec::with_capacity(EnemyCategory::ALL.len());
        for _ in 0..self.burst_size {
            available.clear();
            available.extend(self.remaining.available());
            let Some(&category) = available.choose(&mut self.rng) else {
                return;
            };
            let _ = self.remaining.decrement(category);

            let Some(prefab) = context.roster.prefab(category) else {
                warn!(
                    wave = self.id.get(),
                    %category,
                    "no prefab configured for category; spawn skipped"
                );
                continue;
            };

            let Some(position) = resolve_spawn_position(
                self.strategy,
                &self.reference_points,
                context.players,
                context.settings.placement_area(),
                &mut self.rng,
            ) else {
                warn!(
                    wave = self.id.get(),
                    strategy = ?self.strategy,
                    "no reference point available for spawn placement; spawn skipped"
                );
                continue;
            };

            debug!(
                wave = self.id.get(),
                %category,
                x = position.x,
                y = position.y,
                "spawning enemy"
            );
            out.push(Command::SpawnEnemy {
                category,
                prefab: prefab.to_owned(),
                position,
                container: context.settings.container,
                wave: Some(self.id),
            });
        }
    }
}
