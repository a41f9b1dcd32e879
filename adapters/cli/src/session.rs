use std::{f32::consts::TAU, fmt, time::Duration};

use encounter_director_core::{Command, Event, PlayerId, Position, SessionMode};
use encounter_director_system_director::{Director, DirectorConfig};
use encounter_director_world::{self as world, query, World};
use tracing::{debug, info};

const PLAYER_RING_RADIUS: f32 = 8.0;
const PLAYER_ORBIT_STEP: f32 = 0.05;
const PLAYER_MOVE_INTERVAL: u32 = 10;

/// Scripted inputs driving a headless session.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SessionOptions {
    pub(crate) tick: Duration,
    pub(crate) ticks: u32,
    pub(crate) players: u32,
    pub(crate) kill_every: u32,
    pub(crate) reset_at: Option<u32>,
    pub(crate) pause_at: Option<u32>,
    pub(crate) resume_at: Option<u32>,
}

/// Totals observed over a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct SessionSummary {
    pub(crate) elapsed: Duration,
    pub(crate) enemies_spawned: u32,
    pub(crate) enemies_killed: u32,
    pub(crate) enemies_alive: usize,
    pub(crate) drops: u32,
    pub(crate) waves_completed: u32,
    pub(crate) resets: u32,
    pub(crate) progression_ended: bool,
}

impl SessionSummary {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::EnemySpawned { .. } => self.enemies_spawned += 1,
                Event::EnemyDied { .. } => self.enemies_killed += 1,
                Event::DropSpawned { .. } => self.drops += 1,
                Event::WaveCompleted { .. } => self.waves_completed += 1,
                _ => {}
            }
        }
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "simulated:        {:.1}s", self.elapsed.as_secs_f32())?;
        writeln!(f, "enemies spawned:  {}", self.enemies_spawned)?;
        writeln!(f, "enemies killed:   {}", self.enemies_killed)?;
        writeln!(f, "enemies alive:    {}", self.enemies_alive)?;
        writeln!(f, "loot drops:       {}", self.drops)?;
        writeln!(f, "waves completed:  {}", self.waves_completed)?;
        writeln!(f, "resets:           {}", self.resets)?;
        write!(
            f,
            "progression:      {}",
            if self.progression_ended {
                "ended"
            } else {
                "running"
            }
        )
    }
}

/// Runs a scripted session against the reference world.
pub(crate) fn run(config: DirectorConfig, options: SessionOptions) -> SessionSummary {
    let mut world = World::new();
    let mut director = Director::new(config);
    let mut summary = SessionSummary::default();

    let mut events = Vec::new();
    for index in 0..options.players {
        world::apply(
            &mut world,
            Command::JoinPlayer {
                player: PlayerId::new(index),
                position: ring_position(index, options.players, 0.0),
            },
            &mut events,
        );
    }
    pump(&mut world, &mut director, events, &mut summary);

    for step in 1..=options.ticks {
        if options.reset_at == Some(step) {
            info!(tick = step, "resetting progression");
            director.reset_progression();
            despawn_all(&mut world, &mut director, &mut summary);
            summary.resets += 1;
        }

        let mut events = Vec::new();
        if options.pause_at == Some(step) {
            world::apply(
                &mut world,
                Command::SetSessionMode {
                    mode: SessionMode::Paused,
                },
                &mut events,
            );
        }
        if options.resume_at == Some(step) {
            world::apply(
                &mut world,
                Command::SetSessionMode {
                    mode: SessionMode::Running,
                },
                &mut events,
            );
        }
        world::apply(&mut world, Command::Tick { dt: options.tick }, &mut events);

        if step % PLAYER_MOVE_INTERVAL == 0 {
            let phase = PLAYER_ORBIT_STEP * (step / PLAYER_MOVE_INTERVAL) as f32;
            for player in query::player_ids(&world) {
                world::apply(
                    &mut world,
                    Command::MovePlayer {
                        player,
                        position: ring_position(player.get(), options.players, phase),
                    },
                    &mut events,
                );
            }
        }

        if options.kill_every > 0 && step % options.kill_every == 0 {
            if let Some(enemy) = query::enemy_view(&world).iter().next() {
                debug!(enemy = enemy.id.get(), "scripted kill");
                world::apply(&mut world, Command::KillEnemy { enemy: enemy.id }, &mut events);
            }
        }

        pump(&mut world, &mut director, events, &mut summary);
    }

    summary.elapsed = query::elapsed(&world);
    summary.enemies_alive = query::enemy_view(&world).len();
    summary.progression_ended = director.has_progression_ended();
    summary
}

fn pump(
    world: &mut World,
    director: &mut Director,
    mut events: Vec<Event>,
    summary: &mut SessionSummary,
) {
    while !events.is_empty() {
        summary.record(&events);
        let players = query::player_positions(world);
        let mut commands = Vec::new();
        director.handle(&events, query::session_mode(world), &players, &mut commands);

        events.clear();
        for command in commands {
            world::apply(world, command, &mut events);
        }
    }
}

fn despawn_all(world: &mut World, director: &mut Director, summary: &mut SessionSummary) {
    let mut events = Vec::new();
    for enemy in query::enemy_view(world).into_vec() {
        world::apply(world, Command::DespawnEnemy { enemy: enemy.id }, &mut events);
    }
    pump(world, director, events, summary);
}

fn ring_position(index: u32, count: u32, phase: f32) -> Position {
    let angle = phase + TAU * index as f32 / count.max(1) as f32;
    Position::new(angle.cos(), angle.sin()) * PLAYER_RING_RADIUS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundled() -> DirectorConfig {
        DirectorConfig::from_toml_str(include_str!("../../../config/encounter.toml"))
            .expect("bundled config parses")
    }

    fn options() -> SessionOptions {
        SessionOptions {
            tick: Duration::from_millis(100),
            ticks: 1_500,
            players: 3,
            kill_every: 4,
            reset_at: None,
            pause_at: None,
            resume_at: None,
        }
    }

    #[test]
    fn scripted_session_is_deterministic() {
        let first = run(bundled(), options());
        let second = run(bundled(), options());

        assert_eq!(first, second);
        assert!(first.enemies_spawned > 0);
        assert!(first.enemies_killed > 0);
        assert!(first.waves_completed > 0);
        assert_eq!(first.elapsed, Duration::from_millis(150_000));
    }

    #[test]
    fn reset_clears_the_field() {
        let summary = run(
            bundled(),
            SessionOptions {
                reset_at: Some(600),
                ..options()
            },
        );

        assert_eq!(summary.resets, 1);
        assert!(summary.enemies_spawned > 0);
    }

    #[test]
    fn pausing_freezes_spawns() {
        let paused = SessionOptions {
            ticks: 300,
            kill_every: 0,
            pause_at: Some(1),
            ..options()
        };
        let summary = run(bundled(), paused);
        assert_eq!(summary.enemies_spawned, 0);

        let resumed = run(
            bundled(),
            SessionOptions {
                resume_at: Some(200),
                ..paused
            },
        );
        assert!(resumed.enemies_spawned > 0);
    }

    #[test]
    fn players_sit_on_a_ring() {
        let position = ring_position(1, 4, 0.0);
        assert!((position.length() - PLAYER_RING_RADIUS).abs() < 1e-4);
        assert!(position.x.abs() < 1e-4);
    }
}
