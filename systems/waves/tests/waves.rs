use std::time::Duration;

use encounter_director_core::{
    Command, ContainerId, EnemyCategory, Event, PlayerId, Position, SessionMode, SpawnStrategy,
    WaveKind, WaveRunId,
};
use encounter_director_system_waves::{composition, EnemyRoster, WaveOrchestrator, WaveSettings};
use encounter_director_world::{self as world, query, World};

const TICK: Duration = Duration::from_millis(250);

fn roster() -> EnemyRoster {
    EnemyRoster {
        normal: Some("grunt".to_owned()),
        melee: Some("brute".to_owned()),
        slow: Some("tank".to_owned()),
        range: Some("archer".to_owned()),
    }
}

fn settings(throttle_ms: u64) -> WaveSettings {
    WaveSettings {
        spawn_throttle_ms: throttle_ms,
        spawn_radius: 10.0,
        min_player_distance: 3.0,
        container: ContainerId::new(7),
    }
}

fn tick(orchestrator: &mut WaveOrchestrator, players: &[Position]) -> Vec<Command> {
    let mut out = Vec::new();
    orchestrator.handle(
        &[Event::TimeAdvanced { dt: TICK }],
        SessionMode::Running,
        players,
        &mut out,
    );
    out
}

fn spawn_count(commands: &[Command]) -> usize {
    commands
        .iter()
        .filter(|command| matches!(command, Command::SpawnEnemy { .. }))
        .count()
}

fn completions(commands: &[Command]) -> Vec<WaveRunId> {
    commands
        .iter()
        .filter_map(|command| match command {
            Command::ReportWaveCompleted { wave } => Some(*wave),
            _ => None,
        })
        .collect()
}

#[test]
fn bursts_are_throttled_until_quota_is_spent() {
    let mut orchestrator = WaveOrchestrator::new(settings(1_000), roster(), 0x5eed);
    let reference = [Position::new(5.0, 5.0)];
    let handle = orchestrator.start_wave(WaveKind::Standard, SpawnStrategy::Fixed, 0, &reference);

    let per_tick: Vec<usize> = (0..9)
        .map(|_| spawn_count(&tick(&mut orchestrator, &[])))
        .collect();

    // Three normal hostiles, one per burst, four ticks apart.
    assert_eq!(per_tick, vec![1, 0, 0, 0, 1, 0, 0, 0, 1]);
    assert!(!orchestrator.is_running(handle));
    assert!(tick(&mut orchestrator, &[]).is_empty());
}

#[test]
fn completion_is_reported_once_with_wave_id() {
    let mut orchestrator = WaveOrchestrator::new(settings(0), roster(), 1);
    let handle = orchestrator.start_wave(
        WaveKind::Aggressive,
        SpawnStrategy::Fixed,
        4,
        &[Position::ZERO],
    );
    let quota = composition(WaveKind::Aggressive, 4).total() as usize;

    let mut commands = Vec::new();
    for _ in 0..quota {
        commands.extend(tick(&mut orchestrator, &[]));
    }

    assert_eq!(spawn_count(&commands), quota);
    assert_eq!(completions(&commands), vec![handle.id()]);
    for command in &commands {
        if let Command::SpawnEnemy {
            container, wave, ..
        } = command
        {
            assert_eq!(*container, ContainerId::new(7));
            assert_eq!(*wave, Some(handle.id()));
        }
    }
}

#[test]
fn missing_prefab_skips_spawn_but_spends_quota() {
    let roster = EnemyRoster {
        normal: Some("grunt".to_owned()),
        ..EnemyRoster::default()
    };
    let mut orchestrator = WaveOrchestrator::new(settings(0), roster, 2);
    // Ranged at difficulty zero: one normal and two ranged hostiles.
    let handle =
        orchestrator.start_wave(WaveKind::Ranged, SpawnStrategy::Fixed, 0, &[Position::ZERO]);

    let mut commands = Vec::new();
    for _ in 0..3 {
        commands.extend(tick(&mut orchestrator, &[]));
    }

    assert_eq!(spawn_count(&commands), 1);
    assert_eq!(completions(&commands), vec![handle.id()]);
    assert_eq!(orchestrator.running_count(), 0);
}

#[test]
fn area_around_players_keeps_minimum_distance() {
    let players = [Position::new(0.0, 0.0), Position::new(12.0, 0.0)];
    let mut orchestrator = WaveOrchestrator::new(settings(0), roster(), 0xa11ce);
    let _ = orchestrator.start_wave(WaveKind::Standard, SpawnStrategy::AreaAroundPlayers, 12, &[]);

    let mut positions = Vec::new();
    while orchestrator.running_count() > 0 {
        for command in tick(&mut orchestrator, &players) {
            if let Command::SpawnEnemy { position, .. } = command {
                positions.push(position);
            }
        }
    }

    assert_eq!(
        positions.len() as u32,
        composition(WaveKind::Standard, 12).total()
    );
    for position in positions {
        for player in players {
            assert!(
                position.distance(player) >= 3.0,
                "{position:?} too close to {player:?}"
            );
        }
    }
}

#[test]
fn area_around_players_without_players_spawns_nothing() {
    let mut orchestrator = WaveOrchestrator::new(settings(0), roster(), 4);
    let handle = orchestrator.start_wave(WaveKind::Siege, SpawnStrategy::AreaAroundPlayers, 0, &[]);

    let mut commands = Vec::new();
    for _ in 0..2 {
        commands.extend(tick(&mut orchestrator, &[]));
    }

    assert_eq!(spawn_count(&commands), 0);
    assert_eq!(completions(&commands), vec![handle.id()]);
}

#[test]
fn end_all_waves_stops_every_task() {
    let mut orchestrator = WaveOrchestrator::new(settings(500), roster(), 3);
    let reference = [Position::new(1.0, 1.0)];
    let first = orchestrator.start_wave(WaveKind::Siege, SpawnStrategy::Fixed, 6, &reference);
    let second = orchestrator.start_wave(WaveKind::Ranged, SpawnStrategy::Fixed, 6, &reference);

    assert!(spawn_count(&tick(&mut orchestrator, &[])) > 0);
    assert_eq!(orchestrator.end_all_waves(), 2);
    assert_eq!(orchestrator.running_count(), 0);
    assert!(!orchestrator.is_running(first));
    assert!(!orchestrator.is_running(second));

    for _ in 0..20 {
        assert!(tick(&mut orchestrator, &[]).is_empty());
    }
    assert_eq!(orchestrator.end_all_waves(), 0);
}

#[test]
fn paused_session_suspends_waves() {
    let mut orchestrator = WaveOrchestrator::new(settings(0), roster(), 5);
    let handle =
        orchestrator.start_wave(WaveKind::Standard, SpawnStrategy::Fixed, 0, &[Position::ZERO]);

    let mut out = Vec::new();
    for _ in 0..10 {
        orchestrator.handle(
            &[Event::TimeAdvanced { dt: TICK }],
            SessionMode::Paused,
            &[],
            &mut out,
        );
    }
    assert!(out.is_empty());
    assert_eq!(
        orchestrator.remaining_quota(handle),
        Some(composition(WaveKind::Standard, 0).total())
    );

    assert_eq!(spawn_count(&tick(&mut orchestrator, &[])), 1);
}

#[test]
fn spawns_materialize_in_world() {
    let mut world = World::new();
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::JoinPlayer {
            player: PlayerId::new(1),
            position: Position::new(-20.0, 4.0),
        },
        &mut events,
    );

    let mut orchestrator = WaveOrchestrator::new(settings(250), roster(), 6);
    let handle =
        orchestrator.start_wave(WaveKind::Ranged, SpawnStrategy::AreaAroundPlayers, 2, &[]);

    for _ in 0..40 {
        let mut events = Vec::new();
        world::apply(&mut world, Command::Tick { dt: TICK }, &mut events);
        let players = query::player_positions(&world);
        let mut commands = Vec::new();
        orchestrator.handle(&events, query::session_mode(&world), &players, &mut commands);
        for command in commands {
            world::apply(&mut world, command, &mut events);
        }
    }

    let enemies = query::enemy_view(&world);
    assert_eq!(
        enemies.len() as u32,
        composition(WaveKind::Ranged, 2).total()
    );
    assert!(enemies
        .iter()
        .all(|enemy| enemy.wave == Some(handle.id()) && enemy.container == ContainerId::new(7)));
    assert!(enemies
        .iter()
        .any(|enemy| enemy.category == EnemyCategory::Range && enemy.prefab == "archer"));
    assert_eq!(query::completed_waves(&world), 1);
}

#[test]
fn identical_seeds_replay_identically() {
    let run = |seed: u64| {
        let mut orchestrator = WaveOrchestrator::new(settings(500), roster(), seed);
        let players = [Position::new(3.0, 3.0)];
        let _ = orchestrator.start_wave(
            WaveKind::Aggressive,
            SpawnStrategy::AreaAroundPlayers,
            9,
            &[],
        );
        let _ = orchestrator.start_wave(
            WaveKind::Siege,
            SpawnStrategy::AreaAroundPosition,
            5,
            &[Position::new(40.0, 40.0), Position::new(-40.0, 40.0)],
        );
        (0..60)
            .flat_map(|_| tick(&mut orchestrator, &players))
            .collect::<Vec<_>>()
    };

    assert_eq!(run(0xfeed), run(0xfeed));
    assert_ne!(run(0xfeed), run(0xbeef));
}
