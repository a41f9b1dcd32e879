use std::{collections::HashSet, time::Duration};

use encounter_director_core::{
    Command, ContainerId, DropCategory, DropRange, EnemyCategory, EnemyId, Event, LootTableId,
    PlayerId, Position, RepeatCount, SessionMode, SpawnStrategy, WaveKind, WaveRunId, WeaponId,
};
use encounter_director_system_director::{Director, DirectorConfig, LootSettings, SessionSettings};
use encounter_director_system_loot::{LootEntry, LootMilestone, LootTable};
use encounter_director_system_progression::{PhaseDefinition, ProgressionConfig, WaveEntryConfig};
use encounter_director_system_waves::{EnemyRoster, WaveSettings};
use encounter_director_world::{self as world, query, World};

const TICK: Duration = Duration::from_millis(250);
const PLAYERS: [Position; 1] = [Position::new(0.0, 0.0)];

fn roster() -> EnemyRoster {
    EnemyRoster {
        normal: Some("grunt".to_owned()),
        melee: Some("brute".to_owned()),
        slow: Some("tank".to_owned()),
        range: Some("archer".to_owned()),
    }
}

fn single_table(name: &str, item: DropCategory) -> LootTable {
    LootTable::new(name, vec![LootEntry::new(item, 1)])
}

fn base_config(phases: Vec<PhaseDefinition>) -> DirectorConfig {
    DirectorConfig {
        seed: 0xd1ec_7012,
        session: SessionSettings {
            max_concurrent_waves: 1,
            inter_wave_delay_ms: 0,
            auto_dispatch: true,
            default_drops: DropRange::new(0, 0),
        },
        waves: WaveSettings {
            spawn_throttle_ms: 1_000,
            spawn_radius: 10.0,
            min_player_distance: 2.0,
            ..WaveSettings::default()
        },
        roster: roster(),
        loot: LootSettings {
            drop_chance: 1.0,
            default_table: Some(LootTableId::new(0)),
            tables: vec![single_table("ammo", DropCategory::Ammo)],
            ..LootSettings::default()
        },
        progression: ProgressionConfig {
            phases,
            ..ProgressionConfig::default()
        },
        ..DirectorConfig::default()
    }
}

fn tick(director: &mut Director, out: &mut Vec<Command>) {
    director.handle(
        &[Event::TimeAdvanced { dt: TICK }],
        SessionMode::Running,
        &PLAYERS,
        out,
    );
}

fn spawned_waves(commands: &[Command]) -> Vec<WaveRunId> {
    commands
        .iter()
        .filter_map(|command| match command {
            Command::SpawnEnemy { wave, .. } => *wave,
            _ => None,
        })
        .collect()
}

fn drops(commands: &[Command]) -> Vec<DropCategory> {
    commands
        .iter()
        .filter_map(|command| match command {
            Command::SpawnDrop { item, .. } => Some(*item),
            _ => None,
        })
        .collect()
}

fn died(wave: Option<WaveRunId>) -> Event {
    Event::EnemyDied {
        enemy: EnemyId::new(0),
        category: EnemyCategory::Normal,
        position: Position::new(4.0, 4.0),
        wave,
    }
}

#[test]
fn auto_dispatch_respects_concurrency_and_delay() {
    let mut config = base_config(vec![PhaseDefinition::new(
        "endless",
        vec![WaveEntryConfig::new(WaveKind::Standard, 0)],
        RepeatCount::Infinite,
    )]);
    config.session.max_concurrent_waves = 2;
    config.session.inter_wave_delay_ms = 500;
    let mut director = Director::new(config);

    let mut running = Vec::new();
    for _ in 0..40 {
        let mut out = Vec::new();
        tick(&mut director, &mut out);
        running.push(director.orchestrator().running_count());
    }

    assert_eq!(&running[..3], &[1, 1, 2]);
    assert!(running.iter().all(|count| *count <= 2));
    assert!(!director.has_progression_ended());
}

#[test]
fn paused_session_neither_dispatches_nor_spawns() {
    let mut director = Director::new(base_config(vec![PhaseDefinition::new(
        "once",
        vec![WaveEntryConfig::new(WaveKind::Standard, 0)],
        RepeatCount::Finite(1),
    )]));

    let mut out = Vec::new();
    for _ in 0..8 {
        director.handle(
            &[Event::TimeAdvanced { dt: TICK }],
            SessionMode::Paused,
            &PLAYERS,
            &mut out,
        );
    }
    assert!(out.is_empty());
    assert_eq!(director.orchestrator().running_count(), 0);

    tick(&mut director, &mut out);
    assert_eq!(spawned_waves(&out).len(), 1);
}

#[test]
fn interrupting_entry_ends_running_waves() {
    let mut boss = WaveEntryConfig::new(WaveKind::Siege, 2);
    boss.interrupt_running = true;
    let mut config = base_config(vec![
        PhaseDefinition::new(
            "trash",
            vec![
                WaveEntryConfig::new(WaveKind::Standard, 8),
                WaveEntryConfig::new(WaveKind::Ranged, 8),
            ],
            RepeatCount::Finite(1),
        ),
        PhaseDefinition::new("boss", vec![boss], RepeatCount::Finite(1)),
    ]);
    config.session.max_concurrent_waves = 3;
    let mut director = Director::new(config);

    let mut early = Vec::new();
    tick(&mut director, &mut early);
    tick(&mut director, &mut early);
    assert_eq!(director.orchestrator().running_count(), 2);

    let mut late = Vec::new();
    for _ in 0..30 {
        tick(&mut director, &mut late);
    }

    let boss_wave = WaveRunId::new(2);
    assert!(!spawned_waves(&late).is_empty());
    assert!(spawned_waves(&late).iter().all(|wave| *wave == boss_wave));
    assert!(director.has_progression_ended());
}

#[test]
fn completion_table_wins_over_milestone() {
    let mut closing = WaveEntryConfig::new(WaveKind::Standard, 0);
    closing.loot_table_after_completion = 2;
    let mut config = base_config(vec![PhaseDefinition::new(
        "main",
        vec![closing, WaveEntryConfig::new(WaveKind::Standard, 0)],
        RepeatCount::Finite(1),
    )]);
    config.session.auto_dispatch = false;
    config.loot.tables = vec![
        single_table("ammo", DropCategory::Ammo),
        single_table("health", DropCategory::Health),
        single_table("armor", DropCategory::Armor),
    ];
    config.loot.milestones = vec![
        LootMilestone {
            after_wave: 0,
            table: LootTableId::new(0),
        },
        LootMilestone {
            after_wave: 1,
            table: LootTableId::new(1),
        },
    ];
    let mut director = Director::new(config);
    assert_eq!(director.loot().active_table(), Some(LootTableId::new(0)));

    let first = director.try_next_wave_entry().expect("first entry");
    let handle = director.start_entry(&first);
    let mut out = Vec::new();
    director.handle(
        &[Event::WaveCompleted { wave: handle.id() }],
        SessionMode::Running,
        &PLAYERS,
        &mut out,
    );
    assert_eq!(director.loot().active_table(), Some(LootTableId::new(2)));

    let second = director.try_next_wave_entry().expect("second entry");
    let handle = director.start_entry(&second);
    director.handle(
        &[Event::WaveCompleted { wave: handle.id() }],
        SessionMode::Running,
        &PLAYERS,
        &mut out,
    );
    assert_eq!(director.loot().active_table(), Some(LootTableId::new(2)));

    let _ = director.request_loot_drop(Position::ZERO, 1, 1, None, &mut out);
    assert_eq!(drops(&out), vec![DropCategory::Armor]);
}

#[test]
fn kills_use_the_owning_wave_drop_range() {
    let mut generous = WaveEntryConfig::new(WaveKind::Standard, 0);
    generous.drops = Some(DropRange::new(2, 2));
    let mut config = base_config(vec![PhaseDefinition::new(
        "main",
        vec![generous],
        RepeatCount::Finite(1),
    )]);
    config.session.auto_dispatch = false;
    let mut director = Director::new(config);

    let entry = director.try_next_wave_entry().expect("entry");
    let handle = director.start_entry(&entry);

    let mut out = Vec::new();
    director.handle(
        &[died(Some(handle.id())), died(None), died(Some(WaveRunId::new(40)))],
        SessionMode::Running,
        &PLAYERS,
        &mut out,
    );

    assert_eq!(drops(&out), vec![DropCategory::Ammo; 2]);
}

fn spawned(enemy: u32, wave: Option<WaveRunId>) -> Event {
    Event::EnemySpawned {
        enemy: EnemyId::new(enemy),
        category: EnemyCategory::Normal,
        position: Position::new(4.0, 4.0),
        container: ContainerId::new(0),
        wave,
    }
}

#[test]
fn completed_wave_keeps_its_drop_range_until_its_last_enemy_is_gone() {
    let mut generous = WaveEntryConfig::new(WaveKind::Standard, 0);
    generous.drops = Some(DropRange::new(2, 2));
    let mut config = base_config(vec![PhaseDefinition::new(
        "main",
        vec![generous],
        RepeatCount::Finite(1),
    )]);
    config.session.auto_dispatch = false;
    let mut director = Director::new(config);

    let entry = director.try_next_wave_entry().expect("entry");
    let handle = director.start_entry(&entry);
    let wave = Some(handle.id());

    let mut out = Vec::new();
    director.handle(
        &[
            spawned(1, wave),
            spawned(2, wave),
            Event::WaveCompleted { wave: handle.id() },
        ],
        SessionMode::Running,
        &PLAYERS,
        &mut out,
    );
    assert_eq!(director.tracked_wave_count(), 1);

    director.handle(
        &[
            Event::EnemyDespawned {
                enemy: EnemyId::new(1),
                wave,
            },
            died(wave),
        ],
        SessionMode::Running,
        &PLAYERS,
        &mut out,
    );
    assert_eq!(drops(&out).len(), 2);
    assert_eq!(director.tracked_wave_count(), 0);

    director.handle(&[died(wave)], SessionMode::Running, &PLAYERS, &mut out);
    assert_eq!(drops(&out).len(), 2);
}

#[test]
fn cancelled_wave_never_applies_its_completion_table() {
    let mut closing = WaveEntryConfig::new(WaveKind::Standard, 0);
    closing.loot_table_after_completion = 1;
    let mut config = base_config(vec![PhaseDefinition::new(
        "main",
        vec![closing],
        RepeatCount::Finite(1),
    )]);
    config.session.auto_dispatch = false;
    config.loot.tables = vec![
        single_table("ammo", DropCategory::Ammo),
        single_table("health", DropCategory::Health),
    ];
    let mut director = Director::new(config);

    let entry = director.try_next_wave_entry().expect("entry");
    let handle = director.start_entry(&entry);
    assert_eq!(director.tracked_wave_count(), 1);

    assert_eq!(director.end_all_waves(), 1);
    assert_eq!(director.tracked_wave_count(), 0);

    let mut out = Vec::new();
    director.handle(
        &[Event::WaveCompleted { wave: handle.id() }],
        SessionMode::Running,
        &PLAYERS,
        &mut out,
    );
    assert_eq!(director.loot().active_table(), Some(LootTableId::new(0)));
}

#[test]
fn endless_phase_bookkeeping_stays_bounded() {
    let mut entry = WaveEntryConfig::new(WaveKind::Standard, 0);
    entry.drops = Some(DropRange::new(1, 1));
    entry.loot_table_after_completion = 0;
    let mut config = base_config(vec![PhaseDefinition::new(
        "endless",
        vec![entry],
        RepeatCount::Infinite,
    )]);
    config.session.max_concurrent_waves = 1_000;
    let mut director = Director::new(config);
    let mut world = World::new();
    let mut log = Vec::new();

    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::JoinPlayer {
            player: PlayerId::new(0),
            position: Position::ZERO,
        },
        &mut events,
    );
    pump(&mut world, &mut director, events, &mut log);

    for step in 1..=500 {
        let mut events = Vec::new();
        world::apply(&mut world, Command::Tick { dt: TICK }, &mut events);
        if step % 3 == 0 {
            if let Some(enemy) = query::enemy_view(&world).iter().next() {
                world::apply(&mut world, Command::KillEnemy { enemy: enemy.id }, &mut events);
            }
        }
        pump(&mut world, &mut director, events, &mut log);
        if step % 50 == 0 {
            let _ = director.end_all_waves();
        }

        let owners: HashSet<WaveRunId> = query::enemy_view(&world)
            .iter()
            .filter_map(|enemy| enemy.wave)
            .collect();
        assert!(
            director.tracked_wave_count() <= director.orchestrator().running_count() + owners.len(),
            "step {step}: {} waves tracked",
            director.tracked_wave_count()
        );
    }

    let _ = director.end_all_waves();
    let mut events = Vec::new();
    for enemy in query::enemy_view(&world).into_vec() {
        world::apply(&mut world, Command::KillEnemy { enemy: enemy.id }, &mut events);
    }
    pump(&mut world, &mut director, events, &mut log);
    assert_eq!(director.tracked_wave_count(), 0);
}

#[test]
fn reset_progression_starts_a_new_session() {
    let weapon = DropCategory::Weapon(WeaponId::new(3));
    let mut config = base_config(vec![
        PhaseDefinition::new(
            "first",
            vec![WaveEntryConfig::new(WaveKind::Ranged, 1)],
            RepeatCount::Finite(2),
        ),
        PhaseDefinition::new(
            "second",
            vec![WaveEntryConfig::new(WaveKind::Siege, 3)],
            RepeatCount::Finite(1),
        ),
    ]);
    config.session.auto_dispatch = false;
    config.loot.tables = vec![single_table("weapon", weapon)];
    let mut director = Director::new(config);

    let before: Vec<_> = std::iter::from_fn(|| director.try_next_wave_entry()).collect();
    let mut out = Vec::new();
    assert_eq!(director.request_loot_drop(Position::ZERO, 1, 1, None, &mut out), 1);
    assert_eq!(director.request_loot_drop(Position::ZERO, 1, 1, None, &mut out), 0);
    let _ = director.start_wave(WaveKind::Standard, SpawnStrategy::AreaAroundPlayers, 0, &[]);

    director.reset_progression();

    assert_eq!(director.orchestrator().running_count(), 0);
    let after: Vec<_> = std::iter::from_fn(|| director.try_next_wave_entry()).collect();
    assert_eq!(before.len(), 3);
    assert_eq!(before, after);
    assert_eq!(director.request_loot_drop(Position::ZERO, 1, 1, None, &mut out), 1);
    assert_eq!(drops(&out), vec![weapon, weapon]);
}

#[test]
fn bundled_session_replays_deterministically() {
    let first = run_session(400);
    let second = run_session(400);

    assert_eq!(first, second, "replay diverged between runs");
    assert!(first.iter().any(|event| matches!(event, Event::EnemySpawned { .. })));
    assert!(first.iter().any(|event| matches!(event, Event::DropSpawned { .. })));
    assert!(first.iter().any(|event| matches!(event, Event::WaveCompleted { .. })));
}

fn run_session(ticks: usize) -> Vec<Event> {
    let config = DirectorConfig::from_toml_str(include_str!("../../../config/encounter.toml"))
        .expect("bundled config parses");
    let mut director = Director::new(config);
    let mut world = World::new();
    let mut log = Vec::new();

    for (index, position) in [Position::new(0.0, 0.0), Position::new(10.0, 0.0)]
        .into_iter()
        .enumerate()
    {
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::JoinPlayer {
                player: PlayerId::new(index as u32),
                position,
            },
            &mut events,
        );
        log.extend(events);
    }

    for step in 0..ticks {
        let mut events = Vec::new();
        world::apply(&mut world, Command::Tick { dt: TICK }, &mut events);
        if step % 2 == 1 {
            if let Some(enemy) = query::enemy_view(&world).iter().next() {
                world::apply(&mut world, Command::KillEnemy { enemy: enemy.id }, &mut events);
            }
        }
        pump(&mut world, &mut director, events, &mut log);
    }

    log
}

fn pump(world: &mut World, director: &mut Director, mut events: Vec<Event>, log: &mut Vec<Event>) {
    while !events.is_empty() {
        log.extend(events.iter().cloned());
        let players = query::player_positions(world);
        let mut commands = Vec::new();
        director.handle(&events, query::session_mode(world), &players, &mut commands);

        events.clear();
        for command in commands {
            world::apply(world, command, &mut events);
        }
    }
}
