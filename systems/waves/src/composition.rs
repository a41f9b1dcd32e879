use encounter_director_core::{EnemyCategory, EnemyComposition, WaveKind};

/// Highest difficulty tier with explicitly tuned counts.
pub const HIGHEST_TUNED_TIER: u32 = 3;

/// Largest number of spawns a single burst may contain.
pub const MAX_BURST_SIZE: u32 = 5;

struct CompositionCurve {
    tiers: [EnemyComposition; HIGHEST_TUNED_TIER as usize + 1],
    increment: EnemyComposition,
}

const STANDARD: CompositionCurve = CompositionCurve {
    tiers: [
        EnemyComposition::new(3, 0, 0, 0),
        EnemyComposition::new(4, 1, 0, 0),
        EnemyComposition::new(5, 2, 1, 0),
        EnemyComposition::new(6, 2, 1, 1),
    ],
    increment: EnemyComposition::new(2, 1, 0, 0),
};

const RANGED: CompositionCurve = CompositionCurve {
    tiers: [
        EnemyComposition::new(1, 0, 0, 2),
        EnemyComposition::new(2, 0, 0, 3),
        EnemyComposition::new(2, 1, 0, 4),
        EnemyComposition::new(3, 1, 0, 5),
    ],
    increment: EnemyComposition::new(1, 0, 0, 2),
};

const AGGRESSIVE: CompositionCurve = CompositionCurve {
    tiers: [
        EnemyComposition::new(1, 2, 0, 0),
        EnemyComposition::new(1, 3, 0, 0),
        EnemyComposition::new(2, 4, 0, 1),
        EnemyComposition::new(2, 5, 1, 1),
    ],
    increment: EnemyComposition::new(0, 2, 0, 1),
};

const SIEGE: CompositionCurve = CompositionCurve {
    tiers: [
        EnemyComposition::new(0, 0, 2, 0),
        EnemyComposition::new(1, 0, 3, 0),
        EnemyComposition::new(1, 1, 4, 0),
        EnemyComposition::new(2, 1, 5, 1),
    ],
    increment: EnemyComposition::new(1, 0, 2, 0),
};

const fn curve(kind: WaveKind) -> &'static CompositionCurve {
    match kind {
        WaveKind::Standard => &STANDARD,
        WaveKind::Ranged => &RANGED,
        WaveKind::Aggressive => &AGGRESSIVE,
        WaveKind::Siege => &SIEGE,
    }
}

/// Enemy quota a wave of the provided kind must spawn at `difficulty`.
///
/// Difficulties above [`HIGHEST_TUNED_TIER`] extend the highest tier
/// linearly by the kind's per-category increment.
#[must_use]
pub fn composition(kind: WaveKind, difficulty: u32) -> EnemyComposition {
    let curve = curve(kind);
    if difficulty <= HIGHEST_TUNED_TIER {
        return curve.tiers[difficulty as usize];
    }

    let steps = difficulty - HIGHEST_TUNED_TIER;
    let top = curve.tiers[HIGHEST_TUNED_TIER as usize];
    let scaled = |category: EnemyCategory| {
        top.count(category)
            .saturating_add(steps.saturating_mul(curve.increment.count(category)))
    };
    EnemyComposition::new(
        scaled(EnemyCategory::Normal),
        scaled(EnemyCategory::Melee),
        scaled(EnemyCategory::Slow),
        scaled(EnemyCategory::Range),
    )
}

/// Number of spawns issued per burst at `difficulty`.
#[must_use]
pub const fn burst_size(difficulty: u32) -> u32 {
    let size = 1 + difficulty / 2;
    if size > MAX_BURST_SIZE {
        MAX_BURST_SIZE
    } else {
        size
    }
}
