use encounter_director_core::{Position, SpawnStrategy};
use rand::{seq::SliceRandom, Rng};
use rand_distr::{Distribution, UnitDisc};

/// Number of candidates sampled before an area strategy settles for the last one.
pub const MAX_PLACEMENT_ATTEMPTS: usize = 10;

/// Geometry shared by the area placement strategies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementArea {
    /// Radius of the disk sampled around the chosen reference point.
    pub radius: f32,
    /// Minimum distance a candidate must keep from every player.
    pub min_player_distance: f32,
}

/// Resolves where a single spawn should be placed.
///
/// `reference_points` feeds the fixed and area-around-position strategies,
/// while the area-around-players strategy samples around `players`. Returns
/// `None` when the strategy has nothing to sample around.
pub fn resolve_spawn_position<R: Rng + ?Sized>(
    strategy: SpawnStrategy,
    reference_points: &[Position],
    players: &[Position],
    area: PlacementArea,
    rng: &mut R,
) -> Option<Position> {
    match strategy {
        SpawnStrategy::Fixed => reference_points.choose(rng).copied(),
        SpawnStrategy::AreaAroundPosition => sample_area(reference_points, players, area, rng),
        SpawnStrategy::AreaAroundPlayers => sample_area(players, players, area, rng),
    }
}

fn sample_area<R: Rng + ?Sized>(
    centers: &[Position],
    players: &[Position],
    area: PlacementArea,
    rng: &mut R,
) -> Option<Position> {
    let mut candidate = None;
    for _ in 0..MAX_PLACEMENT_ATTEMPTS {
        let center = *centers.choose(rng)?;
        let [x, y]: [f32; 2] = UnitDisc.sample(rng);
        let position = center + Position::new(x, y) * area.radius;
        if keeps_distance(position, players, area.min_player_distance) {
            return Some(position);
        }
        candidate = Some(position);
    }
    candidate
}

fn keeps_distance(candidate: Position, players: &[Position], min_distance: f32) -> bool {
    players
        .iter()
        .all(|player| player.distance(candidate) >= min_distance)
}
