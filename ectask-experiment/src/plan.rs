use ectask_core::{Congruency, Direction};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// One flanker design cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlankerCell {
    pub target: Direction,
    pub congruency: Congruency,
}

pub const FLANKER_CELLS: [FlankerCell; 4] = [
    FlankerCell {
        target: Direction::Left,
        congruency: Congruency::Congruent,
    },
    FlankerCell {
        target: Direction::Left,
        congruency: Congruency::Incongruent,
    },
    FlankerCell {
        target: Direction::Right,
        congruency: Congruency::Congruent,
    },
    FlankerCell {
        target: Direction::Right,
        congruency: Congruency::Incongruent,
    },
];

/// Near-balanced plan of `n` trials: every cell `n / cells.len()` times,
/// the `n % cells.len()` leftover trials on a uniformly drawn subset of
/// cells, then the whole plan shuffled.
pub fn counterbalanced<C: Copy, R: Rng + ?Sized>(cells: &[C], n: usize, rng: &mut R) -> Vec<C> {
    if cells.is_empty() {
        return Vec::new();
    }
    let reps = n / cells.len();
    let remainder = n % cells.len();

    let mut plan = Vec::with_capacity(n);
    for _ in 0..reps {
        plan.extend_from_slice(cells);
    }
    // Extra trials go to distinct cells, chosen uniformly.
    let mut extra = cells.to_vec();
    extra.shuffle(rng);
    plan.extend_from_slice(&extra[..remainder]);
    plan.shuffle(rng);
    plan
}

pub fn flanker_plan<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<FlankerCell> {
    counterbalanced(&FLANKER_CELLS, n, rng)
}
