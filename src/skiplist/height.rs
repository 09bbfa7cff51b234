use rand::{rngs::StdRng, RngCore, SeedableRng};

pub const MAX_HEIGHT: usize = 12;
const BRANCHING_FACTOR: u32 = 4;

/// Draws node heights from a geometric distribution with p = 1/BRANCHING_FACTOR.
///
/// One generator lives as long as the list, so consecutive inserts never share a
/// freshly derived seed.
pub struct HeightGenerator {
    rand: StdRng,
}

impl HeightGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        let rand = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        HeightGenerator { rand }
    }

    pub fn random_height(&mut self) -> usize {
        let mut height = 1;
        while height < MAX_HEIGHT && self.rand.next_u32() % BRANCHING_FACTOR == 0 {
            height += 1;
        }
        height
    }
}
