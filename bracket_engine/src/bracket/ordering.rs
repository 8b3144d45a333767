//! Entrant ordering ahead of round-1 placement.

use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};

use super::models::{Entrant, EntrantId, OrderingMode};

/// Orders registrations for a draw.
///
/// Holds its own random source so tests and reproducible events can pin it
/// with [`EntrantOrdering::seeded`].
pub struct EntrantOrdering {
    rng: StdRng,
}

impl EntrantOrdering {
    /// Create an ordering backed by OS entropy
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Create an ordering with a fixed random seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Order entrants for placement
    ///
    /// # Arguments
    ///
    /// * `entrants` - Checked-in entrants
    /// * `mode` - Random or seeded draw
    ///
    /// # Returns
    ///
    /// * `Vec<EntrantId>` - Entrant ids in placement order
    pub fn order(&mut self, entrants: &[Entrant], mode: OrderingMode) -> Vec<EntrantId> {
        match mode {
            OrderingMode::RandomDraw => random_order(entrants, &mut self.rng),
            OrderingMode::SeededDraw => seeded_order(entrants),
        }
    }
}

impl Default for EntrantOrdering {
    fn default() -> Self {
        Self::new()
    }
}

/// Fisher–Yates shuffle of the entrant list
pub fn random_order<R: Rng + ?Sized>(entrants: &[Entrant], rng: &mut R) -> Vec<EntrantId> {
    let mut ids: Vec<EntrantId> = entrants.iter().map(|e| e.id).collect();
    ids.shuffle(rng);
    ids
}

/// Ascending seed; unseeded entrants keep their registration order at the end
pub fn seeded_order(entrants: &[Entrant]) -> Vec<EntrantId> {
    let mut sorted = entrants.to_vec();
    sorted.sort_by_key(|e| (e.seed.is_none(), e.seed));
    sorted.into_iter().map(|e| e.id).collect()
}
