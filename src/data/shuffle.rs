//! Randomized gene (column) ordering.
//!
//! Tree induction breaks ties between equally good splits by column position,
//! so every iteration re-orders the genes before fitting.

use rand::Rng;

/// Number of random transpositions applied per shuffle
pub const DEFAULT_SWAPS: usize = 100;

/// Permute `genes` with a fixed number of random transpositions.
///
/// Both positions of each swap are drawn independently and with replacement,
/// so a swap may be a no-op. The result is not a uniform permutation.
pub fn shuffle_columns<T: Clone, R: Rng + ?Sized>(genes: &[T], swaps: usize, rng: &mut R) -> Vec<T> {
    let mut order = genes.to_vec();
    if order.len() < 2 {
        return order;
    }

    for _ in 0..swaps {
        let a = rng.gen_range(0..order.len());
        let b = rng.gen_range(0..order.len());
        order.swap(a, b);
    }
    order
}
