//! Weighted random selection over the quote set.
//!
//! The draw and the walk are kept separate from any persistence so the
//! distribution can be tested deterministically. The caller loads the
//! candidate rows, `select_random` draws uniformly in `[0, total_weight)`,
//! and `pick_weighted` walks the cumulative weights. A quote is chosen when
//! the cumulative weight strictly exceeds the draw, which makes zero-weight
//! quotes unselectable even when the draw lands exactly on their prefix sum.

use rand::Rng;

/// Walk `weights` accumulating until the running sum exceeds `draw`.
/// Returns the index of the selected entry, or `None` when nothing is
/// selectable (empty input, all-zero weights, or a draw past the total).
pub fn pick_weighted(weights: &[i32], draw: f64) -> Option<usize> {
    let mut upto = 0.0;
    for (i, &weight) in weights.iter().enumerate() {
        upto += f64::from(weight.max(0));
        if draw < upto {
            return Some(i);
        }
    }
    None
}

/// Select one index with probability `weight_i / sum(weights)`.
pub fn select_random<R: Rng>(weights: &[i32], rng: &mut R) -> Option<usize> {
    let total: f64 = weights.iter().map(|&w| f64::from(w.max(0))).sum();
    if total <= 0.0 {
        return None;
    }
    pick_weighted(weights, rng.gen_range(0.0..total))
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn empty_set_selects_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(select_random(&[], &mut rng), None);
    }

    #[test]
    fn all_zero_weights_select_nothing() {
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(select_random(&[0, 0, 0], &mut rng), None);
    }

    #[test]
    fn walk_respects_cumulative_boundaries() {
        let weights = [2, 3, 5];
        assert_eq!(pick_weighted(&weights, 0.0), Some(0));
        assert_eq!(pick_weighted(&weights, 1.9), Some(0));
        assert_eq!(pick_weighted(&weights, 2.0), Some(1));
        assert_eq!(pick_weighted(&weights, 4.9), Some(1));
        assert_eq!(pick_weighted(&weights, 5.0), Some(2));
        assert_eq!(pick_weighted(&weights, 9.9), Some(2));
        assert_eq!(pick_weighted(&weights, 10.0), None);
    }

    #[test]
    fn zero_weight_is_never_selected() {
        let weights = [0, 1, 0, 3, 0];
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..10_000 {
            let picked = select_random(&weights, &mut rng).unwrap();
            assert!(picked == 1 || picked == 3);
        }
        // Draws landing exactly on a zero-weight prefix sum must skip it.
        assert_eq!(pick_weighted(&weights, 0.0), Some(1));
        assert_eq!(pick_weighted(&weights, 1.0), Some(3));
    }

    #[test]
    fn frequencies_approximate_weight_ratios() {
        let weights = [1, 2, 3, 4];
        let total = 10.0;
        let trials = 100_000;
        let mut hits = [0u32; 4];
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..trials {
            hits[select_random(&weights, &mut rng).unwrap()] += 1;
        }
        for (i, &weight) in weights.iter().enumerate() {
            let expected = f64::from(weight) / total;
            let observed = f64::from(hits[i]) / f64::from(trials);
            assert!(
                (observed - expected).abs() < 0.01,
                "index {i}: expected {expected}, observed {observed}"
            );
        }
    }

    #[test]
    fn single_quote_is_always_selected() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            assert_eq!(select_random(&[7], &mut rng), Some(0));
        }
    }
}
