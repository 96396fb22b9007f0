//! Temperature scaling and nucleus (top-p) sampling over raw scores.

use rand::Rng;

/// Divide every score by `temperature` in place.
pub fn apply_temperature(logits: &mut [f32], temperature: f32) {
    if temperature == 1.0 {
        return;
    }
    for logit in logits.iter_mut() {
        *logit /= temperature;
    }
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        // All -inf (or empty): fall back to uniform
        let n = logits.len().max(1) as f32;
        return vec![1.0 / n; logits.len()];
    }

    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Draw one index from the smallest set of most-likely tokens whose
/// cumulative probability reaches `top_p`.
///
/// The most likely token always survives the cut, so a tiny `top_p`
/// degrades to greedy decoding. Returns `None` for empty input.
pub fn nucleus_sample<R: Rng>(logits: &[f32], top_p: f32, rng: &mut R) -> Option<usize> {
    if logits.is_empty() {
        return None;
    }

    let probs = softmax(logits);
    let mut order: Vec<usize> = (0..probs.len()).collect();
    order.sort_by(|a, b| probs[*b].total_cmp(&probs[*a]));

    // A token is cut when the mass before it already exceeds top_p.
    let mut kept = Vec::with_capacity(order.len());
    let mut cumulative = 0.0f32;
    for idx in order {
        if !kept.is_empty() && cumulative > top_p {
            break;
        }
        cumulative += probs[idx];
        kept.push(idx);
    }

    let total: f32 = kept.iter().map(|i| probs[*i]).sum();
    let mut target = rng.gen::<f32>() * total;
    for idx in &kept {
        target -= probs[*idx];
        if target <= 0.0 {
            return Some(*idx);
        }
    }
    kept.last().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn softmax_of_all_neg_inf_is_uniform() {
        let probs = softmax(&[f32::NEG_INFINITY, f32::NEG_INFINITY]);
        assert_eq!(probs, vec![0.5, 0.5]);
    }

    #[test]
    fn temperature_sharpens_and_flattens() {
        let mut hot = vec![1.0, 2.0];
        apply_temperature(&mut hot, 2.0);
        assert_eq!(hot, vec![0.5, 1.0]);

        let mut cold = vec![1.0, 2.0];
        apply_temperature(&mut cold, 0.5);
        assert_eq!(cold, vec![2.0, 4.0]);
    }

    #[test]
    fn empty_logits_sample_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(nucleus_sample(&[], 0.9, &mut rng), None);
    }

    #[test]
    fn tiny_top_p_is_greedy() {
        let mut rng = StdRng::seed_from_u64(7);
        let logits = [0.1, 3.0, 0.2, 0.3];
        for _ in 0..100 {
            assert_eq!(nucleus_sample(&logits, 0.01, &mut rng), Some(1));
        }
    }

    #[test]
    fn tail_outside_nucleus_is_never_drawn() {
        // probabilities ≈ [0.6, 0.3, 0.1]; with top_p = 0.7 the first two
        // survive (0.6 < 0.7 lets the second in) and the third is cut.
        let logits = [0.6f32.ln(), 0.3f32.ln(), 0.1f32.ln()];
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = [0usize; 3];
        for _ in 0..2000 {
            let idx = nucleus_sample(&logits, 0.7, &mut rng).unwrap();
            seen[idx] += 1;
        }
        assert_eq!(seen[2], 0);
        assert!(seen[0] > seen[1]);
        assert!(seen[1] > 0);
    }

    #[test]
    fn top_p_of_one_keeps_everything() {
        let logits = [0.0f32, 0.0, 0.0];
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = [false; 3];
        for _ in 0..500 {
            seen[nucleus_sample(&logits, 1.0, &mut rng).unwrap()] = true;
        }
        assert_eq!(seen, [true, true, true]);
    }
}
