//! Sampling primitives shared by the generation strategies.
//!
//! Every function takes the generator explicitly so callers decide between
//! `rand::rng()` and a seeded `StdRng`.

use rand::Rng;
use rand::seq::{SliceRandom, index};

use crate::types::LottoError;

/// Uniform integer in `[min, max]`, both ends inclusive.
pub fn uniform_int<R: Rng + ?Sized>(rng: &mut R, min: u8, max: u8) -> Result<u8, LottoError> {
    if min > max {
        return Err(LottoError::InvalidRange { min, max });
    }
    Ok(rng.random_range(min..=max))
}

/// Returns a shuffled copy; the input is left untouched.
pub fn shuffle<T: Clone, R: Rng + ?Sized>(rng: &mut R, items: &[T]) -> Vec<T> {
    let mut shuffled = items.to_vec();
    shuffled.shuffle(rng);
    shuffled
}

/// `count` distinct integers from `[min, max]` without replacement, ascending.
pub fn unique_sample<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    min: u8,
    max: u8,
) -> Result<Vec<u8>, LottoError> {
    if min > max {
        return Err(LottoError::InvalidRange { min, max });
    }
    let span = usize::from(max - min) + 1;
    if count > span {
        return Err(LottoError::SampleRangeTooSmall { count, min, max });
    }

    let mut picked: Vec<u8> = index::sample(rng, span, count)
        .into_iter()
        .map(|offset| min + offset as u8)
        .collect();
    picked.sort_unstable();
    Ok(picked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    #[test]
    fn test_uniform_int_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let n = uniform_int(&mut rng, 40, 45).unwrap();
            assert!((40..=45).contains(&n));
        }
        assert_eq!(uniform_int(&mut rng, 7, 7), Ok(7));
    }

    #[test]
    fn test_uniform_int_rejects_inverted_range() {
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(
            uniform_int(&mut rng, 10, 9),
            Err(LottoError::InvalidRange { min: 10, max: 9 })
        );
    }

    #[test]
    fn test_shuffle_keeps_elements_and_input() {
        let mut rng = StdRng::seed_from_u64(7);
        let input = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
        let shuffled = shuffle(&mut rng, &input);
        assert_eq!(input, vec![1, 2, 3, 4, 5, 6, 7, 8]);

        let mut sorted = shuffled.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, input);
    }

    #[test]
    fn test_shuffle_permutations_are_uniform() {
        let mut rng = StdRng::seed_from_u64(2024);
        let trials = 60_000;
        let mut seen: HashMap<Vec<u8>, u32> = HashMap::new();
        for _ in 0..trials {
            *seen.entry(shuffle(&mut rng, &[1u8, 2, 3])).or_insert(0) += 1;
        }

        assert_eq!(seen.len(), 6);
        let expected = trials as f64 / 6.0;
        let chi_square: f64 = seen
            .values()
            .map(|&observed| {
                let diff = observed as f64 - expected;
                diff * diff / expected
            })
            .sum();
        // 5 degrees of freedom, p = 0.001
        assert!(chi_square < 20.52, "chi_square={chi_square}");
    }

    #[test]
    fn test_unique_sample_never_repeats() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut counts = [0u32; 46];
        for _ in 0..1000 {
            let sample = unique_sample(&mut rng, 6, 1, 45).unwrap();
            assert_eq!(sample.len(), 6);
            assert!(sample.windows(2).all(|w| w[0] < w[1]));
            for n in sample {
                counts[n as usize] += 1;
            }
        }

        // 6000 picks over 45 numbers, about 133 each
        for &count in &counts[1..] {
            assert!((70..=200).contains(&count), "count={count}");
        }
    }

    #[test]
    fn test_unique_sample_full_range() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(unique_sample(&mut rng, 5, 1, 5).unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_unique_sample_rejects_oversized_count() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(
            unique_sample(&mut rng, 15, 32, 45),
            Err(LottoError::SampleRangeTooSmall { count: 15, min: 32, max: 45 })
        );
    }
}
