//! Number generation strategies.
//!
//! Each strategy is stateless: it only reads its fixed reference data and
//! the generator handed to it.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::random::{shuffle, uniform_int, unique_sample};
use crate::types::{LottoError, MAX_NUMBER, MIN_NUMBER, NumberSet, PICK_COUNT};

/// Numbers observed most often in past draws.
pub const HOT_NUMBERS: [u8; 15] = [12, 21, 33, 16, 38, 6, 7, 18, 19, 13, 31, 24, 1, 2, 4];

/// Numbers observed least often in past draws. Disjoint from [`HOT_NUMBERS`].
pub const COLD_NUMBERS: [u8; 15] = [5, 32, 20, 25, 22, 9, 40, 8, 29, 23, 35, 42, 44, 11, 15];

const BALANCED_BANDS: [(u8, u8); 5] = [(1, 9), (10, 19), (20, 29), (30, 39), (40, 45)];

const HIGH_RANGE: (u8, u8) = (32, 45);
const LOW_RANGE: (u8, u8) = (1, 31);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    /// Six of the fifteen historically frequent numbers.
    Hot,
    /// Six of the fifteen historically rare numbers.
    Cold,
    /// One number per band plus one wildcard.
    Balanced,
    /// Three odd and three even numbers.
    OddEven,
    /// Two numbers from 32-45, four from 1-31.
    HighNumber,
    Random,
}

impl Strategy {
    pub const ALL: [Strategy; 6] = [
        Strategy::Hot,
        Strategy::Cold,
        Strategy::Balanced,
        Strategy::OddEven,
        Strategy::HighNumber,
        Strategy::Random,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Strategy::Hot => "hot",
            Strategy::Cold => "cold",
            Strategy::Balanced => "balanced",
            Strategy::OddEven => "oddEven",
            Strategy::HighNumber => "highNumber",
            Strategy::Random => "random",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Hot => "🔥 최다 출현 번호",
            Strategy::Cold => "❄️ 최소 출현 번호",
            Strategy::Balanced => "⚖️ 균형 전략",
            Strategy::OddEven => "🎭 홀짝 조화",
            Strategy::HighNumber => "💎 고숫자 전략",
            Strategy::Random => "🎲 완전 랜덤",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Strategy::Hot => "과거에 가장 많이 나온 번호들",
            Strategy::Cold => "이제 나올 차례라고 믿는 번호들",
            Strategy::Balanced => "구간별로 골고루 선택",
            Strategy::OddEven => "홀수 3개 + 짝수 3개",
            Strategy::HighNumber => "32~45 포함 (당첨금 독식 확률 UP)",
            Strategy::Random => "순수한 운에 맡기기",
        }
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<NumberSet, LottoError> {
        let numbers = match self {
            Strategy::Hot => pick_from_reference(rng, &HOT_NUMBERS),
            Strategy::Cold => pick_from_reference(rng, &COLD_NUMBERS),
            Strategy::Balanced => balanced(rng)?,
            Strategy::OddEven => odd_even(rng)?,
            Strategy::HighNumber => high_number(rng)?,
            Strategy::Random => unique_sample(rng, PICK_COUNT, MIN_NUMBER, MAX_NUMBER)?,
        };
        NumberSet::new(&numbers)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for Strategy {
    type Err = LottoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.id() == s)
            .ok_or_else(|| LottoError::UnknownStrategy(s.to_string()))
    }
}

/// Runs one strategy `count` times with independent results.
pub fn generate_batch<R: Rng + ?Sized>(
    strategy: Strategy,
    count: usize,
    rng: &mut R,
) -> Result<Vec<NumberSet>, LottoError> {
    (0..count).map(|_| strategy.generate(rng)).collect()
}

fn pick_from_reference<R: Rng + ?Sized>(rng: &mut R, reference: &[u8]) -> Vec<u8> {
    shuffle(rng, reference).into_iter().take(PICK_COUNT).collect()
}

fn balanced<R: Rng + ?Sized>(rng: &mut R) -> Result<Vec<u8>, LottoError> {
    let mut numbers = Vec::with_capacity(PICK_COUNT);
    for (min, max) in BALANCED_BANDS {
        numbers.push(uniform_int(rng, min, max)?);
    }

    // Bands are disjoint, so only the wildcard can collide. Redraw it.
    loop {
        let wildcard = uniform_int(rng, MIN_NUMBER, MAX_NUMBER)?;
        if !numbers.contains(&wildcard) {
            numbers.push(wildcard);
            return Ok(numbers);
        }
    }
}

fn odd_even<R: Rng + ?Sized>(rng: &mut R) -> Result<Vec<u8>, LottoError> {
    let half = PICK_COUNT / 2;
    let mut odds = Vec::with_capacity(half);
    while odds.len() < half {
        let n = uniform_int(rng, MIN_NUMBER, MAX_NUMBER)?;
        if n % 2 == 1 && !odds.contains(&n) {
            odds.push(n);
        }
    }

    let mut evens = Vec::with_capacity(half);
    while evens.len() < half {
        let n = uniform_int(rng, MIN_NUMBER, MAX_NUMBER)?;
        if n % 2 == 0 && !evens.contains(&n) {
            evens.push(n);
        }
    }

    odds.extend(evens);
    Ok(odds)
}

fn high_number<R: Rng + ?Sized>(rng: &mut R) -> Result<Vec<u8>, LottoError> {
    let mut numbers = unique_sample(rng, 2, HIGH_RANGE.0, HIGH_RANGE.1)?;
    numbers.extend(unique_sample(rng, 4, LOW_RANGE.0, LOW_RANGE.1)?);
    Ok(numbers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn assert_valid(set: &NumberSet) {
        let numbers = set.numbers();
        assert!(numbers.windows(2).all(|w| w[0] < w[1]), "{set}");
        assert!(numbers.iter().all(|n| (1..=45).contains(n)), "{set}");
    }

    #[test]
    fn test_every_strategy_yields_valid_sets() {
        let mut rng = StdRng::seed_from_u64(42);
        for strategy in Strategy::ALL {
            for _ in 0..500 {
                let set = strategy.generate(&mut rng).unwrap();
                assert_valid(&set);
            }
        }
    }

    #[test]
    fn test_hot_and_cold_stay_in_reference_lists() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let hot = Strategy::Hot.generate(&mut rng).unwrap();
            assert!(hot.iter().all(|n| HOT_NUMBERS.contains(&n)));
            let cold = Strategy::Cold.generate(&mut rng).unwrap();
            assert!(cold.iter().all(|n| COLD_NUMBERS.contains(&n)));
        }
        assert!(HOT_NUMBERS.iter().all(|n| !COLD_NUMBERS.contains(n)));
    }

    #[test]
    fn test_balanced_covers_every_band() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..500 {
            let set = Strategy::Balanced.generate(&mut rng).unwrap();
            for (min, max) in BALANCED_BANDS {
                assert!(set.iter().any(|n| (min..=max).contains(&n)), "{set}");
            }
        }
    }

    #[test]
    fn test_odd_even_is_three_and_three() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..500 {
            let set = Strategy::OddEven.generate(&mut rng).unwrap();
            assert_eq!(set.iter().filter(|n| n % 2 == 1).count(), 3);
        }
    }

    #[test]
    fn test_high_number_split() {
        let mut rng = StdRng::seed_from_u64(13);
        for _ in 0..500 {
            let set = Strategy::HighNumber.generate(&mut rng).unwrap();
            assert_eq!(set.iter().filter(|&n| n >= 32).count(), 2);
        }
    }

    #[test]
    fn test_strategy_ids_round_trip() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.id().parse::<Strategy>(), Ok(strategy));
        }
        assert_eq!(
            "lucky".parse::<Strategy>(),
            Err(LottoError::UnknownStrategy("lucky".to_string()))
        );
    }

    #[test]
    fn test_generate_batch_count() {
        let mut rng = StdRng::seed_from_u64(1);
        let sets = generate_batch(Strategy::Random, 5, &mut rng).unwrap();
        assert_eq!(sets.len(), 5);
    }

    #[test]
    fn test_same_seed_same_numbers() {
        let a = Strategy::Balanced
            .generate(&mut StdRng::seed_from_u64(77))
            .unwrap();
        let b = Strategy::Balanced
            .generate(&mut StdRng::seed_from_u64(77))
            .unwrap();
        assert_eq!(a, b);
    }
}
