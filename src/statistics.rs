//! Aggregates over historical draws.
//!
//! Input slices are expected most recent first, the order the store
//! returns them in. Nothing here claims predictive value.

use serde::Serialize;
use std::str::FromStr;

use crate::types::{Draw, LottoError, MAX_NUMBER, MIN_NUMBER};

const HOT_COLD_SIZE: usize = 10;

const SECTIONS: [(u8, u8); 5] = [(1, 10), (11, 20), (21, 30), (31, 40), (41, 45)];

const SUM_RANGES: [(u32, u32); 5] = [(21, 90), (91, 120), (121, 150), (151, 180), (181, 270)];

/// Occurrence count per number. The bonus number is counted too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: [u32; MAX_NUMBER as usize],
}

impl FrequencyTable {
    pub fn get(&self, number: u8) -> u32 {
        if !(MIN_NUMBER..=MAX_NUMBER).contains(&number) {
            return 0;
        }
        self.counts[usize::from(number - 1)]
    }

    /// `(number, count)` pairs in ascending number order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .map(|(i, &count)| (i as u8 + 1, count))
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NumberFrequency {
    pub number: u8,
    pub frequency: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotCold {
    pub hot_numbers: Vec<NumberFrequency>,
    pub cold_numbers: Vec<NumberFrequency>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub label: String,
    pub start: u8,
    pub end: u8,
    pub total: u32,
    /// Most frequent first.
    pub numbers: Vec<NumberFrequency>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Share {
    pub count: u32,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OddEvenDistribution {
    pub odd: Share,
    pub even: Share,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsecutivePatterns {
    pub total_draws: u32,
    pub consecutive_pairs: Share,
    pub consecutive_triples: Share,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SumBucket {
    pub label: String,
    pub start: u32,
    pub end: u32,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SumDistribution {
    pub min_sum: u32,
    pub max_sum: u32,
    pub average_sum: f64,
    pub ranges: Vec<SumBucket>,
    pub most_common_range: Option<SumBucket>,
}

pub fn frequency_table(draws: &[Draw]) -> FrequencyTable {
    let mut counts = [0u32; MAX_NUMBER as usize];
    for draw in draws {
        for number in draw.numbers.iter() {
            counts[usize::from(number - 1)] += 1;
        }
        counts[usize::from(draw.bonus - 1)] += 1;
    }
    FrequencyTable { counts }
}

/// Top ten by count, and the bottom ten listed least frequent first.
/// Ties keep ascending number order; no further tiebreak is applied.
pub fn hot_cold_split(table: &FrequencyTable) -> HotCold {
    let mut ranked: Vec<NumberFrequency> = table
        .iter()
        .map(|(number, frequency)| NumberFrequency { number, frequency })
        .collect();
    ranked.sort_by(|a, b| b.frequency.cmp(&a.frequency));

    let hot_numbers = ranked.iter().take(HOT_COLD_SIZE).copied().collect();
    let cold_numbers = ranked.iter().rev().take(HOT_COLD_SIZE).copied().collect();

    HotCold {
        hot_numbers,
        cold_numbers,
    }
}

pub fn section_distribution(table: &FrequencyTable) -> Vec<Section> {
    SECTIONS
        .iter()
        .map(|&(start, end)| {
            let mut numbers: Vec<NumberFrequency> = (start..=end)
                .map(|number| NumberFrequency {
                    number,
                    frequency: table.get(number),
                })
                .collect();
            numbers.sort_by(|a, b| b.frequency.cmp(&a.frequency));

            Section {
                label: format!("{}-{}", start, end),
                start,
                end,
                total: numbers.iter().map(|n| n.frequency).sum(),
                numbers,
            }
        })
        .collect()
}

/// Weighted by frequency, not by distinct numbers.
pub fn odd_even_distribution(table: &FrequencyTable) -> OddEvenDistribution {
    let (odd, even) = table
        .iter()
        .fold((0u32, 0u32), |(odd, even), (number, count)| {
            if number % 2 == 1 {
                (odd + count, even)
            } else {
                (odd, even + count)
            }
        });
    let total = odd + even;

    OddEvenDistribution {
        odd: share(odd, total),
        even: share(even, total),
    }
}

/// Each draw counts at most once per pattern.
pub fn consecutive_patterns(draws: &[Draw]) -> ConsecutivePatterns {
    let mut pairs = 0;
    let mut triples = 0;

    for draw in draws {
        let numbers = draw.numbers.numbers();
        if numbers.windows(2).any(|w| w[1] - w[0] == 1) {
            pairs += 1;
        }
        if numbers
            .windows(3)
            .any(|w| w[1] - w[0] == 1 && w[2] - w[1] == 1)
        {
            triples += 1;
        }
    }

    let total_draws = draws.len() as u32;
    ConsecutivePatterns {
        total_draws,
        consecutive_pairs: share(pairs, total_draws),
        consecutive_triples: share(triples, total_draws),
    }
}

/// `None` when there is nothing to aggregate.
pub fn sum_distribution(draws: &[Draw]) -> Option<SumDistribution> {
    let sums: Vec<u32> = draws.iter().map(|draw| draw.numbers.sum()).collect();
    let min_sum = *sums.iter().min()?;
    let max_sum = *sums.iter().max()?;
    let average_sum = sums.iter().map(|&s| f64::from(s)).sum::<f64>() / sums.len() as f64;

    let ranges: Vec<SumBucket> = SUM_RANGES
        .iter()
        .map(|&(start, end)| SumBucket {
            label: format!("{}-{}", start, end),
            start,
            end,
            count: sums.iter().filter(|&&s| s >= start && s <= end).count() as u32,
        })
        .collect();

    let mut most_common_range: Option<&SumBucket> = None;
    for bucket in &ranges {
        let best = most_common_range.map_or(0, |b| b.count);
        if bucket.count > best {
            most_common_range = Some(bucket);
        }
    }
    let most_common_range = most_common_range.cloned();

    Some(SumDistribution {
        min_sum,
        max_sum,
        average_sum,
        ranges,
        most_common_range,
    })
}

fn share(count: u32, total: u32) -> Share {
    let percentage = if total == 0 {
        0.0
    } else {
        f64::from(count) / f64::from(total) * 100.0
    };
    Share { count, percentage }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AnalysisPeriod {
    Recent,
    Quarter,
    Half,
    Year,
}

impl AnalysisPeriod {
    pub fn rounds(&self) -> usize {
        match self {
            AnalysisPeriod::Recent => 30,
            AnalysisPeriod::Quarter => 13,
            AnalysisPeriod::Half => 26,
            AnalysisPeriod::Year => 52,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AnalysisPeriod::Recent => "최근 30회차",
            AnalysisPeriod::Quarter => "최근 13회차 (약 3개월)",
            AnalysisPeriod::Half => "최근 26회차 (약 6개월)",
            AnalysisPeriod::Year => "최근 52회차 (약 1년)",
        }
    }
}

impl FromStr for AnalysisPeriod {
    type Err = LottoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recent" => Ok(AnalysisPeriod::Recent),
            "quarter" => Ok(AnalysisPeriod::Quarter),
            "half" => Ok(AnalysisPeriod::Half),
            "year" => Ok(AnalysisPeriod::Year),
            other => Err(LottoError::UnknownPeriod(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub period: AnalysisPeriod,
    pub label: String,
    pub rounds: usize,
    pub date_range: String,
    pub frequency: Vec<NumberFrequency>,
    pub hot_cold: HotCold,
    pub sections: Vec<Section>,
    pub odd_even: OddEvenDistribution,
    pub consecutive_patterns: ConsecutivePatterns,
    pub sum_analysis: Option<SumDistribution>,
    pub most_recent_draw: Option<Draw>,
}

/// Summary over the first `period.rounds()` draws of a most-recent-first slice.
pub fn generate_statistics(draws: &[Draw], period: AnalysisPeriod) -> Statistics {
    let window = &draws[..draws.len().min(period.rounds())];
    let table = frequency_table(window);

    let date_range = match (window.last(), window.first()) {
        (Some(oldest), Some(newest)) => format!("{} ~ {}", oldest.date, newest.date),
        _ => String::new(),
    };

    Statistics {
        period,
        label: period.label().to_string(),
        rounds: window.len(),
        date_range,
        frequency: table
            .iter()
            .map(|(number, frequency)| NumberFrequency { number, frequency })
            .collect(),
        hot_cold: hot_cold_split(&table),
        sections: section_distribution(&table),
        odd_even: odd_even_distribution(&table),
        consecutive_patterns: consecutive_patterns(window),
        sum_analysis: sum_distribution(window),
        most_recent_draw: window.first().cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NumberSet;
    use chrono::{Days, NaiveDate};

    fn draw(round: u32, numbers: [u8; 6], bonus: i64) -> Draw {
        let date = NaiveDate::from_ymd_opt(2002, 12, 7)
            .unwrap()
            .checked_add_days(Days::new(u64::from(round - 1) * 7))
            .unwrap();
        Draw::new(round, date, NumberSet::new(&numbers).unwrap(), bonus).unwrap()
    }

    fn sample_draws() -> Vec<Draw> {
        vec![
            draw(3, [7, 8, 9, 20, 30, 40], 45),
            draw(2, [1, 7, 14, 21, 28, 35], 2),
            draw(1, [7, 12, 24, 33, 38, 44], 8),
        ]
    }

    #[test]
    fn test_frequency_counts_bonus() {
        let table = frequency_table(&sample_draws());
        assert_eq!(table.get(7), 3);
        assert_eq!(table.get(8), 2);
        assert_eq!(table.get(45), 1);
        assert_eq!(table.get(2), 1);
        assert_eq!(table.get(3), 0);
        assert_eq!(table.total(), 21);
    }

    #[test]
    fn test_number_in_every_draw() {
        let draws: Vec<Draw> = (1..=20)
            .map(|round| draw(round, [3, 7, 15, 22, 31, 44], 1))
            .collect();
        let table = frequency_table(&draws);
        assert_eq!(table.get(7), 20);
        assert_eq!(table.get(1), 20);
    }

    #[test]
    fn test_hot_cold_split() {
        let table = frequency_table(&sample_draws());
        let split = hot_cold_split(&table);
        assert_eq!(split.hot_numbers.len(), 10);
        assert_eq!(split.cold_numbers.len(), 10);
        assert_eq!(
            split.hot_numbers[0],
            NumberFrequency {
                number: 7,
                frequency: 3
            }
        );
        assert_eq!(split.hot_numbers[1].number, 8);
        assert!(split.cold_numbers.iter().all(|n| n.frequency == 0));
        // Stable sort keeps ascending numbers among ties; reversing puts 43 first.
        assert_eq!(split.cold_numbers[0].number, 43);
    }

    #[test]
    fn test_section_distribution() {
        let sections = section_distribution(&frequency_table(&sample_draws()));
        assert_eq!(sections.len(), 5);
        assert_eq!(sections[0].label, "1-10");
        assert_eq!(sections[0].total, 8);
        assert_eq!(sections[0].numbers[0].number, 7);
        assert_eq!(sections[4].label, "41-45");
        assert_eq!(sections[4].numbers.len(), 5);
        let total: u32 = sections.iter().map(|s| s.total).sum();
        assert_eq!(total, 21);
    }

    #[test]
    fn test_odd_even_weighted() {
        let dist = odd_even_distribution(&frequency_table(&sample_draws()));
        assert_eq!(dist.odd.count + dist.even.count, 21);
        assert_eq!(dist.odd.count, 9);
        assert!((dist.odd.percentage + dist.even.percentage - 100.0).abs() < 1e-9);

        let empty = odd_even_distribution(&frequency_table(&[]));
        assert_eq!(empty.odd.percentage, 0.0);
    }

    #[test]
    fn test_consecutive_patterns_once_per_draw() {
        let patterns = consecutive_patterns(&sample_draws());
        assert_eq!(patterns.total_draws, 3);
        assert_eq!(patterns.consecutive_pairs.count, 1);
        assert_eq!(patterns.consecutive_triples.count, 1);

        let doubles = vec![draw(1, [1, 2, 10, 11, 20, 21], 30)];
        let patterns = consecutive_patterns(&doubles);
        assert_eq!(patterns.consecutive_pairs.count, 1);
        assert_eq!(patterns.consecutive_triples.count, 0);
        assert_eq!(patterns.consecutive_pairs.percentage, 100.0);
    }

    #[test]
    fn test_sum_distribution() {
        let dist = sum_distribution(&sample_draws()).unwrap();
        assert_eq!(dist.min_sum, 106);
        assert_eq!(dist.max_sum, 158);
        assert!((dist.average_sum - 126.0).abs() < 1e-9);
        assert_eq!(dist.ranges[1].count, 2);
        assert_eq!(dist.ranges[2].count, 0);
        assert_eq!(dist.ranges[3].count, 1);
        assert_eq!(dist.most_common_range.unwrap().label, "91-120");

        assert_eq!(sum_distribution(&[]), None);
    }

    #[test]
    fn test_generate_statistics_window() {
        let draws: Vec<Draw> = (1..=40)
            .rev()
            .map(|round| draw(round, [3, 7, 15, 22, 31, 44], 1))
            .collect();
        let stats = generate_statistics(&draws, AnalysisPeriod::Quarter);
        assert_eq!(stats.rounds, 13);
        assert_eq!(stats.most_recent_draw.unwrap().round, 40);
        assert_eq!(stats.frequency.len(), 45);
        assert_eq!(stats.frequency[6].frequency, 13);
        assert_eq!(stats.date_range, format!("{} ~ {}", draws[12].date, draws[0].date));

        let short = generate_statistics(&draws[..5], AnalysisPeriod::Year);
        assert_eq!(short.rounds, 5);
    }

    #[test]
    fn test_period_parsing() {
        assert_eq!("half".parse::<AnalysisPeriod>(), Ok(AnalysisPeriod::Half));
        assert!("decade".parse::<AnalysisPeriod>().is_err());
    }
}
