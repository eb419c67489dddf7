use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_NUMBER: u8 = 1;
pub const MAX_NUMBER: u8 = 45;
pub const PICK_COUNT: usize = 6;

/// Precondition failures raised by the core before any computation happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LottoError {
    InvalidNumberCount(usize),
    NumberOutOfRange(i64),
    DuplicateNumber(u8),
    InvalidBonus(i64),
    InvalidRound(u32),
    InvalidAmount(i64),
    InvalidRange { min: u8, max: u8 },
    SampleRangeTooSmall { count: usize, min: u8, max: u8 },
    UnknownStrategy(String),
    UnknownPeriod(String),
    InvalidDate(String),
    MissingField(&'static str),
}

impl fmt::Display for LottoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LottoError::InvalidNumberCount(n) => {
                write!(f, "expected {} numbers, got {}", PICK_COUNT, n)
            }
            LottoError::NumberOutOfRange(n) => {
                write!(f, "number {} is outside {}-{}", n, MIN_NUMBER, MAX_NUMBER)
            }
            LottoError::DuplicateNumber(n) => write!(f, "number {} appears more than once", n),
            LottoError::InvalidBonus(n) => {
                write!(f, "bonus number {} is out of range or among the main numbers", n)
            }
            LottoError::InvalidRound(r) => write!(f, "invalid round {}", r),
            LottoError::InvalidAmount(a) => write!(f, "amount must be positive, got {}", a),
            LottoError::InvalidRange { min, max } => {
                write!(f, "empty range: min {} is greater than max {}", min, max)
            }
            LottoError::SampleRangeTooSmall { count, min, max } => write!(
                f,
                "cannot pick {} distinct numbers from {}-{}",
                count, min, max
            ),
            LottoError::UnknownStrategy(id) => write!(f, "unknown strategy: {}", id),
            LottoError::UnknownPeriod(id) => write!(f, "unknown analysis period: {}", id),
            LottoError::InvalidDate(d) => write!(f, "invalid draw date: {}", d),
            LottoError::MissingField(name) => write!(f, "draw record is missing {}", name),
        }
    }
}

impl std::error::Error for LottoError {}

pub fn checked_number(value: i64) -> Result<u8, LottoError> {
    if value < i64::from(MIN_NUMBER) || value > i64::from(MAX_NUMBER) {
        return Err(LottoError::NumberOutOfRange(value));
    }
    Ok(value as u8)
}

/// Six distinct numbers in 1..=45, always kept ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<i64>")]
pub struct NumberSet([u8; PICK_COUNT]);

impl NumberSet {
    pub fn new(numbers: &[u8]) -> Result<Self, LottoError> {
        Self::from_values(numbers.iter().map(|&n| i64::from(n)))
    }

    /// Validates raw user input: exact count, range, then duplicates.
    pub fn from_values<I>(values: I) -> Result<Self, LottoError>
    where
        I: IntoIterator<Item = i64>,
    {
        let values: Vec<i64> = values.into_iter().collect();
        if values.len() != PICK_COUNT {
            return Err(LottoError::InvalidNumberCount(values.len()));
        }

        let mut numbers = [0u8; PICK_COUNT];
        for (slot, &value) in numbers.iter_mut().zip(&values) {
            *slot = checked_number(value)?;
        }
        numbers.sort_unstable();

        if let Some(pair) = numbers.windows(2).find(|w| w[0] == w[1]) {
            return Err(LottoError::DuplicateNumber(pair[0]));
        }

        Ok(Self(numbers))
    }

    pub fn numbers(&self) -> &[u8; PICK_COUNT] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().copied()
    }

    pub fn contains(&self, number: u8) -> bool {
        self.0.binary_search(&number).is_ok()
    }

    /// Numbers present in both sets, ascending.
    pub fn common_numbers(&self, other: &NumberSet) -> Vec<u8> {
        self.iter().filter(|&n| other.contains(n)).collect()
    }

    pub fn sum(&self) -> u32 {
        self.iter().map(u32::from).sum()
    }
}

impl TryFrom<Vec<i64>> for NumberSet {
    type Error = LottoError;

    fn try_from(values: Vec<i64>) -> Result<Self, Self::Error> {
        Self::from_values(values)
    }
}

impl fmt::Display for NumberSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}", joined)
    }
}

/// One official result. The prize fields are absent in the plain history
/// dataset and default to zero there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "DrawRecord")]
pub struct Draw {
    pub round: u32,
    pub date: NaiveDate,
    pub numbers: NumberSet,
    pub bonus: u8,
    pub first_prize_amount: u64,
    pub first_prize_winners: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_sales: Option<u64>,
}

impl Draw {
    pub fn new(
        round: u32,
        date: NaiveDate,
        numbers: NumberSet,
        bonus: i64,
    ) -> Result<Self, LottoError> {
        if round == 0 {
            return Err(LottoError::InvalidRound(round));
        }
        let bonus = checked_number(bonus).map_err(|_| LottoError::InvalidBonus(bonus))?;
        if numbers.contains(bonus) {
            return Err(LottoError::InvalidBonus(i64::from(bonus)));
        }

        Ok(Self {
            round,
            date,
            numbers,
            bonus,
            first_prize_amount: 0,
            first_prize_winners: 0,
            total_sales: None,
        })
    }

    pub fn with_first_prize(mut self, amount: u64, winners: u32) -> Self {
        self.first_prize_amount = amount;
        self.first_prize_winners = winners;
        self
    }

    pub fn with_total_sales(mut self, total_sales: Option<u64>) -> Self {
        self.total_sales = total_sales;
        self
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DrawRecord {
    round: u32,
    date: NaiveDate,
    numbers: Vec<i64>,
    bonus: i64,
    #[serde(default)]
    first_prize_amount: u64,
    #[serde(default)]
    first_prize_winners: u32,
    #[serde(default)]
    total_sales: Option<u64>,
}

impl TryFrom<DrawRecord> for Draw {
    type Error = LottoError;

    fn try_from(record: DrawRecord) -> Result<Self, Self::Error> {
        let numbers = NumberSet::from_values(record.numbers)?;
        Ok(Draw::new(record.round, record.date, numbers, record.bonus)?
            .with_first_prize(record.first_prize_amount, record.first_prize_winners)
            .with_total_sales(record.total_sales))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaxBracket {
    Exempt,
    Standard,
    HighValue,
}

impl TaxBracket {
    pub fn income_rate_percent(&self) -> u64 {
        match self {
            TaxBracket::Exempt => 0,
            TaxBracket::Standard => 22,
            TaxBracket::HighValue => 33,
        }
    }

    /// Income tax plus the 10% local surcharge on it.
    pub fn rate_percent(&self) -> f64 {
        match self {
            TaxBracket::Exempt => 0.0,
            TaxBracket::Standard => 24.2,
            TaxBracket::HighValue => 36.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxBreakdown {
    pub original_amount: u64,
    pub income_tax: u64,
    pub local_tax: u64,
    pub total_tax: u64,
    pub net_amount: u64,
    pub tax_rate_percent: f64,
    pub bracket: TaxBracket,
}

impl TaxBreakdown {
    pub fn effective_rate_percent(&self) -> f64 {
        self.total_tax as f64 / self.original_amount as f64 * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrizeTier {
    First,
    Second,
    Third,
    Fourth,
    Fifth,
}

impl PrizeTier {
    pub fn rank(&self) -> u8 {
        match self {
            PrizeTier::First => 1,
            PrizeTier::Second => 2,
            PrizeTier::Third => 3,
            PrizeTier::Fourth => 4,
            PrizeTier::Fifth => 5,
        }
    }

    /// Payout that does not depend on the draw. The first prize is always
    /// read from the draw record instead.
    pub fn fixed_payout(&self) -> Option<u64> {
        match self {
            PrizeTier::First => None,
            PrizeTier::Second => Some(50_000_000),
            PrizeTier::Third => Some(1_500_000),
            PrizeTier::Fourth => Some(50_000),
            PrizeTier::Fifth => Some(5_000),
        }
    }

    pub fn is_approximate(&self) -> bool {
        matches!(self, PrizeTier::Second | PrizeTier::Third)
    }

    pub fn label(&self) -> String {
        format!("{}등", self.rank())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub user_numbers: NumberSet,
    pub draw: Draw,
    pub match_count: u8,
    pub matched_numbers: Vec<u8>,
    pub bonus_matched: bool,
    pub prize_tier: Option<PrizeTier>,
    pub prize_description: String,
}

impl VerificationResult {
    pub fn is_winner(&self) -> bool {
        self.prize_tier.is_some()
    }

    pub fn payout(&self) -> u64 {
        match self.prize_tier {
            Some(PrizeTier::First) => self.draw.first_prize_amount,
            Some(tier) => tier.fixed_payout().unwrap_or(0),
            None => 0,
        }
    }
}

/// Raw `getLottoNumber` payload. Only `returnValue` is present when the
/// round does not exist yet.
#[derive(Deserialize, Debug)]
pub struct LottoNumberResponse {
    #[serde(rename = "returnValue")]
    pub return_value: String,
    #[serde(rename = "drwNo")]
    pub round: Option<u32>,
    #[serde(rename = "drwNoDate")]
    pub date: Option<String>,
    #[serde(rename = "drwtNo1")]
    pub number1: Option<i64>,
    #[serde(rename = "drwtNo2")]
    pub number2: Option<i64>,
    #[serde(rename = "drwtNo3")]
    pub number3: Option<i64>,
    #[serde(rename = "drwtNo4")]
    pub number4: Option<i64>,
    #[serde(rename = "drwtNo5")]
    pub number5: Option<i64>,
    #[serde(rename = "drwtNo6")]
    pub number6: Option<i64>,
    #[serde(rename = "bnusNo")]
    pub bonus: Option<i64>,
    #[serde(rename = "firstWinamnt")]
    pub first_win_amount: Option<u64>,
    #[serde(rename = "firstPrzwnerCo")]
    pub first_winner_count: Option<u32>,
    #[serde(rename = "totSellamnt")]
    pub total_sell_amount: Option<u64>,
}

impl LottoNumberResponse {
    pub fn is_success(&self) -> bool {
        self.return_value == "success"
    }

    pub fn into_draw(self) -> Result<Draw, LottoError> {
        let round = self.round.ok_or(LottoError::MissingField("drwNo"))?;
        let raw_date = self.date.ok_or(LottoError::MissingField("drwNoDate"))?;
        let date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d")
            .map_err(|_| LottoError::InvalidDate(raw_date.clone()))?;

        let numbers = [
            self.number1.ok_or(LottoError::MissingField("drwtNo1"))?,
            self.number2.ok_or(LottoError::MissingField("drwtNo2"))?,
            self.number3.ok_or(LottoError::MissingField("drwtNo3"))?,
            self.number4.ok_or(LottoError::MissingField("drwtNo4"))?,
            self.number5.ok_or(LottoError::MissingField("drwtNo5"))?,
            self.number6.ok_or(LottoError::MissingField("drwtNo6"))?,
        ];
        let bonus = self.bonus.ok_or(LottoError::MissingField("bnusNo"))?;

        Ok(Draw::new(round, date, NumberSet::from_values(numbers)?, bonus)?
            .with_first_prize(
                self.first_win_amount.unwrap_or(0),
                self.first_winner_count.unwrap_or(0),
            )
            .with_total_sales(self.total_sell_amount))
    }
}
