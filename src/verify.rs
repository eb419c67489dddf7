use crate::types::{Draw, LottoError, NumberSet, PrizeTier, VerificationResult};
use crate::utils::format_won;

/// Classifies `user_numbers` against `draw`. First matching rule wins:
/// 6 → 1st, 5 + bonus → 2nd, 5 → 3rd, 4 → 4th, 3 → 5th.
pub fn verify(user_numbers: &NumberSet, draw: &Draw) -> VerificationResult {
    let matched_numbers = user_numbers.common_numbers(&draw.numbers);
    let match_count = matched_numbers.len() as u8;
    let bonus_matched = user_numbers.contains(draw.bonus);

    let prize_tier = match (match_count, bonus_matched) {
        (6, _) => Some(PrizeTier::First),
        (5, true) => Some(PrizeTier::Second),
        (5, false) => Some(PrizeTier::Third),
        (4, _) => Some(PrizeTier::Fourth),
        (3, _) => Some(PrizeTier::Fifth),
        _ => None,
    };

    VerificationResult {
        user_numbers: *user_numbers,
        draw: draw.clone(),
        match_count,
        matched_numbers,
        bonus_matched,
        prize_tier,
        prize_description: describe_prize(prize_tier, draw),
    }
}

/// Validates raw input before looking at the draw.
pub fn verify_numbers(user_numbers: &[i64], draw: &Draw) -> Result<VerificationResult, LottoError> {
    let user_numbers = NumberSet::from_values(user_numbers.iter().copied())?;
    Ok(verify(&user_numbers, draw))
}

pub fn describe_prize(tier: Option<PrizeTier>, draw: &Draw) -> String {
    match tier {
        Some(PrizeTier::First) => format!("1등 - {}", format_won(draw.first_prize_amount)),
        Some(tier) => {
            let amount = format_won(tier.fixed_payout().unwrap_or(0));
            if tier.is_approximate() {
                format!("{} - 약 {}", tier.label(), amount)
            } else {
                format!("{} - {}", tier.label(), amount)
            }
        }
        None => "낙첨".to_string(),
    }
}
