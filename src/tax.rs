use crate::types::{LottoError, TaxBracket, TaxBreakdown};

pub const TAX_FREE_LIMIT: u64 = 50_000_000;
pub const STANDARD_LIMIT: u64 = 300_000_000;

/// Local tax is 10% of the already floored income tax.
const LOCAL_TAX_PERCENT: u64 = 10;

pub fn bracket_for(amount: u64) -> TaxBracket {
    if amount <= TAX_FREE_LIMIT {
        TaxBracket::Exempt
    } else if amount <= STANDARD_LIMIT {
        TaxBracket::Standard
    } else {
        TaxBracket::HighValue
    }
}

/// Tiered withholding on a prize. Every step truncates to whole won.
pub fn compute_tax(amount: i64) -> Result<TaxBreakdown, LottoError> {
    if amount <= 0 {
        return Err(LottoError::InvalidAmount(amount));
    }
    let original_amount = amount as u64;
    let bracket = bracket_for(original_amount);

    let income_tax = percent_floor(original_amount, bracket.income_rate_percent());
    let local_tax = percent_floor(income_tax, LOCAL_TAX_PERCENT);
    let total_tax = income_tax + local_tax;

    Ok(TaxBreakdown {
        original_amount,
        income_tax,
        local_tax,
        total_tax,
        net_amount: original_amount - total_tax,
        tax_rate_percent: bracket.rate_percent(),
        bracket,
    })
}

fn percent_floor(value: u64, percent: u64) -> u64 {
    (u128::from(value) * u128::from(percent) / 100) as u64
}
