use chrono::NaiveDate;

/// Round 1 was drawn on this Saturday; one round per week since.
pub const FIRST_DRAW_DATE: (i32, u32, u32) = (2002, 12, 7);

pub fn format_number(value: u64) -> String {
    let digits = value.to_string();
    let mut formatted = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(ch);
    }
    formatted
}

pub fn format_won(amount: u64) -> String {
    format!("{}원", format_number(amount))
}

pub fn first_draw_date() -> NaiveDate {
    let (year, month, day) = FIRST_DRAW_DATE;
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

/// Round expected to be drawn on or before `today`. Zero before the first draw.
pub fn estimate_current_round(today: NaiveDate) -> u32 {
    let days = (today - first_draw_date()).num_days();
    if days < 0 {
        return 0;
    }
    (days / 7) as u32 + 1
}

/// Rounds after `latest_stored` up to and including `current`.
pub fn generate_rounds_to_fetch(latest_stored: Option<u32>, current: u32) -> Vec<u32> {
    let start = latest_stored.map_or(1, |round| round + 1);
    (start..=current).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(50_000_000), "50,000,000");
        assert_eq!(format_won(5_000), "5,000원");
    }

    #[test]
    fn test_estimate_current_round() {
        let day = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(estimate_current_round(day(2002, 12, 6)), 0);
        assert_eq!(estimate_current_round(day(2002, 12, 7)), 1);
        assert_eq!(estimate_current_round(day(2002, 12, 13)), 1);
        assert_eq!(estimate_current_round(day(2002, 12, 14)), 2);
        assert_eq!(estimate_current_round(day(2025, 9, 20)), 1190);
    }

    #[test]
    fn test_generate_rounds_to_fetch() {
        assert_eq!(generate_rounds_to_fetch(Some(1188), 1190), vec![1189, 1190]);
        assert_eq!(generate_rounds_to_fetch(Some(1190), 1190), Vec::<u32>::new());
        assert_eq!(generate_rounds_to_fetch(None, 3), vec![1, 2, 3]);
    }
}
