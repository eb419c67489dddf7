use crate::database::{check_existing_rounds, save_multiple_draws};
use crate::types::{Draw, LottoNumberResponse};
use crate::utils::estimate_current_round;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::Connection;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_API_URL: &str = "https://www.dhlottery.co.kr/common.do";

/// How far back to look when the estimated latest round is not published yet.
const LATEST_LOOKBACK: u32 = 10;

pub async fn fetch_lottery_number(base_url: &str, round: u32) -> Result<LottoNumberResponse> {
    let client = reqwest::Client::new();
    let round_param = round.to_string();

    let response = client
        .get(base_url)
        .query(&[("method", "getLottoNumber"), ("drwNo", round_param.as_str())])
        .timeout(Duration::from_secs(10))
        .send()
        .await?
        .error_for_status()?;

    let lottery_response: LottoNumberResponse = response.json().await?;
    Ok(lottery_response)
}

/// `Ok(None)` when the round is unknown or not drawn yet.
pub async fn fetch_draw(base_url: &str, round: u32) -> Result<Option<Draw>> {
    let response = fetch_lottery_number(base_url, round).await?;
    if !response.is_success() {
        return Ok(None);
    }

    let draw = response
        .into_draw()
        .with_context(|| format!("Malformed draw record for round {}", round))?;
    Ok(Some(draw))
}

pub async fn fetch_latest_draw(base_url: &str, today: NaiveDate) -> Result<Option<Draw>> {
    let estimated = estimate_current_round(today);

    for offset in 0..LATEST_LOOKBACK {
        let Some(round) = estimated.checked_sub(offset).filter(|&r| r > 0) else {
            break;
        };
        match fetch_draw(base_url, round).await {
            Ok(Some(draw)) => return Ok(Some(draw)),
            Ok(None) => info!("Round {} not published yet", round),
            Err(e) => warn!("✗ Error fetching round {}: {}", round, e),
        }
    }

    Ok(None)
}

pub async fn fetch_and_save_missing_rounds(
    conn: &Connection,
    base_url: &str,
    rounds: &[u32],
) -> Result<Vec<Draw>> {
    info!("🔍 Checking existing rounds in database...");
    let (rounds_to_fetch, existing_rounds) = check_existing_rounds(conn, rounds)?;

    if !existing_rounds.is_empty() {
        info!("📋 {} rounds already stored", existing_rounds.len());
    }

    if rounds_to_fetch.is_empty() {
        info!("🎯 All requested rounds already exist in database. No fetching needed!");
        return Ok(Vec::new());
    }

    info!("📥 Need to fetch {} new rounds", rounds_to_fetch.len());

    let mut all_draws = Vec::new();

    for (i, round) in rounds_to_fetch.iter().copied().enumerate() {
        if i > 0 {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        match fetch_draw(base_url, round).await {
            Ok(Some(draw)) => {
                info!(
                    "✓ Round {} ({}) fetched: {} + {}",
                    round, draw.date, draw.numbers, draw.bonus
                );
                all_draws.push(draw);
            }
            Ok(None) => warn!("⚠ No draw result published for round {}", round),
            Err(e) => warn!("✗ Error fetching round {}: {}", round, e),
        }
    }

    if !all_draws.is_empty() {
        let inserted = save_multiple_draws(conn, &all_draws)?;
        info!("🎯 Saved {} new draws to database", inserted);
    } else {
        warn!("⚠ No new draws were fetched and saved.");
    }

    Ok(all_draws)
}
