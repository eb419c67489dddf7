use anyhow::Result;
use chrono::Local;
use lotto645::api::{fetch_and_save_missing_rounds, fetch_latest_draw};
use lotto645::config;
use lotto645::database::{create_database, get_latest_draws, get_latest_round, import_history_json};
use lotto645::reports::generate_and_save_report_to_path;
use lotto645::statistics::{AnalysisPeriod, generate_statistics};
use lotto645::strategy::Strategy;
use lotto645::utils::{estimate_current_round, generate_rounds_to_fetch};
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let config = config::load()?;
    let conn = create_database(&config.database_url)?;

    let history_path = Path::new(&config.history_path);
    if history_path.exists() {
        info!("Reading file: {:?}", history_path);
        let raw_json_string = fs::read_to_string(history_path)?;
        match import_history_json(&conn, &raw_json_string) {
            Ok(inserted) => info!("🎟️ {} rounds imported from history file.", inserted),
            Err(e) => error!("❌ Failed to import {:?}: {:#}", history_path, e),
        }
    } else {
        info!("No history file at {:?}, skipping import", history_path);
    }

    if config.sync {
        let today = Local::now().date_naive();
        let current = match fetch_latest_draw(&config.api_url, today).await {
            Ok(Some(draw)) => draw.round,
            Ok(None) => estimate_current_round(today),
            Err(e) => {
                warn!("⚠ Could not find the latest published round: {:#}", e);
                estimate_current_round(today)
            }
        };
        let rounds_to_fetch = generate_rounds_to_fetch(get_latest_round(&conn)?, current);

        info!("🎲 Starting draw batch fetch and save...");
        match fetch_and_save_missing_rounds(&conn, &config.api_url, &rounds_to_fetch).await {
            Ok(draws) => info!("✅ Sync finished, {} draws added.", draws.len()),
            Err(e) => error!("❌ Error during batch operation: {:#}", e),
        }
    }

    let recent = get_latest_draws(&conn, AnalysisPeriod::Year.rounds() as u32)?;
    if recent.is_empty() {
        warn!("⚠ No draw data found in database.");
        return Ok(());
    }

    let stats = generate_statistics(&recent, AnalysisPeriod::Recent);
    info!("📊 {} ({}, {} draws)", stats.label, stats.date_range, stats.rounds);
    let hot: Vec<u8> = stats.hot_cold.hot_numbers.iter().map(|n| n.number).collect();
    let cold: Vec<u8> = stats.hot_cold.cold_numbers.iter().map(|n| n.number).collect();
    info!("🔥 Hot: {:?}", hot);
    info!("❄️ Cold: {:?}", cold);
    if let Some(sums) = &stats.sum_analysis {
        info!(
            "➕ Sum range {}-{}, average {:.1}",
            sums.min_sum, sums.max_sum, sums.average_sum
        );
    }

    let mut rng = rand::rng();
    for strategy in Strategy::ALL {
        match strategy.generate(&mut rng) {
            Ok(numbers) => info!("🎱 {}: {}", strategy.name(), numbers),
            Err(e) => error!("❌ {} failed: {}", strategy.name(), e),
        }
    }

    info!("📋 Generating HTML report for the latest draw...");
    let latest = &recent[0];
    match generate_and_save_report_to_path(&conn, latest.round, &config.report_path) {
        Ok(path) => info!("✅ Report generated for round {} at {:?}", latest.round, path),
        Err(e) => error!("❌ Failed to generate report for round {}: {:#}", latest.round, e),
    }

    Ok(())
}
