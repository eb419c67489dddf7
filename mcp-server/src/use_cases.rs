use anyhow::{Result, anyhow, bail};
use chrono::Local;
use rusqlite::Connection;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use lotto645::api::fetch_and_save_missing_rounds;
use lotto645::database::{
    get_draw_by_round, get_latest_draws, get_latest_round, import_history_json,
};
use lotto645::favorites::{Favorites, SqliteStore, WinnerSubmission};
use lotto645::reports::generate_and_save_report_to_path;
use lotto645::statistics::{AnalysisPeriod, generate_statistics};
use lotto645::strategy::{Strategy, generate_batch};
use lotto645::tax::compute_tax;
use lotto645::types::{Draw, NumberSet};
use lotto645::utils::{estimate_current_round, generate_rounds_to_fetch};
use lotto645::verify::verify;

const MAX_BATCH: i64 = 20;
const DEFAULT_LATEST_LIMIT: i64 = 10;
const DEFAULT_FETCH_LIMIT: usize = 20;

fn required_str<'a>(arguments: &'a HashMap<String, Value>, key: &str) -> Result<&'a str> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("Missing {} parameter", key))
}

fn optional_i64(arguments: &HashMap<String, Value>, key: &str) -> Result<Option<i64>> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| anyhow!("{} must be an integer", key)),
    }
}

fn required_i64(arguments: &HashMap<String, Value>, key: &str) -> Result<i64> {
    optional_i64(arguments, key)?.ok_or_else(|| anyhow!("Missing {} parameter", key))
}

fn required_round(arguments: &HashMap<String, Value>) -> Result<u32> {
    let round = required_i64(arguments, "round")?;
    u32::try_from(round)
        .ok()
        .filter(|&r| r > 0)
        .ok_or_else(|| anyhow!("round must be a positive integer, got {}", round))
}

fn integer_list(arguments: &HashMap<String, Value>, key: &str) -> Result<Vec<i64>> {
    let values = arguments
        .get(key)
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow!("Missing {} parameter", key))?;

    values
        .iter()
        .map(|v| {
            v.as_i64()
                .ok_or_else(|| anyhow!("{} must only contain integers", key))
        })
        .collect()
}

/// Validated before any draw lookup so bad tickets report the ticket error.
fn user_numbers(arguments: &HashMap<String, Value>) -> Result<NumberSet> {
    Ok(NumberSet::from_values(integer_list(arguments, "numbers")?)?)
}

/// Draw for `round`, or the most recent stored draw when no round is given.
fn target_draw(connection: &Connection, arguments: &HashMap<String, Value>) -> Result<Draw> {
    if arguments.contains_key("round") {
        let round = required_round(arguments)?;
        return get_draw_by_round(connection, round)?
            .ok_or_else(|| anyhow!("No draw stored for round {}", round));
    }

    get_latest_draws(connection, 1)?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No draws stored yet"))
}

pub struct NumberUseCase;

impl NumberUseCase {
    pub fn new() -> Self {
        Self
    }

    pub async fn list_strategies(&self, _arguments: &HashMap<String, Value>) -> Result<String> {
        let strategies: Vec<Value> = Strategy::ALL
            .iter()
            .map(|s| {
                json!({
                    "id": s.id(),
                    "name": s.name(),
                    "description": s.description(),
                })
            })
            .collect();

        Ok(json!({
            "success": true,
            "strategies": strategies
        })
        .to_string())
    }

    pub async fn generate_numbers(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let strategy: Strategy = match arguments.get("strategy").and_then(|v| v.as_str()) {
            Some(id) => id.parse()?,
            None => Strategy::Random,
        };

        let count = optional_i64(arguments, "count")?.unwrap_or(1);
        if !(1..=MAX_BATCH).contains(&count) {
            bail!("count must be between 1 and {}", MAX_BATCH);
        }

        let mut rng = rand::rng();
        let sets = generate_batch(strategy, count as usize, &mut rng)?;

        Ok(json!({
            "success": true,
            "strategy": strategy.id(),
            "name": strategy.name(),
            "numbers": sets
        })
        .to_string())
    }

    pub async fn calculate_tax(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let amount = required_i64(arguments, "amount")?;
        let breakdown = compute_tax(amount)?;

        Ok(json!({
            "success": true,
            "tax": breakdown,
            "effectiveRatePercent": breakdown.effective_rate_percent()
        })
        .to_string())
    }
}

impl Default for NumberUseCase {
    fn default() -> Self {
        Self::new()
    }
}

pub struct DrawUseCase {
    connection: Arc<Connection>,
}

impl DrawUseCase {
    pub fn new(connection: Arc<Connection>) -> Self {
        Self { connection }
    }

    pub async fn get_draw(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let round = required_round(arguments)?;
        let draw = get_draw_by_round(&self.connection, round)?;

        Ok(json!({
            "success": true,
            "found": draw.is_some(),
            "draw": draw
        })
        .to_string())
    }

    pub async fn get_latest_draws(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let limit = optional_i64(arguments, "limit")?.unwrap_or(DEFAULT_LATEST_LIMIT);
        let limit = u32::try_from(limit).map_err(|_| anyhow!("limit must not be negative"))?;
        let draws = get_latest_draws(&self.connection, limit)?;

        Ok(json!({
            "success": true,
            "count": draws.len(),
            "draws": draws
        })
        .to_string())
    }

    pub async fn import_history_json(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let raw_json = match arguments.get("raw_json").and_then(|v| v.as_str()) {
            Some(raw) => raw.to_string(),
            None => {
                let path = required_str(arguments, "path")
                    .map_err(|_| anyhow!("Missing raw_json or path parameter"))?;
                fs::read_to_string(path)?
            }
        };

        let inserted = import_history_json(&self.connection, &raw_json)?;

        Ok(json!({
            "success": true,
            "inserted": inserted,
            "message": format!("Imported {} new rounds", inserted)
        })
        .to_string())
    }

    pub async fn verify_numbers(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let user = user_numbers(arguments)?;
        let draw = target_draw(&self.connection, arguments)?;
        let result = verify(&user, &draw);

        Ok(json!({
            "success": true,
            "isWinner": result.is_winner(),
            "result": result
        })
        .to_string())
    }

    pub async fn get_statistics(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let period: AnalysisPeriod = match arguments.get("period").and_then(|v| v.as_str()) {
            Some(p) => p.parse()?,
            None => AnalysisPeriod::Recent,
        };

        let draws = get_latest_draws(&self.connection, period.rounds() as u32)?;
        if draws.is_empty() {
            bail!("No draws stored yet");
        }
        let statistics = generate_statistics(&draws, period);

        Ok(json!({
            "success": true,
            "statistics": statistics
        })
        .to_string())
    }
}

pub struct ApiUseCase {
    connection: Arc<Connection>,
    api_url: String,
}

impl ApiUseCase {
    pub fn new(connection: Arc<Connection>, api_url: String) -> Self {
        Self {
            connection,
            api_url,
        }
    }

    /// Explicit `rounds`, or the next missing rounds up to the current estimate.
    pub async fn fetch_draws(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let rounds: Vec<u32> = if arguments.contains_key("rounds") {
            integer_list(arguments, "rounds")?
                .into_iter()
                .map(|r| {
                    u32::try_from(r)
                        .ok()
                        .filter(|&r| r > 0)
                        .ok_or_else(|| anyhow!("Invalid round {}", r))
                })
                .collect::<Result<_>>()?
        } else {
            let limit = match optional_i64(arguments, "limit")? {
                Some(l) => usize::try_from(l).map_err(|_| anyhow!("limit must not be negative"))?,
                None => DEFAULT_FETCH_LIMIT,
            };
            let current = estimate_current_round(Local::now().date_naive());
            let mut rounds =
                generate_rounds_to_fetch(get_latest_round(&self.connection)?, current);
            rounds.truncate(limit);
            rounds
        };

        let draws = fetch_and_save_missing_rounds(&self.connection, &self.api_url, &rounds)
            .await
            .map_err(|e| anyhow!("API error: {}", e))?;

        Ok(json!({
            "success": true,
            "requested": rounds.len(),
            "fetched": draws.len(),
            "draws": draws
        })
        .to_string())
    }
}

pub struct FavoritesUseCase {
    connection: Arc<Connection>,
    favorites: Favorites<SqliteStore>,
}

impl FavoritesUseCase {
    pub fn new(connection: Arc<Connection>) -> Self {
        let favorites = Favorites::new(SqliteStore::new(Arc::clone(&connection)));
        Self {
            connection,
            favorites,
        }
    }

    pub async fn add_favorite_numbers(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let numbers = user_numbers(arguments)?;
        let saved = self.favorites.add_favorite_numbers(&numbers)?;

        Ok(json!({
            "success": true,
            "favorite": saved
        })
        .to_string())
    }

    pub async fn list_favorite_numbers(&self, _arguments: &HashMap<String, Value>) -> Result<String> {
        let favorites = self.favorites.favorite_numbers()?;

        Ok(json!({
            "success": true,
            "favorites": favorites
        })
        .to_string())
    }

    pub async fn remove_favorite_numbers(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let id = required_i64(arguments, "id")?;
        let removed = self.favorites.remove_favorite_numbers(id)?;

        Ok(json!({
            "success": true,
            "removed": removed
        })
        .to_string())
    }

    pub async fn add_favorite_store(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let name = required_str(arguments, "name")?;
        let address = arguments.get("address").and_then(|v| v.as_str());
        let added = self.favorites.add_favorite_store(name, address)?;

        Ok(json!({
            "success": true,
            "added": added
        })
        .to_string())
    }

    pub async fn remove_favorite_store(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let name = required_str(arguments, "name")?;
        let removed = self.favorites.remove_favorite_store(name)?;

        Ok(json!({
            "success": true,
            "removed": removed
        })
        .to_string())
    }

    pub async fn list_favorite_stores(&self, _arguments: &HashMap<String, Value>) -> Result<String> {
        let stores = self.favorites.favorite_stores()?;

        Ok(json!({
            "success": true,
            "stores": stores
        })
        .to_string())
    }

    pub async fn submit_winner(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let user = user_numbers(arguments)?;
        let draw = target_draw(&self.connection, arguments)?;
        let result = verify(&user, &draw);

        let text = |key: &str| {
            arguments
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        let submission = WinnerSubmission {
            nickname: required_str(arguments, "nickname")?.to_string(),
            store_name: text("store_name"),
            store_location: text("store_location"),
            message: text("message"),
            agree_to_share: arguments
                .get("agree_to_share")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        };
        let record = self.favorites.submit_winner(&result, submission)?;

        Ok(json!({
            "success": true,
            "winner": record
        })
        .to_string())
    }

    pub async fn list_winners(&self, _arguments: &HashMap<String, Value>) -> Result<String> {
        let winners = self.favorites.winners()?;

        Ok(json!({
            "success": true,
            "winners": winners
        })
        .to_string())
    }
}

pub struct ReportUseCase {
    connection: Arc<Connection>,
    report_path: String,
}

impl ReportUseCase {
    pub fn new(connection: Arc<Connection>, report_path: String) -> Self {
        Self {
            connection,
            report_path,
        }
    }

    pub async fn generate_and_save_report(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let round = required_round(arguments)?;

        let path = generate_and_save_report_to_path(&self.connection, round, &self.report_path)
            .map_err(|e| anyhow!("Report generation error: {}", e))?;

        Ok(json!({
            "success": true,
            "path": path.display().to_string(),
            "message": format!("Report generated successfully for round: {}", round)
        })
        .to_string())
    }
}
