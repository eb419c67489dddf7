use anyhow::{Result, bail};
use serde::Deserialize;
use std::env;

use crate::api::DEFAULT_API_URL;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database_url: String,
    pub report_path: String,
    pub api_url: String,
    pub history_path: String,
    pub sync: bool,
}

pub fn load() -> Result<Config> {
    let database_url = env::var("LOTTO_DB_PATH").unwrap_or_else(|_| "data/lotto.db".to_string());
    let report_path = env::var("LOTTO_REPORT_PATH").unwrap_or_else(|_| "reports".to_string());
    let api_url = env::var("LOTTO_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    let history_path =
        env::var("LOTTO_HISTORY_PATH").unwrap_or_else(|_| "data/lottoHistory.json".to_string());
    let sync = match env::var("LOTTO_SYNC") {
        Ok(raw) => parse_flag(&raw)?,
        Err(_) => false,
    };

    Ok(Config {
        database_url,
        report_path,
        api_url,
        history_path,
        sync,
    })
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("LOTTO_SYNC must be true or false, got {:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true").unwrap());
        assert!(parse_flag(" TRUE ").unwrap());
        assert!(parse_flag("1").unwrap());
        assert!(!parse_flag("false").unwrap());
        assert!(!parse_flag("").unwrap());
        assert!(parse_flag("maybe").is_err());
    }
}
