//! Saved number sets, favorite stores, and the submitted-winner log.
//!
//! Everything goes through [`KeyValueStore`], so the repository works the
//! same against SQLite or an in-memory map.

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use crate::database::{kv_get, kv_remove, kv_set};
use crate::types::{NumberSet, VerificationResult};

pub const FAVORITE_NUMBERS_KEY: &str = "favoriteNumbers";
pub const FAVORITE_STORES_KEY: &str = "favoriteStores";
pub const WINNING_HISTORY_KEY: &str = "winningHistory";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Backed by the `kv_store` table.
pub struct SqliteStore {
    connection: Arc<Connection>,
}

impl SqliteStore {
    pub fn new(connection: Arc<Connection>) -> Self {
        Self { connection }
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(kv_get(&self.connection, key)?)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        Ok(kv_set(&self.connection, key, value)?)
    }

    fn remove(&self, key: &str) -> Result<()> {
        Ok(kv_remove(&self.connection, key)?)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteNumbers {
    pub id: i64,
    pub numbers: NumberSet,
    pub created_at: DateTime<Utc>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteStore {
    pub name: String,
    pub address: Option<String>,
    pub favorite_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerSubmission {
    pub nickname: String,
    #[serde(default)]
    pub store_name: String,
    #[serde(default)]
    pub store_location: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub agree_to_share: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerRecord {
    pub id: i64,
    pub round: u32,
    pub user_numbers: NumberSet,
    pub rank: u8,
    pub prize: String,
    pub nickname: String,
    pub store_name: String,
    pub store_location: String,
    pub message: String,
    pub submitted_at: DateTime<Utc>,
}

pub struct Favorites<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> Favorites<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        match self.store.get(key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn save<T: Serialize>(&self, key: &str, items: &[T]) -> Result<()> {
        self.store.set(key, &serde_json::to_string(items)?)
    }

    pub fn favorite_numbers(&self) -> Result<Vec<FavoriteNumbers>> {
        self.load(FAVORITE_NUMBERS_KEY)
    }

    /// Newest first. Labels count up from the current list length.
    pub fn add_favorite_numbers(&self, numbers: &NumberSet) -> Result<FavoriteNumbers> {
        let mut saved: Vec<FavoriteNumbers> = self.favorite_numbers()?;
        let now = Utc::now();
        let entry = FavoriteNumbers {
            id: next_id(now, saved.iter().map(|f| f.id)),
            numbers: *numbers,
            created_at: now,
            name: format!("번호조합 {}", saved.len() + 1),
        };
        saved.insert(0, entry.clone());
        self.save(FAVORITE_NUMBERS_KEY, &saved)?;
        Ok(entry)
    }

    /// Returns false when no entry had that id.
    pub fn remove_favorite_numbers(&self, id: i64) -> Result<bool> {
        let mut saved: Vec<FavoriteNumbers> = self.favorite_numbers()?;
        let before = saved.len();
        saved.retain(|f| f.id != id);
        if saved.len() == before {
            return Ok(false);
        }
        self.save(FAVORITE_NUMBERS_KEY, &saved)?;
        Ok(true)
    }

    pub fn favorite_stores(&self) -> Result<Vec<FavoriteStore>> {
        self.load(FAVORITE_STORES_KEY)
    }

    /// Returns false when a store with the same name is already saved.
    pub fn add_favorite_store(&self, name: &str, address: Option<&str>) -> Result<bool> {
        let mut stores = self.favorite_stores()?;
        if stores.iter().any(|s| s.name == name) {
            return Ok(false);
        }
        stores.push(FavoriteStore {
            name: name.to_string(),
            address: address.map(str::to_string),
            favorite_at: Utc::now(),
        });
        self.save(FAVORITE_STORES_KEY, &stores)?;
        Ok(true)
    }

    pub fn remove_favorite_store(&self, name: &str) -> Result<bool> {
        let mut stores = self.favorite_stores()?;
        let before = stores.len();
        stores.retain(|s| s.name != name);
        if stores.len() == before {
            return Ok(false);
        }
        self.save(FAVORITE_STORES_KEY, &stores)?;
        Ok(true)
    }

    pub fn is_favorite_store(&self, name: &str) -> Result<bool> {
        Ok(self.favorite_stores()?.iter().any(|s| s.name == name))
    }

    pub fn winners(&self) -> Result<Vec<WinnerRecord>> {
        self.load(WINNING_HISTORY_KEY)
    }

    pub fn submit_winner(
        &self,
        result: &VerificationResult,
        submission: WinnerSubmission,
    ) -> Result<WinnerRecord> {
        let Some(tier) = result.prize_tier else {
            bail!("Only winning results can be submitted");
        };
        let nickname = submission.nickname.trim();
        if nickname.is_empty() {
            bail!("Nickname is required");
        }
        if !submission.agree_to_share {
            bail!("Consent to share the winning details is required");
        }

        let mut history: Vec<WinnerRecord> = self.winners()?;
        let now = Utc::now();
        let record = WinnerRecord {
            id: next_id(now, history.iter().map(|w| w.id)),
            round: result.draw.round,
            user_numbers: result.user_numbers,
            rank: tier.rank(),
            prize: result.prize_description.clone(),
            nickname: nickname.to_string(),
            store_name: submission.store_name,
            store_location: submission.store_location,
            message: submission.message,
            submitted_at: now,
        };
        history.insert(0, record.clone());
        self.save(WINNING_HISTORY_KEY, &history)?;
        Ok(record)
    }
}

/// Millisecond timestamp, bumped past any id already in use.
fn next_id(now: DateTime<Utc>, existing: impl Iterator<Item = i64>) -> i64 {
    let candidate = now.timestamp_millis();
    match existing.max() {
        Some(max) if max >= candidate => max + 1,
        _ => candidate,
    }
}
