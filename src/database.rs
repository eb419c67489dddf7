use crate::types::{Draw, LottoError, NumberSet};
use anyhow::Context;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Result, Row};
use std::fs;
use std::path::Path;
use tracing::info;

const DRAW_COLUMNS: &str = "round, draw_date, n1, n2, n3, n4, n5, n6, bonus,
    first_prize_amount, first_prize_winners, total_sales";

pub fn create_database(database_url: &str) -> anyhow::Result<Connection> {
    if let Some(parent) = Path::new(database_url).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }

    let conn = Connection::open(database_url)?;
    init_schema(&conn)?;
    info!("📁 Opened draw database at {}", database_url);
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS draws (
            round INTEGER PRIMARY KEY,
            draw_date TEXT NOT NULL,
            n1 INTEGER NOT NULL,
            n2 INTEGER NOT NULL,
            n3 INTEGER NOT NULL,
            n4 INTEGER NOT NULL,
            n5 INTEGER NOT NULL,
            n6 INTEGER NOT NULL,
            bonus INTEGER NOT NULL,
            first_prize_amount INTEGER NOT NULL DEFAULT 0,
            first_prize_winners INTEGER NOT NULL DEFAULT 0,
            total_sales INTEGER,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    Ok(())
}

fn row_to_draw(row: &Row<'_>) -> Result<Draw> {
    let round: u32 = row.get(0)?;
    let raw_date: String = row.get(1)?;
    let date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let mut values = Vec::with_capacity(6);
    for idx in 2..8 {
        values.push(row.get::<_, i64>(idx)?);
    }
    let bonus: i64 = row.get(8)?;

    let invalid = |e: LottoError| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Integer, Box::new(e))
    };
    let numbers = NumberSet::from_values(values).map_err(invalid)?;
    let draw = Draw::new(round, date, numbers, bonus).map_err(invalid)?;

    let first_prize_amount: i64 = row.get(9)?;
    let first_prize_winners: u32 = row.get(10)?;
    let total_sales: Option<i64> = row.get(11)?;

    let total_sales = total_sales.map(|s| from_sql_amount(11, s)).transpose()?;

    Ok(draw
        .with_first_prize(from_sql_amount(9, first_prize_amount)?, first_prize_winners)
        .with_total_sales(total_sales))
}

fn query_draws<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Draw>> {
    let mut stmt = conn.prepare(sql)?;
    let draw_iter = stmt.query_map(params, row_to_draw)?;

    let mut results = Vec::new();
    for draw in draw_iter {
        results.push(draw?);
    }
    Ok(results)
}

/// Returns true when a new row was written; existing rounds are left as they are.
pub fn save_draw(conn: &Connection, draw: &Draw) -> Result<bool> {
    let n = draw.numbers.numbers();
    let first_prize_amount = to_sql_amount(draw.first_prize_amount)?;
    let total_sales = draw.total_sales.map(to_sql_amount).transpose()?;
    let changed = conn.execute(
        "INSERT OR IGNORE INTO draws (
            round, draw_date, n1, n2, n3, n4, n5, n6, bonus,
            first_prize_amount, first_prize_winners, total_sales
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        rusqlite::params![
            draw.round,
            draw.date.format("%Y-%m-%d").to_string(),
            n[0],
            n[1],
            n[2],
            n[3],
            n[4],
            n[5],
            draw.bonus,
            first_prize_amount,
            draw.first_prize_winners,
            total_sales,
        ],
    )?;
    Ok(changed > 0)
}

/// All or nothing: any failing row rolls the whole batch back.
pub fn save_multiple_draws(conn: &Connection, draws: &[Draw]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut inserted = 0;
    for draw in draws {
        if save_draw(&tx, draw)? {
            inserted += 1;
        }
    }
    tx.commit()?;
    Ok(inserted)
}

/// SQLite integers are signed 64-bit.
fn to_sql_amount(amount: u64) -> Result<i64> {
    i64::try_from(amount).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn from_sql_amount(idx: usize, amount: i64) -> Result<u64> {
    u64::try_from(amount).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Integer, Box::new(e))
    })
}

pub fn get_draw_by_round(conn: &Connection, round: u32) -> Result<Option<Draw>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM draws WHERE round = ?1",
        DRAW_COLUMNS
    ))?;
    stmt.query_row([round], row_to_draw).optional()
}

pub fn get_all_draws(conn: &Connection) -> Result<Vec<Draw>> {
    query_draws(
        conn,
        &format!("SELECT {} FROM draws ORDER BY round DESC", DRAW_COLUMNS),
        [],
    )
}

/// Most recent first.
pub fn get_latest_draws(conn: &Connection, limit: u32) -> Result<Vec<Draw>> {
    query_draws(
        conn,
        &format!(
            "SELECT {} FROM draws ORDER BY round DESC LIMIT ?1",
            DRAW_COLUMNS
        ),
        [limit],
    )
}

/// Draws at or before `round`, most recent first.
pub fn get_draws_up_to_round(conn: &Connection, round: u32, limit: u32) -> Result<Vec<Draw>> {
    query_draws(
        conn,
        &format!(
            "SELECT {} FROM draws WHERE round <= ?1 ORDER BY round DESC LIMIT ?2",
            DRAW_COLUMNS
        ),
        [round, limit],
    )
}

pub fn get_draws_by_date_range(
    conn: &Connection,
    start_date: &str,
    end_date: &str,
) -> Result<Vec<Draw>> {
    query_draws(
        conn,
        &format!(
            "SELECT {} FROM draws
             WHERE draw_date >= ?1 AND draw_date <= ?2
             ORDER BY round DESC",
            DRAW_COLUMNS
        ),
        [start_date, end_date],
    )
}

pub fn draw_exists(conn: &Connection, round: u32) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT COUNT(*) FROM draws WHERE round = ?1")?;
    let count: i64 = stmt.query_row([round], |row| row.get(0))?;
    Ok(count > 0)
}

pub fn get_latest_round(conn: &Connection) -> Result<Option<u32>> {
    conn.query_row("SELECT MAX(round) FROM draws", [], |row| row.get(0))
}

/// Splits `rounds` into (still missing, already stored).
pub fn check_existing_rounds(conn: &Connection, rounds: &[u32]) -> Result<(Vec<u32>, Vec<u32>)> {
    let mut rounds_to_fetch = Vec::new();
    let mut existing_rounds = Vec::new();

    for &round in rounds {
        if draw_exists(conn, round)? {
            existing_rounds.push(round);
        } else {
            rounds_to_fetch.push(round);
        }
    }

    Ok((rounds_to_fetch, existing_rounds))
}

pub fn kv_get(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| {
        row.get(0)
    })
    .optional()
}

pub fn kv_set(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
        [key, value],
    )?;
    Ok(())
}

pub fn kv_remove(conn: &Connection, key: &str) -> Result<()> {
    conn.execute("DELETE FROM kv_store WHERE key = ?1", [key])?;
    Ok(())
}

/// Loads a `lottoHistory.json` array. Returns the number of new rounds.
pub fn import_history_json(conn: &Connection, raw_json: &str) -> anyhow::Result<usize> {
    let draws: Vec<Draw> = serde_json::from_str(raw_json).context("Invalid draw history JSON")?;
    let inserted = save_multiple_draws(conn, &draws)?;
    info!(
        "🎟️ Imported {} new rounds ({} records in file)",
        inserted,
        draws.len()
    );
    Ok(inserted)
}

/// Most recent first, in the same shape `import_history_json` reads.
pub fn export_history_json(conn: &Connection) -> anyhow::Result<String> {
    let draws = get_all_draws(conn)?;
    Ok(serde_json::to_string_pretty(&draws)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HISTORY: &str = r#"[
        {"round": 3, "date": "2002-12-21", "numbers": [11, 16, 19, 21, 27, 31], "bonus": 30},
        {"round": 2, "date": "2002-12-14", "numbers": [9, 13, 21, 25, 32, 42], "bonus": 2},
        {"round": 1, "date": "2002-12-07", "numbers": [10, 23, 29, 33, 37, 40], "bonus": 16,
         "firstPrizeAmount": 0, "firstPrizeWinners": 0, "totalSales": 3681782000}
    ]"#;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_import_and_query() {
        let conn = test_conn();
        assert_eq!(import_history_json(&conn, HISTORY).unwrap(), 3);
        assert_eq!(import_history_json(&conn, HISTORY).unwrap(), 0);

        let latest = get_latest_draws(&conn, 2).unwrap();
        assert_eq!(latest.iter().map(|d| d.round).collect::<Vec<_>>(), vec![3, 2]);

        let first = get_draw_by_round(&conn, 1).unwrap().unwrap();
        assert_eq!(first.numbers.numbers(), &[10, 23, 29, 33, 37, 40]);
        assert_eq!(first.total_sales, Some(3_681_782_000));
        assert_eq!(get_draw_by_round(&conn, 99).unwrap(), None);
        assert_eq!(get_latest_round(&conn).unwrap(), Some(3));
    }

    #[test]
    fn test_empty_store() {
        let conn = test_conn();
        assert_eq!(get_latest_round(&conn).unwrap(), None);
        assert!(get_all_draws(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_check_existing_rounds() {
        let conn = test_conn();
        import_history_json(&conn, HISTORY).unwrap();
        let (missing, existing) = check_existing_rounds(&conn, &[2, 3, 4, 5]).unwrap();
        assert_eq!(missing, vec![4, 5]);
        assert_eq!(existing, vec![2, 3]);
    }

    #[test]
    fn test_date_range_and_window() {
        let conn = test_conn();
        import_history_json(&conn, HISTORY).unwrap();
        let range = get_draws_by_date_range(&conn, "2002-12-10", "2002-12-31").unwrap();
        assert_eq!(range.len(), 2);
        let window = get_draws_up_to_round(&conn, 2, 30).unwrap();
        assert_eq!(window.iter().map(|d| d.round).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[test]
    fn test_export_round_trip() {
        let conn = test_conn();
        import_history_json(&conn, HISTORY).unwrap();
        let exported = export_history_json(&conn).unwrap();

        let other = test_conn();
        assert_eq!(import_history_json(&other, &exported).unwrap(), 3);
        assert_eq!(get_all_draws(&other).unwrap(), get_all_draws(&conn).unwrap());
    }

    #[test]
    fn test_kv_store() {
        let conn = test_conn();
        assert_eq!(kv_get(&conn, "favoriteNumbers").unwrap(), None);
        kv_set(&conn, "favoriteNumbers", "[]").unwrap();
        kv_set(&conn, "favoriteNumbers", "[1]").unwrap();
        assert_eq!(kv_get(&conn, "favoriteNumbers").unwrap().as_deref(), Some("[1]"));
        kv_remove(&conn, "favoriteNumbers").unwrap();
        assert_eq!(kv_get(&conn, "favoriteNumbers").unwrap(), None);
    }

    #[test]
    fn test_large_amounts_round_trip() {
        let conn = test_conn();
        let draw = Draw::new(
            1,
            NaiveDate::from_ymd_opt(2002, 12, 7).unwrap(),
            NumberSet::new(&[10, 23, 29, 33, 37, 40]).unwrap(),
            16,
        )
        .unwrap()
        .with_first_prize(i64::MAX as u64, 1)
        .with_total_sales(Some(i64::MAX as u64));

        assert!(save_draw(&conn, &draw).unwrap());
        assert_eq!(get_draw_by_round(&conn, 1).unwrap(), Some(draw));
    }

    #[test]
    fn test_amount_beyond_sqlite_range_is_rejected() {
        let conn = test_conn();
        let draw = Draw::new(
            1,
            NaiveDate::from_ymd_opt(2002, 12, 7).unwrap(),
            NumberSet::new(&[10, 23, 29, 33, 37, 40]).unwrap(),
            16,
        )
        .unwrap()
        .with_first_prize(u64::MAX, 1);

        assert!(matches!(
            save_draw(&conn, &draw),
            Err(rusqlite::Error::ToSqlConversionFailure(_))
        ));
        assert_eq!(get_draw_by_round(&conn, 1).unwrap(), None);
    }

    #[test]
    fn test_import_is_atomic() {
        let conn = test_conn();
        let history = r#"[
            {"round": 1, "date": "2002-12-07", "numbers": [10, 23, 29, 33, 37, 40], "bonus": 16},
            {"round": 2, "date": "2002-12-14", "numbers": [9, 13, 21, 25, 32, 42], "bonus": 2,
             "firstPrizeAmount": 18446744073709551615}
        ]"#;

        assert!(import_history_json(&conn, history).is_err());
        assert!(get_all_draws(&conn).unwrap().is_empty());

        assert_eq!(import_history_json(&conn, HISTORY).unwrap(), 3);
    }

    #[test]
    fn test_import_rejects_invalid_record() {
        let conn = test_conn();
        let bad = r#"[{"round": 1, "date": "2002-12-07", "numbers": [1, 2, 3, 4, 5, 5], "bonus": 9}]"#;
        assert!(import_history_json(&conn, bad).is_err());
        assert!(get_all_draws(&conn).unwrap().is_empty());
    }
}
