//! Schema evolution for the tracker database.
//!
//! The store is brought to its required shape by [`SchemaManager::ensure_initialized`].
//! Every step is additive and idempotent: tables are created only when
//! missing, columns are added only after inspecting the table, and backfills
//! only touch rows still carrying their sentinel values. Running the sequence
//! again (after a failure, or from a second handle racing the first) is safe.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use rusqlite::{Connection, params};
use tracing::{debug, info};

use crate::models::{
    DEFAULT_AVATAR_COLOR, DEFAULT_DAILY_GOAL, DEFAULT_PROFILE_ID, DEFAULT_PROFILE_NAME,
    LEGACY_GOAL_KEY,
};

/// Columns introduced after the first release, as `(table, column, definition)`.
const ADDED_COLUMNS: &[(&str, &str, &str)] = &[
    ("entries", "profile_id", "INTEGER DEFAULT 1"),
    ("profiles", "display_order", "INTEGER DEFAULT 0"),
    ("profiles", "age", "INTEGER"),
    ("profiles", "lifestyle", "TEXT"),
    ("profiles", "current_weight", "REAL"),
    ("profiles", "target_weight", "REAL"),
    ("profiles", "gender", "TEXT"),
    ("profiles", "height", "REAL"),
    ("profiles", "weekly_goal", "REAL"),
    ("weight_entries", "profile_id", "INTEGER DEFAULT 1"),
];

/// Runs the migration sequence at most once per handle.
///
/// The ready flag moves from "not ready" to "ready" exactly once, and only
/// after the whole sequence succeeded; a failed attempt leaves it unset so the
/// next call starts over.
#[derive(Debug, Default)]
pub struct SchemaManager {
    ready: OnceCell<()>,
}

impl SchemaManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.get().is_some()
    }

    pub fn ensure_initialized(&self, conn: &Connection) -> Result<()> {
        self.ready.get_or_try_init(|| migrate(conn))?;
        Ok(())
    }
}

fn migrate(conn: &Connection) -> Result<()> {
    debug!("initializing schema");

    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS profiles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            daily_goal INTEGER DEFAULT {DEFAULT_DAILY_GOAL},
            avatar_color TEXT DEFAULT '{DEFAULT_AVATAR_COLOR}',
            display_order INTEGER DEFAULT 0,
            age INTEGER,
            lifestyle TEXT,
            current_weight REAL,
            target_weight REAL,
            gender TEXT,
            height REAL,
            weekly_goal REAL
        );

        CREATE TABLE IF NOT EXISTS entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            calories INTEGER NOT NULL,
            created_at TEXT DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            profile_id INTEGER DEFAULT {DEFAULT_PROFILE_ID}
        );

        CREATE TABLE IF NOT EXISTS weight_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            weight REAL NOT NULL,
            date TEXT NOT NULL,
            created_at TEXT DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            profile_id INTEGER
        );

        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT
        );"
    ))
    .context("Failed to create tables")?;

    for (table, column, definition) in ADDED_COLUMNS {
        add_column_if_missing(conn, table, column, definition)?;
    }

    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_entries_profile ON entries(profile_id);
         CREATE INDEX IF NOT EXISTS idx_weight_entries_profile ON weight_entries(profile_id, date);",
    )
    .context("Failed to create indexes")?;

    let reordered = conn
        .execute(
            "UPDATE profiles SET display_order = id
             WHERE display_order = 0 OR display_order IS NULL",
            [],
        )
        .context("Failed to backfill profile display order")?;
    if reordered > 0 {
        debug!(reordered, "backfilled profile display order");
    }

    for table in ["entries", "weight_entries"] {
        let orphaned = conn
            .execute(
                &format!("UPDATE {table} SET profile_id = ?1 WHERE profile_id IS NULL"),
                params![DEFAULT_PROFILE_ID],
            )
            .with_context(|| format!("Failed to backfill {table}.profile_id"))?;
        if orphaned > 0 {
            debug!(table, orphaned, "assigned rows without a profile to the default profile");
        }
    }

    seed_default_profile(conn)?;

    info!("schema ready");
    Ok(())
}

fn seed_default_profile(conn: &Connection) -> Result<()> {
    let legacy_goal: Option<String> = {
        let mut stmt = conn.prepare("SELECT value FROM settings WHERE key = ?1")?;
        let mut rows = stmt.query(params![LEGACY_GOAL_KEY])?;
        match rows.next()? {
            Some(row) => row.get(0)?,
            None => None,
        }
    };
    let goal = legacy_goal
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|g| *g > 0)
        .unwrap_or(DEFAULT_DAILY_GOAL);

    // A single guarded statement, so two handles seeding at once still end up
    // with one profile.
    let inserted = conn
        .execute(
            "INSERT INTO profiles (name, daily_goal, avatar_color, display_order)
             SELECT ?1, ?2, ?3, 1
             WHERE NOT EXISTS (SELECT 1 FROM profiles)",
            params![DEFAULT_PROFILE_NAME, goal, DEFAULT_AVATAR_COLOR],
        )
        .context("Failed to seed default profile")?;
    if inserted > 0 {
        info!(goal, "seeded default profile");
    }
    Ok(())
}

fn add_column_if_missing(
    conn: &Connection,
    table: &str,
    column: &str,
    definition: &str,
) -> Result<()> {
    if column_exists(conn, table, column)? {
        return Ok(());
    }
    debug!(table, column, "adding column");
    let sql = format!("ALTER TABLE {table} ADD COLUMN {column} {definition}");
    if let Err(err) = conn.execute(&sql, []) {
        // Another handle may have added it between the check and the ALTER.
        if column_exists(conn, table, column)? {
            return Ok(());
        }
        return Err(err).with_context(|| format!("Failed to add column {table}.{column}"));
    }
    Ok(())
}

pub(crate) fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM profiles", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_fresh_store_gets_tables_and_one_profile() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = SchemaManager::new();
        assert!(!schema.is_ready());

        schema.ensure_initialized(&conn).unwrap();
        assert!(schema.is_ready());

        for (table, column, _) in ADDED_COLUMNS {
            assert!(column_exists(&conn, table, column).unwrap(), "{table}.{column}");
        }
        assert_eq!(profile_count(&conn), 1);

        let (name, goal, order): (String, i64, i64) = conn
            .query_row(
                "SELECT name, daily_goal, display_order FROM profiles",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(name, DEFAULT_PROFILE_NAME);
        assert_eq!(goal, DEFAULT_DAILY_GOAL);
        assert_eq!(order, 1);
    }

    #[test]
    fn test_repeated_calls_seed_exactly_once() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = SchemaManager::new();
        for _ in 0..5 {
            schema.ensure_initialized(&conn).unwrap();
        }
        assert_eq!(profile_count(&conn), 1);
    }

    #[test]
    fn test_separate_managers_on_same_store_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        SchemaManager::new().ensure_initialized(&conn).unwrap();
        SchemaManager::new().ensure_initialized(&conn).unwrap();
        SchemaManager::new().ensure_initialized(&conn).unwrap();
        assert_eq!(profile_count(&conn), 1);
    }

    #[test]
    fn test_work_runs_only_on_first_effective_call() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = SchemaManager::new();
        schema.ensure_initialized(&conn).unwrap();

        // Once ready, the manager doesn't touch the store again, so a profile
        // removed behind its back is not re-seeded.
        conn.execute("DELETE FROM profiles", []).unwrap();
        schema.ensure_initialized(&conn).unwrap();
        assert_eq!(profile_count(&conn), 0);

        // A fresh manager does run the sequence and seeds again.
        SchemaManager::new().ensure_initialized(&conn).unwrap();
        assert_eq!(profile_count(&conn), 1);
    }

    #[test]
    fn test_upgrades_first_release_shape() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE profiles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                daily_goal INTEGER DEFAULT 2000,
                avatar_color TEXT DEFAULT '#7cb342'
            );
            CREATE TABLE entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                calories INTEGER NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            );
            INSERT INTO profiles (name, daily_goal) VALUES ('Main User', 2000);
            INSERT INTO profiles (name, daily_goal) VALUES ('Partner', 1800);
            INSERT INTO entries (name, calories) VALUES ('Toast', 300);",
        )
        .unwrap();

        SchemaManager::new().ensure_initialized(&conn).unwrap();

        let orders: Vec<(i64, i64)> = {
            let mut stmt = conn
                .prepare("SELECT id, display_order FROM profiles ORDER BY id")
                .unwrap();
            stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
                .unwrap()
                .collect::<Result<Vec<_>, _>>()
                .unwrap()
        };
        assert_eq!(orders, vec![(1, 1), (2, 2)]);

        let owner: i64 = conn
            .query_row("SELECT profile_id FROM entries", [], |row| row.get(0))
            .unwrap();
        assert_eq!(owner, DEFAULT_PROFILE_ID);

        // Existing profiles mean nothing is seeded.
        assert_eq!(profile_count(&conn), 2);
    }

    #[test]
    fn test_null_profile_ids_are_backfilled() {
        let conn = Connection::open_in_memory().unwrap();
        SchemaManager::new().ensure_initialized(&conn).unwrap();
        conn.execute(
            "INSERT INTO weight_entries (weight, date, profile_id) VALUES (80.0, '2024-06-15', NULL)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO entries (name, calories, profile_id) VALUES ('Tea', 5, NULL)",
            [],
        )
        .unwrap();

        SchemaManager::new().ensure_initialized(&conn).unwrap();

        let nulls: i64 = conn
            .query_row(
                "SELECT (SELECT COUNT(*) FROM entries WHERE profile_id IS NULL)
                      + (SELECT COUNT(*) FROM weight_entries WHERE profile_id IS NULL)",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(nulls, 0);
    }

    #[test]
    fn test_legacy_goal_seeds_default_profile() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE settings (key TEXT PRIMARY KEY, value TEXT);
             INSERT INTO settings (key, value) VALUES ('daily_goal', '1750');",
        )
        .unwrap();

        SchemaManager::new().ensure_initialized(&conn).unwrap();

        let goal: i64 = conn
            .query_row("SELECT daily_goal FROM profiles", [], |row| row.get(0))
            .unwrap();
        assert_eq!(goal, 1750);
    }

    #[test]
    fn test_unparseable_legacy_goal_is_ignored() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE settings (key TEXT PRIMARY KEY, value TEXT);
             INSERT INTO settings (key, value) VALUES ('daily_goal', 'lots');",
        )
        .unwrap();

        SchemaManager::new().ensure_initialized(&conn).unwrap();

        let goal: i64 = conn
            .query_row("SELECT daily_goal FROM profiles", [], |row| row.get(0))
            .unwrap();
        assert_eq!(goal, DEFAULT_DAILY_GOAL);
    }

    #[test]
    fn test_failed_migration_leaves_manager_unready_and_retries() {
        let conn = Connection::open_in_memory().unwrap();
        // A view can't take new columns, so the additive step fails.
        conn.execute_batch("CREATE VIEW profiles AS SELECT 1 AS id, 'x' AS name;")
            .unwrap();

        let schema = SchemaManager::new();
        let err = schema.ensure_initialized(&conn).unwrap_err();
        assert!(format!("{err:#}").contains("profiles"));
        assert!(!schema.is_ready());

        conn.execute_batch("DROP VIEW profiles;").unwrap();
        schema.ensure_initialized(&conn).unwrap();
        assert!(schema.is_ready());
        assert_eq!(profile_count(&conn), 1);
    }

    #[test]
    fn test_column_exists() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (a INTEGER, b TEXT);")
            .unwrap();
        assert!(column_exists(&conn, "t", "a").unwrap());
        assert!(column_exists(&conn, "t", "b").unwrap());
        assert!(!column_exists(&conn, "t", "c").unwrap());
    }
}
