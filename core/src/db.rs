use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, TimeDelta};
use rand::seq::IndexedRandom;
use rusqlite::{Connection, params};
use tracing::debug;

use crate::error::ValidationError;
use crate::models::{
    AVATAR_COLORS, DEFAULT_AVATAR_COLOR, DEFAULT_DAILY_GOAL, DailyTotal, DayHistory, Entry,
    Gender, Lifestyle, MoveDirection, NewEntry, NewWeightEntry, Profile, ProfileDetails,
    WeightEntry, WeightProgress, effective_goal, entry_timestamp, format_timestamp,
    validate_calories, validate_name, validate_weight,
};
use crate::schema::SchemaManager;

const PROFILE_COLUMNS: &str = "id, name, daily_goal, avatar_color, display_order, age, lifestyle,
     current_weight, target_weight, gender, height, weekly_goal";

const PROFILE_ORDER: &str = "ORDER BY display_order ASC, id ASC";

/// Profile-scoped access to the tracker store.
///
/// Every entry, weight, goal and profile-detail operation takes the active
/// profile id explicitly and filters or stamps rows with it. Each public
/// operation first makes sure the schema is ready; after the first success
/// that check is a flag read.
pub struct Database {
    conn: Connection,
    schema: SchemaManager,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database::from_connection(conn);
        db.ensure_initialized()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database::from_connection(conn);
        db.ensure_initialized()?;
        Ok(db)
    }

    /// Wrap a connection without touching it. The schema is brought up on the
    /// first operation (or an explicit [`Database::ensure_initialized`]).
    #[must_use]
    pub fn from_connection(conn: Connection) -> Self {
        Database {
            conn,
            schema: SchemaManager::new(),
        }
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        self.schema.ensure_initialized(&self.conn)
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.schema.is_ready()
    }

    // --- Row mapping helpers ---

    // An unrecognised label is a conversion error rather than `None`, so a
    // later full-detail update can't silently erase it.
    fn parse_column<T>(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        raw.map(|s| {
            s.parse().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
        })
        .transpose()
    }

    fn profile_from_row(row: &rusqlite::Row) -> rusqlite::Result<Profile> {
        let lifestyle = Self::parse_column(6, row.get(6)?)?;
        let gender = Self::parse_column(9, row.get(9)?)?;
        Ok(Profile {
            id: row.get(0)?,
            name: row.get(1)?,
            daily_goal: effective_goal(row.get(2)?),
            avatar_color: row.get(3)?,
            display_order: row.get::<_, Option<i64>>(4)?.unwrap_or_default(),
            age: row.get(5)?,
            lifestyle,
            current_weight: row.get(7)?,
            target_weight: row.get(8)?,
            gender,
            height: row.get(10)?,
            weekly_goal: row.get(11)?,
        })
    }

    // Expects columns: 0: id, 1: name, 2: calories, 3: created_at, 4: profile_id
    fn entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<Entry> {
        Ok(Entry {
            id: row.get(0)?,
            name: row.get(1)?,
            calories: row.get(2)?,
            created_at: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            profile_id: row.get(4)?,
        })
    }

    fn weight_entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<WeightEntry> {
        let date_str: String = row.get(2)?;
        let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(WeightEntry {
            id: row.get(0)?,
            weight: row.get(1)?,
            date,
            created_at: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            profile_id: row.get(4)?,
        })
    }

    // --- Profiles ---

    pub fn list_profiles(&self) -> Result<Vec<Profile>> {
        self.ensure_initialized()?;
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PROFILE_COLUMNS} FROM profiles {PROFILE_ORDER}"))?;
        let profiles = stmt
            .query_map([], Self::profile_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(profiles)
    }

    pub fn get_profile(&self, profile_id: i64) -> Result<Option<Profile>> {
        self.ensure_initialized()?;
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"))?;
        let mut rows = stmt.query(params![profile_id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::profile_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn create_profile(&self, name: &str) -> Result<Profile> {
        self.ensure_initialized()?;
        let name = validate_name(name)?;
        let color = AVATAR_COLORS
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(DEFAULT_AVATAR_COLOR);
        self.conn.execute(
            "INSERT INTO profiles (name, daily_goal, avatar_color, display_order)
             VALUES (?1, ?2, ?3, (SELECT COALESCE(MAX(display_order), 0) + 1 FROM profiles))",
            params![name, DEFAULT_DAILY_GOAL, color],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(profile_id = id, "created profile");
        self.get_profile(id)?
            .context("Profile not found after insert")
    }

    /// Rename the profile. A blank name leaves it untouched and returns `false`.
    pub fn rename_profile(&self, profile_id: i64, name: &str) -> Result<bool> {
        self.ensure_initialized()?;
        let Ok(name) = validate_name(name) else {
            return Ok(false);
        };
        let rows = self.conn.execute(
            "UPDATE profiles SET name = ?1 WHERE id = ?2",
            params![name, profile_id],
        )?;
        Ok(rows > 0)
    }

    /// Swap the profile's position with its neighbour in the current order.
    /// Returns `false` at either end of the list or for an unknown id.
    pub fn move_profile(&self, profile_id: i64, direction: MoveDirection) -> Result<bool> {
        self.ensure_initialized()?;
        let mut profiles = self.list_profiles()?;
        let Some(idx) = profiles.iter().position(|p| p.id == profile_id) else {
            return Ok(false);
        };
        let neighbour = match direction {
            MoveDirection::Up if idx > 0 => idx - 1,
            MoveDirection::Down if idx + 1 < profiles.len() => idx + 1,
            _ => return Ok(false),
        };

        let mut seen = HashSet::new();
        if !profiles.iter().all(|p| seen.insert(p.display_order)) {
            // Any shared order lets a swap jump past a tied profile; spread
            // them out to the listed positions first.
            self.renumber_profiles(&profiles)?;
            profiles = self.list_profiles()?;
        }

        let current = &profiles[idx];
        let other = &profiles[neighbour];
        // Two statements, no transaction: a crash in between can leave both
        // profiles with the same order until the next move.
        self.conn.execute(
            "UPDATE profiles SET display_order = ?1 WHERE id = ?2",
            params![other.display_order, current.id],
        )?;
        self.conn.execute(
            "UPDATE profiles SET display_order = ?1 WHERE id = ?2",
            params![current.display_order, other.id],
        )?;
        debug!(profile_id, ?direction, "moved profile");
        Ok(true)
    }

    fn renumber_profiles(&self, ordered: &[Profile]) -> Result<()> {
        for (position, profile) in (1_i64..).zip(ordered) {
            self.conn.execute(
                "UPDATE profiles SET display_order = ?1 WHERE id = ?2",
                params![position, profile.id],
            )?;
        }
        Ok(())
    }

    /// Overwrite the name, daily goal and every extended attribute in one statement.
    pub fn update_profile_details(&self, profile_id: i64, details: &ProfileDetails) -> Result<bool> {
        self.ensure_initialized()?;
        let name = validate_name(&details.name)?;
        if details.daily_goal < 0 {
            return Err(ValidationError::InvalidGoal(details.daily_goal).into());
        }
        let rows = self.conn.execute(
            "UPDATE profiles SET
                name = ?1, daily_goal = ?2, age = ?3, lifestyle = ?4, current_weight = ?5,
                target_weight = ?6, gender = ?7, height = ?8, weekly_goal = ?9
             WHERE id = ?10",
            params![
                name,
                details.daily_goal,
                details.age,
                details.lifestyle.map(Lifestyle::as_str),
                details.current_weight,
                details.target_weight,
                details.gender.map(Gender::as_str),
                details.height,
                details.weekly_goal,
                profile_id,
            ],
        )?;
        Ok(rows > 0)
    }

    // --- Goals ---

    /// The profile's daily goal; 0, unset, or an unknown profile reads as the default.
    pub fn get_goal(&self, profile_id: i64) -> Result<i64> {
        self.ensure_initialized()?;
        let mut stmt = self
            .conn
            .prepare("SELECT daily_goal FROM profiles WHERE id = ?1")?;
        let mut rows = stmt.query(params![profile_id])?;
        let stored: Option<i64> = match rows.next()? {
            Some(row) => row.get(0)?,
            None => None,
        };
        Ok(effective_goal(stored))
    }

    pub fn update_goal(&self, profile_id: i64, goal: i64) -> Result<bool> {
        self.ensure_initialized()?;
        if goal < 0 {
            return Err(ValidationError::InvalidGoal(goal).into());
        }
        let rows = self.conn.execute(
            "UPDATE profiles SET daily_goal = ?1 WHERE id = ?2",
            params![goal, profile_id],
        )?;
        Ok(rows > 0)
    }

    // --- Entries ---

    pub fn add_entry(&self, profile_id: i64, entry: &NewEntry) -> Result<Entry> {
        self.ensure_initialized()?;
        let name = validate_name(&entry.name)?;
        let calories = validate_calories(entry.calories)?;
        let created_at = entry_timestamp(entry.date, Local::now())?;
        self.conn.execute(
            "INSERT INTO entries (name, calories, created_at, profile_id) VALUES (?1, ?2, ?3, ?4)",
            params![name, calories, created_at, profile_id],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(Entry {
            id,
            name,
            calories,
            created_at,
            profile_id,
        })
    }

    /// Entries whose local calendar date is `date`, newest first.
    pub fn get_entries(&self, profile_id: i64, date: NaiveDate) -> Result<Vec<Entry>> {
        self.ensure_initialized()?;
        let date_str = date.format("%Y-%m-%d").to_string();
        let mut stmt = self.conn.prepare(
            "SELECT id, name, calories, created_at, profile_id
             FROM entries
             WHERE profile_id = ?1 AND date(created_at, 'localtime') = ?2
             ORDER BY datetime(created_at) DESC, id DESC",
        )?;
        let entries = stmt
            .query_map(params![profile_id, date_str], Self::entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn get_all_entries(&self, profile_id: i64) -> Result<Vec<Entry>> {
        self.ensure_initialized()?;
        let mut stmt = self.conn.prepare(
            "SELECT id, name, calories, created_at, profile_id
             FROM entries
             WHERE profile_id = ?1
             ORDER BY datetime(created_at) DESC, id DESC",
        )?;
        let entries = stmt
            .query_map(params![profile_id], Self::entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Delete an entry owned by `profile_id`. Ids belonging to another profile
    /// (or no row at all) are left alone and report `false`.
    pub fn delete_entry(&self, profile_id: i64, entry_id: i64) -> Result<bool> {
        self.ensure_initialized()?;
        let rows = self.conn.execute(
            "DELETE FROM entries WHERE id = ?1 AND profile_id = ?2",
            params![entry_id, profile_id],
        )?;
        if rows == 0 {
            debug!(profile_id, entry_id, "delete matched no entry for this profile");
        }
        Ok(rows > 0)
    }

    /// Entries grouped by local calendar day, newest day first.
    pub fn get_history(&self, profile_id: i64) -> Result<Vec<DayHistory>> {
        self.ensure_initialized()?;
        let goal = self.get_goal(profile_id)?;
        let mut stmt = self.conn.prepare(
            "SELECT id, name, calories, created_at, profile_id, date(created_at, 'localtime')
             FROM entries
             WHERE profile_id = ?1
             ORDER BY datetime(created_at) DESC, id DESC",
        )?;
        let rows = stmt
            .query_map(params![profile_id], |row| {
                let day: String = row.get(5)?;
                Ok((day, Self::entry_from_row(row)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut days: Vec<DayHistory> = Vec::new();
        for (day, entry) in rows {
            let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                .with_context(|| format!("Unreadable timestamp on entry {}", entry.id))?;
            if let Some(last) = days.last_mut().filter(|d| d.date == date) {
                last.total_calories += entry.calories;
                last.entries.push(entry);
            } else {
                days.push(DayHistory {
                    date,
                    total_calories: entry.calories,
                    entries: vec![entry],
                    goal,
                    over_goal: false,
                });
            }
        }
        for day in &mut days {
            day.over_goal = day.total_calories > day.goal;
        }
        Ok(days)
    }

    // --- Aggregation ---

    /// Calories per local calendar day over the trailing `window_days` ending
    /// at `today`, oldest first. Days without entries are omitted.
    pub fn daily_totals(
        &self,
        profile_id: i64,
        window_days: i64,
        today: NaiveDate,
    ) -> Result<Vec<DailyTotal>> {
        self.ensure_initialized()?;
        if window_days < 1 {
            return Err(ValidationError::InvalidWindow(window_days).into());
        }
        // Windows reaching past the calendar's range cover everything.
        let start = TimeDelta::try_days(window_days - 1)
            .and_then(|span| today.checked_sub_signed(span))
            .unwrap_or(NaiveDate::MIN);
        let start_str = start.format("%Y-%m-%d").to_string();
        let end_str = today.format("%Y-%m-%d").to_string();

        let mut stmt = self.conn.prepare(
            "SELECT date(created_at, 'localtime') AS day, SUM(calories)
             FROM entries
             WHERE profile_id = ?1 AND date(created_at, 'localtime') BETWEEN ?2 AND ?3
             GROUP BY day
             ORDER BY day ASC",
        )?;
        let rows = stmt
            .query_map(params![profile_id, start_str, end_str], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(day, total)| {
                let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                    .with_context(|| format!("Unreadable day bucket '{day}'"))?;
                Ok(DailyTotal { date, total })
            })
            .collect()
    }

    /// Average of the daily totals in the window, counting only days with entries.
    #[allow(clippy::cast_precision_loss)]
    pub fn calorie_average(&self, profile_id: i64, window_days: i64, today: NaiveDate) -> Result<f64> {
        let totals = self.daily_totals(profile_id, window_days, today)?;
        if totals.is_empty() {
            return Ok(0.0);
        }
        let sum: i64 = totals.iter().map(|t| t.total).sum();
        Ok(sum as f64 / totals.len() as f64)
    }

    // --- Weight Entries ---

    pub fn add_weight_entry(&self, profile_id: i64, entry: &NewWeightEntry) -> Result<WeightEntry> {
        self.ensure_initialized()?;
        let weight = validate_weight(entry.weight)?;
        let date_str = entry.date.format("%Y-%m-%d").to_string();
        let created_at = format_timestamp(chrono::Utc::now());
        self.conn.execute(
            "INSERT INTO weight_entries (weight, date, created_at, profile_id) VALUES (?1, ?2, ?3, ?4)",
            params![weight, date_str, created_at, profile_id],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(WeightEntry {
            id,
            weight,
            date: entry.date,
            created_at,
            profile_id,
        })
    }

    pub fn get_weight_history(&self, profile_id: i64) -> Result<Vec<WeightEntry>> {
        self.ensure_initialized()?;
        let mut stmt = self.conn.prepare(
            "SELECT id, weight, date, created_at, profile_id
             FROM weight_entries
             WHERE profile_id = ?1
             ORDER BY date DESC, datetime(created_at) DESC, id DESC",
        )?;
        let entries = stmt
            .query_map(params![profile_id], Self::weight_entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn delete_weight_entry(&self, profile_id: i64, entry_id: i64) -> Result<bool> {
        self.ensure_initialized()?;
        let rows = self.conn.execute(
            "DELETE FROM weight_entries WHERE id = ?1 AND profile_id = ?2",
            params![entry_id, profile_id],
        )?;
        if rows == 0 {
            debug!(profile_id, entry_id, "delete matched no weight entry for this profile");
        }
        Ok(rows > 0)
    }

    pub fn get_weight_progress(&self, profile_id: i64) -> Result<WeightProgress> {
        let history = self.get_weight_history(profile_id)?;
        let profile = self.get_profile(profile_id)?;
        let profile_current = profile.as_ref().and_then(|p| p.current_weight);
        let target = profile.as_ref().and_then(|p| p.target_weight);

        let current = history.first().map(|e| e.weight).or(profile_current);
        let start = history.last().map(|e| e.weight).or(current);
        let change = match (current, start) {
            (Some(c), Some(s)) => c - s,
            _ => 0.0,
        };
        Ok(WeightProgress {
            current,
            start: history.last().map(|e| e.weight),
            change,
            target,
        })
    }

    // --- Legacy settings ---

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.ensure_initialized()?;
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        self.ensure_initialized()?;
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM settings WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            Ok(row.get(0)?)
        } else {
            Ok(None)
        }
    }
}
