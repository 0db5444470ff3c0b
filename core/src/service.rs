use std::path::Path;

use anyhow::Result;
use chrono::{Local, NaiveDate};

use crate::db::Database;
use crate::error::ValidationError;
use crate::models::{
    DailyTotal, DayHistory, Entry, Gender, Lifestyle, MoveDirection, NewEntry, NewWeightEntry,
    Profile, ProfileDetails, WeightEntry, WeightProgress, parse_calories, parse_date, parse_weight,
    resolve_profile_id,
};

/// Form-style inputs for a full profile detail update. Blank optional fields
/// clear the stored value.
#[derive(Debug, Clone, Default)]
pub struct ProfileForm<'a> {
    pub name: &'a str,
    pub daily_goal: &'a str,
    pub age: Option<&'a str>,
    pub lifestyle: Option<&'a str>,
    pub current_weight: Option<&'a str>,
    pub target_weight: Option<&'a str>,
    pub gender: Option<&'a str>,
    pub height: Option<&'a str>,
    pub weekly_goal: Option<&'a str>,
}

/// Entry point for callers holding raw user input.
///
/// Parses and validates strings, fills in "today" where a date is omitted, and
/// forwards to the profile-scoped [`Database`].
pub struct KcalService {
    db: Database,
}

impl KcalService {
    pub fn new(db_path: &str) -> Result<Self> {
        Self::open(Path::new(db_path))
    }

    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::open(path)?;
        Ok(Self { db })
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db })
    }

    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    #[must_use]
    pub fn resolve_profile(raw: Option<&str>) -> i64 {
        resolve_profile_id(raw)
    }

    fn date_or_today(date: Option<&str>) -> Result<NaiveDate> {
        match date.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Ok(parse_date(raw)?),
            None => Ok(Local::now().date_naive()),
        }
    }

    // --- Profiles ---

    pub fn list_profiles(&self) -> Result<Vec<Profile>> {
        self.db.list_profiles()
    }

    pub fn get_profile(&self, profile_id: i64) -> Result<Option<Profile>> {
        self.db.get_profile(profile_id)
    }

    pub fn create_profile(&self, name: &str) -> Result<Profile> {
        self.db.create_profile(name)
    }

    pub fn rename_profile(&self, profile_id: i64, name: &str) -> Result<bool> {
        self.db.rename_profile(profile_id, name)
    }

    pub fn move_profile(&self, profile_id: i64, direction: &str) -> Result<bool> {
        let direction: MoveDirection = direction.parse()?;
        self.db.move_profile(profile_id, direction)
    }

    pub fn update_profile_details(&self, profile_id: i64, form: &ProfileForm<'_>) -> Result<bool> {
        let details = ProfileDetails {
            name: form.name.to_string(),
            daily_goal: parse_goal(form.daily_goal)?,
            age: parse_optional(form.age, "age")?,
            lifestyle: parse_optional::<Lifestyle>(form.lifestyle, "lifestyle")?,
            current_weight: parse_optional_weight(form.current_weight)?,
            target_weight: parse_optional_weight(form.target_weight)?,
            gender: parse_optional::<Gender>(form.gender, "gender")?,
            height: parse_optional(form.height, "height")?,
            weekly_goal: parse_optional(form.weekly_goal, "weekly_goal")?,
        };
        self.db.update_profile_details(profile_id, &details)
    }

    // --- Entries ---

    pub fn add_entry(
        &self,
        profile_id: i64,
        name: &str,
        calories: &str,
        date: Option<&str>,
    ) -> Result<Entry> {
        let calories = parse_calories(calories)?;
        let date = match date.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(parse_date(raw)?),
            None => None,
        };
        self.db.add_entry(
            profile_id,
            &NewEntry {
                name: name.to_string(),
                calories,
                date,
            },
        )
    }

    pub fn get_entries(&self, profile_id: i64, date: Option<&str>) -> Result<Vec<Entry>> {
        let date = Self::date_or_today(date)?;
        self.db.get_entries(profile_id, date)
    }

    pub fn get_all_entries(&self, profile_id: i64) -> Result<Vec<Entry>> {
        self.db.get_all_entries(profile_id)
    }

    pub fn delete_entry(&self, profile_id: i64, entry_id: i64) -> Result<bool> {
        self.db.delete_entry(profile_id, entry_id)
    }

    pub fn get_history(&self, profile_id: i64) -> Result<Vec<DayHistory>> {
        self.db.get_history(profile_id)
    }

    // --- Goals ---

    pub fn get_goal(&self, profile_id: i64) -> Result<i64> {
        self.db.get_goal(profile_id)
    }

    pub fn update_goal(&self, profile_id: i64, goal: &str) -> Result<bool> {
        let goal = parse_goal(goal)?;
        self.db.update_goal(profile_id, goal)
    }

    // --- Aggregation ---

    pub fn daily_totals(&self, profile_id: i64, window_days: i64) -> Result<Vec<DailyTotal>> {
        self.db
            .daily_totals(profile_id, window_days, Local::now().date_naive())
    }

    pub fn calorie_average(&self, profile_id: i64, window_days: i64) -> Result<f64> {
        self.db
            .calorie_average(profile_id, window_days, Local::now().date_naive())
    }

    // --- Weight ---

    pub fn add_weight_entry(
        &self,
        profile_id: i64,
        weight: &str,
        date: Option<&str>,
    ) -> Result<WeightEntry> {
        let weight = parse_weight(weight)?;
        let date = Self::date_or_today(date)?;
        self.db
            .add_weight_entry(profile_id, &NewWeightEntry { weight, date })
    }

    pub fn get_weight_history(&self, profile_id: i64) -> Result<Vec<WeightEntry>> {
        self.db.get_weight_history(profile_id)
    }

    pub fn delete_weight_entry(&self, profile_id: i64, entry_id: i64) -> Result<bool> {
        self.db.delete_weight_entry(profile_id, entry_id)
    }

    pub fn get_weight_progress(&self, profile_id: i64) -> Result<WeightProgress> {
        self.db.get_weight_progress(profile_id)
    }

    // --- Settings ---

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        self.db.get_setting(key)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.db.set_setting(key, value)
    }
}

fn parse_goal(raw: &str) -> Result<i64> {
    let goal: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidAttribute {
            field: "daily_goal",
            value: raw.to_string(),
        })?;
    if goal < 0 {
        return Err(ValidationError::InvalidGoal(goal).into());
    }
    Ok(goal)
}

fn parse_optional<T: std::str::FromStr>(raw: Option<&str>, field: &'static str) -> Result<Option<T>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s.parse::<T>().map(Some).map_err(|_| {
            ValidationError::InvalidAttribute {
                field,
                value: s.to_string(),
            }
            .into()
        }),
    }
}

fn parse_optional_weight(raw: Option<&str>) -> Result<Option<f64>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => Ok(Some(parse_weight(s)?)),
    }
}
