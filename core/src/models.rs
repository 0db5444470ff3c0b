use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Profile used when no (or an unparseable) profile id is supplied.
pub const DEFAULT_PROFILE_ID: i64 = 1;
pub const DEFAULT_PROFILE_NAME: &str = "Main User";
pub const DEFAULT_DAILY_GOAL: i64 = 2000;
pub const DEFAULT_AVATAR_COLOR: &str = "#7cb342";

/// Cosmetic colors handed out to new profiles.
pub const AVATAR_COLORS: &[&str] = &[
    "#7cb342", "#c07a55", "#4f5d48", "#5c8fb8", "#b85c8f", "#d4a017", "#8e6bbf", "#3f9c8f",
];

/// Key of the legacy single-profile goal in the `settings` table.
pub const LEGACY_GOAL_KEY: &str = "daily_goal";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub name: String,
    pub daily_goal: i64,
    pub avatar_color: Option<String>,
    pub display_order: i64,
    pub age: Option<i64>,
    pub lifestyle: Option<Lifestyle>,
    pub current_weight: Option<f64>,
    pub target_weight: Option<f64>,
    pub gender: Option<Gender>,
    pub height: Option<f64>,
    pub weekly_goal: Option<f64>,
}

/// Full attribute set written by `update_profile_details`. Every field is
/// overwritten; `None` clears the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileDetails {
    pub name: String,
    pub daily_goal: i64,
    pub age: Option<i64>,
    pub lifestyle: Option<Lifestyle>,
    pub current_weight: Option<f64>,
    pub target_weight: Option<f64>,
    pub gender: Option<Gender>,
    pub height: Option<f64>,
    pub weekly_goal: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifestyle {
    Sedentary,
    #[serde(rename = "Lightly Active")]
    LightlyActive,
    #[serde(rename = "Moderately Active")]
    ModeratelyActive,
    #[serde(rename = "Very Active")]
    VeryActive,
    #[serde(rename = "Extra Active")]
    ExtraActive,
}

impl Lifestyle {
    pub const ALL: [Lifestyle; 5] = [
        Lifestyle::Sedentary,
        Lifestyle::LightlyActive,
        Lifestyle::ModeratelyActive,
        Lifestyle::VeryActive,
        Lifestyle::ExtraActive,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Lifestyle::Sedentary => "Sedentary",
            Lifestyle::LightlyActive => "Lightly Active",
            Lifestyle::ModeratelyActive => "Moderately Active",
            Lifestyle::VeryActive => "Very Active",
            Lifestyle::ExtraActive => "Extra Active",
        }
    }
}

impl fmt::Display for Lifestyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lifestyle {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_label(s);
        Lifestyle::ALL
            .into_iter()
            .find(|l| normalize_label(l.as_str()) == wanted)
            .ok_or_else(|| ValidationError::InvalidAttribute {
                field: "lifestyle",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            _ => Err(ValidationError::InvalidAttribute {
                field: "gender",
                value: s.to_string(),
            }),
        }
    }
}

// "Lightly Active", "lightly-active" and "lightly_active" all compare equal.
fn normalize_label(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

impl FromStr for MoveDirection {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "up" => Ok(MoveDirection::Up),
            "down" => Ok(MoveDirection::Down),
            _ => Err(ValidationError::InvalidDirection(s.to_string())),
        }
    }
}

// --- Food entries ---

#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    pub id: i64,
    pub name: String,
    pub calories: i64,
    pub created_at: String,
    pub profile_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewEntry {
    pub name: String,
    pub calories: i64,
    /// Calendar day the entry belongs to; `None` means "now".
    pub date: Option<NaiveDate>,
}

/// Calories summed over one local calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub total: i64,
}

/// One day of the history view: the day's entries and how they compare to the goal.
#[derive(Debug, Clone, Serialize)]
pub struct DayHistory {
    pub date: NaiveDate,
    pub entries: Vec<Entry>,
    pub total_calories: i64,
    pub goal: i64,
    pub over_goal: bool,
}

// --- Weight tracking types ---

#[derive(Debug, Clone, Serialize)]
pub struct WeightEntry {
    pub id: i64,
    pub weight: f64,
    pub date: NaiveDate,
    pub created_at: String,
    pub profile_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewWeightEntry {
    pub weight: f64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeightProgress {
    /// Latest logged weight, or the profile's `current_weight` when nothing is logged.
    pub current: Option<f64>,
    /// Oldest logged weight.
    pub start: Option<f64>,
    /// `current - start`; 0 when either side is unknown.
    pub change: f64,
    pub target: Option<f64>,
}

/// Resolve the active profile from an externally supplied identifier
/// (a cookie, flag, or environment value). Never fails: anything that is not
/// a positive integer falls back to [`DEFAULT_PROFILE_ID`].
#[must_use]
pub fn resolve_profile_id(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
        .unwrap_or(DEFAULT_PROFILE_ID)
}

/// A stored goal of 0 (or one that was never set) displays as the default.
#[must_use]
pub fn effective_goal(stored: Option<i64>) -> i64 {
    match stored {
        Some(goal) if goal > 0 => goal,
        _ => DEFAULT_DAILY_GOAL,
    }
}

pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(trimmed.to_string())
}

pub fn validate_calories(calories: i64) -> Result<i64, ValidationError> {
    if calories < 0 {
        return Err(ValidationError::InvalidCalories(calories.to_string()));
    }
    Ok(calories)
}

pub fn parse_calories(raw: &str) -> Result<i64, ValidationError> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidCalories(raw.to_string()))?;
    validate_calories(value).map_err(|_| ValidationError::InvalidCalories(raw.to_string()))
}

pub fn validate_weight(weight: f64) -> Result<f64, ValidationError> {
    if !weight.is_finite() || weight <= 0.0 {
        return Err(ValidationError::InvalidWeight(weight.to_string()));
    }
    Ok(weight)
}

pub fn parse_weight(raw: &str) -> Result<f64, ValidationError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidWeight(raw.to_string()))?;
    validate_weight(value).map_err(|_| ValidationError::InvalidWeight(raw.to_string()))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(raw.to_string()))
}

/// Format a UTC instant the way `created_at` columns store it, e.g. `2024-06-15T10:00:00Z`.
#[must_use]
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Compute the `created_at` value for a new entry.
///
/// With no date, or the current local date, the entry is stamped `now`.
/// Any other date is pinned to local noon of that day so the entry can't slip
/// across a day boundary once converted to UTC.
pub fn entry_timestamp(date: Option<NaiveDate>, now: DateTime<Local>) -> Result<String> {
    let Some(date) = date else {
        return Ok(format_timestamp(now.with_timezone(&Utc)));
    };
    if date == now.date_naive() {
        return Ok(format_timestamp(now.with_timezone(&Utc)));
    }
    let noon = date
        .and_hms_opt(12, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("Invalid time of day for {date}"))?;
    let local = Local
        .from_local_datetime(&noon)
        .earliest()
        .ok_or_else(|| anyhow::anyhow!("Local noon does not exist on {date}"))?;
    Ok(format_timestamp(local.with_timezone(&Utc)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_profile_id_parses_integer() {
        assert_eq!(resolve_profile_id(Some("3")), 3);
        assert_eq!(resolve_profile_id(Some(" 12 ")), 12);
    }

    #[test]
    fn test_resolve_profile_id_falls_back_to_default() {
        assert_eq!(resolve_profile_id(None), DEFAULT_PROFILE_ID);
        assert_eq!(resolve_profile_id(Some("")), DEFAULT_PROFILE_ID);
        assert_eq!(resolve_profile_id(Some("abc")), DEFAULT_PROFILE_ID);
        assert_eq!(resolve_profile_id(Some("2.5")), DEFAULT_PROFILE_ID);
        assert_eq!(resolve_profile_id(Some("0")), DEFAULT_PROFILE_ID);
        assert_eq!(resolve_profile_id(Some("-4")), DEFAULT_PROFILE_ID);
    }

    #[test]
    fn test_effective_goal() {
        assert_eq!(effective_goal(Some(1800)), 1800);
        assert_eq!(effective_goal(Some(0)), DEFAULT_DAILY_GOAL);
        assert_eq!(effective_goal(None), DEFAULT_DAILY_GOAL);
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Toast ").unwrap(), "Toast");
        assert_eq!(validate_name("   "), Err(ValidationError::EmptyName));
        assert_eq!(validate_name(""), Err(ValidationError::EmptyName));
    }

    #[test]
    fn test_parse_calories() {
        assert_eq!(parse_calories("300").unwrap(), 300);
        assert_eq!(parse_calories("0").unwrap(), 0);
        assert!(parse_calories("-5").is_err());
        assert!(parse_calories("12.5").is_err());
        assert!(parse_calories("lots").is_err());
        assert!(parse_calories("").is_err());
    }

    #[test]
    fn test_parse_weight() {
        assert!((parse_weight("80.4").unwrap() - 80.4).abs() < f64::EPSILON);
        assert!(parse_weight("0").is_err());
        assert!(parse_weight("-70").is_err());
        assert!(parse_weight("heavy").is_err());
        assert!(parse_weight("NaN").is_err());
        assert!(parse_weight("inf").is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-06-15").unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
        );
        assert!(parse_date("15/06/2024").is_err());
    }

    #[test]
    fn test_lifestyle_parsing_is_lenient() {
        assert_eq!(
            "Lightly Active".parse::<Lifestyle>().unwrap(),
            Lifestyle::LightlyActive
        );
        assert_eq!(
            "very-active".parse::<Lifestyle>().unwrap(),
            Lifestyle::VeryActive
        );
        assert_eq!(
            "extra_active".parse::<Lifestyle>().unwrap(),
            Lifestyle::ExtraActive
        );
        assert!("couch potato".parse::<Lifestyle>().is_err());
    }

    #[test]
    fn test_lifestyle_serializes_as_label() {
        let json = serde_json::to_string(&Lifestyle::ModeratelyActive).unwrap();
        assert_eq!(json, "\"Moderately Active\"");
    }

    #[test]
    fn test_gender_parsing() {
        assert_eq!("male".parse::<Gender>().unwrap(), Gender::Male);
        assert_eq!("Female".parse::<Gender>().unwrap(), Gender::Female);
        assert!("other".parse::<Gender>().is_err());
    }

    #[test]
    fn test_move_direction_parsing() {
        assert_eq!("UP".parse::<MoveDirection>().unwrap(), MoveDirection::Up);
        assert_eq!("down".parse::<MoveDirection>().unwrap(), MoveDirection::Down);
        assert!("left".parse::<MoveDirection>().is_err());
    }

    #[test]
    fn test_entry_timestamp_defaults_to_now() {
        let now = Local::now();
        let ts = entry_timestamp(None, now).unwrap();
        assert_eq!(ts, format_timestamp(now.with_timezone(&Utc)));
    }

    #[test]
    fn test_entry_timestamp_today_uses_now() {
        let now = Local::now();
        let ts = entry_timestamp(Some(now.date_naive()), now).unwrap();
        assert_eq!(ts, format_timestamp(now.with_timezone(&Utc)));
    }

    #[test]
    fn test_entry_timestamp_past_date_pinned_to_local_noon() {
        let now = Local::now();
        let past = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let ts = entry_timestamp(Some(past), now).unwrap();
        let parsed = DateTime::parse_from_rfc3339(&ts).unwrap().with_timezone(&Local);
        assert_eq!(parsed.date_naive(), past);
        assert_eq!(parsed.format("%H:%M:%S").to_string(), "12:00:00");
        assert!(ts.ends_with('Z'));
    }
}
