use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

/// Expand `today`/`yesterday`/`tomorrow` into `YYYY-MM-DD`. Anything else is
/// passed through for the service to validate.
pub(crate) fn expand_date(date_str: Option<String>) -> Option<String> {
    let today = Local::now().date_naive();
    date_str.map(|s| match s.trim().to_lowercase().as_str() {
        "today" => iso(today),
        "yesterday" => iso(today - chrono::Duration::days(1)),
        "tomorrow" => iso(today + chrono::Duration::days(1)),
        _ => s,
    })
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Render a stored UTC `created_at` as local `HH:MM`, falling back to the raw text.
/// Accepts RFC 3339 stamps and the older `YYYY-MM-DD HH:MM:SS` (UTC) form.
pub(crate) fn local_time(created_at: &str) -> String {
    let utc = DateTime::parse_from_rfc3339(created_at)
        .map(|t| t.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(created_at, "%Y-%m-%d %H:%M:%S").map(|t| t.and_utc())
        });
    utc.map_or_else(
        |_| created_at.to_string(),
        |t| t.with_timezone(&Local).format("%H:%M").to_string(),
    )
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

pub(crate) fn fmt_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_date_none() {
        assert_eq!(expand_date(None), None);
    }

    #[test]
    fn test_expand_date_keywords() {
        let today = Local::now().date_naive();
        assert_eq!(expand_date(Some("today".to_string())), Some(iso(today)));
        assert_eq!(
            expand_date(Some("Yesterday".to_string())),
            Some(iso(today - chrono::Duration::days(1)))
        );
        assert_eq!(
            expand_date(Some("tomorrow".to_string())),
            Some(iso(today + chrono::Duration::days(1)))
        );
    }

    #[test]
    fn test_expand_date_passes_other_text_through() {
        assert_eq!(
            expand_date(Some("2024-01-15".to_string())).as_deref(),
            Some("2024-01-15")
        );
        assert_eq!(expand_date(Some("nope".to_string())).as_deref(), Some("nope"));
    }

    #[test]
    fn test_local_time() {
        let stamp = "2024-06-15T10:30:00Z";
        let expected = DateTime::parse_from_rfc3339(stamp)
            .unwrap()
            .with_timezone(&Local)
            .format("%H:%M")
            .to_string();
        assert_eq!(local_time(stamp), expected);
        assert_eq!(local_time("garbage"), "garbage");
    }

    #[test]
    fn test_local_time_legacy_format() {
        let expected = DateTime::parse_from_rfc3339("2024-06-15T18:05:00Z")
            .unwrap()
            .with_timezone(&Local)
            .format("%H:%M")
            .to_string();
        assert_eq!(local_time("2024-06-15 18:05:00"), expected);
    }

    #[test]
    fn test_fmt_opt() {
        assert_eq!(fmt_opt(Some(34)), "34");
        assert_eq!(fmt_opt::<i64>(None), "-");
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
    }

    #[test]
    fn test_no_neg_zero() {
        assert_eq!(no_neg_zero(-0.0).to_bits(), 0.0_f64.to_bits());
        assert!((no_neg_zero(-2.5) + 2.5).abs() < f64::EPSILON);
    }
}
