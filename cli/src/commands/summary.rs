use anyhow::Result;
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use kcal_core::models::DailyTotal;
use kcal_core::service::KcalService;

use super::entry::print_entry_table;
use super::helpers::print_json;

pub(crate) fn cmd_history(svc: &KcalService, profile_id: i64, json: bool) -> Result<()> {
    let days = svc.get_history(profile_id)?;

    if json {
        return print_json(&days);
    }

    if days.is_empty() {
        eprintln!("No entries logged yet");
        return Ok(());
    }

    for day in &days {
        let marker = if day.over_goal { "over" } else { "ok" };
        println!(
            "=== {} === {} / {} kcal ({marker})",
            day.date.format("%a %Y-%m-%d"),
            day.total_calories,
            day.goal
        );
        print_entry_table(&day.entries);
        println!();
    }
    Ok(())
}

pub(crate) fn cmd_totals(svc: &KcalService, profile_id: i64, days: i64, json: bool) -> Result<()> {
    let totals = svc.daily_totals(profile_id, days)?;
    let average = svc.calorie_average(profile_id, days)?;
    let goal = svc.get_goal(profile_id)?;

    if json {
        #[derive(Serialize)]
        struct Totals<'a> {
            window_days: i64,
            goal: i64,
            average: f64,
            days: &'a [DailyTotal],
        }
        return print_json(&Totals {
            window_days: days,
            goal,
            average,
            days: &totals,
        });
    }

    if totals.is_empty() {
        eprintln!("No entries in the last {days} day(s)");
        return Ok(());
    }

    #[derive(Tabled)]
    struct TotalRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "kcal")]
        total: i64,
        #[tabled(rename = "vs goal")]
        delta: String,
    }

    let rows: Vec<TotalRow> = totals
        .iter()
        .map(|t| TotalRow {
            date: t.date.format("%a %Y-%m-%d").to_string(),
            total: t.total,
            delta: format!("{:+}", t.total - goal),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..3)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    println!(
        "Average over {} logged day(s): {average:.0} kcal (goal {goal})",
        totals.len()
    );
    Ok(())
}
