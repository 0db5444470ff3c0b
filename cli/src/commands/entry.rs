use anyhow::Result;
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use kcal_core::models::Entry;
use kcal_core::service::KcalService;

use super::helpers::{expand_date, local_time, print_json, truncate};

pub(crate) fn cmd_log(
    svc: &KcalService,
    profile_id: i64,
    name: &str,
    calories: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = expand_date(date);
    let entry = svc.add_entry(profile_id, name, calories, date.as_deref())?;

    if json {
        print_json(&entry)?;
    } else {
        println!(
            "Logged {} ({} kcal) [id {}]",
            entry.name, entry.calories, entry.id
        );
    }
    Ok(())
}

pub(crate) fn cmd_entries(
    svc: &KcalService,
    profile_id: i64,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = expand_date(date);
    let entries = svc.get_entries(profile_id, date.as_deref())?;
    let goal = svc.get_goal(profile_id)?;
    let total: i64 = entries.iter().map(|e| e.calories).sum();

    if json {
        #[derive(Serialize)]
        struct DayEntries<'a> {
            entries: &'a [Entry],
            total_calories: i64,
            goal: i64,
            remaining: i64,
        }
        return print_json(&DayEntries {
            entries: &entries,
            total_calories: total,
            goal,
            remaining: goal - total,
        });
    }

    if entries.is_empty() {
        eprintln!("No entries. Use `kcal log <name> <calories>` to add one.");
        return Ok(());
    }

    print_entry_table(&entries);
    let remaining = goal - total;
    if remaining >= 0 {
        println!("Total: {total} / {goal} kcal ({remaining} left)");
    } else {
        println!("Total: {total} / {goal} kcal ({} over)", -remaining);
    }
    Ok(())
}

pub(crate) fn cmd_delete(svc: &KcalService, profile_id: i64, entry_id: i64, json: bool) -> Result<()> {
    let deleted = svc.delete_entry(profile_id, entry_id)?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "id": entry_id, "deleted": deleted })
        );
    } else if deleted {
        println!("Deleted entry {entry_id}");
    } else {
        eprintln!("No entry {entry_id} for this profile");
    }
    Ok(())
}

pub(crate) fn print_entry_table(entries: &[Entry]) {
    #[derive(Tabled)]
    struct EntryRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "kcal")]
        calories: i64,
    }

    let rows: Vec<EntryRow> = entries
        .iter()
        .map(|e| EntryRow {
            id: e.id,
            time: local_time(&e.created_at),
            name: truncate(&e.name, 40),
            calories: e.calories,
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}
