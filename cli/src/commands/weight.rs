use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use kcal_core::service::KcalService;

use super::helpers::{expand_date, fmt_opt, no_neg_zero, print_json};

const LBS_PER_KG: f64 = 2.20462;

pub(crate) fn cmd_weight_log(
    svc: &KcalService,
    profile_id: i64,
    weight: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = expand_date(date);
    let entry = svc.add_weight_entry(profile_id, weight, date.as_deref())?;

    if json {
        print_json(&entry)?;
    } else {
        println!(
            "Logged {:.1} kg ({:.1} lbs) for {} [id {}]",
            entry.weight,
            entry.weight * LBS_PER_KG,
            entry.date.format("%Y-%m-%d"),
            entry.id
        );
    }
    Ok(())
}

pub(crate) fn cmd_weight_history(svc: &KcalService, profile_id: i64, json: bool) -> Result<()> {
    let entries = svc.get_weight_history(profile_id)?;

    if json {
        print_json(&entries)?;
    } else if entries.is_empty() {
        eprintln!("No weight entries found. Use `kcal weight log` to record your weight.");
    } else {
        #[derive(Tabled)]
        struct WeightRow {
            #[tabled(rename = "ID")]
            id: i64,
            #[tabled(rename = "Date")]
            date: String,
            #[tabled(rename = "Weight (kg)")]
            kg: String,
            #[tabled(rename = "Weight (lbs)")]
            lbs: String,
        }

        let rows: Vec<WeightRow> = entries
            .iter()
            .map(|e| WeightRow {
                id: e.id,
                date: e.date.format("%Y-%m-%d").to_string(),
                kg: format!("{:.1}", e.weight),
                lbs: format!("{:.1}", e.weight * LBS_PER_KG),
            })
            .collect();

        let table = Table::new(&rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(2..4)).with(Alignment::right()))
            .to_string();
        println!("{table}");
    }

    Ok(())
}

pub(crate) fn cmd_weight_delete(
    svc: &KcalService,
    profile_id: i64,
    id: i64,
    json: bool,
) -> Result<()> {
    let deleted = svc.delete_weight_entry(profile_id, id)?;

    if json {
        println!("{}", serde_json::json!({ "id": id, "deleted": deleted }));
    } else if deleted {
        println!("Deleted weight entry {id}");
    } else {
        eprintln!("No weight entry {id} for this profile");
    }

    Ok(())
}

pub(crate) fn cmd_weight_progress(svc: &KcalService, profile_id: i64, json: bool) -> Result<()> {
    let progress = svc.get_weight_progress(profile_id)?;

    if json {
        return print_json(&progress);
    }

    let kg = |w: Option<f64>| fmt_opt(w.map(|v| format!("{v:.1} kg")));
    println!("Current: {}", kg(progress.current));
    println!("Start:   {}", kg(progress.start));
    println!("Change:  {:+.1} kg", no_neg_zero(progress.change));
    println!("Target:  {}", kg(progress.target));
    if let (Some(current), Some(target)) = (progress.current, progress.target) {
        println!("To go:   {:.1} kg", (current - target).abs());
    }
    Ok(())
}
