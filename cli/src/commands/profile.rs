use anyhow::{Context, Result, bail};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use kcal_core::models::Profile;
use kcal_core::service::{KcalService, ProfileForm};

use super::helpers::{fmt_opt, print_json, truncate};

/// Flags of `kcal profile update`. `None` keeps the stored value; an empty
/// string clears an optional attribute.
#[derive(Debug, Default)]
pub(crate) struct ProfileUpdate {
    pub name: Option<String>,
    pub goal: Option<String>,
    pub age: Option<String>,
    pub lifestyle: Option<String>,
    pub current_weight: Option<String>,
    pub target_weight: Option<String>,
    pub gender: Option<String>,
    pub height: Option<String>,
    pub weekly_goal: Option<String>,
}

pub(crate) fn cmd_profile_list(svc: &KcalService, active_id: i64, json: bool) -> Result<()> {
    let profiles = svc.list_profiles()?;

    if json {
        return print_json(&profiles);
    }

    #[derive(Tabled)]
    struct ProfileRow {
        #[tabled(rename = "")]
        active: &'static str,
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Goal")]
        goal: i64,
        #[tabled(rename = "Color")]
        color: String,
    }

    let rows: Vec<ProfileRow> = profiles
        .iter()
        .map(|p| ProfileRow {
            active: if p.id == active_id { "*" } else { "" },
            id: p.id,
            name: truncate(&p.name, 30),
            goal: p.daily_goal,
            color: p.avatar_color.clone().unwrap_or_default(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_profile_show(svc: &KcalService, profile_id: i64, json: bool) -> Result<()> {
    let profile = find_profile(svc, profile_id)?;

    if json {
        return print_json(&profile);
    }

    println!("[{}] {}", profile.id, profile.name);
    println!("  Daily goal:     {} kcal", profile.daily_goal);
    println!("  Age:            {}", fmt_opt(profile.age));
    println!("  Gender:         {}", fmt_opt(profile.gender));
    println!("  Height:         {}", fmt_opt(profile.height.map(|h| format!("{h} cm"))));
    println!("  Lifestyle:      {}", fmt_opt(profile.lifestyle));
    println!(
        "  Current weight: {}",
        fmt_opt(profile.current_weight.map(|w| format!("{w} kg")))
    );
    println!(
        "  Target weight:  {}",
        fmt_opt(profile.target_weight.map(|w| format!("{w} kg")))
    );
    println!(
        "  Weekly goal:    {}",
        fmt_opt(profile.weekly_goal.map(|w| format!("{w:+} kg/week")))
    );
    Ok(())
}

pub(crate) fn cmd_profile_create(svc: &KcalService, name: &str, json: bool) -> Result<()> {
    let profile = svc.create_profile(name)?;

    if json {
        print_json(&profile)?;
    } else {
        println!("Created profile [{}] {}", profile.id, profile.name);
    }
    Ok(())
}

pub(crate) fn cmd_profile_rename(
    svc: &KcalService,
    profile_id: i64,
    name: &str,
    json: bool,
) -> Result<()> {
    let renamed = svc.rename_profile(profile_id, name)?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "id": profile_id, "renamed": renamed })
        );
    } else if renamed {
        println!("Renamed profile {profile_id} to {}", name.trim());
    } else {
        eprintln!("Profile {profile_id} unchanged");
    }
    Ok(())
}

pub(crate) fn cmd_profile_move(
    svc: &KcalService,
    profile_id: i64,
    direction: &str,
    json: bool,
) -> Result<()> {
    let moved = svc.move_profile(profile_id, direction)?;

    if json {
        println!("{}", serde_json::json!({ "id": profile_id, "moved": moved }));
    } else if moved {
        println!("Moved profile {profile_id} {}", direction.trim().to_lowercase());
    } else {
        eprintln!("Profile {profile_id} is already at the edge (or does not exist)");
    }
    Ok(())
}

pub(crate) fn cmd_profile_update(
    svc: &KcalService,
    profile_id: i64,
    update: &ProfileUpdate,
    json: bool,
) -> Result<()> {
    let current = find_profile(svc, profile_id)?;

    // Unset flags are prefilled from the stored profile.
    let name = update.name.clone().unwrap_or_else(|| current.name.clone());
    let goal = update
        .goal
        .clone()
        .unwrap_or_else(|| current.daily_goal.to_string());
    let age = keep(update.age.as_ref(), current.age);
    let lifestyle = keep(update.lifestyle.as_ref(), current.lifestyle);
    let current_weight = keep(update.current_weight.as_ref(), current.current_weight);
    let target_weight = keep(update.target_weight.as_ref(), current.target_weight);
    let gender = keep(update.gender.as_ref(), current.gender);
    let height = keep(update.height.as_ref(), current.height);
    let weekly_goal = keep(update.weekly_goal.as_ref(), current.weekly_goal);

    let form = ProfileForm {
        name: &name,
        daily_goal: &goal,
        age: age.as_deref(),
        lifestyle: lifestyle.as_deref(),
        current_weight: current_weight.as_deref(),
        target_weight: target_weight.as_deref(),
        gender: gender.as_deref(),
        height: height.as_deref(),
        weekly_goal: weekly_goal.as_deref(),
    };
    if !svc.update_profile_details(profile_id, &form)? {
        bail!("Profile {profile_id} not found");
    }

    let updated = find_profile(svc, profile_id)?;
    if json {
        print_json(&updated)?;
    } else {
        println!("Updated profile [{}] {}", updated.id, updated.name);
    }
    Ok(())
}

fn keep<T: ToString>(flag: Option<&String>, stored: Option<T>) -> Option<String> {
    match flag {
        Some(value) => Some(value.clone()),
        None => stored.map(|v| v.to_string()),
    }
}

fn find_profile(svc: &KcalService, profile_id: i64) -> Result<Profile> {
    svc.get_profile(profile_id)?
        .with_context(|| format!("Profile {profile_id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kcal_core::models::{DEFAULT_PROFILE_ID, Gender, Lifestyle};

    #[test]
    fn test_keep_prefers_flag() {
        assert_eq!(keep(Some(&"40".to_string()), Some(35)), Some("40".to_string()));
        assert_eq!(keep(Some(&String::new()), Some(35)), Some(String::new()));
        assert_eq!(keep(None, Some(35)), Some("35".to_string()));
        assert_eq!(keep::<i64>(None, None), None);
    }

    #[test]
    fn test_update_keeps_unset_fields() {
        let svc = KcalService::new_in_memory().unwrap();
        let first = ProfileUpdate {
            age: Some("29".to_string()),
            lifestyle: Some("lightly active".to_string()),
            gender: Some("female".to_string()),
            current_weight: Some("64.5".to_string()),
            ..ProfileUpdate::default()
        };
        cmd_profile_update(&svc, DEFAULT_PROFILE_ID, &first, true).unwrap();

        let second = ProfileUpdate {
            goal: Some("1800".to_string()),
            current_weight: Some(String::new()),
            ..ProfileUpdate::default()
        };
        cmd_profile_update(&svc, DEFAULT_PROFILE_ID, &second, true).unwrap();

        let p = svc.get_profile(DEFAULT_PROFILE_ID).unwrap().unwrap();
        assert_eq!(p.name, "Main User");
        assert_eq!(p.daily_goal, 1800);
        assert_eq!(p.age, Some(29));
        assert_eq!(p.lifestyle, Some(Lifestyle::LightlyActive));
        assert_eq!(p.gender, Some(Gender::Female));
        assert!(p.current_weight.is_none());
    }

    #[test]
    fn test_update_unknown_profile_fails() {
        let svc = KcalService::new_in_memory().unwrap();
        assert!(cmd_profile_update(&svc, 77, &ProfileUpdate::default(), true).is_err());
    }
}
