use anyhow::{Result, bail};

use kcal_core::service::KcalService;

pub(crate) fn cmd_goal_show(svc: &KcalService, profile_id: i64, json: bool) -> Result<()> {
    let goal = svc.get_goal(profile_id)?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "profile_id": profile_id, "daily_goal": goal })
        );
    } else {
        println!("Daily goal: {goal} kcal");
    }
    Ok(())
}

pub(crate) fn cmd_goal_set(svc: &KcalService, profile_id: i64, calories: &str, json: bool) -> Result<()> {
    if !svc.update_goal(profile_id, calories)? {
        bail!("Profile {profile_id} not found");
    }
    let goal = svc.get_goal(profile_id)?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "profile_id": profile_id, "daily_goal": goal })
        );
    } else {
        println!("Daily goal set to {goal} kcal");
    }
    Ok(())
}
