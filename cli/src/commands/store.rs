use std::path::Path;

use anyhow::Result;

use kcal_core::service::KcalService;

use super::helpers::print_json;

pub(crate) fn cmd_init(svc: &KcalService, db_path: &Path, json: bool) -> Result<()> {
    let db = svc.database();
    db.ensure_initialized()?;
    let profiles = db.list_profiles()?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "database": db_path.display().to_string(),
                "ready": db.is_initialized(),
                "profiles": profiles.len(),
            })
        );
    } else {
        println!("Database ready at {}", db_path.display());
        println!("{} profile(s)", profiles.len());
    }
    Ok(())
}

pub(crate) fn cmd_setting_get(svc: &KcalService, key: &str, json: bool) -> Result<()> {
    let value = svc.get_setting(key)?;

    if json {
        println!("{}", serde_json::json!({ "key": key, "value": value }));
    } else if let Some(v) = value {
        println!("{key} = {v}");
    } else {
        eprintln!("{key} is not set");
    }
    Ok(())
}

pub(crate) fn cmd_setting_set(svc: &KcalService, key: &str, value: &str, json: bool) -> Result<()> {
    svc.set_setting(key, value)?;

    if json {
        print_json(&serde_json::json!({ "key": key, "value": value }))?;
    } else {
        println!("{key} = {value}");
    }
    Ok(())
}
