use anyhow::{Context, Result, bail};
use std::ffi::OsString;
use std::path::PathBuf;

/// Environment variable consulted when `--database` is not given.
pub const DATABASE_ENV: &str = "KCAL_DATABASE_PATH";

pub struct Config {
    pub db_path: PathBuf,
}

impl Config {
    /// Resolve the database location: the `--database` flag wins, then
    /// `KCAL_DATABASE_PATH`. There is no built-in default.
    pub fn load(db_override: Option<PathBuf>) -> Result<Self> {
        Self::resolve(db_override, std::env::var_os(DATABASE_ENV))
    }

    fn resolve(db_override: Option<PathBuf>, env_value: Option<OsString>) -> Result<Self> {
        let db_path = db_override
            .filter(|p| !p.as_os_str().is_empty())
            .or_else(|| env_value.filter(|v| !v.is_empty()).map(PathBuf::from));

        let Some(db_path) = db_path else {
            bail!("No database configured. Pass --database <PATH> or set {DATABASE_ENV}");
        };

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create data directory: {}", parent.display())
            })?;
        }

        Ok(Config { db_path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_overrides_env() {
        let dir = tempfile::tempdir().unwrap();
        let flag = dir.path().join("flag.db");
        let env = dir.path().join("env.db");
        let config = Config::resolve(Some(flag.clone()), Some(env.into_os_string())).unwrap();
        assert_eq!(config.db_path, flag);
    }

    #[test]
    fn test_env_used_without_flag() {
        let dir = tempfile::tempdir().unwrap();
        let env = dir.path().join("env.db");
        let config = Config::resolve(None, Some(env.clone().into_os_string())).unwrap();
        assert_eq!(config.db_path, env);
    }

    #[test]
    fn test_missing_path_is_fatal() {
        let err = Config::resolve(None, None).err().unwrap();
        assert!(err.to_string().contains(DATABASE_ENV));
        assert!(Config::resolve(Some(PathBuf::new()), Some(OsString::new())).is_err());
    }

    #[test]
    fn test_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data").join("kcal").join("kcal.db");
        let config = Config::resolve(Some(nested.clone()), None).unwrap();
        assert_eq!(config.db_path, nested);
        assert!(dir.path().join("data").join("kcal").is_dir());
    }
}
