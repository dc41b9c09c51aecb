use crate::config::Config;
use crate::utils::{ensure_dir, get_clawbridge_home};
use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_clawbridge_home()?.join("config.json"))
}

fn resolve_path(config_path: Option<&Path>) -> PathBuf {
    match config_path {
        Some(p) => p.to_path_buf(),
        None => get_config_path().unwrap_or_else(|_| PathBuf::from("config.json")),
    }
}

pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let path = resolve_path(config_path);

    let mut config = if path.exists() {
        // Shared lock: concurrent readers allowed, blocked while `init` writes
        let file = fs::File::open(&path)
            .with_context(|| format!("Failed to open config at {}", path.display()))?;
        file.lock_shared()
            .with_context(|| "Failed to acquire shared lock on config file")?;

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        check_file_permissions(&path);
        debug!("loaded config from {}", path.display());

        serde_json::from_str::<Config>(&content)
            .with_context(|| format!("Failed to parse config JSON from {}", path.display()))?
    } else {
        debug!("no config at {}, using defaults", path.display());
        Config::default()
    };

    crate::config::credentials::apply_env_overrides(&mut config);

    config
        .validate()
        .with_context(|| "Configuration validation failed")?;
    Ok(config)
}

/// Warn if the config file is readable by group or others.
#[cfg(unix)]
fn check_file_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Ok(meta) = fs::metadata(path) {
        let mode = meta.permissions().mode();
        if mode & 0o077 != 0 {
            warn!(
                "config file {} has permissions {:o}, recommend 0600",
                path.display(),
                mode & 0o777
            );
        }
    }
}

#[cfg(not(unix))]
fn check_file_permissions(_path: &Path) {}

pub fn save_config(config: &Config, config_path: Option<&Path>) -> Result<PathBuf> {
    let path = resolve_path(config_path);

    ensure_dir(path.parent().context("Config path has no parent")?)?;

    // atomic_write() renames over the target, which would drop a flock held on
    // the old inode, so writers serialize on a sibling lock file instead.
    let lock_path = path.with_extension("json.lock");
    let lock_file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&lock_path)
        .with_context(|| format!("Failed to create lock file at {}", lock_path.display()))?;
    lock_file
        .lock_exclusive()
        .with_context(|| "Failed to acquire exclusive lock on config lock file")?;

    let content = serde_json::to_string_pretty(config)?;
    crate::utils::atomic_write(&path, &content)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = fs::set_permissions(&path, fs::Permissions::from_mode(0o600)) {
            warn!("could not restrict permissions on {}: {}", path.display(), e);
        }
    }

    Ok(path)
}

#[cfg(test)]
mod tests;
