//! Catalog settings commands.

use console::style;

use crate::config::Settings;
use crate::repository::settings::{
    valid_update_minutes, AVAILABLE_KEYS, MAX_UPDATE_MINUTES, TIME_UPDATE,
};

use crate::cli::helpers::open_catalog;

/// List stored settings.
pub async fn cmd_settings_list(settings: &Settings) -> anyhow::Result<()> {
    let repo = open_catalog(settings)?.settings();
    let stored = repo.list().await?;

    if stored.is_empty() {
        println!("{} No settings stored; defaults apply", style("!").yellow());
    }
    for (key, value) in stored {
        println!("{} = {}", style(key).bold(), value);
    }
    Ok(())
}

/// Print one setting.
pub async fn cmd_settings_get(settings: &Settings, key: &str) -> anyhow::Result<()> {
    let repo = open_catalog(settings)?.settings();
    match repo.get(key).await? {
        Some(value) => println!("{}", value),
        None => println!("{} '{}' is not set", style("!").yellow(), key),
    }
    Ok(())
}

/// Store a setting after validating the key and value.
pub async fn cmd_settings_set(settings: &Settings, key: &str, value: &str) -> anyhow::Result<()> {
    if !AVAILABLE_KEYS.contains(&key) {
        anyhow::bail!(
            "Unknown setting '{}'. Available: {}",
            key,
            AVAILABLE_KEYS.join(", ")
        );
    }
    if key == TIME_UPDATE && valid_update_minutes(value).is_none() {
        anyhow::bail!(
            "{} must be a number of minutes between 1 and {}",
            TIME_UPDATE,
            MAX_UPDATE_MINUTES
        );
    }

    let repo = open_catalog(settings)?.settings();
    repo.set(key, value.trim()).await?;
    println!("{} {} = {}", style("✓").green(), key, value.trim());
    Ok(())
}
