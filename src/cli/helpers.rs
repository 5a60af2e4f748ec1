//! Shared helper functions for CLI commands.

use console::style;

use crate::config::Settings;
use crate::repository::CatalogContext;

/// Truncate a string to at most `max` characters, marking the cut.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}

/// Open the catalog, failing with a hint when it has not been initialized.
pub fn open_catalog(settings: &Settings) -> anyhow::Result<CatalogContext> {
    if !settings.database_exists() {
        anyhow::bail!(
            "No catalog at {}. Run '{}' first.",
            settings.database_url(),
            style("ttsync init").bold()
        );
    }
    Ok(settings.create_context())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Расписание", 20), "Расписание");
        assert_eq!(truncate("Расписание", 5), "Расп…");
    }
}
