//! Initialize command.

use console::style;

use crate::config::{ResolvedBackend, Settings};

/// Initialize the data directory and database.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let ctx = settings.create_context();
    ctx.init_schema().await?;

    for backend in settings.storage_backends() {
        let (name, target) = match backend {
            ResolvedBackend::Local { name, root } => (name, root.display().to_string()),
            ResolvedBackend::Remote { name, base_url, .. } => (name, base_url),
        };
        println!("  {} Storage '{}': {}", style("→").dim(), name, target);
    }

    println!(
        "{} Initialized catalog at {}",
        style("✓").green(),
        settings.database_url()
    );

    Ok(())
}
