//! Catalog inspection commands.

use console::style;

use crate::config::Settings;

use crate::cli::helpers::{open_catalog, truncate};

/// List resources with their tags.
pub async fn cmd_resources(settings: &Settings, include_deprecated: bool) -> anyhow::Result<()> {
    let catalog = open_catalog(settings)?.catalog();
    let resources = catalog.list_resources(include_deprecated).await?;

    if resources.is_empty() {
        println!(
            "{} No resources catalogued. Run 'ttsync update' first.",
            style("!").yellow()
        );
        return Ok(());
    }

    println!("\n{}", style("Resources").bold());
    println!("{}", "-".repeat(100));
    println!("{:<6} {:<30} {:<40} Updated", "ID", "Name", "Path");
    println!("{}", "-".repeat(100));

    for resource in &resources {
        let name = if resource.deprecated {
            style(truncate(&resource.name, 29)).dim().to_string()
        } else {
            truncate(&resource.name, 29)
        };
        println!(
            "{:<6} {:<30} {:<40} {}",
            resource.id,
            name,
            truncate(&resource.path, 39),
            resource.last_update.format("%Y-%m-%d %H:%M")
        );
        let tags: Vec<String> = resource
            .tags
            .iter()
            .map(|t| format!("{}:{}", t.category, t.name))
            .collect();
        if !tags.is_empty() {
            println!("       {}", style(tags.join(", ")).dim());
        }
    }

    println!("\n{} resources", resources.len());
    Ok(())
}

/// Show the versions of one resource, newest first.
pub async fn cmd_versions(settings: &Settings, resource_id: i32) -> anyhow::Result<()> {
    let catalog = open_catalog(settings)?.catalog();
    let versions = catalog.versions(resource_id).await?;

    if versions.is_empty() {
        println!(
            "{} No versions for resource {}",
            style("!").yellow(),
            resource_id
        );
        return Ok(());
    }

    println!("{:<6} {:<17} {:<17} {:<8} Hash", "ID", "Seen", "Changed", "Type");
    for version in versions {
        let changed = version
            .last_changed
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6} {:<17} {:<17} {:<8} {}",
            version.id,
            version.timestamp.format("%Y-%m-%d %H:%M"),
            changed,
            version.mimetype.as_deref().unwrap_or("-"),
            &version.hashsum[..version.hashsum.len().min(16)]
        );
    }

    Ok(())
}
