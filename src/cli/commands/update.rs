//! Update and daemon commands.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use console::style;

use crate::classify::Classifier;
use crate::config::Settings;
use crate::crawler::{FileSource, HtmlIndexSource, ManifestSource};
use crate::repository::settings::update_interval;
use crate::services::{build_client, HttpFetcher, PassReport, UpdatePipeline, UpdateScheduler};

use crate::cli::helpers::open_catalog;

/// Assemble a pipeline from settings.
fn build_pipeline(
    settings: &Settings,
    manifest: Option<&Path>,
    workers: Option<usize>,
) -> anyhow::Result<UpdatePipeline> {
    let ctx = open_catalog(settings)?;
    let client = build_client(
        &settings.user_agent,
        Duration::from_secs(settings.request_timeout),
    )?;

    let source: Arc<dyn FileSource> = match manifest {
        Some(path) => Arc::new(ManifestSource::new(path)),
        None => Arc::new(HtmlIndexSource::new(
            client.clone(),
            settings.classifier.file_extensions.clone(),
        )),
    };

    let fetcher = Arc::new(HttpFetcher::new(client.clone()));
    let mut builder = UpdatePipeline::builder(&ctx, source, fetcher)
        .storage(settings.storage_fanout(&client))
        .classifier(Classifier::new(settings.classifier.clone()))
        .kinds(settings.kinds.clone())
        .workers(workers.unwrap_or(settings.workers));
    if let Some(converter) = settings.converter() {
        builder = builder.converter(Arc::new(converter));
    }
    if let Some(ref scratch) = settings.scratch_dir {
        builder = builder.scratch_dir(scratch);
    }

    Ok(builder.build())
}

fn print_report(report: &PassReport) {
    println!("{} Update pass complete", style("✓").green());
    println!("  {} Discovered:  {}", style("→").dim(), report.discovered);
    println!("  {} Changed:     {}", style("→").dim(), report.changed);
    println!("  {} Unchanged:   {}", style("→").dim(), report.unchanged);
    if report.created > 0 || report.revived > 0 {
        println!(
            "  {} New:         {} ({} revived)",
            style("→").dim(),
            report.created,
            report.revived
        );
    }
    if report.failed + report.storage_failed > 0 {
        println!(
            "  {} Failed:      {}",
            style("!").yellow(),
            report.failed + report.storage_failed
        );
    }
    if report.sweep_skipped {
        println!("  {} Sweep skipped", style("!").yellow());
    } else {
        println!("  {} Deprecated:  {}", style("→").dim(), report.deprecated);
    }
}

/// Run one update pass.
pub async fn cmd_update(
    settings: &Settings,
    manifest: Option<&Path>,
    workers: Option<usize>,
) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    let pipeline = build_pipeline(settings, manifest, workers)?;
    let report = pipeline.run_pass().await?;
    print_report(&report);
    Ok(())
}

/// Run passes on the configured interval until interrupted.
pub async fn cmd_daemon(
    settings: &Settings,
    manifest: Option<&Path>,
    initial_pass: bool,
) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    let pipeline = Arc::new(build_pipeline(settings, manifest, None)?);

    if initial_pass {
        match pipeline.run_pass().await {
            Ok(report) => print_report(&report),
            Err(e) => tracing::error!("Initial pass failed: {}", e),
        }
    }

    let minutes = pipeline.settings().update_minutes().await?;
    let scheduler = UpdateScheduler::new(pipeline);
    scheduler.start(update_interval(minutes)).await?;
    println!(
        "{} Updating every {} minutes; Ctrl-C to stop",
        style("→").dim(),
        minutes
    );

    tokio::signal::ctrl_c().await?;
    println!("{} Stopping after the current pass", style("!").yellow());
    scheduler.stop().await?;
    Ok(())
}
