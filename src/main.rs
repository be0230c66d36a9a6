use anyhow::Result;
use clap::Parser;
use colored::*;
use std::time::Duration;

use image_localizer::logging::init_logging;
use image_localizer::{HttpFetcher, ImageLocalizer, LocalizeCommand};

#[tokio::main]
async fn main() -> Result<()> {
    let args = LocalizeCommand::parse();
    init_logging();

    let fetcher = HttpFetcher::new(&args.user_agent, Duration::from_secs(args.timeout))?;
    let converter = args.converter.build(args.quality);
    let localizer = ImageLocalizer::new(args.to_config(), fetcher, converter);

    let report = localizer.run().await?;

    if let Some(path) = &args.report_json {
        report.write_json(path)?;
        println!("📝 Report written to {:?}", path);
    }

    if report.dry_run {
        println!("✅ Dry run: {} images would be localized", report.unique_urls);
        return Ok(());
    }

    let counts = report.counts();
    println!(
        "📊 {} converted, {} kept original, {} salvaged, {} failed",
        counts.converted.to_string().green(),
        counts.kept_original.to_string().yellow(),
        counts.salvaged.to_string().yellow(),
        counts.failed.to_string().red()
    );

    if report.rewritten {
        println!("✅ Done updating {}", report.source.display());
    } else {
        println!("✅ Nothing to update in {}", report.source.display());
    }
    Ok(())
}
