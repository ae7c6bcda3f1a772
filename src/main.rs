use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod actions;
mod classify;
mod config;
mod education;
mod error;
mod grid;
mod layout;
mod models;
mod normalize;
mod output;
mod pipeline;
mod posts;
mod reconcile;
mod report;
mod segment;
mod signals;

use config::Config;
use grid::CsvWorkbookSource;
use pipeline::{PostRun, UnderperformanceRun};
use posts::CsvPostSource;

#[derive(Parser)]
#[command(name = "qc-extract")]
#[command(about = "Extract QC reports and underperforming agent records for contact centers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Common {
    /// Directory holding `<center>/` workbook folders and board exports
    #[arg(long, default_value = "source")]
    source: PathBuf,
    /// JSON run configuration; built-in centers when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Restrict the run to one configured center
    #[arg(long)]
    center: Option<String>,
}

#[derive(Args)]
struct Output {
    #[arg(long, default_value = "output")]
    out: PathBuf,
    /// Also write a markdown run summary
    #[arg(long)]
    summary: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract all four record streams
    Run {
        #[command(flatten)]
        common: Common,
        #[command(flatten)]
        output: Output,
    },
    /// Extract posts, report items and education records
    Posts {
        #[command(flatten)]
        common: Common,
        #[command(flatten)]
        output: Output,
    },
    /// Extract underperforming agent records
    Underperforming {
        #[command(flatten)]
        common: Common,
        #[command(flatten)]
        output: Output,
    },
    /// Show the month-end workbook chosen for each center and month
    Select {
        #[command(flatten)]
        common: Common,
    },
}

fn load_config(common: &Common) -> anyhow::Result<Config> {
    let mut config = Config::load(common.config.as_deref())?;
    if let Some(name) = &common.center {
        let center = config
            .center(name)
            .cloned()
            .ok_or_else(|| anyhow!("unknown center: {name}"))?;
        config.centers = vec![center];
    }
    Ok(config)
}

fn write_posts(out: &Path, run: &PostRun) -> anyhow::Result<()> {
    output::write_ndjson(&output::stream_path(out, output::POSTS_FILE), &run.posts)?;
    output::write_ndjson(&output::stream_path(out, output::ACTIONS_FILE), &run.actions)?;
    output::write_ndjson(&output::stream_path(out, output::EDUCATION_FILE), &run.education)?;
    println!(
        "Posts: {} | report items: {} | education records: {}",
        run.posts.len(),
        run.actions.len(),
        run.education.len()
    );
    for (center, cause) in &run.failed_centers {
        println!("- posts unavailable for {center}: {cause}");
    }
    Ok(())
}

fn write_underperforming(out: &Path, run: &UnderperformanceRun) -> anyhow::Result<()> {
    output::write_ndjson(
        &output::stream_path(out, output::UNDERPERFORMING_FILE),
        &run.records,
    )?;
    println!(
        "Underperformance records: {} ({} duplicates dropped)",
        run.records.len(),
        run.duplicates
    );
    for file in run.files.iter().filter(|f| f.failure.is_some()) {
        println!(
            "- failed {}: {}",
            file.file_name,
            file.failure.as_deref().unwrap_or_default()
        );
    }
    Ok(())
}

fn write_summary(
    path: Option<&Path>,
    posts: Option<&PostRun>,
    underperformance: Option<&UnderperformanceRun>,
) -> anyhow::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let summary = report::build_summary(Utc::now().naive_utc(), posts, underperformance);
    std::fs::write(path, summary)
        .with_context(|| format!("failed to write summary {}", path.display()))?;
    println!("Summary written to {}.", path.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { common, output } => {
            let config = load_config(&common)?;
            let posts = pipeline::run_posts(
                &config,
                &CsvPostSource::new(&common.source),
                Utc::now().naive_utc(),
            );
            let underperformance =
                pipeline::run_underperforming(&config, &common.source, &CsvWorkbookSource)?;
            write_posts(&output.out, &posts)?;
            write_underperforming(&output.out, &underperformance)?;
            write_summary(output.summary.as_deref(), Some(&posts), Some(&underperformance))?;
        }
        Commands::Posts { common, output } => {
            let config = load_config(&common)?;
            let posts = pipeline::run_posts(
                &config,
                &CsvPostSource::new(&common.source),
                Utc::now().naive_utc(),
            );
            write_posts(&output.out, &posts)?;
            write_summary(output.summary.as_deref(), Some(&posts), None)?;
        }
        Commands::Underperforming { common, output } => {
            let config = load_config(&common)?;
            let underperformance =
                pipeline::run_underperforming(&config, &common.source, &CsvWorkbookSource)?;
            write_underperforming(&output.out, &underperformance)?;
            write_summary(output.summary.as_deref(), None, Some(&underperformance))?;
        }
        Commands::Select { common } => {
            let config = load_config(&common)?;
            let selections = pipeline::select_files(&config, &common.source)?;
            for selection in selections {
                if selection.files.is_empty() {
                    println!("{}: no workbooks found.", selection.center);
                    continue;
                }
                println!("{}:", selection.center);
                for file in &selection.files {
                    println!("- {}월 (week {}): {}", file.month, file.week, file.file_name);
                }
            }
        }
    }

    Ok(())
}
