use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use imgsieve::core::inspect::inspect;
use imgsieve::{Filter, FilterConfig, Pass, PassReport, Pipeline, Session};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(
    name = "imgsieve",
    version,
    about = "Move duplicate, blurred, low-contrast and outlier images out of a training set"
)]
struct Cli {
    /// JSON config file; command-line flags override it
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Only show what would be moved
    #[arg(long, global = true)]
    dry_run: bool,

    /// Print pass reports as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log per-image metrics
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Move exact (and optionally near) duplicates into `<dir>/duplicates`
    Dedup {
        /// Directory to sieve
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,
        /// Directory to move duplicates into
        #[arg(long, value_name = "DIR")]
        target_dir: Option<PathBuf>,
        /// Also move images one hash bit away from a kept image
        #[arg(long)]
        near: bool,
    },

    /// Move blurred images into `<dir>/blurred`
    Blur {
        /// Directory to sieve
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,
        /// Directory to move blurred images into
        #[arg(long, value_name = "DIR")]
        target_dir: Option<PathBuf>,
        /// Sharpness at or below which an image is blurry
        #[arg(long)]
        threshold: Option<f64>,
        /// Half-size of the low-frequency window removed before scoring. The
        /// window is clamped to the spectrum, so an image narrower and shorter
        /// than twice this value scores -inf and is always moved
        #[arg(long)]
        window: Option<usize>,
    },

    /// Move low-contrast images into `<dir>/low_contrast`
    Contrast {
        /// Directory to sieve
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,
        /// Directory to move low-contrast images into
        #[arg(long, value_name = "DIR")]
        target_dir: Option<PathBuf>,
        /// Central entropy at or below which an image is low contrast
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Move images with abnormal entropy into `<dir>/outliers`
    Outliers {
        /// Directory to sieve
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,
        /// Directory to move outliers into
        #[arg(long, value_name = "DIR")]
        target_dir: Option<PathBuf>,
        /// Tukey fence multiplier
        #[arg(long)]
        multiplier: Option<f64>,
    },

    /// Run several passes in order: contrast, dedup, blur, outliers
    Run {
        /// Directory to sieve
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,
        /// Pass to include (repeatable; default: contrast and dedup)
        #[arg(long = "pass", value_enum, value_name = "PASS")]
        passes: Vec<Pass>,
        /// Enable near-duplicate matching in the dedup pass
        #[arg(long)]
        near: bool,
    },

    /// Print every metric for every image without moving anything
    Inspect {
        /// Directory to inspect
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(file) => FilterConfig::from_json_file(file)
            .with_context(|| format!("Failed to load config {:?}", file))?,
        None => FilterConfig::default(),
    };
    if cli.dry_run {
        config.dry_run = true;
    }

    let (path, passes) = match cli.command {
        Commands::Dedup {
            path,
            target_dir,
            near,
        } => {
            if target_dir.is_some() {
                config.dedup.target_dir = target_dir;
            }
            config.dedup.near_match |= near;
            (path, vec![Pass::Dedup])
        }
        Commands::Blur {
            path,
            target_dir,
            threshold,
            window,
        } => {
            if target_dir.is_some() {
                config.blur.target_dir = target_dir;
            }
            if let Some(threshold) = threshold {
                config.blur.threshold = threshold;
            }
            if let Some(window) = window {
                config.blur.window = window;
            }
            (path, vec![Pass::Blur])
        }
        Commands::Contrast {
            path,
            target_dir,
            threshold,
        } => {
            if target_dir.is_some() {
                config.contrast.target_dir = target_dir;
            }
            if let Some(threshold) = threshold {
                config.contrast.threshold = threshold;
            }
            (path, vec![Pass::Contrast])
        }
        Commands::Outliers {
            path,
            target_dir,
            multiplier,
        } => {
            if target_dir.is_some() {
                config.outliers.target_dir = target_dir;
            }
            if let Some(multiplier) = multiplier {
                config.outliers.iqr_multiplier = multiplier;
            }
            (path, vec![Pass::Outliers])
        }
        Commands::Run { path, passes, near } => {
            config.dedup.near_match |= near;
            let passes = if passes.is_empty() {
                Pipeline::DEFAULT_PASSES.to_vec()
            } else {
                passes
            };
            (path, passes)
        }
        Commands::Inspect { path } => {
            config.validate().context("Invalid configuration")?;
            return run_inspect(&path, &config, cli.json);
        }
    };

    config.validate().context("Invalid configuration")?;
    run_passes(&path, &config, &passes, cli.json)
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_filter = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn run_passes(path: &Path, config: &FilterConfig, passes: &[Pass], json: bool) -> Result<()> {
    let pipeline = Pipeline::from_config(config, passes);
    let mut session = Session::new(config);

    if !json {
        let names: Vec<_> = pipeline.passes().iter().map(Pass::label).collect();
        println!("▶ Sieving {} ({})", path.display(), names.join(" → "));
    }

    let mut reports = Vec::new();
    for filter in pipeline.filters() {
        let spinner = spinner(format!("Running {} pass…", filter.pass()))?;
        let report = benchmark(&format!("{} pass", filter.pass()), !json, || {
            filter.run(path, &mut session)
        });
        spinner.finish_and_clear();
        let report = report.with_context(|| format!("{} pass failed on {:?}", filter.pass(), path))?;
        reports.push(report);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            print_summary(report);
        }
        if session.is_dry_run() {
            println!("\n⚠️  Dry-run only; no files were changed.");
        }
    }

    let failures: usize = reports.iter().map(|r| r.failed.len()).sum();
    if failures > 0 {
        anyhow::bail!("{} file(s) could not be moved", failures);
    }
    Ok(())
}

fn print_summary(report: &PassReport) {
    println!(
        "\n✨ {}: scanned {}, moved {} → {}",
        report.pass,
        report.scanned,
        report.relocated().count(),
        report.target_dir.display()
    );
    let skipped = report.skipped().count();
    if skipped > 0 {
        println!("   ⏭️  {} left in place (name taken or file gone)", skipped);
    }
    if !report.unreadable.is_empty() {
        println!("   ⚠️  {} unreadable", report.unreadable.len());
    }
    if !report.failed.is_empty() {
        println!("   ❌ {} failed to move", report.failed.len());
    }
    if let Some(note) = &report.note {
        println!("   ℹ️  {}", note);
    }
}

fn run_inspect(path: &Path, config: &FilterConfig, json: bool) -> Result<()> {
    let session = Session::new(config);
    let spinner = spinner("Measuring images…".to_string())?;
    let inspection = benchmark("measuring all images", !json, || inspect(path, config, &session));
    spinner.finish_and_clear();
    let inspection = inspection.with_context(|| format!("Failed to inspect {:?}", path))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&inspection)?);
        return Ok(());
    }

    println!(
        "{:<40} {:>16} {:>10} {:>8} {:>8}",
        "image", "hash", "sharpness", "entropy", "center"
    );
    for m in &inspection.images {
        let name = m
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!(
            "{:<40} {:>16} {:>10.2} {:>8.2} {:>8.2}",
            name,
            m.hash.to_string(),
            m.sharpness,
            m.entropy,
            m.center_entropy
        );
    }
    if !inspection.unreadable.is_empty() {
        println!("\n⚠️  {} unreadable file(s)", inspection.unreadable.len());
    }
    Ok(())
}

fn spinner(message: String) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

/// Run `f()`, print how long it took (with `label`) when `show` is set, and return its result.
fn benchmark<T, F: FnOnce() -> T>(label: &str, show: bool, f: F) -> T {
    let start = Instant::now();
    let result = f();
    if show {
        println!("⏱ {} took {:.2?}", label, start.elapsed());
    }
    result
}
