//! CLI binary for sconee-archive.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig` and prints a run summary.

use anyhow::{Context, Result};
use clap::Parser;
use sconee_archive::{run, run_single_url, PipelineConfig};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Unattended run over urls.txt and uploads/, then publish
  catalog-update

  # Classify one URL and prepend it to the catalog (no publish)
  catalog-update --url https://design-blog.test/oak-chair-nook

  # Dry local layout, no git push
  catalog-update --no-publish --catalog data.json --intake uploads

INTAKE SEMANTICS:
  urls.txt     one URL per line; the file is emptied after each batch,
               so a failed URL must be re-added by hand
  uploads/     images are moved to processed/ only when fully catalogued;
               failures stay for the next run

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY     Classification service API key (required)
  ARCHIVE_MODEL      Override the classifier model id
  ARCHIVE_CATALOG    Override the catalog path

SETUP:
  1. Set API key:     export GEMINI_API_KEY=...
  2. Queue work:      echo https://blog.test/post >> urls.txt
  3. Run:             catalog-update
"#;

/// Update the interior-design archive catalog from pending URLs and uploads.
#[derive(Parser, Debug)]
#[command(
    name = "catalog-update",
    version,
    about = "Classify interior-design images and update the site catalog",
    long_about = "Reads pending work from a URL list file and a local upload folder, classifies \
each image through a vision LLM, prepends the results to the site's JSON catalog, and \
optionally publishes the working tree with git.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Classify this single URL and exit (interactive mode, never publishes).
    #[arg(long)]
    url: Option<String>,

    /// Catalog JSON file.
    #[arg(long, env = "ARCHIVE_CATALOG", default_value = "data.json")]
    catalog: PathBuf,

    /// Pending URL list file.
    #[arg(long, env = "ARCHIVE_URLS", default_value = "urls.txt")]
    urls: PathBuf,

    /// Upload intake directory.
    #[arg(long, env = "ARCHIVE_INTAKE", default_value = "uploads")]
    intake: PathBuf,

    /// Directory consumed uploads are moved into.
    #[arg(long, env = "ARCHIVE_PROCESSED", default_value = "processed")]
    processed: PathBuf,

    /// Web-asset directory for normalized images.
    #[arg(long, env = "ARCHIVE_IMAGES", default_value = "images")]
    images: PathBuf,

    /// Classifier model id.
    #[arg(long, env = "ARCHIVE_MODEL", default_value = "gemini-1.5-flash")]
    model: String,

    /// Classification service API key (prefer the environment variable).
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// HTTP timeout in seconds.
    #[arg(long, env = "ARCHIVE_TIMEOUT", default_value_t = 10)]
    timeout: u64,

    /// Pause after each successful classification, in milliseconds.
    #[arg(long, env = "ARCHIVE_DELAY_MS", default_value_t = 2000)]
    delay_ms: u64,

    /// Skip the git publish step.
    #[arg(long, env = "ARCHIVE_NO_PUBLISH")]
    no_publish: bool,

    /// Working tree to stage and push.
    #[arg(long, env = "ARCHIVE_REPO", default_value = ".")]
    repo: PathBuf,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "ARCHIVE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "ARCHIVE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    // ── Single-URL mode ──────────────────────────────────────────────────
    if let Some(ref url) = cli.url {
        match run_single_url(&config, url)
            .await
            .context("Catalog update failed")?
        {
            Some(record) => {
                let tags = record.tags.clone().unwrap_or_else(|| {
                    [&record.space, &record.vibe, &record.detail]
                        .iter()
                        .filter_map(|f| f.as_deref())
                        .collect::<Vec<_>>()
                        .join(" | ")
                });
                println!("{} {}", green("✔"), bold(&record.title));
                println!("  {}  {}", dim(&tags), dim(&record.img));
                if !cli.quiet {
                    eprintln!("Catalog updated — push {} to publish.", config.catalog_path.display());
                }
            }
            None => {
                println!("{} could not catalogue {}", red("✘"), url);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    // ── Unattended run ───────────────────────────────────────────────────
    let stats = run(&config).await.context("Catalog update failed")?;

    if !cli.quiet {
        if stats.urls_attempted + stats.uploads_attempted == 0 {
            eprintln!("{} nothing pending — no work this run", dim("·"));
        } else {
            eprintln!(
                "{}  {}/{} urls  {}/{} uploads{}",
                if stats.total_succeeded() > 0 {
                    green("✔")
                } else {
                    red("✘")
                },
                stats.urls_succeeded,
                stats.urls_attempted,
                stats.uploads_succeeded,
                stats.uploads_attempted,
                if stats.published {
                    "  (published)".to_string()
                } else if config.publish && stats.total_succeeded() > 0 {
                    format!("  ({})", red("publish failed"))
                } else {
                    String::new()
                },
            );
        }
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .catalog_path(&cli.catalog)
        .url_list_path(&cli.urls)
        .intake_dir(&cli.intake)
        .processed_dir(&cli.processed)
        .images_dir(&cli.images)
        .model(&cli.model)
        .http_timeout_secs(cli.timeout)
        .courtesy_delay_ms(cli.delay_ms)
        .publish(!cli.no_publish && cli.url.is_none())
        .repo_dir(&cli.repo);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }

    builder.build().context("Invalid configuration")
}
