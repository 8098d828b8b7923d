// Command-line driver: snapshot one document into a self-contained HTML file.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::path::PathBuf;

use oneshot_snapshot::utils::{DEFAULT_OUTPUT_FILE, DEFAULT_RENDER_DUMP, DEFAULT_RENDER_SCRIPT};
use oneshot_snapshot::{RenderConfig, SnapshotConfig, SnapshotReport};

#[derive(Debug, Parser, Clone)]
#[command(
    name = "oneshot",
    version,
    about = "Snapshot a web page into a single self-contained HTML file"
)]
struct Cli {
    /// Document to snapshot: an http(s) URL or a local file path
    #[arg(long, value_name = "URL")]
    url: String,

    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_OUTPUT_FILE)]
    output: PathBuf,

    /// Resolve relative references against this URL instead of the document's
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Read the document and its resources from disk even if the URL looks remote
    #[arg(long, default_value_t = false)]
    local_files: bool,

    #[arg(long, default_value_t = false)]
    remove_scripts: bool,

    /// Keep scripts but mark them inert (ignored with --remove-scripts)
    #[arg(long, default_value_t = false)]
    neuter_scripts: bool,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    fetch_remote_css: bool,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    fetch_remote_images: bool,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    fetch_remote_css_images: bool,

    #[arg(long, value_name = "N")]
    max_concurrent_fetches: Option<usize>,

    #[arg(long, value_name = "SECS")]
    fetch_timeout_secs: Option<u64>,

    /// Render remote documents with this headless browser program first
    #[arg(long, value_name = "PROGRAM")]
    render_program: Option<String>,

    /// Argument passed to the renderer before the input and output paths
    #[arg(long = "render-arg", value_name = "ARG", action = ArgAction::Append)]
    render_args: Vec<String>,

    #[arg(long, value_name = "FILE", default_value = DEFAULT_RENDER_DUMP)]
    render_dump: PathBuf,
}

impl Cli {
    fn into_config(self) -> Result<SnapshotConfig> {
        let mut builder = SnapshotConfig::builder()
            .document_url(self.url)
            .output_file(self.output)
            .remove_scripts(self.remove_scripts)
            .neuter_scripts(self.neuter_scripts)
            .fetch_remote_css(self.fetch_remote_css)
            .fetch_remote_images(self.fetch_remote_images)
            .fetch_remote_css_images(self.fetch_remote_css_images);

        if let Some(base) = self.base_url {
            builder = builder.base_url(base);
        }
        if self.local_files {
            builder = builder.local(true);
        }
        if let Some(limit) = self.max_concurrent_fetches {
            builder = builder.max_concurrent_fetches(limit);
        }
        if let Some(secs) = self.fetch_timeout_secs {
            builder = builder.fetch_timeout_secs(secs);
        }
        if let Some(program) = self.render_program {
            let args = if self.render_args.is_empty() {
                vec![DEFAULT_RENDER_SCRIPT.to_string()]
            } else {
                self.render_args
            };
            builder = builder.renderer(RenderConfig {
                program,
                args,
                dump_file: self.render_dump,
            });
        }

        builder.build().context("Invalid snapshot configuration")
    }
}

fn print_summary(config: &SnapshotConfig, report: &SnapshotReport) {
    println!("Snapshot written to {}", config.output_file().display());
    println!(
        "  inlined: {}  failed: {}  distinct images fetched: {}",
        report.successes,
        report.failures.len(),
        report.fetched
    );
    if report.scripts_disabled > 0 {
        println!("  scripts disabled: {}", report.scripts_disabled);
    }
    for failure in &report.failures {
        println!("  ! {failure}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Cli::parse().into_config()?;
    log::debug!("Configuration: {config:?}");

    let report = oneshot_snapshot::snapshot(&config)
        .await
        .with_context(|| format!("Snapshot of {} failed", config.document_url()))?;

    print_summary(&config, &report);
    Ok(())
}
