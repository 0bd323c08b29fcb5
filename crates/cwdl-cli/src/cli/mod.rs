//! CLI for cwdl, the courseware link resolver and downloader.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use cwdl_core::config;
use std::path::PathBuf;

use commands::{run_completions, run_fetch, run_man, run_resolve, run_scan, FetchArgs};

/// Top-level CLI for cwdl.
#[derive(Debug, Parser)]
#[command(name = "cwdl")]
#[command(about = "cwdl: resolve courseware viewer links and download the documents", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Resolve a viewer link to its direct download URL and filename.
    Resolve {
        /// Viewer link (e.g. https://vip.ow365.cn/?...&ssl=1).
        url: String,
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Resolve viewer links and download them one at a time.
    Fetch {
        /// Viewer links to resolve and download.
        urls: Vec<String>,
        /// Also take every viewer link found in this saved page source.
        #[arg(long, value_name = "FILE")]
        from_page: Option<PathBuf>,
        /// Directory to save into (default: config download_dir, then the current directory).
        #[arg(long, value_name = "DIR")]
        download_dir: Option<PathBuf>,
        /// Pause between two resolutions in milliseconds (default from config).
        #[arg(long, value_name = "MS")]
        stagger_ms: Option<u64>,
        /// Write resolution results and final task states as JSON to this file.
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// List viewer links found in a saved page source.
    Scan {
        /// Path to the saved HTML.
        path: PathBuf,
    },

    /// Print a shell completion script.
    Completions {
        /// Target shell.
        shell: Shell,
    },

    /// Print the man page (roff).
    Man,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match &cli.command {
            CliCommand::Completions { shell } => return run_completions(*shell),
            CliCommand::Man => return run_man(),
            CliCommand::Scan { path } => return run_scan(path),
            _ => {}
        }

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Resolve { url, json } => run_resolve(&cfg, &url, json).await?,
            CliCommand::Fetch {
                urls,
                from_page,
                download_dir,
                stagger_ms,
                report,
            } => {
                let args = FetchArgs {
                    urls,
                    from_page,
                    download_dir,
                    stagger_ms,
                    report,
                };
                run_fetch(&cfg, args).await?;
            }
            CliCommand::Scan { .. } | CliCommand::Completions { .. } | CliCommand::Man => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
