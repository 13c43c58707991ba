use clap::Parser;
use std::path::PathBuf;

use crate::Opts;

/// Collect records from a data repository, enrich them with metadata, and save the joined tables.
#[derive(Clone, Debug, Parser)]
#[command(name = "curator")]
#[command(about = "Collect search results and metadata from a data repository.")]
pub struct Cli {
    /// Repository to collect from (see --list-repositories). Default: `repository` in .curator.toml.
    #[arg(value_name = "REPOSITORY")]
    pub repository: Option<String>,

    /// Search terms. Can specify multiple: -t term1 term2 "two words"
    #[arg(long = "term", short = 't', num_args = 1..)]
    pub terms: Vec<String>,

    /// Search types. Can specify multiple: -y articles collections
    #[arg(long = "type", short = 'y', num_args = 1..)]
    pub types: Vec<String>,

    /// JSON credential file mapping repository name to token.
    #[arg(long, short = 'c')]
    pub credentials: Option<PathBuf>,

    /// Directory to write output files into. Default: `data`.
    #[arg(long, short = 'o')]
    pub output_dir: Option<PathBuf>,

    /// Output format: json or jsonl.
    #[arg(long, short = 'f')]
    pub format: Option<String>,

    /// Give up after this many consecutive rate-limit retries. Default: retry until the limit clears.
    #[arg(long, value_parser = clap::value_parser!(u32))]
    pub max_retries: Option<u32>,

    /// Progress poll interval in milliseconds.
    #[arg(long, value_parser = clap::value_parser!(u64))]
    pub poll_ms: Option<u64>,

    /// Collect and report, but do not write output files.
    #[arg(long)]
    pub no_save: bool,

    /// Show progress bars instead of log lines.
    #[arg(long, short = 'b', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub bars: Option<bool>,

    /// Print the available repositories and exit.
    #[arg(long)]
    pub list_repositories: bool,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}

impl Cli {
    /// Overwrite `opts` with every flag given on the command line. Call after the file overlay.
    pub fn apply_to(&self, opts: &mut Opts) {
        if let Some(ref repository) = self.repository {
            opts.repository = Some(repository.clone());
        }
        if !self.terms.is_empty() {
            opts.terms = self.terms.clone();
        }
        if !self.types.is_empty() {
            opts.types = self.types.clone();
        }
        if let Some(ref path) = self.credentials {
            opts.credentials = Some(path.clone());
        }
        if let Some(ref dir) = self.output_dir {
            opts.output_dir = dir.clone();
        }
        if let Some(ref format) = self.format {
            opts.output_format = format.clone();
        }
        if let Some(n) = self.max_retries {
            opts.max_rate_limit_retries = Some(n);
        }
        if let Some(ms) = self.poll_ms {
            opts.poll_interval_ms = ms;
        }
        if self.no_save {
            opts.save = false;
        }
        if let Some(bars) = self.bars {
            opts.bars = bars;
        }
        if let Some(verbose) = self.verbose {
            opts.verbose = verbose;
        }
    }
}
