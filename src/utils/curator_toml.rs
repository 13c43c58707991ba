//! Load `.curator.toml` from a directory (CLI only). Library callers build [`Opts`] directly.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::Opts;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub struct CuratorToml {
    #[serde(default)]
    settings: RunSection,
}

#[derive(Debug, Default, Deserialize)]
struct RunSection {
    repository: Option<String>,
    terms: Option<Vec<String>>,
    types: Option<Vec<String>>,
    credentials: Option<String>,
    output_dir: Option<String>,
    format: Option<String>,
    max_retries: Option<u32>,
    poll_ms: Option<u64>,
    save: Option<bool>,
    bars: Option<bool>,
    verbose: Option<bool>,
}

/// Load `.curator.toml` from `dir` if present. Returns None if file missing or unreadable.
pub fn load_curator_toml(dir: &Path) -> Option<CuratorToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_curator_toml(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

pub fn parse_curator_toml(s: &str) -> Result<CuratorToml, toml::de::Error> {
    toml::from_str(s)
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($section:expr, $opts:expr, $file_field:ident => $opts_field:ident) => {
        if let Some(v) = $section.$file_field.clone() {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI.
pub fn apply_file_to_opts(file: &CuratorToml, opts: &mut Opts) {
    let section = &file.settings;
    if let Some(ref r) = section.repository {
        opts.repository = Some(r.clone());
    }
    apply_file_opt!(section, opts, terms => terms);
    apply_file_opt!(section, opts, types => types);
    if let Some(ref p) = section.credentials {
        opts.credentials = Some(PathBuf::from(p));
    }
    if let Some(ref p) = section.output_dir {
        opts.output_dir = PathBuf::from(p);
    }
    apply_file_opt!(section, opts, format => output_format);
    if let Some(n) = section.max_retries {
        opts.max_rate_limit_retries = Some(n);
    }
    apply_file_opt!(section, opts, poll_ms => poll_interval_ms);
    apply_file_opt!(section, opts, save => save);
    apply_file_opt!(section, opts, bars => bars);
    apply_file_opt!(section, opts, verbose => verbose);
}
