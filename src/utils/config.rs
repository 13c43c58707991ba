//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
    env_prefix: String,
    user_agent: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
                env_prefix: pkg.to_uppercase(),
                user_agent: format!("{pkg}/{}", env!("CARGO_PKG_VERSION")),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Per-directory settings file (`.curator.toml`).
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Env var holding the credential for `repository` (`CURATOR_FIGSHARE_TOKEN`).
    pub fn credential_env_var(&self, repository: &str) -> String {
        let repo: String = repository
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}_{repo}_TOKEN", self.env_prefix)
    }
}

// ---- Progress ----

/// Observer polling cadence.
pub struct ProgressConsts;

impl ProgressConsts {
    /// How often the observer loop drains the progress channel (ms).
    pub const POLL_INTERVAL_MS: u64 = 100;
}

// ---- HTTP / rate limiting ----

pub struct HttpConsts;

impl HttpConsts {
    /// Status code that triggers backoff-and-retry.
    pub const RATE_LIMITED: u16 = 429;
    /// Header carrying the unix timestamp at which the rate limit resets.
    pub const RATE_LIMIT_RESET_HEADER: &'static str = "RateLimit-Reset";
    /// Backoff when a 429 arrives without a usable reset header (seconds).
    pub const DEFAULT_BACKOFF_SECS: u64 = 1;
    /// Per-request timeout (seconds).
    pub const REQUEST_TIMEOUT_SECS: u64 = 60;
    /// Max body characters quoted in error messages.
    pub const ERROR_BODY_PREVIEW: usize = 512;
}

// ---- Output ----

/// Directory the JSON sink writes into when none is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "data";

/// Output format identifier when none is configured.
pub const DEFAULT_OUTPUT_FORMAT: &str = "json";
