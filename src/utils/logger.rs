use colored::Colorize;
use env_logger::{Builder, Env};
use log::{Level, LevelFilter};
use std::io::Write;

use crate::utils::config::PackagePaths;

/// Install the CLI logger. `CURATOR_LOG` overrides the filters below.
///
/// Dependencies (ureq, rustls) log at warn; this crate at info, or debug when `verbose`.
/// Debug lines carry the emitting module so fetcher and controller output can be told apart.
pub fn setup_logging(verbose: bool) {
    let paths = PackagePaths::get();
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let env = Env::default().filter(format!("{}_LOG", paths.pkg_name().to_uppercase()));

    let _ = Builder::new()
        .filter_level(LevelFilter::Warn)
        .filter_module(paths.pkg_name(), level)
        .parse_env(env)
        .format(|buf, record| {
            let name = PackagePaths::get().pkg_name();
            let line = match record.level() {
                Level::Error => format!("[{} {}] {}", name.cyan(), "ERROR".red(), record.args()),
                Level::Warn => format!("[{} {}] {}", name.cyan(), "WARN".yellow(), record.args()),
                Level::Info => format!("[{}] {}", name.cyan(), record.args()),
                Level::Debug | Level::Trace => format!(
                    "[{} {}] {}",
                    name.cyan(),
                    record.target().dimmed(),
                    record.args()
                ),
            };
            writeln!(buf, "{}", line)
        })
        .try_init();
}
