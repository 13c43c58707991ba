pub mod config;
pub mod credentials;
pub mod curator_toml;
pub mod logger;

pub use config::*;
pub use credentials::{apply_credential, load_credential, read_credential_file};
pub use curator_toml::{apply_file_to_opts, load_curator_toml, parse_curator_toml};
pub use logger::setup_logging;
