//! Credential loading: JSON credential file → env var → `.env` in dir.

use log::{info, warn};
use serde_json::{Map, Value};
use std::path::Path;

use crate::adapters::Adapter;
use crate::engine::ProgressReporter;
use crate::utils::config::PackagePaths;
use crate::{CollectError, CollectResult, CredentialToken};

const NO_CREDENTIALS: &str = "No credentials found, attempting unauthorized run.";

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn try_env_then_dotenv(repository: &str, dir: &Path) -> Option<String> {
    let key = PackagePaths::get().credential_env_var(repository);
    if let Some(s) = std::env::var(&key).ok().as_deref().and_then(non_empty) {
        return Some(s);
    }
    let env_path = dir.join(".env");
    if env_path.is_file() {
        let _ = dotenvy::from_path(&env_path);
        if let Some(s) = std::env::var(&key).ok().as_deref().and_then(non_empty) {
            return Some(s);
        }
    }
    None
}

/// Read the credential for `repository` from a JSON file of the form `{repository: token}`.
///
/// A missing file is an error; a file without the repository key degrades to `None`.
pub fn read_credential_file(path: &Path, repository: &str) -> CollectResult<Option<String>> {
    if !path.is_file() {
        return Err(CollectError::Credentials(format!(
            "{} does not exist",
            path.display()
        )));
    }
    let raw = std::fs::read_to_string(path)
        .map_err(|e| CollectError::Credentials(format!("read {}: {e}", path.display())))?;
    let data: Map<String, Value> = serde_json::from_str(&raw).map_err(|e| {
        CollectError::Credentials(format!("{} is not a JSON object: {e}", path.display()))
    })?;
    Ok(data
        .get(repository)
        .and_then(Value::as_str)
        .and_then(non_empty))
}

/// Resolve the credential for `repository`: credential file when given, else env → `.env` in `dir`.
/// A credential file without an entry for the repository emits a warning and yields `None`.
pub fn load_credential(
    credential_file: Option<&Path>,
    repository: &str,
    dir: &Path,
    reporter: &ProgressReporter,
) -> CollectResult<Option<CredentialToken>> {
    if let Some(path) = credential_file {
        return match read_credential_file(path, repository)? {
            Some(token) => {
                info!("Credentials for {repository} loaded from {}", path.display());
                Ok(Some(CredentialToken::new(token)))
            }
            None => {
                warn!("{}: no entry for {repository}", path.display());
                reporter.message(NO_CREDENTIALS);
                Ok(None)
            }
        };
    }
    Ok(try_env_then_dotenv(repository, dir).map(|token| {
        info!("Credentials for {repository} found in environment");
        CredentialToken::new(token)
    }))
}

/// Hand `token` to the adapter when it accepts credentials. Called once, before the run.
pub fn apply_credential(adapter: &mut dyn Adapter, token: Option<CredentialToken>) {
    match token {
        Some(token) if adapter.supports_credentials() => adapter.set_credential(token),
        Some(_) => warn!(
            "{} does not accept credentials; ignoring the provided token",
            adapter.name()
        ),
        None => {}
    }
}
