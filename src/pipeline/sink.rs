//! Persistence sinks: where the final tables go.

use log::debug;
use std::fmt;
use std::fs::{self, File};
use std::collections::HashSet;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{CollectError, CollectResult, ResultTable};

/// Output format identifier handed to the sink.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON array per table.
    #[default]
    Json,
    /// One JSON object per line.
    JsonLines,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::JsonLines => "jsonl",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = CollectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "jsonl" | "ndjson" => Ok(OutputFormat::JsonLines),
            other => Err(CollectError::Validation(format!(
                "unknown output format '{other}', expected json or jsonl"
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Receives the final tables, keyed by sanitized file stem, once per completed run.
pub trait PersistenceSink: Send {
    /// Destination shown in the "Saving output to ..." message.
    fn describe(&self) -> String;
    fn persist(&mut self, tables: &[(String, &ResultTable)], format: OutputFormat) -> CollectResult<()>;
}

/// Writes `<dir>/<prefix>_<key>.<ext>` per table, creating `dir` as needed.
#[derive(Clone, Debug)]
pub struct JsonDirSink {
    dir: PathBuf,
    prefix: String,
}

impl JsonDirSink {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn path_for(&self, key: &str, format: OutputFormat) -> PathBuf {
        let name = if self.prefix.is_empty() {
            format!("{key}.{}", format.extension())
        } else {
            format!("{}_{key}.{}", self.prefix, format.extension())
        };
        self.dir.join(name)
    }
}

fn sink_error(path: &Path, source: io::Error) -> CollectError {
    CollectError::Sink {
        target: path.display().to_string(),
        source,
    }
}

fn write_table(path: &Path, table: &ResultTable, format: OutputFormat) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, table)?;
            writeln!(out)?;
        }
        OutputFormat::JsonLines => {
            for row in table.rows() {
                serde_json::to_writer(&mut out, row)?;
                writeln!(out)?;
            }
        }
    }
    out.flush()
}

impl PersistenceSink for JsonDirSink {
    fn describe(&self) -> String {
        self.dir.display().to_string()
    }

    /// Fails before writing anything when two keys map to the same file.
    fn persist(&mut self, tables: &[(String, &ResultTable)], format: OutputFormat) -> CollectResult<()> {
        let mut seen = HashSet::new();
        for (key, _) in tables {
            let path = self.path_for(key, format);
            if !seen.insert(path.clone()) {
                let err = io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("more than one table maps to '{key}'"),
                );
                return Err(sink_error(&path, err));
            }
        }
        fs::create_dir_all(&self.dir).map_err(|e| sink_error(&self.dir, e))?;
        for (key, table) in tables {
            let path = self.path_for(key, format);
            write_table(&path, table, format).map_err(|e| sink_error(&path, e))?;
            debug!("Wrote {} rows to {}", table.len(), path.display());
        }
        Ok(())
    }
}

/// One `persist` call as recorded by [`MemorySink`].
#[derive(Clone, Debug, PartialEq)]
pub struct PersistedTable {
    pub key: String,
    pub format: OutputFormat,
    pub table: ResultTable,
}

/// Keeps persisted tables in memory. Clones share storage, so a clone kept by the caller
/// sees what the run wrote.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    tables: Arc<Mutex<Vec<PersistedTable>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PersistedTable>> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn tables(&self) -> Vec<PersistedTable> {
        self.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl PersistenceSink for MemorySink {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn persist(&mut self, tables: &[(String, &ResultTable)], format: OutputFormat) -> CollectResult<()> {
        let mut stored = self.lock();
        stored.extend(tables.iter().map(|(key, table)| PersistedTable {
            key: key.clone(),
            format,
            table: (*table).clone(),
        }));
        Ok(())
    }
}
