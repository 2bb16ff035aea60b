use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

/// Durable record of (package, region) pairs already processed, used to make
/// a batch resumable. The backing file is a headerless `pkg;region` append
/// log: read once on open, then only ever appended to. A mark that fails to
/// reach disk costs at most one redundant fetch on the next run.
pub struct CacheLedger {
    path: PathBuf,
    file: File,
    entries: HashMap<String, HashSet<String>>,
}

impl CacheLedger {
    /// Load the ledger at `path`, creating the file if absent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut entries: HashMap<String, HashSet<String>> = HashMap::new();

        if path.exists() {
            let reader = BufReader::new(
                File::open(&path).with_context(|| format!("opening cache ledger {}", path.display()))?,
            );
            for line in reader.lines() {
                let line = line?;
                let mut parts = line.split(';');
                let (Some(pkg), Some(region)) = (parts.next(), parts.next()) else {
                    continue;
                };
                if pkg.is_empty() {
                    continue;
                }
                entries
                    .entry(pkg.to_string())
                    .or_default()
                    .insert(region.to_string());
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening cache ledger {} for append", path.display()))?;

        debug!("Cache ledger loaded: {} packages", entries.len());
        Ok(CacheLedger { path, file, entries })
    }

    pub fn is_processed(&self, pkg: &str, region: &str) -> bool {
        self.entries.get(pkg).is_some_and(|r| r.contains(region))
    }

    /// Record the pair in memory and append it to disk before returning.
    pub fn mark_processed(&mut self, pkg: &str, region: &str) -> Result<()> {
        self.entries
            .entry(pkg.to_string())
            .or_default()
            .insert(region.to_string());
        writeln!(self.file, "{};{}", pkg, region)
            .with_context(|| format!("appending to cache ledger {}", self.path.display()))?;
        self.file.flush()?;
        Ok(())
    }
}

// ── Tests ──
