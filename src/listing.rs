use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context, Result};

/// Read package identifiers from the input listing: one per line, `;`
/// separated, only the first field is the identifier (trailing fields such
/// as a category label are ignored). Blank lines are skipped. A missing
/// file is fatal, before any network activity.
pub fn read_package_names(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    if !path.exists() {
        bail!("Could not find the input package listing file: {}", path.display());
    }

    let reader = BufReader::new(
        File::open(path).with_context(|| format!("opening package listing {}", path.display()))?,
    );

    let mut packages = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let Some(first) = line.trim().split(';').next() else {
            continue;
        };
        if first.is_empty() {
            continue;
        }
        packages.push(first.to_string());
    }
    Ok(packages)
}

// ── Tests ──
