use std::fs::{File, OpenOptions};
use std::path::Path;

use anyhow::{Context, Result};

use crate::extract::AppFields;

const FOUND_FILE: &str = "pkg_data_found.csv";
const MISSING_FILE: &str = "pkg_missing.csv";
const ERROR_FILE: &str = "pkg_error.csv";

/// Sentinel status recorded when the failure happened below HTTP (connect
/// error, timeout) and no status code exists.
pub const NO_STATUS: i32 = -1;

/// The three outcome streams: every attempt lands in exactly one of them.
/// `;`-delimited, append-only, header row written when a file is created.
pub struct Reports {
    found: csv::Writer<File>,
    missing: csv::Writer<File>,
    error: csv::Writer<File>,
}

impl Reports {
    pub fn open(prefix: &str) -> Result<Self> {
        Ok(Reports {
            found: open_stream(
                &format!("{prefix}{FOUND_FILE}"),
                &["Package Name", "Data Region", "Rating", "Reviews", "Downloads", "Last Updated"],
            )?,
            missing: open_stream(
                &format!("{prefix}{MISSING_FILE}"),
                &["Package Name", "Data Region", "Http Status", "Url"],
            )?,
            error: open_stream(
                &format!("{prefix}{ERROR_FILE}"),
                &["Package Name", "Data Region", "Http Status", "Url", "Error"],
            )?,
        })
    }

    pub fn record_found(&mut self, pkg: &str, region: &str, fields: &AppFields) -> Result<()> {
        self.found.write_record([
            pkg,
            region,
            fields.rating.as_str(),
            fields.reviews.as_str(),
            fields.downloads.as_str(),
            fields.last_updated.as_str(),
        ])?;
        self.found.flush()?;
        Ok(())
    }

    pub fn record_missing(&mut self, pkg: &str, region: &str, status: u16, url: &str) -> Result<()> {
        let status = status.to_string();
        self.missing
            .write_record([pkg, region, status.as_str(), url])?;
        self.missing.flush()?;
        Ok(())
    }

    pub fn record_error(
        &mut self,
        pkg: &str,
        region: &str,
        status: i32,
        url: &str,
        message: &str,
    ) -> Result<()> {
        let status = status.to_string();
        self.error
            .write_record([pkg, region, status.as_str(), url, message])?;
        self.error.flush()?;
        Ok(())
    }
}

fn open_stream(path: &str, header: &[&str]) -> Result<csv::Writer<File>> {
    let is_new = !Path::new(path).exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening output stream {path}"))?;
    let mut writer = csv::WriterBuilder::new().delimiter(b';').from_writer(file);
    if is_new {
        writer.write_record(header)?;
        writer.flush()?;
    }
    Ok(writer)
}

// ── Tests ──
