use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Verbatim raw-HTML store, one file per (package, region) pair. Written on
/// every Found outcome; read back when the batch runs in replay mode.
pub struct HtmlArchive {
    dir: PathBuf,
}

impl HtmlArchive {
    /// Open the archive directory, creating it if absent.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating raw html directory {}", dir.display()))?;
        Ok(HtmlArchive { dir })
    }

    fn path_for(&self, pkg: &str, region: &str) -> PathBuf {
        self.dir.join(format!("{pkg}_{region}.html"))
    }

    pub fn save(&self, pkg: &str, region: &str, html: &str) -> Result<()> {
        let path = self.path_for(pkg, region);
        fs::write(&path, html).with_context(|| format!("writing raw html {}", path.display()))
    }

    /// Stored document for the pair, or None when it was never archived.
    pub fn load(&self, pkg: &str, region: &str) -> Option<String> {
        fs::read_to_string(self.path_for(pkg, region)).ok()
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_round_trips_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let archive = HtmlArchive::open(dir.path().join("raw_html_output")).unwrap();

        let body = "<html><body>exact bytes\n</body></html>";
        archive.save("com.example.app", "US", body).unwrap();
        assert_eq!(archive.load("com.example.app", "US").as_deref(), Some(body));
    }

    #[test]
    fn pairs_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let archive = HtmlArchive::open(dir.path()).unwrap();

        archive.save("com.a", "US", "us page").unwrap();
        archive.save("com.a", "FI", "fi page").unwrap();
        archive.save("com.a", "", "regionless page").unwrap();

        assert_eq!(archive.load("com.a", "US").as_deref(), Some("us page"));
        assert_eq!(archive.load("com.a", "FI").as_deref(), Some("fi page"));
        assert_eq!(archive.load("com.a", "").as_deref(), Some("regionless page"));
        assert!(archive.load("com.b", "US").is_none());
    }
}
