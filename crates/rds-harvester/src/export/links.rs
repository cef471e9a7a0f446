//! Detail-page links and the incremental link log.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::model::Declaration;

/// Detail page of one declaration: `<base>/<id>/common`.
pub fn detail_url(base: &str, id: u64) -> String {
    format!("{}/{id}/common", base.trim_end_matches('/'))
}

/// Detail-page links for every record, in record order.
pub fn generate_links(records: &[Declaration], base: &str) -> Vec<String> {
    records.iter().map(|r| detail_url(base, r.id)).collect()
}

/// Line-per-link text file, appended to as partitions finish.
///
/// Concurrent tasks share one instance behind a mutex; every append is
/// flushed before the lock is released.
pub struct LinkLog {
    writer: BufWriter<File>,
    path: PathBuf,
    written: usize,
}

impl LinkLog {
    /// Create (or truncate) the link file.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("failed to open link log: {}", path.display()))?;

        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            written: 0,
        })
    }

    /// Append links, one per line.
    pub fn append(&mut self, links: &[String]) -> Result<()> {
        for link in links {
            writeln!(self.writer, "{link}")
                .with_context(|| format!("failed to write {}", self.path.display()))?;
        }
        self.writer.flush()?;
        self.written += links.len();
        Ok(())
    }

    /// Links written so far.
    pub fn written(&self) -> usize {
        self.written
    }
}
