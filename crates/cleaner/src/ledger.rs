use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use log::error;

/// Append-only record of files that have been fully cleaned.
///
/// One path per line. Paths are written as their raw bytes, so names that
/// are not valid UTF-8 round-trip unchanged. The file is re-read on every
/// lookup so edits made by other tools are always visible.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every recorded entry as raw bytes. A missing ledger is an empty set.
    pub fn entries(&self) -> io::Result<HashSet<Vec<u8>>> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(e),
        };

        Ok(content
            .split(|&b| b == b'\n')
            .map(<[u8]>::trim_ascii)
            .filter(|line| !line.is_empty())
            .map(<[u8]>::to_vec)
            .collect())
    }

    /// Check whether `file` has been recorded. Read errors are logged and count as "not recorded".
    pub fn contains(&self, file: &Path) -> bool {
        match self.entries() {
            Ok(entries) => entries.contains(file.as_os_str().as_encoded_bytes()),
            Err(e) => {
                error!("Failed to read ledger {}: {}", self.path.display(), e);
                false
            }
        }
    }

    /// Append `file` as one line. Write errors are logged, never propagated.
    pub fn record(&self, file: &Path) {
        if let Err(e) = self.try_record(file) {
            error!("Failed to write ledger {}: {}", self.path.display(), e);
        }
    }

    fn try_record(&self, file: &Path) -> io::Result<()> {
        let mut handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        // Single write so readers never see half a line
        let mut line = file.as_os_str().as_encoded_bytes().to_vec();
        line.push(b'\n');
        handle.write_all(&line)?;
        handle.flush()
    }
}
