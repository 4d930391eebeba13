use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use crate::config::CleanerConfig;
use log::{debug, info, warn};

/// Result of looking at one file during a walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanResult {
    /// File should be cleaned
    Candidate(PathBuf),
    /// Container file that is deliberately left alone (path, reason)
    Skipped(PathBuf, String),
}

/// Filename rules deciding which files are picked up
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    extension: String,
    clean_suffix: String,
    trailer_suffix: String,
    temp_file_name: String,
}

impl CandidateFilter {
    pub fn from_config(cfg: &CleanerConfig) -> Self {
        let extension = cfg.container_extension.to_lowercase();
        Self {
            clean_suffix: format!("{}.{}", cfg.clean_marker.to_lowercase(), extension),
            trailer_suffix: format!("{}.{}", cfg.trailer_marker.to_lowercase(), extension),
            extension,
            temp_file_name: cfg.temp_file_name.to_lowercase(),
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// True when `path` carries the container extension, in any case
    pub fn has_container_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(&self.extension))
            .unwrap_or(false)
    }

    pub fn is_temp_output(&self, file_name: &str) -> bool {
        file_name.to_lowercase() == self.temp_file_name
    }

    /// Classify a container file by name alone. Returns None for non-container files.
    pub fn classify(&self, path: &Path) -> Option<ScanResult> {
        if !self.has_container_extension(path) {
            return None;
        }
        let file_name = path.file_name()?.to_string_lossy().to_lowercase();

        let reason = if file_name == self.temp_file_name {
            Some("temporary output")
        } else if file_name.ends_with(&self.clean_suffix) {
            Some("already clean")
        } else if file_name.ends_with(&self.trailer_suffix) {
            Some("trailer")
        } else {
            None
        };

        Some(match reason {
            Some(reason) => ScanResult::Skipped(path.to_path_buf(), reason.to_string()),
            None => ScanResult::Candidate(path.to_path_buf()),
        })
    }
}

/// Walks the configured roots for container files
#[derive(Debug, Clone)]
pub struct LibraryScanner {
    roots: Vec<PathBuf>,
    filter: CandidateFilter,
}

impl LibraryScanner {
    pub fn new(cfg: &CleanerConfig) -> Self {
        Self {
            roots: cfg.source_roots.clone(),
            filter: CandidateFilter::from_config(cfg),
        }
    }

    pub fn filter(&self) -> &CandidateFilter {
        &self.filter
    }

    /// Lazily walk every root once. Each call starts a fresh walk.
    ///
    /// Hidden directories are included; missing roots are reported and skipped.
    pub fn scan(&self) -> impl Iterator<Item = ScanResult> + '_ {
        self.roots
            .iter()
            .filter(|root| {
                if root.exists() {
                    info!("Scanning directory: {}", root.display());
                    true
                } else {
                    warn!("Source folder not found: {}", root.display());
                    false
                }
            })
            .flat_map(|root| WalkDir::new(root).follow_links(false).into_iter())
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(e) => {
                    warn!("Error reading directory entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.path().is_file())
            .filter_map(move |entry| self.filter.classify(entry.path()))
            .inspect(|result| {
                if let ScanResult::Skipped(path, reason) = result {
                    debug!("Skipped {}: {}", path.display(), reason);
                }
            })
    }
}
