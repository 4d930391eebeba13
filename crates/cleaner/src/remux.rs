use std::fs::{self, File, FileTimes};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use log::{debug, info, warn};
use crate::config::CleanerConfig;
use crate::error::CleanError;
use crate::ledger::Ledger;
use crate::mkvmerge::RemuxTool;
use crate::sanitize::{SanitizationPlan, Sanitizer};

/// Result of a successful clean
#[derive(Debug, Clone)]
pub struct CleanOutcome {
    /// Path the file was discovered at; this is what the ledger records
    pub original: PathBuf,
    /// Where the cleaned container now lives
    pub final_path: PathBuf,
    pub plan: SanitizationPlan,
}

/// Access and modification times captured before the rewrite
#[derive(Debug, Clone, Copy)]
struct TimestampSnapshot {
    accessed: SystemTime,
    modified: SystemTime,
}

impl TimestampSnapshot {
    fn capture(path: &Path) -> std::io::Result<Self> {
        let metadata = fs::metadata(path)?;
        Ok(Self {
            accessed: metadata.accessed()?,
            modified: metadata.modified()?,
        })
    }

    fn restore(&self, path: &Path) -> std::io::Result<()> {
        let times = FileTimes::new()
            .set_accessed(self.accessed)
            .set_modified(self.modified);
        File::options().write(true).open(path)?.set_times(times)
    }
}

/// Drives the remux tool for one file at a time and records successes
#[derive(Debug)]
pub struct Remuxer<T> {
    tool: T,
    sanitizer: Sanitizer,
    ledger: Ledger,
    temp_file_name: String,
}

impl<T: RemuxTool> Remuxer<T> {
    pub fn new(cfg: &CleanerConfig, tool: T) -> Self {
        Self {
            tool,
            sanitizer: Sanitizer::from_config(cfg),
            ledger: Ledger::new(&cfg.ledger_path),
            temp_file_name: cfg.temp_file_name.clone(),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }

    /// Clean one file in place and record it in the ledger.
    ///
    /// The original is only deleted once the tool has produced the new
    /// container. A failure between that delete and the following rename
    /// leaves only the temporary output behind ([`CleanError::Replace`]).
    pub async fn clean(&self, path: &Path) -> Result<CleanOutcome, CleanError> {
        let tracks = self
            .tool
            .identify(path)
            .await
            .map_err(|source| CleanError::Inspect {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("{}: {} tracks", path.display(), tracks.len());

        let snapshot = TimestampSnapshot::capture(path).map_err(|source| CleanError::Snapshot {
            path: path.to_path_buf(),
            source,
        })?;

        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        let file_name = path.file_name().unwrap_or_default();
        let plan = self.sanitizer.plan(file_name, &tracks);
        let temp_path = dir.join(&self.temp_file_name);
        let final_path = dir.join(&plan.file_name);

        if temp_path.exists() {
            return Err(CleanError::TempOutputExists { path: temp_path });
        }
        if final_path != path && final_path.exists() {
            return Err(CleanError::TargetExists { path: final_path });
        }

        debug!(
            "{}: {} track directives, output {}",
            path.display(),
            plan.directives.len(),
            final_path.display()
        );

        if let Err(source) = self.tool.remux(path, &temp_path, &plan).await {
            if temp_path.exists() {
                if let Err(e) = fs::remove_file(&temp_path) {
                    warn!("Failed to delete partial output {}: {}", temp_path.display(), e);
                }
            }
            return Err(CleanError::Rewrite {
                path: path.to_path_buf(),
                source,
            });
        }

        let replace_err = |source| CleanError::Replace {
            original: path.to_path_buf(),
            temp: temp_path.clone(),
            source,
        };
        fs::remove_file(path).map_err(replace_err)?;
        fs::rename(&temp_path, &final_path).map_err(replace_err)?;

        snapshot
            .restore(&final_path)
            .map_err(|source| CleanError::RestoreTimes {
                path: final_path.clone(),
                source,
            })?;

        // Key on the original path: the new name never passes the scan filter
        self.ledger.record(path);
        info!("Cleaned {} -> {}", path.display(), final_path.display());

        Ok(CleanOutcome {
            original: path.to_path_buf(),
            final_path,
            plan,
        })
    }
}
