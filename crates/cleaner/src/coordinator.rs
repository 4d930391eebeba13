use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use chrono::{Local, NaiveTime};
use log::{debug, error, info, warn};
use tokio_util::sync::CancellationToken;
use crate::config::CleanerConfig;
use crate::error::RunError;
use crate::mkvmerge::RemuxTool;
use crate::remux::{CleanOutcome, Remuxer};
use crate::scan::{LibraryScanner, ScanResult};
use crate::window::ExecutionWindow;

type Clock = Arc<dyn Fn() -> NaiveTime + Send + Sync>;

/// Outcome of single-file mode
#[derive(Debug)]
pub enum FileOutcome {
    Cleaned(CleanOutcome),
    /// Already in the ledger; nothing was done
    AlreadyClean(PathBuf),
}

/// Counters for one walk over the roots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub candidates: usize,
    pub cleaned: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Walk ended before visiting every file (window closed or cancelled)
    pub stopped_early: bool,
}

/// Ties the window, scanner, remuxer and ledger together
pub struct Coordinator<T> {
    window: ExecutionWindow,
    scanner: LibraryScanner,
    remuxer: Remuxer<T>,
    watch_interval: Duration,
    clock: Clock,
}

impl<T: RemuxTool> Coordinator<T> {
    pub fn new(cfg: &CleanerConfig, tool: T) -> Self {
        Self {
            window: ExecutionWindow::new(&cfg.schedule),
            scanner: LibraryScanner::new(cfg),
            remuxer: Remuxer::new(cfg, tool),
            watch_interval: Duration::from_secs(cfg.watch_interval_secs),
            clock: Arc::new(|| Local::now().time()),
        }
    }

    /// Replace the wall clock used for window checks
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveTime + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn window(&self) -> &ExecutionWindow {
        &self.window
    }

    pub fn remuxer(&self) -> &Remuxer<T> {
        &self.remuxer
    }

    fn now(&self) -> NaiveTime {
        (self.clock)()
    }

    fn window_closed(&self) -> RunError {
        RunError::WindowClosed {
            start: self.window.start_hour(),
            end: self.window.end_hour(),
        }
    }

    /// Warn about temporary outputs an interrupted run left behind.
    ///
    /// Walks every root, stopping early once `cancel` fires.
    pub fn report_leftover_temp_files(&self, cancel: &CancellationToken) -> usize {
        let filter = self.scanner.filter();
        let leftovers: Vec<PathBuf> = self
            .scanner
            .scan()
            .take_while(|_| !cancel.is_cancelled())
            .filter_map(|result| match result {
                ScanResult::Skipped(path, _) => Some(path),
                ScanResult::Candidate(_) => None,
            })
            .filter(|path| {
                path.file_name()
                    .map(|n| filter.is_temp_output(&n.to_string_lossy()))
                    .unwrap_or(false)
            })
            .collect();

        for path in &leftovers {
            warn!(
                "Leftover temporary output {} (interrupted clean?), check the directory by hand",
                path.display()
            );
        }
        if !leftovers.is_empty() {
            warn!(
                "{} leftover temporary output(s) found, their directories will fail until resolved",
                leftovers.len()
            );
        }
        leftovers.len()
    }

    /// Clean one explicitly named file
    pub async fn run_file(&self, path: &Path) -> Result<FileOutcome, RunError> {
        if !path.exists() {
            return Err(RunError::NotFound(path.to_path_buf()));
        }
        if !self.scanner.filter().has_container_extension(path) {
            return Err(RunError::WrongExtension {
                path: path.to_path_buf(),
                extension: self.scanner.filter().extension().to_string(),
            });
        }
        if !self.window.may_start_work_now(&self.now()) {
            return Err(self.window_closed());
        }

        let key = ledger_key(path);
        if self.remuxer.ledger().contains(&key) {
            info!("Already cleaned, skipping: {}", key.display());
            return Ok(FileOutcome::AlreadyClean(key));
        }

        info!("Cleaning: {}", key.display());
        let outcome = self.remuxer.clean(&key).await?;
        Ok(FileOutcome::Cleaned(outcome))
    }

    /// Walk every root once and clean each eligible file
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<RunSummary, RunError> {
        if !self.window.may_start_work_now(&self.now()) {
            return Err(self.window_closed());
        }
        self.report_leftover_temp_files(cancel);
        Ok(self.clean_pass(cancel, None).await)
    }

    /// Re-scan on the configured interval until `cancel` fires
    pub async fn run_forever(&self, cancel: CancellationToken) {
        info!("Watch mode - interval: {}s", self.watch_interval.as_secs());
        if self.window.is_enabled() {
            info!(
                "Execution window: {}h00 to {}h00",
                self.window.start_hour(),
                self.window.end_hour()
            );
        }

        // Mtime of each file cleaned by this process
        let mut seen: HashMap<PathBuf, SystemTime> = HashMap::new();
        let mut leftovers_reported = false;

        while !cancel.is_cancelled() {
            let now = self.now();
            if !self.window.may_scan_now(&now) {
                info!("[{}] Window closed, pausing", now.format("%H:%M:%S"));
            } else {
                if !leftovers_reported {
                    self.report_leftover_temp_files(&cancel);
                    leftovers_reported = true;
                }
                let summary = self.clean_pass(&cancel, Some(&mut seen)).await;
                log_summary(&summary);
            }

            info!("Waiting {}s before next check", self.watch_interval.as_secs());
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.watch_interval) => {}
            }
        }

        info!("Watch mode stopped");
    }

    async fn clean_pass(
        &self,
        cancel: &CancellationToken,
        mut seen: Option<&mut HashMap<PathBuf, SystemTime>>,
    ) -> RunSummary {
        let mut summary = RunSummary::default();

        for result in self.scanner.scan() {
            let path = match result {
                ScanResult::Candidate(path) => path,
                ScanResult::Skipped(..) => {
                    summary.skipped += 1;
                    continue;
                }
            };

            if cancel.is_cancelled() {
                info!("Cancellation requested, stopping scan");
                summary.stopped_early = true;
                break;
            }

            let key = ledger_key(&path);
            let mtime = if seen.is_some() {
                fs::metadata(&key).and_then(|m| m.modified()).ok()
            } else {
                None
            };
            if let (Some(seen), Some(mtime)) = (seen.as_deref(), mtime) {
                if seen.get(&key) == Some(&mtime) {
                    debug!("Unchanged since last clean: {}", key.display());
                    summary.skipped += 1;
                    continue;
                }
            }

            if self.remuxer.ledger().contains(&key) {
                debug!("Already cleaned: {}", key.display());
                summary.skipped += 1;
                continue;
            }

            let now = self.now();
            if !self.window.may_start_work_now(&now) {
                info!(
                    "[{}] End of window reached, no new cleans",
                    now.format("%H:%M:%S")
                );
                summary.stopped_early = true;
                break;
            }

            summary.candidates += 1;
            info!("Cleaning: {}", key.display());
            match self.remuxer.clean(&key).await {
                Ok(_) => {
                    summary.cleaned += 1;
                    if let (Some(seen), Some(mtime)) = (seen.as_deref_mut(), mtime) {
                        seen.insert(key, mtime);
                    }
                }
                Err(e) => {
                    error!("Failed to clean {}: {}", path.display(), e);
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}

/// Write the summary of a pass to the log
pub fn log_summary(summary: &RunSummary) {
    info!(
        "Scan summary: {} attempted, {} cleaned, {} failed, {} skipped{}",
        summary.candidates,
        summary.cleaned,
        summary.failed,
        summary.skipped,
        if summary.stopped_early { " (stopped early)" } else { "" }
    );
}

/// Canonical form of `path` used as the ledger key
pub fn ledger_key(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
