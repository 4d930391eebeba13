//! Error types for the cleaner library.
//!
//! Each failure point of a clean gets its own variant so callers can tell a
//! harmless skip (original untouched) from a post-rewrite failure that may
//! need a human to look at the directory.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal startup errors while building a [`crate::CleanerConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid SOURCE_FOLDERS list {raw:?}: {source}")]
    SourceFolders {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value for {key}: {value:?} ({expected})")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{key} must be an hour between 0 and 23, got {value}")]
    HourOutOfRange { key: &'static str, value: u32 },
}

/// Errors raised by the external remux tool adapter.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Failed to execute {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed (exit code {exit_code}): {stderr}")]
    Failed {
        tool: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Failed to decode {tool} output: {source}")]
    Decode {
        tool: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure while cleaning one file, tagged by the step that failed.
#[derive(Error, Debug)]
pub enum CleanError {
    /// Track listing failed; nothing was touched.
    #[error("Inspection failed for {path}: {source}")]
    Inspect {
        path: PathBuf,
        #[source]
        source: ToolError,
    },

    #[error("Failed to read timestamps of {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A previous clean left its output behind; it may be the only copy of a file.
    #[error("Leftover temporary output {path}, manual recovery required")]
    TempOutputExists { path: PathBuf },

    /// Another file already sits at the cleaned name; nothing was touched.
    #[error("{path} already exists, refusing to overwrite it")]
    TargetExists { path: PathBuf },

    /// Rewrite to the temporary path failed; the original is intact.
    #[error("Rewrite failed for {path}: {source}")]
    Rewrite {
        path: PathBuf,
        #[source]
        source: ToolError,
    },

    /// Delete or rename failed after the new container was produced.
    #[error(
        "Replacing {original} with {temp} failed, manual recovery may be required: {source}"
    )]
    Replace {
        original: PathBuf,
        temp: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cleaned file is in place but still carries the rewrite's timestamps.
    #[error("Restoring timestamps of {path} failed, manual recovery may be required: {source}")]
    RestoreTimes {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Refusals and failures of a coordinated run.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Not a .{extension} file: {path}")]
    WrongExtension { path: PathBuf, extension: String },

    #[error("Cleaning window closed (start {start}h, end {end}h)")]
    WindowClosed { start: u32, end: u32 },

    #[error(transparent)]
    Clean(#[from] CleanError),
}
