pub mod config;
pub mod error;
pub mod window;
pub mod ledger;
pub mod scan;
pub mod sanitize;
pub mod mkvmerge;
pub mod remux;
pub mod coordinator;

pub use config::{CleanerConfig, ScheduleConfig};
pub use coordinator::{Coordinator, FileOutcome, RunSummary};
pub use error::{CleanError, ConfigError, RunError, ToolError};
pub use ledger::Ledger;
pub use mkvmerge::{Mkvmerge, RemuxTool};
pub use sanitize::{SanitizationPlan, Sanitizer, TrackDirective, TrackKind, TrackMetadata};
pub use window::ExecutionWindow;
