use std::ffi::OsString;
use std::path::{Path, PathBuf};
use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use tokio::process::Command;
use crate::error::ToolError;
use crate::sanitize::{SanitizationPlan, TrackKind, TrackMetadata};

/// External container tool used to inspect and rewrite files
#[async_trait]
pub trait RemuxTool {
    /// List the tracks of `path`
    async fn identify(&self, path: &Path) -> Result<Vec<TrackMetadata>, ToolError>;

    /// Write a new container for `input` at `output`, applying `plan`'s name and title overrides
    async fn remux(
        &self,
        input: &Path,
        output: &Path,
        plan: &SanitizationPlan,
    ) -> Result<(), ToolError>;
}

/// `mkvmerge -J` output, reduced to what the cleaner needs
#[derive(Debug, Clone, Deserialize)]
pub struct IdentifyOutput {
    #[serde(default)]
    pub tracks: Vec<IdentifyTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentifyTrack {
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: TrackKind,
    #[serde(default)]
    pub properties: IdentifyTrackProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentifyTrackProperties {
    pub track_name: Option<String>,
}

impl From<IdentifyTrack> for TrackMetadata {
    fn from(track: IdentifyTrack) -> Self {
        TrackMetadata {
            id: track.id,
            kind: track.kind,
            name: track.properties.track_name,
        }
    }
}

/// Parse `mkvmerge -J` JSON into track metadata
pub fn parse_identify(json: &str) -> Result<Vec<TrackMetadata>, serde_json::Error> {
    let output: IdentifyOutput = serde_json::from_str(json)?;
    Ok(output.tracks.into_iter().map(TrackMetadata::from).collect())
}

/// Arguments for rewriting `input` into `output` with `plan` applied
pub fn remux_args(input: &Path, output: &Path, plan: &SanitizationPlan) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-o".into(), output.as_os_str().to_os_string()];

    for directive in &plan.directives {
        args.push("--track-name".into());
        args.push(format!("{}:{}", directive.track_id, directive.name).into());
    }

    args.push("--title".into());
    args.push(plan.title.clone().into());
    args.push(input.as_os_str().to_os_string());
    args
}

/// mkvmerge from MKVToolNix, run as a subprocess
#[derive(Debug, Clone)]
pub struct Mkvmerge {
    bin: PathBuf,
}

impl Mkvmerge {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }

    fn tool_name(&self) -> String {
        self.bin.display().to_string()
    }
}

#[async_trait]
impl RemuxTool for Mkvmerge {
    async fn identify(&self, path: &Path) -> Result<Vec<TrackMetadata>, ToolError> {
        debug!("mkvmerge identify: {} -J {}", self.bin.display(), path.display());

        let output = Command::new(&self.bin)
            .arg("-J")
            .arg(path)
            .output()
            .await
            .map_err(|source| ToolError::Spawn {
                tool: self.tool_name(),
                source,
            })?;

        if !output.status.success() {
            // -J reports problems as JSON on stdout, so keep both streams
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(ToolError::Failed {
                tool: self.tool_name(),
                exit_code: output.status.code().unwrap_or(-1),
                stderr: format!("{}{}", stderr.trim(), stdout.trim()),
            });
        }

        let json = String::from_utf8_lossy(&output.stdout);
        parse_identify(&json).map_err(|source| ToolError::Decode {
            tool: self.tool_name(),
            source,
        })
    }

    async fn remux(
        &self,
        input: &Path,
        output: &Path,
        plan: &SanitizationPlan,
    ) -> Result<(), ToolError> {
        let args = remux_args(input, output, plan);
        debug!("mkvmerge args: {:?}", args);

        let result = Command::new(&self.bin)
            .args(&args)
            .output()
            .await
            .map_err(|source| ToolError::Spawn {
                tool: self.tool_name(),
                source,
            })?;

        // 0 = ok, 1 = finished with warnings, 2 = error
        match result.status.code() {
            Some(0) => Ok(()),
            Some(1) => {
                warn!(
                    "mkvmerge finished with warnings for {}: {}",
                    input.display(),
                    String::from_utf8_lossy(&result.stdout).trim()
                );
                Ok(())
            }
            code => {
                let stderr = String::from_utf8_lossy(&result.stderr);
                let stdout = String::from_utf8_lossy(&result.stdout);
                Err(ToolError::Failed {
                    tool: self.tool_name(),
                    exit_code: code.unwrap_or(-1),
                    stderr: format!("{}{}", stderr.trim(), stdout.trim()),
                })
            }
        }
    }
}
