//! External tool discovery and invocation.
//!
//! Every collaborator is checked up front with a typed capability probe,
//! and every invocation goes through a runner that echoes the command and
//! records the tool's own output verbatim in the run log.

use std::fmt;
use std::path::Path;
use std::process::{Command, Output};

use thiserror::Error;

use crate::logging::RunLogger;

/// Exit information captured from a failed external command.
#[derive(Debug, Clone)]
pub struct CommandFailure {
    pub tool: String,
    pub exit_code: i32,
    pub stderr: String,
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} exited with code {}", self.tool, self.exit_code)?;
        let diagnostics = self.stderr.trim();
        if !diagnostics.is_empty() {
            write!(f, ": {}", diagnostics)?;
        }
        Ok(())
    }
}

/// Error from invoking an external tool.
#[derive(Debug, Error)]
pub enum ToolInvocationError {
    #[error("failed to launch {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Failed(CommandFailure),
}

/// A required tool was not found during the capability probe.
#[derive(Debug, Error)]
#[error("required tool '{name}' is not available: {reason}")]
pub struct MissingToolError {
    pub name: String,
    pub reason: String,
}

/// Outcome of probing for one external tool.
#[derive(Debug, Clone)]
pub enum ToolStatus {
    Available { version: Option<String> },
    Missing { reason: String },
}

impl ToolStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, ToolStatus::Available { .. })
    }
}

/// One entry of the capability probe report.
#[derive(Debug, Clone)]
pub struct ToolCheck {
    pub name: String,
    pub status: ToolStatus,
}

/// Probe for a single tool on the PATH (or at an explicit path).
pub fn check_tool(name: &str) -> ToolCheck {
    match which::which(name) {
        Ok(path) => ToolCheck {
            name: name.to_string(),
            status: ToolStatus::Available {
                version: query_version(&path),
            },
        },
        Err(e) => ToolCheck {
            name: name.to_string(),
            status: ToolStatus::Missing {
                reason: e.to_string(),
            },
        },
    }
}

/// Probe every named tool.
pub fn check_tools(names: &[&str]) -> Vec<ToolCheck> {
    names.iter().map(|name| check_tool(name)).collect()
}

/// Verify all required collaborators before the pipeline starts.
///
/// The first missing tool fails the run; stage logic never has to
/// re-discover availability.
pub fn verify_required(names: &[&str]) -> Result<Vec<ToolCheck>, MissingToolError> {
    let checks = check_tools(names);
    for check in &checks {
        if let ToolStatus::Missing { reason } = &check.status {
            return Err(MissingToolError {
                name: check.name.clone(),
                reason: reason.clone(),
            });
        }
    }
    Ok(checks)
}

/// First line of `<tool> -version`, if the tool answers it.
fn query_version(path: &Path) -> Option<String> {
    let output = Command::new(path).arg("-version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .next()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
}

/// Run an external command, recording it and its output in the run log.
///
/// Both stdout and stderr are logged line by line, unmodified, so the
/// tool's own diagnostics survive into the log even on success. A
/// non-zero exit maps to `CommandFailure` carrying the captured stderr.
pub fn run_logged(
    logger: &RunLogger,
    tool: &str,
    cmd: &mut Command,
) -> Result<Output, ToolInvocationError> {
    logger.command(&render_command(cmd));

    let output = cmd.output().map_err(|e| ToolInvocationError::Launch {
        tool: tool.to_string(),
        source: e,
    })?;

    for line in String::from_utf8_lossy(&output.stdout).lines() {
        logger.output_line(line, false);
    }
    for line in String::from_utf8_lossy(&output.stderr).lines() {
        logger.output_line(line, true);
    }

    if !output.status.success() {
        return Err(ToolInvocationError::Failed(CommandFailure {
            tool: tool.to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }));
    }

    Ok(output)
}

fn render_command(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().to_string()];
    parts.extend(cmd.get_args().map(|arg| arg.to_string_lossy().to_string()));
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failure_displays_context() {
        let failure = CommandFailure {
            tool: "ffmpeg".to_string(),
            exit_code: 1,
            stderr: "Unknown encoder 'libx264'\n".to_string(),
        };
        let msg = failure.to_string();
        assert!(msg.contains("ffmpeg"));
        assert!(msg.contains("code 1"));
        assert!(msg.contains("Unknown encoder"));
    }

    #[test]
    fn missing_tool_reported() {
        let check = check_tool("definitely-not-a-real-tool-name");
        assert!(!check.status.is_available());
    }

    #[test]
    fn verify_required_fails_on_missing() {
        let result = verify_required(&["definitely-not-a-real-tool-name"]);
        assert!(result.is_err());
    }

    #[test]
    fn render_includes_program_and_args() {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-y", "-i", "in.mp4"]);
        assert_eq!(render_command(&cmd), "ffmpeg -y -i in.mp4");
    }
}
