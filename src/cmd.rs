use std::process::{Output, Stdio};

use tokio::process::Command;

use crate::error::{ChallengeError, ChallengeResult};

/// Run a command and capture its output. Fails if the command
/// returns a non-zero exit code.
///
/// The child is killed if the returned future is dropped, so a
/// deadline racing this call stops the process too.
pub async fn run(program: &str, args: &[&str]) -> ChallengeResult<String> {
    let output = spawn(program, args).await?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let command = format_command(program, args);
        tracing::debug!(%command, %stderr, "command failed");
        Err(ChallengeError::CommandFailed {
            command,
            status: output.status,
        })
    }
}

/// Check if a command exists on PATH.
pub async fn command_exists(program: &str) -> bool {
    Command::new("which")
        .arg(program)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .is_ok_and(|s| s.success())
}

async fn spawn(program: &str, args: &[&str]) -> ChallengeResult<Output> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ChallengeError::CommandNotFound(program.to_string())
            } else {
                ChallengeError::Io(e)
            }
        })
}

/// Render a command line for error messages. Arguments carrying
/// an `Authorization` header are masked.
#[must_use]
pub fn format_command(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().map(|a| {
        if a.starts_with("Authorization:") {
            "Authorization: ***".to_string()
        } else {
            (*a).to_string()
        }
    }));
    parts.join(" ")
}
