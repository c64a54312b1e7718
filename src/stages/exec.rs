// file: src/stages/exec.rs
// version: 1.2.0
// guid: 09e4b7a2-51c8-4f90-bd36-c2a75d08e413

//! Uniform run-and-check command execution
//!
//! Every external invocation in the install sequence goes through this
//! module: stdout and stderr are captured, the exit status is inspected,
//! and failures carry the command context plus visible diagnostics so the
//! operator can debug without re-running by hand.

use crate::error::InstallError;
use crate::Result;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Execute a command and return stdout, failing on non-zero exit
pub async fn run_checked(program: &str, args: &[&str], context: &str) -> Result<String> {
    debug!("Executing: {} {}", program, args.join(" "));

    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| InstallError::Execution {
            context: context.to_string(),
            code: -1,
            stderr: format!("failed to spawn {}: {}", program, e),
        })?;

    check_output(output, context)
}

/// Execute a command in a working directory, failing on non-zero exit
///
/// Arguments are passed straight through without a shell, so user-supplied
/// values (names, passwords) need no quoting.
pub async fn run_checked_in(dir: &str, program: &str, args: &[String], context: &str) -> Result<String> {
    debug!("Executing in {}: {} {}", dir, program, args.join(" "));

    let output = Command::new(program)
        .args(args)
        .current_dir(dir)
        .output()
        .await
        .map_err(|e| InstallError::Execution {
            context: context.to_string(),
            code: -1,
            stderr: format!("failed to spawn {}: {}", program, e),
        })?;

    check_output(output, context)
}

/// Execute a shell script fragment via `bash -c`
pub async fn run_script(script: &str, context: &str) -> Result<String> {
    run_checked("bash", &["-c", script], context).await
}

/// Execute a shell script fragment as another account via `sudo -u`
///
/// Dependency and asset builds must not run as root or generated files end
/// up owned by the installer account.
pub async fn run_as_user(user: &str, script: &str, context: &str) -> Result<String> {
    run_checked("sudo", &["-u", user, "bash", "-c", script], context).await
}

/// Execute a command feeding `input` on stdin, failing on non-zero exit
pub async fn run_with_input(
    program: &str,
    args: &[&str],
    input: &str,
    context: &str,
) -> Result<String> {
    debug!("Executing (with stdin): {} {}", program, args.join(" "));

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| InstallError::Execution {
            context: context.to_string(),
            code: -1,
            stderr: format!("failed to spawn {}: {}", program, e),
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input.as_bytes()).await?;
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| InstallError::Execution {
            context: context.to_string(),
            code: -1,
            stderr: e.to_string(),
        })?;

    check_output(output, context)
}

/// Run a command purely for its exit status; never fails
pub async fn succeeds(program: &str, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Run a command and return stdout regardless of exit status
///
/// For probes whose non-zero exit is meaningful rather than fatal, like
/// `crontab -l` on an account without a crontab.
pub async fn run_unchecked(program: &str, args: &[&str]) -> String {
    Command::new(program)
        .args(args)
        .output()
        .await
        .map(|output| String::from_utf8_lossy(&output.stdout).to_string())
        .unwrap_or_default()
}

fn check_output(output: std::process::Output, context: &str) -> Result<String> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(InstallError::Execution {
            context: context.to_string(),
            code: output.status.code().unwrap_or(-1),
            stderr,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_checked_captures_stdout() {
        let out = run_checked("echo", &["hello"], "echo test").await.unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_checked_fails_on_nonzero_exit() {
        let err = run_checked("false", &[], "false test").await.unwrap_err();
        match err {
            InstallError::Execution { context, code, .. } => {
                assert_eq!(context, "false test");
                assert_eq!(code, 1);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_checked_reports_spawn_failure() {
        let err = run_checked("nonexistent-command-12345", &[], "spawn test")
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 99);
    }

    #[tokio::test]
    async fn test_run_script() {
        let out = run_script("printf '%s' scripted", "script test")
            .await
            .unwrap();
        assert_eq!(out, "scripted");
    }

    #[tokio::test]
    async fn test_run_with_input_round_trips() {
        let out = run_with_input("cat", &[], "piped input", "cat test")
            .await
            .unwrap();
        assert_eq!(out, "piped input");
    }

    #[tokio::test]
    async fn test_succeeds() {
        assert!(succeeds("true", &[]).await);
        assert!(!succeeds("false", &[]).await);
        assert!(!succeeds("nonexistent-command-12345", &[]).await);
    }

    #[tokio::test]
    async fn test_run_unchecked_tolerates_failure() {
        let out = run_unchecked("bash", &["-c", "echo partial; exit 3"]).await;
        assert_eq!(out.trim(), "partial");
    }
}
