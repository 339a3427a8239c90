//! External tool adapter: `soffice` and `ebook-convert` subprocesses.
//!
//! Office and ebook conversions delegate to programs that own those
//! formats. The adapter gives every invocation the same lifecycle:
//!
//! 1. stage input into a per-conversion scratch directory,
//! 2. spawn with both pipes captured,
//! 3. drain stdout and stderr concurrently (line-buffered children
//!    block on a full pipe buffer, so both must be read while waiting),
//! 4. wait under the configured deadline, killing on expiry,
//! 5. read the produced output file back; the scratch directory is
//!    removed on every exit path by its `TempDir` guard.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::ConvertError;

/// Identity and failure policy for a known external tool.
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    /// Display name used in errors and logs.
    pub name: &'static str,
    /// Treat `Error` lines on stderr as failure even on exit status 0.
    pub stderr_is_fatal: bool,
}

/// LibreOffice headless. Known to exit 0 while printing `Error:` lines
/// to stderr when a conversion filter fails, hence `stderr_is_fatal`.
pub const SOFFICE: ToolSpec = ToolSpec {
    name: "soffice",
    stderr_is_fatal: true,
};

/// Calibre's converter. Writes progress noise to stderr on healthy runs,
/// so only the exit status decides failure.
pub const EBOOK_CONVERT: ToolSpec = ToolSpec {
    name: "ebook-convert",
    stderr_is_fatal: false,
};

/// Captured output of a completed invocation.
#[derive(Debug)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run an external tool to completion under a deadline.
pub async fn invoke(
    spec: &ToolSpec,
    program: &str,
    args: &[String],
    timeout: Duration,
) -> Result<ToolOutput, ConvertError> {
    debug!(tool = spec.name, program, ?args, "invoking external tool");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ConvertError::Io {
            path: PathBuf::from(program),
            source,
        })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ConvertError::Internal("child stdout was not captured".into()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| ConvertError::Internal("child stderr was not captured".into()))?;

    let stdout_drain = tokio::spawn(drain(stdout, spec.name, "stdout"));
    let stderr_drain = tokio::spawn(drain(stderr, spec.name, "stderr"));

    let status = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(waited) => waited.map_err(|source| ConvertError::Io {
            path: PathBuf::from(program),
            source,
        })?,
        Err(_) => {
            warn!(tool = spec.name, secs = timeout.as_secs(), "deadline expired, killing child");
            let _ = child.start_kill();
            let _ = child.wait().await;
            stdout_drain.abort();
            stderr_drain.abort();
            return Err(ConvertError::ConversionTimeout {
                tool: spec.name.to_string(),
                secs: timeout.as_secs(),
            });
        }
    };

    // Join both drains after the child exits; EOF on the pipes is
    // guaranteed at this point.
    let stdout = stdout_drain
        .await
        .map_err(|e| ConvertError::Internal(format!("stdout drain failed: {e}")))?;
    let stderr = stderr_drain
        .await
        .map_err(|e| ConvertError::Internal(format!("stderr drain failed: {e}")))?;

    if !status.success() {
        return Err(ConvertError::ExternalToolFailure {
            tool: spec.name.to_string(),
            status: status.code(),
            stderr,
        });
    }
    if spec.stderr_is_fatal && stderr.lines().any(|l| l.contains("Error")) {
        return Err(ConvertError::ExternalToolFailure {
            tool: spec.name.to_string(),
            status: status.code(),
            stderr,
        });
    }

    Ok(ToolOutput { stdout, stderr })
}

/// Read a child pipe line-by-line, logging each line and collecting the
/// whole stream for error reporting.
async fn drain(
    reader: impl AsyncRead + Unpin + Send + 'static,
    tool: &'static str,
    stream: &'static str,
) -> String {
    let mut lines = BufReader::new(reader).lines();
    let mut collected = String::new();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(tool, stream, "{line}");
        collected.push_str(&line);
        collected.push('\n');
    }
    collected
}

/// Create a scratch directory for one conversion.
fn scratch_dir(config: &EngineConfig) -> Result<TempDir, ConvertError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("filemorph-");
    let result = match &config.temp_root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    };
    result.map_err(|source| ConvertError::Io {
        path: config
            .temp_root
            .clone()
            .unwrap_or_else(std::env::temp_dir),
        source,
    })
}

async fn stage_input(
    dir: &TempDir,
    file_name: &str,
    payload: &[u8],
) -> Result<PathBuf, ConvertError> {
    let path = dir.path().join(file_name);
    tokio::fs::write(&path, payload)
        .await
        .map_err(|source| ConvertError::Io {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}

async fn collect_output(spec: &ToolSpec, path: PathBuf) -> Result<Vec<u8>, ConvertError> {
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(bytes),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            // Exit status 0 but no output file: some filters report
            // failure this way.
            Err(ConvertError::ExternalToolFailure {
                tool: spec.name.to_string(),
                status: Some(0),
                stderr: format!("no output file produced at '{}'", path.display()),
            })
        }
        Err(source) => Err(ConvertError::Io { path, source }),
    }
}

/// Convert an office document by running
/// `soffice --headless --convert-to <target_ext> --outdir <dir> <input>`.
///
/// `base` is the sanitized stem of the upload; LibreOffice names its
/// output `<base>.<target_ext>` in the out-directory.
pub async fn run_soffice(
    config: &EngineConfig,
    base: &str,
    input_ext: &str,
    target_ext: &str,
    payload: &[u8],
) -> Result<Vec<u8>, ConvertError> {
    let dir = scratch_dir(config)?;
    let input = stage_input(&dir, &format!("{base}.{input_ext}"), payload).await?;

    let args = vec![
        "--headless".to_string(),
        "--convert-to".to_string(),
        target_ext.to_string(),
        "--outdir".to_string(),
        dir.path().display().to_string(),
        input.display().to_string(),
    ];
    invoke(
        &SOFFICE,
        &config.soffice_program,
        &args,
        Duration::from_secs(config.tool_timeout_secs),
    )
    .await?;

    collect_output(&SOFFICE, dir.path().join(format!("{base}.{target_ext}"))).await
}

/// Convert an ebook by running `ebook-convert <input> <output>`; Calibre
/// derives the conversion pair from the two file extensions.
pub async fn run_ebook_convert(
    config: &EngineConfig,
    base: &str,
    input_ext: &str,
    target_ext: &str,
    payload: &[u8],
) -> Result<Vec<u8>, ConvertError> {
    let dir = scratch_dir(config)?;
    let input = stage_input(&dir, &format!("{base}.{input_ext}"), payload).await?;
    let output = dir.path().join(format!("{base}.{target_ext}"));

    let args = vec![input.display().to_string(), output.display().to_string()];
    invoke(
        &EBOOK_CONVERT,
        &config.ebook_convert_program,
        &args,
        Duration::from_secs(config.tool_timeout_secs),
    )
    .await?;

    collect_output(&EBOOK_CONVERT, output).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(stderr_is_fatal: bool) -> ToolSpec {
        ToolSpec {
            name: "test-tool",
            stderr_is_fatal,
        }
    }

    #[tokio::test]
    async fn captures_stdout_of_successful_command() {
        let out = invoke(
            &spec(false),
            "echo",
            &["hello".to_string()],
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(out.stdout.trim(), "hello");
        assert!(out.stderr.is_empty());
    }

    #[tokio::test]
    async fn nonzero_exit_is_tool_failure() {
        let err = invoke(
            &spec(false),
            "sh",
            &["-c".to_string(), "echo oops >&2; exit 3".to_string()],
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        match err {
            ConvertError::ExternalToolFailure { status, stderr, .. } => {
                assert_eq!(status, Some(3));
                assert!(stderr.contains("oops"));
            }
            other => panic!("expected ExternalToolFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fatal_stderr_policy_fails_on_error_lines() {
        let err = invoke(
            &spec(true),
            "sh",
            &["-c".to_string(), "echo 'Error: no filter' >&2".to_string()],
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ConvertError::ExternalToolFailure { .. }));

        // Plain warnings on stderr pass.
        let out = invoke(
            &spec(true),
            "sh",
            &["-c".to_string(), "echo 'Warning: fonts' >&2".to_string()],
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert!(out.stderr.contains("Warning"));
    }

    #[tokio::test]
    async fn deadline_kills_the_child() {
        let err = invoke(
            &spec(false),
            "sleep",
            &["30".to_string()],
            Duration::from_millis(200),
        )
        .await
        .unwrap_err();
        match err {
            ConvertError::ConversionTimeout { tool, .. } => assert_eq!(tool, "test-tool"),
            other => panic!("expected ConversionTimeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_io_error() {
        let err = invoke(
            &spec(false),
            "definitely-not-a-real-program-xyz",
            &[],
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ConvertError::Io { .. }));
    }
}
