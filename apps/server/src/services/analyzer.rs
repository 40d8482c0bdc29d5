//! External analyzer invocation.
//!
//! Runs the analyzer process once per request with a wall-clock timeout and a
//! per-stream output ceiling. Whatever the process wrote is always returned,
//! including on non-zero exit, timeout or overflow, so the extractor can still
//! look for a result.
//!
//! Inline log content is written to a named temp file that lives only as long
//! as the invocation. Concurrent invocations are bounded by a semaphore.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tempfile::{NamedTempFile, TempDir};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// File name of the result hand-off file inside its scoped directory.
const RESULT_FILE_NAME: &str = "result.json";

/// Read buffer size for draining child output.
const READ_CHUNK_SIZE: usize = 8192;

/// Analyzer process configuration.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Executable to run (e.g. `python`).
    pub program: String,
    /// Script passed as the first argument, relative to `working_dir` if not absolute.
    pub script: Option<PathBuf>,
    /// Wall-clock limit per invocation.
    pub timeout: Duration,
    /// Maximum bytes collected per output stream.
    pub max_output_bytes: usize,
    /// Flag used to pass the result hand-off path (e.g. `--result-file`).
    pub result_file_arg: Option<String>,
    /// Working directory of the child process.
    pub working_dir: PathBuf,
    /// Workspace passed when the request names none. Falls back to `working_dir`.
    pub default_workspace: Option<PathBuf>,
    /// Directory where inline log content is materialized.
    pub temp_dir: PathBuf,
}

impl AnalyzerConfig {
    /// Resolve a script path against the working directory.
    pub fn resolve_script(&self, script: &Path) -> PathBuf {
        if script.is_absolute() {
            script.to_path_buf()
        } else {
            self.working_dir.join(script)
        }
    }
}

/// Analyze request body.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    /// Path of an existing log file to analyze.
    #[serde(default)]
    pub log_file_path: Option<String>,
    /// Raw log text; takes precedence over `log_file_path`.
    #[serde(default)]
    pub log_content: Option<String>,
    /// Workspace directory handed to the analyzer.
    #[serde(default)]
    pub workspace_path: Option<String>,
}

/// Where the analyzer reads its input from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Inline text that must be written to a temp file first.
    Inline(String),
    /// An existing file.
    File(PathBuf),
}

impl AnalyzeRequest {
    /// Select the input source. Inline content wins when both are given.
    pub fn input_source(&self) -> AppResult<InputSource> {
        if let Some(content) = self.log_content.as_deref().filter(|c| !c.is_empty()) {
            return Ok(InputSource::Inline(content.to_string()));
        }
        if let Some(path) = self.log_file_path.as_deref().filter(|p| !p.trim().is_empty()) {
            return Ok(InputSource::File(PathBuf::from(path)));
        }
        Err(AppError::InvalidInput(
            "Either log_content or log_file_path is required".to_string(),
        ))
    }
}

/// A fully built command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

/// Output stream of the child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Why an invocation did not complete cleanly. Never fatal to the request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvocationFailure {
    #[error("failed to start analyzer: {0}")]
    Spawn(String),

    #[error("analyzer exited with status {0:?}")]
    ExitStatus(Option<i32>),

    #[error("analyzer timed out after {0:?}")]
    TimedOut(Duration),

    #[error("analyzer {stream:?} exceeded {limit} bytes")]
    OutputLimitExceeded { stream: OutputStream, limit: usize },
}

/// Everything an invocation produced.
#[derive(Debug, Clone)]
pub struct AnalyzerOutput {
    pub stdout: String,
    pub stderr: String,
    /// Contents of the hand-off file, if the analyzer wrote one.
    pub result_file: Option<String>,
    pub failure: Option<InvocationFailure>,
    pub duration: Duration,
}

impl AnalyzerOutput {
    /// True when the process ran to a zero exit within its bounds.
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Runs the external analyzer with admission control.
#[derive(Clone)]
pub struct Analyzer {
    config: Arc<AnalyzerConfig>,
    permits: Arc<Semaphore>,
    queue_timeout: Duration,
}

impl Analyzer {
    /// Create an analyzer allowing `max_concurrent` invocations at once.
    pub fn new(config: AnalyzerConfig, max_concurrent: usize, queue_timeout: Duration) -> Self {
        Self {
            config: Arc::new(config),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            queue_timeout,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Build the command line for an input file and optional hand-off path.
    pub fn build_invocation(
        &self,
        input: &Path,
        workspace: Option<&str>,
        result_file: Option<&Path>,
    ) -> Invocation {
        let config = &self.config;
        let mut args = Vec::new();

        if let Some(ref script) = config.script {
            args.push(config.resolve_script(script).display().to_string());
        }

        args.push("--log-file".to_string());
        args.push(input.display().to_string());

        let workspace = workspace
            .filter(|w| !w.trim().is_empty())
            .map(PathBuf::from)
            .or_else(|| config.default_workspace.clone())
            .unwrap_or_else(|| config.working_dir.clone());
        args.push("--workspace".to_string());
        args.push(workspace.display().to_string());

        if let (Some(flag), Some(path)) = (config.result_file_arg.as_ref(), result_file) {
            args.push(flag.clone());
            args.push(path.display().to_string());
        }

        Invocation {
            program: config.program.clone(),
            args,
            working_dir: config.working_dir.clone(),
        }
    }

    /// Run the analyzer for a request.
    ///
    /// Returns `Err` only for problems before the process starts (bad input,
    /// queue timeout, missing script, temp file I/O). Process-level failures
    /// are reported in [`AnalyzerOutput::failure`].
    pub async fn run(&self, request: &AnalyzeRequest) -> AppResult<AnalyzerOutput> {
        let source = request.input_source()?;

        if let Some(ref script) = self.config.script {
            let script_path = self.config.resolve_script(script);
            if !script_path.exists() {
                return Err(AppError::AnalyzerUnavailable(format!(
                    "Analyzer script not found: {}",
                    script_path.display()
                )));
            }
        }

        let _permit = tokio::time::timeout(self.queue_timeout, self.permits.acquire())
            .await
            .map_err(|_| {
                warn!("Analysis rejected: no analyzer slot within {:?}", self.queue_timeout);
                AppError::ServiceUnavailable(
                    "Too many analyses in progress. Please try again later.".to_string(),
                )
            })?
            .map_err(|_| AppError::ServiceUnavailable("Analyzer is shutting down".to_string()))?;

        // Both guards are dropped on every return path below, removing the files.
        let (input_path, _materialized) = match source {
            InputSource::Inline(content) => {
                let temp = self.materialize(&content)?;
                (temp.path().to_path_buf(), Some(temp))
            }
            InputSource::File(path) => (path, None),
        };

        let handoff_dir = match self.config.result_file_arg {
            Some(_) => Some(
                tempfile::Builder::new()
                    .prefix("error-log-result-")
                    .tempdir_in(&self.config.temp_dir)
                    .map_err(|e| {
                        AppError::FileSystem(format!("Failed to create result directory: {}", e))
                    })?,
            ),
            None => None,
        };
        let result_path = handoff_dir.as_ref().map(|dir| dir.path().join(RESULT_FILE_NAME));

        let invocation =
            self.build_invocation(&input_path, request.workspace_path.as_deref(), result_path.as_deref());
        info!(
            program = %invocation.program,
            args = ?invocation.args,
            "Starting analyzer"
        );

        let mut output = execute(&invocation, self.config.timeout, self.config.max_output_bytes).await;
        output.result_file = read_result_file(handoff_dir.as_ref()).await;

        match output.failure {
            Some(ref failure) => warn!(
                duration_ms = output.duration.as_millis() as u64,
                stdout_length = output.stdout.len(),
                stderr_length = output.stderr.len(),
                "Analyzer finished with failure: {}",
                failure
            ),
            None => info!(
                duration_ms = output.duration.as_millis() as u64,
                stdout_length = output.stdout.len(),
                stderr_length = output.stderr.len(),
                "Analyzer finished"
            ),
        }

        Ok(output)
    }

    /// Write inline content to a scoped temp file.
    fn materialize(&self, content: &str) -> AppResult<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix("error-log-")
            .suffix(".txt")
            .tempfile_in(&self.config.temp_dir)
            .map_err(|e| AppError::FileSystem(format!("Failed to create temp log file: {}", e)))?;
        file.write_all(content.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| AppError::FileSystem(format!("Failed to write temp log file: {}", e)))?;
        debug!(path = %file.path().display(), bytes = content.len(), "Materialized log content");
        Ok(file)
    }
}

/// Read the hand-off file if the analyzer produced a non-empty one.
async fn read_result_file(dir: Option<&TempDir>) -> Option<String> {
    let path = dir?.path().join(RESULT_FILE_NAME);
    match tokio::fs::read(&path).await {
        Ok(bytes) if !bytes.is_empty() => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Ok(_) => None,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!("Failed to read analyzer result file {}: {}", path.display(), e);
            None
        }
    }
}

/// Spawn the invocation and collect its output within the bounds.
pub async fn execute(invocation: &Invocation, timeout: Duration, max_output_bytes: usize) -> AnalyzerOutput {
    let started = Instant::now();
    let deadline = tokio::time::Instant::now() + timeout;

    let mut command = Command::new(&invocation.program);
    command
        .args(&invocation.args)
        .current_dir(&invocation.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .env("PYTHONIOENCODING", "utf-8")
        .env("PYTHONUTF8", "1")
        .kill_on_drop(true);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            let message = format!("{}: {}", invocation.program, e);
            return AnalyzerOutput {
                stdout: String::new(),
                stderr: message.clone(),
                result_file: None,
                failure: Some(InvocationFailure::Spawn(message)),
                duration: started.elapsed(),
            };
        }
    };

    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();
    let mut failure = None;

    if let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) {
        let stdout_fut = drain_bounded(stdout, &mut stdout_buf, max_output_bytes);
        let stderr_fut = drain_bounded(stderr, &mut stderr_buf, max_output_bytes);
        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(stdout_fut, stderr_fut, sleep);

        let mut stdout_done = false;
        let mut stderr_done = false;

        while failure.is_none() && !(stdout_done && stderr_done) {
            tokio::select! {
                overflowed = &mut stdout_fut, if !stdout_done => {
                    stdout_done = true;
                    if overflowed {
                        failure = Some(InvocationFailure::OutputLimitExceeded {
                            stream: OutputStream::Stdout,
                            limit: max_output_bytes,
                        });
                    }
                }
                overflowed = &mut stderr_fut, if !stderr_done => {
                    stderr_done = true;
                    if overflowed {
                        failure = Some(InvocationFailure::OutputLimitExceeded {
                            stream: OutputStream::Stderr,
                            limit: max_output_bytes,
                        });
                    }
                }
                _ = &mut sleep => {
                    failure = Some(InvocationFailure::TimedOut(timeout));
                }
            }
        }
    }

    if failure.is_none() {
        match tokio::time::timeout_at(deadline, child.wait()).await {
            Ok(Ok(status)) if status.success() => {}
            Ok(Ok(status)) => failure = Some(InvocationFailure::ExitStatus(status.code())),
            Ok(Err(e)) => failure = Some(InvocationFailure::Spawn(e.to_string())),
            Err(_) => failure = Some(InvocationFailure::TimedOut(timeout)),
        }
    }

    if matches!(
        failure,
        Some(InvocationFailure::TimedOut(_)) | Some(InvocationFailure::OutputLimitExceeded { .. })
    ) {
        if let Err(e) = child.start_kill() {
            debug!("Analyzer already exited before kill: {}", e);
        }
        // Reap so no zombie is left behind.
        let _ = child.wait().await;
    }

    AnalyzerOutput {
        stdout: String::from_utf8_lossy(&stdout_buf).into_owned(),
        stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
        result_file: None,
        failure,
        duration: started.elapsed(),
    }
}

/// Read a stream to EOF into `buf`, keeping at most `limit` bytes.
///
/// Returns `true` if the stream produced more than `limit` bytes.
async fn drain_bounded<R>(mut reader: R, buf: &mut Vec<u8>, limit: usize) -> bool
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => return false,
            Ok(n) => {
                let remaining = limit.saturating_sub(buf.len());
                if n > remaining {
                    buf.extend_from_slice(&chunk[..remaining]);
                    return true;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("Failed to read analyzer output: {}", e);
                return false;
            }
        }
    }
}
