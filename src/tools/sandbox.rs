//! Execution sandbox - the process and filesystem boundary
//!
//! Runs one command at a time through `/bin/sh -c`, captures stdout and
//! stderr up to a fixed cap, and enforces a timeout with a SIGTERM → kill
//! escalation. A non-zero exit is a normal result; only a failure to launch
//! is an error.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::core::config::SandboxConfig;
use crate::core::{Result, ScribeError};

const SHELL: &str = "/bin/sh";

/// Exit codes the shell uses for "command not found" and "not executable"
const SHELL_NOT_FOUND: i32 = 127;
const SHELL_NOT_EXECUTABLE: i32 = 126;

/// Ok/error classification of a tool run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Ok,
    Error,
}

/// Bytes captured from one output stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Retained bytes, never more than the cap
    pub bytes: Vec<u8>,
    /// Bytes that were read but not retained
    pub truncated_bytes: usize,
}

impl CapturedOutput {
    /// Capture an in-memory buffer under a cap
    pub fn from_bytes(data: &[u8], cap: usize) -> Self {
        let keep = data.len().min(cap);
        Self {
            bytes: data[..keep].to_vec(),
            truncated_bytes: data.len() - keep,
        }
    }

    /// Append a chunk, retaining at most `cap` bytes in total
    pub fn push(&mut self, data: &[u8], cap: usize) {
        let room = cap.saturating_sub(self.bytes.len());
        let keep = data.len().min(room);
        self.bytes.extend_from_slice(&data[..keep]);
        self.truncated_bytes += data.len() - keep;
    }

    /// Whether anything was cut
    pub fn is_truncated(&self) -> bool {
        self.truncated_bytes > 0
    }

    /// Retained bytes as text
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty() && self.truncated_bytes == 0
    }

    /// Retained text followed by a truncation marker when needed
    pub fn render(&self) -> String {
        let mut out = self.text();
        if self.is_truncated() {
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&format!(
                "[... output truncated: {} more bytes not shown ...]\n",
                self.truncated_bytes
            ));
        }
        out
    }
}

/// Result of executing one tool invocation
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    /// Tool-specific lead lines (command echo, build verdict, file name)
    pub header: String,
    /// Process exit code; `None` for in-process tools or killed processes
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    /// Leftover processes held the pipes open and were terminated
    pub output_incomplete: bool,
    pub stdout: CapturedOutput,
    pub stderr: CapturedOutput,
}

impl ExecutionResult {
    /// A successful in-process result carrying a message
    pub fn ok_message(text: impl AsRef<str>, cap: usize) -> Self {
        Self::message(ExecutionStatus::Ok, text, cap)
    }

    /// A failed in-process result carrying a message
    pub fn error_message(text: impl AsRef<str>, cap: usize) -> Self {
        Self::message(ExecutionStatus::Error, text, cap)
    }

    fn message(status: ExecutionStatus, text: impl AsRef<str>, cap: usize) -> Self {
        Self {
            status,
            header: String::new(),
            exit_code: None,
            timed_out: false,
            output_incomplete: false,
            stdout: CapturedOutput::from_bytes(text.as_ref().as_bytes(), cap),
            stderr: CapturedOutput::default(),
        }
    }

    /// Prefix lines shown before the captured output
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == ExecutionStatus::Ok
    }

    /// Whether any stream was cut
    pub fn is_truncated(&self) -> bool {
        self.stdout.is_truncated() || self.stderr.is_truncated()
    }

    /// Observation text fed back to the model
    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.header.is_empty() {
            out.push_str(&self.header);
            if !self.header.ends_with('\n') {
                out.push('\n');
            }
        }

        let is_process = self.exit_code.is_some() || self.timed_out;
        if !is_process {
            out.push_str(&self.stdout.render());
            return out;
        }

        match self.exit_code {
            Some(code) => out.push_str(&format!("Exit Code: {}\n", code)),
            None => out.push_str("Exit Code: none (terminated)\n"),
        }
        if self.timed_out {
            out.push_str("TIMED OUT: the command exceeded its time limit and was terminated\n");
        }
        out.push_str("\nSTDOUT:\n");
        out.push_str(&self.stdout.render());
        if !self.stderr.is_empty() {
            out.push_str("\nSTDERR:\n");
            out.push_str(&self.stderr.render());
        }
        if self.output_incomplete {
            out.push_str(
                "\nNOTE: output may be incomplete; background processes kept the output open \
                 after the command ended and were terminated\n",
            );
        }
        out
    }
}

/// Runs commands and file operations for a single run
#[derive(Debug, Clone)]
pub struct Sandbox {
    working_dir: PathBuf,
    timeout: Duration,
    kill_grace: Duration,
    output_cap: usize,
}

impl Sandbox {
    /// Create a sandbox rooted at `working_dir`
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self::from_config(&SandboxConfig {
            working_dir: working_dir.into(),
            ..SandboxConfig::default()
        })
    }

    /// Create a sandbox from configuration
    pub fn from_config(config: &SandboxConfig) -> Self {
        Self {
            working_dir: config.working_dir.clone(),
            timeout: Duration::from_secs(config.command_timeout_secs),
            kill_grace: Duration::from_millis(config.kill_grace_ms),
            output_cap: config.output_cap_bytes,
        }
    }

    /// Same limits, different working directory
    pub fn with_working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = working_dir.into();
        self
    }

    /// Set the command timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the SIGTERM grace period
    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    /// Set the per-stream capture cap
    pub fn with_output_cap(mut self, cap: usize) -> Self {
        self.output_cap = cap;
        self
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn output_cap(&self) -> usize {
        self.output_cap
    }

    /// Resolve a path against the working directory; absolute paths pass through
    pub fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.working_dir.join(p)
        }
    }

    /// Run a shell command line and capture its output
    pub async fn run(&self, command_line: &str) -> Result<ExecutionResult> {
        tracing::info!(
            cwd = %self.working_dir.display(),
            command = command_line,
            "Executing command"
        );

        let mut cmd = Command::new(SHELL);
        cmd.arg("-c")
            .arg(command_line)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group so the whole tree can be signalled on timeout.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| {
            ScribeError::execution(format!(
                "failed to launch `{}` in {}: {}",
                command_line,
                self.working_dir.display(),
                e
            ))
        })?;

        // The id is gone once the child has been reaped.
        let pid = child.id();
        let mut stdout = Capture::spawn(child.stdout.take(), self.output_cap);
        let mut stderr = Capture::spawn(child.stderr.take(), self.output_cap);

        let (exit_code, timed_out) = match tokio::time::timeout(self.timeout, child.wait()).await
        {
            Ok(Ok(status)) => (status.code(), false),
            Ok(Err(e)) => {
                return Err(ScribeError::execution(format!(
                    "failed waiting for `{}`: {}",
                    command_line, e
                )))
            }
            Err(_) => {
                tracing::warn!(
                    command = command_line,
                    timeout_secs = self.timeout.as_secs(),
                    "Command timed out, terminating"
                );
                self.terminate(&mut child, pid).await;
                (None, true)
            }
        };

        let mut output_incomplete = false;
        if !self.drained(&mut stdout, &mut stderr).await {
            tracing::warn!(
                command = command_line,
                "Output still open after the command ended, terminating leftover processes"
            );
            signal_group(pid, libc::SIGTERM);
            if !self.drained(&mut stdout, &mut stderr).await {
                signal_group(pid, libc::SIGKILL);
            }
            output_incomplete = true;
        }
        let stdout = stdout.finish();
        let stderr = stderr.finish();

        if let Some(code) = exit_code {
            if is_launch_failure(command_line, code, &stderr.text()) {
                return Err(ScribeError::execution(format!(
                    "could not run `{}` (exit {}): {}",
                    command_line,
                    code,
                    stderr.text().trim()
                )));
            }
        }

        tracing::debug!(
            exit_code = ?exit_code,
            stdout_len = stdout.bytes.len(),
            stderr_len = stderr.bytes.len(),
            truncated = stdout.is_truncated() || stderr.is_truncated(),
            "Command completed"
        );

        let status = if exit_code == Some(0) {
            ExecutionStatus::Ok
        } else {
            ExecutionStatus::Error
        };

        Ok(ExecutionResult {
            status,
            header: String::new(),
            exit_code,
            timed_out,
            output_incomplete,
            stdout,
            stderr,
        })
    }

    /// SIGTERM the process group, then force kill after the grace period
    async fn terminate(&self, child: &mut Child, pid: Option<u32>) {
        signal_group(pid, libc::SIGTERM);
        if tokio::time::timeout(self.kill_grace, child.wait()).await.is_ok() {
            return;
        }

        tracing::warn!("Child ignored SIGTERM, killing");
        signal_group(pid, libc::SIGKILL);
        let _ = child.kill().await;
    }

    /// Wait up to the grace period for both pipes to close
    async fn drained(&self, stdout: &mut Capture, stderr: &mut Capture) -> bool {
        let both = async {
            for pipe in [stdout, stderr] {
                // A handle must not be polled again once it has completed.
                if !pipe.task.is_finished() {
                    let _ = (&mut pipe.task).await;
                }
            }
        };
        tokio::time::timeout(self.kill_grace, both).await.is_ok()
    }

    /// Read a UTF-8 file
    pub async fn read_text(&self, path: &str) -> std::io::Result<String> {
        tokio::fs::read_to_string(self.resolve(path)).await
    }

    /// Read a file as an observation; a missing path is described, not raised
    pub async fn read_file(&self, path: &str) -> ExecutionResult {
        let cap = self.output_cap;
        match self.read_text(path).await {
            Ok(content) => ExecutionResult::ok_message(&content, cap)
                .with_header(format!("File: {}\nSize: {} bytes\n", path, content.len())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                ExecutionResult::error_message(format!("ERROR: File '{}' not found", path), cap)
            }
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                ExecutionResult::error_message(
                    format!("ERROR: File '{}' is not valid UTF-8 text", path),
                    cap,
                )
            }
            Err(e) => ExecutionResult::error_message(format!("ERROR: {}: {}", path, e), cap),
        }
    }

    /// Write a file, creating missing parent directories
    pub async fn write_file(&self, path: &str, content: &str) -> ExecutionResult {
        let cap = self.output_cap;
        let target = self.resolve(path);

        if let Some(parent) = target.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return ExecutionResult::error_message(
                    format!("ERROR: cannot create directory for '{}': {}", path, e),
                    cap,
                );
            }
        }

        match tokio::fs::write(&target, content).await {
            Ok(()) => {
                tracing::debug!(path = %target.display(), bytes = content.len(), "File written");
                ExecutionResult::ok_message(
                    format!("File written: {} ({} bytes)", path, content.len()),
                    cap,
                )
            }
            Err(e) => ExecutionResult::error_message(format!("ERROR: {}: {}", path, e), cap),
        }
    }

    /// List a directory as an observation
    pub async fn list_dir(&self, path: &str) -> ExecutionResult {
        let cap = self.output_cap;
        let mut entries = match tokio::fs::read_dir(self.resolve(path)).await {
            Ok(entries) => entries,
            Err(e) => {
                return ExecutionResult::error_message(format!("ERROR: {}: {}", path, e), cap)
            }
        };

        let mut dirs = Vec::new();
        let mut files = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    match entry.file_type().await {
                        Ok(ft) if ft.is_dir() => dirs.push(name),
                        _ => files.push(name),
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    return ExecutionResult::error_message(format!("ERROR: {}: {}", path, e), cap)
                }
            }
        }
        dirs.sort();
        files.sort();

        let mut out = format!("Contents of '{}':\n", path);
        if !dirs.is_empty() {
            out.push_str("\nDirectories:\n");
            for d in &dirs {
                out.push_str(&format!("  {}/\n", d));
            }
        }
        if !files.is_empty() {
            out.push_str("\nFiles:\n");
            for f in &files {
                out.push_str(&format!("  {}\n", f));
            }
        }
        if dirs.is_empty() && files.is_empty() {
            out.push_str("  (empty)\n");
        }
        ExecutionResult::ok_message(out, cap)
    }
}

/// A pipe being drained in the background into a shared buffer
struct Capture {
    buffer: Arc<Mutex<CapturedOutput>>,
    task: JoinHandle<()>,
}

impl Capture {
    fn spawn<R>(reader: Option<R>, cap: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(CapturedOutput::default()));
        let task = tokio::spawn(capture(reader, cap, buffer.clone()));
        Self { buffer, task }
    }

    /// Stop reading and keep whatever arrived
    fn finish(self) -> CapturedOutput {
        self.task.abort();
        let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *buffer)
    }
}

/// Drain a pipe, retaining at most `cap` bytes
async fn capture<R>(reader: Option<R>, cap: usize, output: Arc<Mutex<CapturedOutput>>)
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return;
    };

    let mut buf = [0u8; 8192];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                tracing::warn!("Failed reading command output: {}", e);
                break;
            }
        };
        output
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(&buf[..n], cap);
    }
}

/// Signal every process in the group led by `pid`
fn signal_group(pid: Option<u32>, signal: libc::c_int) {
    #[cfg(unix)]
    if let Some(pid) = pid {
        // SAFETY: the group was created for this command; a stale id only yields ESRCH.
        unsafe {
            libc::kill(-(pid as libc::pid_t), signal);
        }
    }
    #[cfg(not(unix))]
    let _ = (pid, signal);
}

/// The shell started, but could not start the program the command names
fn is_launch_failure(command_line: &str, exit_code: i32, stderr: &str) -> bool {
    if exit_code != SHELL_NOT_FOUND && exit_code != SHELL_NOT_EXECUTABLE {
        return false;
    }
    match command_line.split_whitespace().next() {
        Some(program) => stderr.contains(&format!("{}: ", program)),
        None => false,
    }
}
