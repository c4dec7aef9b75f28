// src/system/session.rs

use crate::{
    CancellationToken,
    core::{arguments::CommandLine, commons::PathStyle},
    system::output::{Notice, OutputSink},
};
use std::{
    fmt,
    io::{self, ErrorKind},
    path::Path,
    process::{ExitStatus, Stdio},
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::{Child, Command},
    sync::watch,
    task::JoinHandle,
};

/// How often a waiting run checks whether its process has exited or been killed.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command could not be parsed: {0}")]
    CommandParse(String),
    #[error("No command specified to run.")]
    EmptyCommand,
    #[error("A build is already in progress.")]
    AlreadyRunning,
    #[error("Command '{0}' could not be executed: {1}")]
    CommandFailed(String, io::Error),
    /// The buffered variant keeps whatever the process printed before it failed.
    #[error("Command '{command}' exited with a non-zero error code.")]
    NonZeroExitStatus {
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    #[error("{message}")]
    Reported {
        command: String,
        code: Option<i32>,
        message: String,
    },
    #[error("Operation was cancelled by the user.")]
    Interrupted,
}

/// How a captured run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The process exited on its own. `code` is `None` when it was stopped by a signal.
    Exited { code: Option<i32> },
    /// The session killed the process.
    Killed,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        matches!(self, Self::Exited { code: Some(0) })
    }
}

/// Output of a command run to completion.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandResponse {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug)]
struct ActiveProcess {
    id: u64,
    child: Child,
}

#[derive(Debug)]
struct SessionState {
    active: Mutex<Option<ActiveProcess>>,
    running: watch::Sender<bool>,
    next_id: AtomicU64,
}

impl SessionState {
    fn lock(&self) -> MutexGuard<'_, Option<ActiveProcess>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Kills the active process and forgets it. With `only`, a process belonging
    /// to a different run is left alone.
    fn kill_active(&self, only: Option<u64>) -> bool {
        let mut active = self.lock();
        let owned = match (active.as_ref(), only) {
            (Some(process), Some(id)) => process.id == id,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if !owned {
            return false;
        }
        if let Some(mut process) = active.take() {
            log::debug!(
                "Killing captured run {} (PID: {:?})...",
                process.id,
                process.child.id()
            );
            if let Err(e) = process.child.start_kill() {
                log::warn!("Failed to kill child process of run {}: {}", process.id, e);
            }
        }
        self.running.send_replace(false);
        true
    }
}

/// Owns at most one captured-output process at a time and streams its output into a sink.
///
/// The session is the only owner of the child handle while it runs. The handle is
/// cleared when the process exits, when the session kills it, and when the
/// [`CapturedRun`] that tracks it is dropped.
pub struct ProcessSession {
    program: String,
    base_args: Vec<String>,
    sink: Arc<dyn OutputSink>,
    state: Arc<SessionState>,
}

impl fmt::Debug for ProcessSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessSession")
            .field("program", &self.program)
            .field("base_args", &self.base_args)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl ProcessSession {
    /// Creates a session for `command_path`, which may carry leading arguments
    /// (e.g. `npx appc`).
    pub fn new(command_path: &str, sink: Arc<dyn OutputSink>) -> Result<Self, ExecutionError> {
        let (program, base_args) = split_command(command_path)?;
        let (running, _) = watch::channel(false);
        Ok(Self {
            program,
            base_args,
            sink,
            state: Arc::new(SessionState {
                active: Mutex::new(None),
                running,
                next_id: AtomicU64::new(1),
            }),
        })
    }

    /// The command as typed, including leading arguments.
    pub fn command(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.base_args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn sink(&self) -> Arc<dyn OutputSink> {
        Arc::clone(&self.sink)
    }

    pub fn is_running(&self) -> bool {
        *self.state.running.borrow()
    }

    /// Observes the running flag; used to enable or disable build affordances.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.running.subscribe()
    }

    fn argv(&self, line: &CommandLine) -> Vec<String> {
        self.base_args
            .iter()
            .cloned()
            .chain(line.args().iter().cloned())
            .collect()
    }

    fn display_line(&self, line: &CommandLine) -> String {
        format!("{} {}", self.command(), line.render())
    }

    fn write_header(&self, line: &CommandLine) {
        self.sink.clear();
        self.sink.append(&format!("{}\n\n", self.display_line(line)));
    }

    fn spawn(&self, line: &CommandLine, cwd: Option<&Path>) -> Result<Child, ExecutionError> {
        let mut command = Command::new(&self.program);
        command.args(self.argv(line));
        configure_piped(&mut command, cwd);

        // Windows built-ins and .cmd shims are not found by a direct spawn, so we
        // retry through `cmd /C` with the full line.
        match command.spawn() {
            Ok(child) => Ok(child),
            Err(e) if e.kind() == ErrorKind::NotFound && cfg!(target_os = "windows") => {
                log::debug!("Command '{}' not found. Retrying with cmd /C.", self.program);
                let arguments = line
                    .shell_line(PathStyle::Windows)
                    .map_err(|e| ExecutionError::CommandParse(e.to_string()))?;
                let full_line = format!("{} {}", self.command(), arguments);
                let mut fallback = Command::new("cmd");
                fallback.arg("/C").arg(&full_line);
                configure_piped(&mut fallback, cwd);
                fallback
                    .spawn()
                    .map_err(|e| ExecutionError::CommandFailed(full_line, e))
            }
            Err(e) => Err(ExecutionError::CommandFailed(self.display_line(line), e)),
        }
    }

    fn pump_output(&self, child: &mut Child) -> Vec<JoinHandle<()>> {
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(pump(stdout, self.sink())));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(pump(stderr, self.sink())));
        }
        readers
    }

    /// Starts `line` in captured-output mode.
    ///
    /// The non-interactive flag is appended, the sink is cleared and revealed, and
    /// stdout/stderr stream into it as they arrive. A second request while a run is
    /// active is rejected with [`ExecutionError::AlreadyRunning`] and spawns nothing.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn run_captured(
        &self,
        line: CommandLine,
        cwd: Option<&Path>,
    ) -> Result<CapturedRun, ExecutionError> {
        let mut active = self.state.lock();
        if active.is_some() {
            self.sink
                .notify(Notice::Info, "A build is already in progress");
            return Err(ExecutionError::AlreadyRunning);
        }

        let line = line.with_no_prompt();
        self.write_header(&line);
        let mut child = self.spawn(&line, cwd)?;
        let readers = self.pump_output(&mut child);

        let id = self.state.next_id.fetch_add(1, Ordering::SeqCst);
        log::debug!("Started captured run {} (PID: {:?})", id, child.id());
        *active = Some(ActiveProcess { id, child });
        self.state.running.send_replace(true);
        drop(active);

        self.sink.reveal();
        Ok(CapturedRun {
            id,
            command: self.display_line(&line),
            readers,
            state: Arc::clone(&self.state),
            sink: self.sink(),
        })
    }

    /// Runs `line` to completion with its output captured, without taking the
    /// single-flight guard. On failure `failure_message` is shown and the output revealed.
    pub async fn run_with_progress(
        &self,
        line: CommandLine,
        cwd: Option<&Path>,
        failure_message: &str,
    ) -> Result<(), ExecutionError> {
        self.write_header(&line);
        let command = self.display_line(&line);
        let mut child = self.spawn(&line, cwd)?;
        let readers = self.pump_output(&mut child);

        let status = child
            .wait()
            .await
            .map_err(|e| ExecutionError::CommandFailed(command.clone(), e))?;
        for reader in readers {
            let _ = reader.await;
        }

        if status.success() {
            return Ok(());
        }
        self.sink.notify(Notice::Error, failure_message);
        self.sink.reveal();
        Err(ExecutionError::Reported {
            command,
            code: status.code(),
            message: failure_message.to_string(),
        })
    }

    /// Runs `line` with the session's command and returns everything it printed.
    pub async fn run_in_background(
        &self,
        line: &CommandLine,
    ) -> Result<CommandResponse, ExecutionError> {
        run_to_completion(&self.program, &self.argv(line), None).await
    }

    /// Kills the active captured run, if any. Returns whether a process was killed.
    pub fn kill(&self) -> bool {
        self.state.kill_active(None)
    }

    /// Ends the session: kills whatever is still running.
    pub fn dispose(&self) {
        if self.kill() {
            log::debug!("Session disposed while a run was active.");
        }
    }
}

/// A captured-output run in flight. Dropping it kills the process if it is still running.
pub struct CapturedRun {
    id: u64,
    command: String,
    readers: Vec<JoinHandle<()>>,
    state: Arc<SessionState>,
    sink: Arc<dyn OutputSink>,
}

impl fmt::Debug for CapturedRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedRun")
            .field("id", &self.id)
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

enum Poll {
    Running,
    Finished(io::Result<ExitStatus>),
    Killed,
}

impl CapturedRun {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Waits for the process to exit or to be killed through the session.
    pub async fn wait(self) -> Result<RunOutcome, ExecutionError> {
        self.wait_until(None).await
    }

    /// Like [`Self::wait`], but kills the run once `cancellation_token` is set. That
    /// includes the time after exit spent draining output: a background child of the
    /// process can hold the pipes open long after the process itself is gone.
    pub async fn wait_or_cancel(
        self,
        cancellation_token: &CancellationToken,
    ) -> Result<RunOutcome, ExecutionError> {
        self.wait_until(Some(cancellation_token)).await
    }

    async fn wait_until(
        mut self,
        cancellation_token: Option<&CancellationToken>,
    ) -> Result<RunOutcome, ExecutionError> {
        let cancelled = || cancellation_token.is_some_and(|token| token.load(Ordering::SeqCst));
        loop {
            if cancelled() && self.state.kill_active(Some(self.id)) {
                log::debug!("Cancellation requested, killed captured run {}.", self.id);
            }
            let poll = {
                let mut active = self.state.lock();
                match active.as_mut() {
                    Some(process) if process.id == self.id => match process.child.try_wait() {
                        Ok(None) => Poll::Running,
                        Ok(Some(status)) => {
                            active.take();
                            self.state.running.send_replace(false);
                            Poll::Finished(Ok(status))
                        }
                        Err(e) => {
                            active.take();
                            self.state.running.send_replace(false);
                            Poll::Finished(Err(e))
                        }
                    },
                    // The session already killed and forgot this run.
                    _ => Poll::Killed,
                }
            };

            match poll {
                Poll::Running => tokio::time::sleep(POLL_INTERVAL).await,
                Poll::Killed => {
                    // A killed process produces no further output.
                    self.abort_readers();
                    return Ok(RunOutcome::Killed);
                }
                Poll::Finished(result) => {
                    let status =
                        result.map_err(|e| ExecutionError::CommandFailed(self.command.clone(), e))?;
                    while self.readers.iter().any(|reader| !reader.is_finished()) {
                        if cancelled() {
                            log::debug!(
                                "Cancellation requested while draining output of run {}.",
                                self.id
                            );
                            self.abort_readers();
                            return Ok(RunOutcome::Killed);
                        }
                        tokio::time::sleep(POLL_INTERVAL).await;
                    }
                    self.readers.clear();
                    return Ok(self.finish(status));
                }
            }
        }
    }

    fn finish(&self, status: ExitStatus) -> RunOutcome {
        let code = status.code();
        if !status.success() {
            log::error!("Command '{}' exited with {:?}", self.command, code);
            let message = match code {
                Some(code) => format!("Build failed with exit code {code}, please check the output."),
                None => "Build was terminated, please check the output.".to_string(),
            };
            self.sink.notify(Notice::Error, &message);
            self.sink.reveal();
        }
        RunOutcome::Exited { code }
    }

    fn abort_readers(&mut self) {
        for reader in self.readers.drain(..) {
            reader.abort();
        }
    }
}

impl Drop for CapturedRun {
    fn drop(&mut self) {
        if self.state.kill_active(Some(self.id)) {
            log::debug!("Captured run {} dropped while running; process killed.", self.id);
        }
        self.abort_readers();
    }
}

/// Runs a command to completion and returns its stdout and stderr.
///
/// A nonzero exit fails with [`ExecutionError::NonZeroExitStatus`], which still
/// carries the partial output.
pub async fn run_to_completion(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
) -> Result<CommandResponse, ExecutionError> {
    let display = std::iter::once(program.to_string())
        .chain(args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ");

    let mut command = Command::new(program);
    command.args(args).stdin(Stdio::null());
    if let Some(cwd) = cwd {
        command.current_dir(dunce::simplified(cwd));
    }

    let output = command
        .output()
        .await
        .map_err(|e| ExecutionError::CommandFailed(display.clone(), e))?;
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        return Err(ExecutionError::NonZeroExitStatus {
            command: display,
            code: output.status.code(),
            stdout,
            stderr,
        });
    }
    Ok(CommandResponse { stdout, stderr })
}

fn split_command(command_path: &str) -> Result<(String, Vec<String>), ExecutionError> {
    let trimmed = command_path.trim();
    let parts = shlex::split(trimmed).ok_or_else(|| ExecutionError::CommandParse(trimmed.to_string()))?;
    let mut parts = parts.into_iter();
    let program = parts.next().ok_or(ExecutionError::EmptyCommand)?;
    Ok((program, parts.collect()))
}

fn configure_piped(command: &mut Command, cwd: Option<&Path>) {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(cwd) = cwd {
        command.current_dir(dunce::simplified(cwd));
    }
}

/// Forwards a process stream into the sink, one line at a time.
async fn pump<R>(reader: R, sink: Arc<dyn OutputSink>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => sink.append(&String::from_utf8_lossy(&line)),
            Err(e) => {
                log::debug!("Stopped reading process output: {}", e);
                break;
            }
        }
    }
}
