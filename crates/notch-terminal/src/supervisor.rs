//! Child process launch and termination.
//!
//! Every child runs inside a pseudo-terminal so shells behave as they would
//! in a real terminal window (line editing, prompts, job control). The
//! supervisor resolves the executable first so launch failures carry a
//! useful kind, then hands back a [`ProcessHandle`] for I/O and signaling
//! plus an [`ExitWatcher`] that owns the child and reports its exit.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use portable_pty::{native_pty_system, Child, ChildKiller, CommandBuilder, MasterPty, PtySize};

use crate::env::build_child_env;
use crate::error::{SpawnFailure, SpawnFailureKind, TerminalError};

pub const DEFAULT_COLS: u16 = 80;
pub const DEFAULT_ROWS: u16 = 24;

// =============================================================================
// LAUNCH SPEC
// =============================================================================

/// What to run and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Applied over the inherited environment, before `TERM` is forced.
    pub extra_env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
    pub cols: u16,
    pub rows: u16,
}

impl LaunchSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            extra_env: Vec::new(),
            cwd: None,
            cols: DEFAULT_COLS,
            rows: DEFAULT_ROWS,
        }
    }

    pub fn env(mut self, vars: Vec<(String, String)>) -> Self {
        self.extra_env = vars;
        self
    }

    pub fn cwd(mut self, dir: Option<PathBuf>) -> Self {
        self.cwd = dir;
        self
    }

    pub fn size(mut self, cols: u16, rows: u16) -> Self {
        self.cols = cols;
        self.rows = rows;
        self
    }

    fn pty_size(&self) -> PtySize {
        PtySize {
            rows: self.rows,
            cols: self.cols,
            pixel_width: 0,
            pixel_height: 0,
        }
    }
}

// =============================================================================
// EXECUTABLE RESOLUTION
// =============================================================================

/// Locate `program` the way `execvp` would, classifying the failure.
///
/// Names containing a path separator are taken as paths (relative ones
/// against `cwd`); bare names are searched in `path_var`.
pub fn resolve_executable(
    program: &str,
    path_var: Option<&str>,
    cwd: Option<&Path>,
) -> Result<PathBuf, SpawnFailure> {
    if program.is_empty() {
        return Err(SpawnFailure::new(program, SpawnFailureKind::NotFound, "empty program name"));
    }

    if program.contains(std::path::MAIN_SEPARATOR) || program.contains('/') {
        let path = Path::new(program);
        let path = match cwd {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        };
        return match check_executable(&path) {
            Candidate::Executable => Ok(path),
            Candidate::NotExecutable => Err(SpawnFailure::new(
                program,
                SpawnFailureKind::PermissionDenied,
                format!("{} is not executable", path.display()),
            )),
            Candidate::Missing => Err(SpawnFailure::new(
                program,
                SpawnFailureKind::NotFound,
                format!("{} does not exist", path.display()),
            )),
        };
    }

    let mut denied: Option<PathBuf> = None;
    for dir in std::env::split_paths(path_var.unwrap_or_default()) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        for candidate in candidate_names(&dir, program) {
            match check_executable(&candidate) {
                Candidate::Executable => return Ok(candidate),
                Candidate::NotExecutable => {
                    denied.get_or_insert(candidate);
                }
                Candidate::Missing => {}
            }
        }
    }

    Err(match denied {
        Some(path) => SpawnFailure::new(
            program,
            SpawnFailureKind::PermissionDenied,
            format!("{} is not executable", path.display()),
        ),
        None => SpawnFailure::new(program, SpawnFailureKind::NotFound, "not found in PATH"),
    })
}

enum Candidate {
    Executable,
    NotExecutable,
    Missing,
}

fn check_executable(path: &Path) -> Candidate {
    let Ok(meta) = std::fs::metadata(path) else {
        return Candidate::Missing;
    };
    if !meta.is_file() {
        return Candidate::NotExecutable;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if meta.permissions().mode() & 0o111 == 0 {
            return Candidate::NotExecutable;
        }
    }
    Candidate::Executable
}

fn candidate_names(dir: &Path, program: &str) -> Vec<PathBuf> {
    #[cfg(windows)]
    {
        if Path::new(program).extension().is_none() {
            return vec![dir.join(format!("{program}.exe")), dir.join(program)];
        }
    }
    vec![dir.join(program)]
}

// =============================================================================
// PROCESS HANDLE
// =============================================================================

/// Result of [`ProcessHandle::stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// A terminate signal was delivered.
    Signaled,
    AlreadyExited,
    AlreadyStopped,
}

/// How the child ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// `None` when the wait itself failed.
    pub code: Option<u32>,
    pub success: bool,
}

/// Shared handle to a running child.
///
/// The reader and writer can each be taken once. Dropping the writer closes
/// the PTY input, which most shells read as end of input.
pub struct ProcessHandle {
    pid: Option<u32>,
    program: String,
    killer: Mutex<Box<dyn ChildKiller + Send + Sync>>,
    master: Mutex<Box<dyn MasterPty + Send>>,
    reader: Mutex<Option<Box<dyn Read + Send>>>,
    writer: Mutex<Option<Box<dyn Write + Send>>>,
    size: Mutex<PtySize>,
    exited: Arc<AtomicBool>,
    stopped: AtomicBool,
    signals_sent: AtomicUsize,
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("program", &self.program)
            .field("exited", &self.has_exited())
            .field("signals_sent", &self.signals_sent())
            .finish()
    }
}

impl ProcessHandle {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    /// Number of terminate signals delivered so far. Never exceeds one.
    pub fn signals_sent(&self) -> usize {
        self.signals_sent.load(Ordering::SeqCst)
    }

    pub fn take_reader(&self) -> Option<Box<dyn Read + Send>> {
        self.reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn take_writer(&self) -> Option<Box<dyn Write + Send>> {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn size(&self) -> (u16, u16) {
        let size = self.size.lock().unwrap_or_else(PoisonError::into_inner);
        (size.cols, size.rows)
    }

    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), TerminalError> {
        if cols == 0 || rows == 0 {
            return Err(TerminalError::ResizeFailed(format!(
                "invalid size {cols}x{rows}"
            )));
        }
        let new_size = PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        };
        self.master
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .resize(new_size)
            .map_err(|e| TerminalError::ResizeFailed(e.to_string()))?;
        *self.size.lock().unwrap_or_else(PoisonError::into_inner) = new_size;
        Ok(())
    }

    /// Send the terminate signal once. Later calls, and calls after the
    /// child exited on its own, do nothing.
    pub fn stop(&self) -> StopOutcome {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return StopOutcome::AlreadyStopped;
        }
        if self.has_exited() {
            return StopOutcome::AlreadyExited;
        }

        let result = self
            .killer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .kill();
        self.signals_sent.fetch_add(1, Ordering::SeqCst);

        match result {
            Ok(()) => {
                tracing::debug!(pid = ?self.pid, program = %self.program, "terminate signal sent");
                StopOutcome::Signaled
            }
            Err(e) => {
                // Usually the child exited between the check and the signal.
                tracing::debug!(pid = ?self.pid, error = %e, "terminate signal not delivered");
                StopOutcome::AlreadyExited
            }
        }
    }
}

// =============================================================================
// EXIT WATCHER
// =============================================================================

/// Owns the child until it exits.
pub struct ExitWatcher {
    child: Box<dyn Child + Send + Sync>,
    exited: Arc<AtomicBool>,
    program: String,
}

impl std::fmt::Debug for ExitWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExitWatcher")
            .field("program", &self.program)
            .field("pid", &self.child.process_id())
            .finish()
    }
}

impl ExitWatcher {
    /// Wait for the child on a background thread, then run `on_exit`.
    pub fn spawn<F>(self, on_exit: F) -> Result<thread::JoinHandle<()>, TerminalError>
    where
        F: FnOnce(ProcessExit) + Send + 'static,
    {
        let ExitWatcher {
            mut child,
            exited,
            program,
        } = self;

        let handle = thread::Builder::new()
            .name("process-watch".to_string())
            .spawn(move || {
                let exit = match child.wait() {
                    Ok(status) => ProcessExit {
                        code: Some(status.exit_code()),
                        success: status.success(),
                    },
                    Err(e) => {
                        tracing::warn!(program = %program, error = %e, "wait on child failed");
                        ProcessExit {
                            code: None,
                            success: false,
                        }
                    }
                };
                exited.store(true, Ordering::SeqCst);
                tracing::debug!(program = %program, code = ?exit.code, "child exited");
                on_exit(exit);
            })?;
        Ok(handle)
    }
}

// =============================================================================
// SUPERVISOR
// =============================================================================

/// Launches children with the session environment.
#[derive(Debug, Clone, Default)]
pub struct ProcessSupervisor {
    extra_path: Vec<String>,
}

impl ProcessSupervisor {
    /// `extra_path` directories are appended to every child's `PATH`.
    pub fn new(extra_path: Vec<String>) -> Self {
        Self { extra_path }
    }

    pub fn extra_path(&self) -> &[String] {
        &self.extra_path
    }

    /// Spawn `spec` inside a new PTY.
    pub fn start(&self, spec: &LaunchSpec) -> Result<(Arc<ProcessHandle>, ExitWatcher), TerminalError> {
        let shell = notch_config::schema::default_shell();
        let env = build_child_env(&shell, &self.extra_path, spec.extra_env.iter().cloned());
        let path_var = env
            .iter()
            .find(|(k, _)| k == "PATH")
            .map(|(_, v)| v.as_str());
        let executable = resolve_executable(&spec.program, path_var, spec.cwd.as_deref())?;

        let pty_failure = |what: &str, e: &dyn std::fmt::Display| {
            SpawnFailure::new(&spec.program, SpawnFailureKind::Pty, format!("{what}: {e}"))
        };

        let pair = native_pty_system()
            .openpty(spec.pty_size())
            .map_err(|e| pty_failure("failed to open PTY", &e))?;

        let mut cmd = CommandBuilder::new(&executable);
        cmd.args(&spec.args);
        cmd.env_clear();
        for (key, value) in &env {
            cmd.env(key, value);
        }
        if let Some(dir) = &spec.cwd {
            cmd.cwd(dir);
        }

        let child = pair.slave.spawn_command(cmd).map_err(|e| {
            SpawnFailure::new(&spec.program, SpawnFailureKind::Other, e.to_string())
        })?;

        // Only the master side is needed from here on.
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| pty_failure("failed to clone PTY reader", &e))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| pty_failure("failed to take PTY writer", &e))?;

        let exited = Arc::new(AtomicBool::new(false));
        let pid = child.process_id();
        tracing::info!(
            program = %spec.program,
            pid = ?pid,
            cols = spec.cols,
            rows = spec.rows,
            "child process started"
        );

        let handle = Arc::new(ProcessHandle {
            pid,
            program: spec.program.clone(),
            killer: Mutex::new(child.clone_killer()),
            master: Mutex::new(pair.master),
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
            size: Mutex::new(spec.pty_size()),
            exited: Arc::clone(&exited),
            stopped: AtomicBool::new(false),
            signals_sent: AtomicUsize::new(0),
        });

        let watcher = ExitWatcher {
            child,
            exited,
            program: spec.program.clone(),
        };

        Ok((handle, watcher))
    }

    pub fn stop(&self, handle: &ProcessHandle) -> StopOutcome {
        handle.stop()
    }
}

// =============================================================================
// TESTS
// =============================================================================
