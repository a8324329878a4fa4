use crate::cache::CommandCache;
use crate::error::{Result, UpliftError};
use crate::git::query::render_command;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::debug;

/// How much of a streaming child's stderr is kept for the error message.
pub const STDERR_TAIL_BYTES: usize = 8 * 1024;

/// Lazily produced output lines. Finite and single-pass.
pub type LineStream<'a> = Box<dyn Iterator<Item = Result<String>> + 'a>;

/// Everything above this trait talks to history through it, so tests can swap
/// in canned output instead of spawning processes.
pub trait CommandRunner {
    /// Whole stdout of one invocation. Memoized by exact argument tokens.
    fn run_captured(&self, args: &[String]) -> Result<String>;

    /// Stdout one line at a time. Never cached.
    fn run_streaming(&self, args: &[String]) -> Result<LineStream<'_>>;
}

type SharedChild = Arc<Mutex<Child>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared interrupt switch. Raising it kills the child that is currently
/// streaming, even when its reader is blocked, and stops new spawns.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<CancelState>);

#[derive(Debug, Default)]
struct CancelState {
    raised: AtomicBool,
    running: Mutex<Option<SharedChild>>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Safe to call from a signal-handler thread.
    pub fn cancel(&self) {
        self.0.raised.store(true, Ordering::SeqCst);
        if let Some(child) = lock(&self.0.running).as_ref() {
            let _ = lock(child).kill();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.raised.load(Ordering::SeqCst)
    }

    fn watch(&self, child: SharedChild) {
        *lock(&self.0.running) = Some(child);
    }

    fn release(&self) {
        lock(&self.0.running).take();
    }
}

pub struct GitRunner {
    program: String,
    path: PathBuf,
    cache: CommandCache,
    cancel: CancelFlag,
}

impl GitRunner {
    /// Open the working tree at `path`, or the current dir if `None`.
    /// Fails before anything is spawned when there is no `.git` entry.
    pub fn open<P: AsRef<Path>>(path: Option<P>, cache: CommandCache) -> Result<Self> {
        let path = match path {
            Some(p) => p.as_ref().to_path_buf(),
            None => std::env::current_dir()?,
        };

        // `.git` is a directory in normal clones and a file in worktrees/submodules
        if !path.join(".git").exists() {
            return Err(UpliftError::NotARepository(path.display().to_string()));
        }

        Ok(Self {
            program: "git".to_string(),
            path,
            cache,
            cancel: CancelFlag::new(),
        })
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cache(&self) -> &CommandCache {
        &self.cache
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args).current_dir(&self.path).stdin(Stdio::null());
        cmd
    }

    fn launch_error(&self, err: io::Error) -> UpliftError {
        if err.kind() == io::ErrorKind::NotFound {
            UpliftError::ToolInvocation {
                tool: self.program.clone(),
                source: err,
            }
        } else {
            UpliftError::Io(err)
        }
    }

    fn ensure_not_cancelled(&self, args: &[String]) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(UpliftError::Cancelled(render_command(args)));
        }
        Ok(())
    }
}

impl CommandRunner for GitRunner {
    fn run_captured(&self, args: &[String]) -> Result<String> {
        if let Some(hit) = self.cache.get(args) {
            debug!(command = %render_command(args), "cache hit");
            return Ok(hit);
        }
        self.ensure_not_cancelled(args)?;

        debug!(command = %render_command(args), "capturing");
        let output = self
            .command(args)
            .output()
            .map_err(|e| self.launch_error(e))?;

        if !output.status.success() {
            return Err(UpliftError::ToolExecution {
                command: render_command(args),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        Ok(self.cache.insert(args, stdout))
    }

    fn run_streaming(&self, args: &[String]) -> Result<LineStream<'_>> {
        self.ensure_not_cancelled(args)?;

        debug!(command = %render_command(args), "streaming");
        let mut child = self
            .command(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.launch_error(e))?;

        let pipes = match child.stdout.take() {
            Some(stdout) => child
                .stderr
                .take()
                .map(drain_stderr)
                .transpose()
                .map(|stderr| (stdout, stderr)),
            None => Err(io::Error::other("child stdout was not captured")),
        };
        let (stdout, stderr) = match pipes {
            Ok(pipes) => pipes,
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(err.into());
            }
        };

        let child = Arc::new(Mutex::new(child));
        self.cancel.watch(Arc::clone(&child));

        Ok(Box::new(GitLines {
            child: Some(child),
            reader: Some(BufReader::new(stdout)),
            stderr,
            command: render_command(args),
            cancel: self.cancel.clone(),
            buf: Vec::new(),
        }))
    }
}

/// Reads stderr to EOF on its own thread so a chatty child never blocks on a
/// full pipe. Keeps only the last [`STDERR_TAIL_BYTES`].
fn drain_stderr(mut pipe: ChildStderr) -> io::Result<JoinHandle<Vec<u8>>> {
    thread::Builder::new()
        .name("git-stderr".to_string())
        .spawn(move || {
            let mut tail = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                match pipe.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => {
                        tail.extend_from_slice(&chunk[..n]);
                        if tail.len() > 2 * STDERR_TAIL_BYTES {
                            tail.drain(..tail.len() - STDERR_TAIL_BYTES);
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(_) => break,
                }
            }
            if tail.len() > STDERR_TAIL_BYTES {
                tail.drain(..tail.len() - STDERR_TAIL_BYTES);
            }
            tail
        })
}

/// Line iterator over a live `git` process. Holds at most one line in memory.
/// Dropping it early kills the process.
struct GitLines {
    child: Option<SharedChild>,
    reader: Option<BufReader<ChildStdout>>,
    stderr: Option<JoinHandle<Vec<u8>>>,
    command: String,
    cancel: CancelFlag,
    buf: Vec<u8>,
}

impl GitLines {
    fn abort(&mut self) {
        self.reader = None;
        // a grandchild may still hold stderr open; don't wait on the drain thread
        self.stderr = None;
        self.cancel.release();
        if let Some(child) = self.child.take() {
            let mut child = lock(&child);
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn cancelled(&mut self) -> Result<String> {
        self.abort();
        Err(UpliftError::Cancelled(self.command.clone()))
    }

    fn finish(&mut self) -> Result<()> {
        self.reader = None;
        self.cancel.release();
        let Some(child) = self.child.take() else {
            return Ok(());
        };

        let raw = self
            .stderr
            .take()
            .map(|handle| handle.join().unwrap_or_default())
            .unwrap_or_default();
        let status = lock(&child).wait()?;
        if status.success() {
            Ok(())
        } else {
            Err(UpliftError::ToolExecution {
                command: self.command.clone(),
                stderr: String::from_utf8_lossy(&raw).trim().to_string(),
            })
        }
    }
}

impl Iterator for GitLines {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.child.as_ref()?;
        if self.cancel.is_cancelled() {
            return Some(self.cancelled());
        }

        self.buf.clear();
        let read = self.reader.as_mut()?.read_until(b'\n', &mut self.buf);
        // a kill from another thread surfaces here as EOF or a read error
        if self.cancel.is_cancelled() {
            return Some(self.cancelled());
        }
        match read {
            Ok(0) => self.finish().err().map(Err),
            Ok(_) => {
                while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
                    self.buf.pop();
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => {
                self.abort();
                Some(Err(e.into()))
            }
        }
    }
}

impl Drop for GitLines {
    fn drop(&mut self) {
        self.abort();
    }
}
