//! Running a built command and streaming its output.
//!
//! Process creation sits behind [`ProcessLauncher`]; [`execute`] only joins
//! the tokens, forwards each output line to the caller's callback as it
//! arrives, and reports completion exactly once at the end.

use crate::command::SoxCommand;
use crate::error::{Result, SoxError};
use std::io::{self, BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use tracing::{debug, trace, warn};

/// Exit code reported when the process could not be started or was killed
/// without one.
pub const NO_EXIT_CODE: i32 = -1;

/// One event of an engine run, for closure-based callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellEvent<'a> {
    Line(&'a str),
    Complete(i32),
}

/// Receives engine output line by line, then one completion notice.
pub trait StreamCallback {
    fn shell_out(&mut self, line: &str);
    fn process_complete(&mut self, exit_code: i32);
}

impl<F> StreamCallback for F
where
    F: FnMut(ShellEvent<'_>),
{
    fn shell_out(&mut self, line: &str) {
        self(ShellEvent::Line(line))
    }

    fn process_complete(&mut self, exit_code: i32) {
        self(ShellEvent::Complete(exit_code))
    }
}

/// Starts the engine for a space-joined invocation string.
///
/// Implementations call `on_line` once per output line, in the order the
/// process emits them, on the calling thread, and return the exit code once
/// the process has terminated.
pub trait ProcessLauncher {
    fn launch(&mut self, invocation: &str, on_line: &mut dyn FnMut(&str)) -> io::Result<i32>;
}

/// Launches real processes. The invocation is split on whitespace; stdout
/// and stderr are both forwarded since sox reports `stat` on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl SystemLauncher {
    pub fn new() -> Self {
        Self
    }

    /// Whether `binary` can be started at all.
    pub fn is_available(binary: &str) -> bool {
        Command::new(binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }
}

impl ProcessLauncher for SystemLauncher {
    fn launch(&mut self, invocation: &str, on_line: &mut dyn FnMut(&str)) -> io::Result<i32> {
        let mut parts = invocation.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty invocation"))?;

        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let (tx, rx) = mpsc::channel::<String>();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_line_reader(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_line_reader(stderr, tx.clone()));
        }
        drop(tx);

        // Ends once both pipes hit EOF and their senders are dropped.
        for line in rx {
            on_line(&line);
        }
        join_readers(readers, program);

        let status = child.wait()?;
        Ok(status.code().unwrap_or(NO_EXIT_CODE))
    }
}

/// Join the pipe readers, returning how many of them panicked.
fn join_readers(readers: Vec<thread::JoinHandle<()>>, program: &str) -> usize {
    let mut panicked = 0;
    for reader in readers {
        if reader.join().is_err() {
            warn!("Output reader for {} panicked; lines may be missing", program);
            panicked += 1;
        }
    }
    panicked
}

fn spawn_line_reader<R>(pipe: R, tx: mpsc::Sender<String>) -> thread::JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\n', '\r']);
                    if tx.send(line.to_string()).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

/// Run `command` to completion and return its exit code.
///
/// Blocks until the process exits. With a callback, every output line is
/// delivered through `shell_out` before a single `process_complete`; without
/// one the output is discarded. A launch failure still produces the
/// completion notice (with [`NO_EXIT_CODE`]) before the error is returned.
pub fn execute<L>(
    launcher: &mut L,
    command: &SoxCommand,
    mut callback: Option<&mut dyn StreamCallback>,
) -> Result<i32>
where
    L: ProcessLauncher + ?Sized,
{
    let invocation = command.invocation();
    debug!("Running: {}", invocation);

    let launched = launcher.launch(&invocation, &mut |line: &str| {
        trace!("sox: {}", line);
        if let Some(cb) = callback.as_mut() {
            cb.shell_out(line);
        }
    });

    let exit_code = match launched {
        Ok(code) => code,
        Err(source) => {
            if let Some(cb) = callback.as_mut() {
                cb.process_complete(NO_EXIT_CODE);
            }
            let binary = command.tokens().first().cloned().unwrap_or_default();
            warn!("Failed to launch {}: {}", binary, source);
            return Err(SoxError::Launch { binary, source });
        }
    };

    if let Some(cb) = callback {
        cb.process_complete(exit_code);
    }

    if exit_code == 0 {
        debug!("sox finished successfully");
    } else {
        warn!("sox failed with exit code {}", exit_code);
    }

    Ok(exit_code)
}
