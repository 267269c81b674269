//! Batch worker process supervision.
//!
//! The worker is launched as
//! `<executable> -Progress "<pipeline file>" "<input scene>" "<output scene>"`
//! with stdout and stderr sharing the write end of one anonymous pipe. A
//! single reader thread frames the bytes into [`PipeMessage`]s and forwards
//! them over a channel, so messages keep the order they were written in.
//! The supervising thread polls for exit, dispatches messages and drains
//! whatever is left once the worker has exited.

use super::protocol::{MessageParser, PipeMessage, READ_CHUNK_SIZE};
use crate::error::{Result, SgError};
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use std::ffi::OsString;
use std::io::{PipeReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Flag telling the worker to report progress on its output streams
pub const PROGRESS_FLAG: &str = "-Progress";

/// Everything needed to launch one worker invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub executable: PathBuf,
    pub pipeline_file: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl WorkerCommand {
    pub fn args(&self) -> Vec<OsString> {
        vec![
            OsString::from(PROGRESS_FLAG),
            self.pipeline_file.clone().into_os_string(),
            self.input.clone().into_os_string(),
            self.output.clone().into_os_string(),
        ]
    }
}

/// A running batch worker.
pub struct ExternalProcess {
    child: Child,
    messages: Receiver<PipeMessage>,
    reader: Option<JoinHandle<()>>,
}

impl ExternalProcess {
    /// Launch the worker.
    ///
    /// An empty pipeline path is rejected before anything is spawned; any
    /// launch failure is a `ProcessFailure`.
    pub fn spawn(command: &WorkerCommand) -> Result<Self> {
        if command.pipeline_file.as_os_str().is_empty() {
            return Err(SgError::InvalidConfiguration(
                "The pipeline file path is empty.".to_string(),
            ));
        }

        let (pipe_reader, pipe_writer) = std::io::pipe().map_err(|e| {
            SgError::ProcessFailure(format!("CreatePipe: could not create the worker pipe: {}", e))
        })?;
        let stderr_writer = pipe_writer.try_clone().map_err(|e| {
            SgError::ProcessFailure(format!("CreatePipe: could not share the worker pipe: {}", e))
        })?;

        debug!("Launching {:?} {:?}", command.executable, command.args());
        // The Command is a temporary so our copies of the write end close
        // right after the spawn; the reader sees EOF once the worker exits.
        let mut child = Command::new(&command.executable)
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::from(pipe_writer))
            .stderr(Stdio::from(stderr_writer))
            .spawn()
            .map_err(|e| {
                SgError::ProcessFailure(format!(
                    "ExecuteProcess (Batch Processor): could not launch {:?}: {}",
                    command.executable, e
                ))
            })?;

        let (tx, rx) = unbounded();
        let reader = match spawn_reader(pipe_reader, tx) {
            Ok(handle) => handle,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        };

        Ok(Self {
            child,
            messages: rx,
            reader: Some(reader),
        })
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Supervise the worker until it exits and return its exit code.
    ///
    /// Every message is passed to `dispatch` in arrival order. If
    /// `dispatch` fails, the worker is killed and the error returned.
    /// A worker terminated by a signal reports exit code `-1`.
    pub fn wait<F>(&mut self, poll_interval: Duration, mut dispatch: F) -> Result<i32>
    where
        F: FnMut(PipeMessage) -> Result<()>,
    {
        let status = loop {
            if let Err(e) = self.dispatch_pending(&mut dispatch) {
                self.terminate();
                return Err(e);
            }

            match self.child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => thread::sleep(poll_interval),
                Err(e) => {
                    self.terminate();
                    return Err(SgError::ProcessFailure(format!(
                        "Could not query the batch worker: {}",
                        e
                    )));
                }
            }
        };

        // Left-overs: the reader finishes once the pipe closes.
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                warn!("Worker output reader panicked");
            }
        }
        self.dispatch_pending(&mut dispatch)?;

        let code = status.code().unwrap_or(-1);
        debug!("Batch worker {} exited with {}", self.child.id(), code);
        Ok(code)
    }

    fn dispatch_pending<F>(&self, dispatch: &mut F) -> Result<()>
    where
        F: FnMut(PipeMessage) -> Result<()>,
    {
        loop {
            match self.messages.try_recv() {
                Ok(message) => {
                    trace!("Worker message: {:?}", message);
                    dispatch(message)?;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return Ok(()),
            }
        }
    }

    fn terminate(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            if let Err(e) = self.child.kill() {
                warn!("Failed to kill batch worker {}: {}", self.child.id(), e);
            }
        }
        let _ = self.child.wait();
    }
}

impl Drop for ExternalProcess {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn spawn_reader(mut stream: PipeReader, tx: Sender<PipeMessage>) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("sg-worker-pipe".to_string())
        .spawn(move || {
            let mut parser = MessageParser::new();
            let mut buffer = [0u8; READ_CHUNK_SIZE];

            loop {
                match stream.read(&mut buffer) {
                    Ok(0) => break,
                    Ok(n) => {
                        for message in parser.feed(&buffer[..n]) {
                            if tx.send(message).is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        warn!("Failed to read the worker pipe: {}", e);
                        break;
                    }
                }
            }

            for message in parser.finish() {
                if tx.send(message).is_err() {
                    return;
                }
            }
        })
        .map_err(|e| SgError::ProcessFailure(format!("Could not start the pipe reader: {}", e)))
}
