use std::{
    process::Stdio,
    sync::{Arc, Mutex},
    time::Duration,
};

use bytes::BytesMut;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    process::{Child, ChildStdin, Command},
    task::JoinHandle,
};

use crate::{completion::Completion, error::TranscoderError};

/// Line written to the transcoder's stdin to ask it to quit.
pub const SHUTDOWN_COMMAND: &[u8] = b"q\n";

// output pumps normally end with the child, unless a grandchild keeps the pipes open
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Only the tail of the transcoder output is kept, progress lines would
/// otherwise pile up for the whole run.
pub const MAX_CAPTURED_OUTPUT: usize = 64 * 1024;

/// Program and leading arguments used to launch the transcoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscoderSettings {
    pub program: String,
    /// Passed before the generated arguments, e.g. `-hide_banner`
    pub pre_args: Vec<String>,
}

impl TranscoderSettings {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            pre_args: Vec::new(),
        }
    }

    pub fn with_pre_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pre_args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for TranscoderSettings {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

/// Last [`MAX_CAPTURED_OUTPUT`] bytes of stdout and stderr, interleaved as
/// they arrive.
#[derive(Clone, Debug, Default)]
pub struct CapturedOutput(Arc<Mutex<BytesMut>>);

impl CapturedOutput {
    fn append(&self, data: &[u8]) {
        let Ok(mut buf) = self.0.lock() else {
            return;
        };
        let data = &data[data.len().saturating_sub(MAX_CAPTURED_OUTPUT)..];
        let overflow = (buf.len() + data.len()).saturating_sub(MAX_CAPTURED_OUTPUT);
        if overflow > 0 {
            let _ = buf.split_to(overflow);
        }
        buf.extend_from_slice(data);
    }

    pub fn len(&self) -> usize {
        self.0.lock().map(|buf| buf.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn text(&self) -> String {
        match self.0.lock() {
            Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => String::new(),
        }
    }
}

/// Write side of the transcoder's stdin.
pub struct ControlChannel {
    stdin: ChildStdin,
}

impl ControlChannel {
    /// Cooperative stop. Returns once the line is handed to the pipe,
    /// never waits for the process to exit.
    pub async fn request_shutdown(&mut self) -> std::io::Result<()> {
        self.stdin.write_all(SHUTDOWN_COMMAND).await?;
        self.stdin.flush().await
    }
}

enum ProcessRun {
    Running {
        child: Child,
        pumps: Vec<JoinHandle<()>>,
    },
    SpawnFailed(std::io::Error),
}

/// Transcoder child process.
///
/// Spawning never fails at this level: a spawn error is kept and reported by
/// [`TranscoderProcess::wait`], so callers have a single place to observe the
/// outcome of a run.
pub struct TranscoderProcess {
    pid: Option<u32>,
    output: CapturedOutput,
    control: Option<ControlChannel>,
    run: ProcessRun,
}

impl TranscoderProcess {
    /// Must be called inside a tokio runtime.
    pub fn spawn(settings: &TranscoderSettings, args: &[String]) -> Self {
        let output = CapturedOutput::default();

        let mut command = Command::new(&settings.program);
        command
            .args(&settings.pre_args)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false);

        match command.spawn() {
            Ok(mut child) => {
                let pid = child.id();
                let control = child.stdin.take().map(|stdin| ControlChannel { stdin });
                if control.is_none() {
                    log::warn!("Transcoder: stdin not available");
                }

                let mut pumps = Vec::new();
                if let Some(stdout) = child.stdout.take() {
                    pumps.push(tokio::spawn(pump_output(stdout, output.clone())));
                }
                if let Some(stderr) = child.stderr.take() {
                    pumps.push(tokio::spawn(pump_output(stderr, output.clone())));
                }

                log::debug!("Transcoder: spawned {} (pid {:?})", settings.program, pid);
                Self {
                    pid,
                    output,
                    control,
                    run: ProcessRun::Running { child, pumps },
                }
            }
            Err(e) => {
                log::error!("Transcoder: failed to spawn {}: {}", settings.program, e);
                Self {
                    pid: None,
                    output,
                    control: None,
                    run: ProcessRun::SpawnFailed(e),
                }
            }
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub(crate) fn is_spawned(&self) -> bool {
        matches!(self.run, ProcessRun::Running { .. })
    }

    pub fn output(&self) -> &CapturedOutput {
        &self.output
    }

    /// Detach the stdin writer. Subsequent calls return `None`.
    pub fn take_control(&mut self) -> Option<ControlChannel> {
        self.control.take()
    }

    /// Wait for the run to end and classify it.
    pub async fn wait(self) -> Completion {
        let Self { output, run, .. } = self;
        match run {
            ProcessRun::SpawnFailed(source) => Completion::Failed(TranscoderError::Spawn {
                source,
                output: output.text(),
            }),
            ProcessRun::Running { mut child, pumps } => {
                let status = child.wait().await;
                for pump in pumps {
                    if tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, pump).await.is_err() {
                        log::warn!("Transcoder: output still open after exit, dropping the rest");
                    }
                }
                match status {
                    Ok(status) if status.success() => Completion::Exited,
                    Ok(status) => Completion::Failed(TranscoderError::Exit {
                        status,
                        output: output.text(),
                    }),
                    Err(source) => Completion::Failed(TranscoderError::Wait {
                        source,
                        output: output.text(),
                    }),
                }
            }
        }
    }
}

async fn pump_output<R>(mut reader: R, output: CapturedOutput)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => output.append(&buf[..n]),
            Err(e) => {
                log::debug!("Transcoder: output read failed: {}", e);
                break;
            }
        }
    }
}
