use crate::{error::TranscoderError, process::TranscoderProcess};

/// Terminal outcome of one transcoder run.
#[derive(Debug)]
pub enum Completion {
    /// The process exited with a success status.
    Exited,
    Failed(TranscoderError),
}

impl Completion {
    pub fn is_success(&self) -> bool {
        matches!(self, Completion::Exited)
    }

    pub fn error(&self) -> Option<&TranscoderError> {
        match self {
            Completion::Exited => None,
            Completion::Failed(e) => Some(e),
        }
    }

    /// Captured diagnostics of a failed run
    pub fn output(&self) -> Option<&str> {
        self.error().map(TranscoderError::output)
    }
}

/// Receive side of the completion channel.
///
/// Yields exactly one [`Completion`], after which `recv` returns `None`.
#[derive(Debug)]
pub struct CompletionReceiver {
    rx: tokio::sync::mpsc::Receiver<Completion>,
}

impl CompletionReceiver {
    pub async fn recv(&mut self) -> Option<Completion> {
        self.rx.recv().await
    }

    /// Non-blocking poll; `None` while the run is still going or after the
    /// result was taken.
    pub fn try_recv(&mut self) -> Option<Completion> {
        self.rx.try_recv().ok()
    }
}

/// Start the watcher task for `process`. The task sends one completion and
/// closes the channel by dropping its sender.
pub(crate) fn watch(id: String, process: TranscoderProcess) -> CompletionReceiver {
    let (tx, rx) = tokio::sync::mpsc::channel(1);

    tokio::spawn(async move {
        let completion = process.wait().await;
        match &completion {
            Completion::Exited => log::info!("Publisher {}: transcoder exited", id),
            Completion::Failed(e) => log::error!("Publisher {}: {}", id, e),
        }
        if tx.send(completion).await.is_err() {
            log::debug!("Publisher {}: completion receiver dropped", id);
        }
    });

    CompletionReceiver { rx }
}
