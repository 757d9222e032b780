use std::process::ExitStatus;

use crate::capability::MediaKind;

/// Why a transcoder run ended badly. `output` holds whatever the process
/// printed before it ended.
#[derive(Debug, thiserror::Error)]
pub enum TranscoderError {
    #[error("failed to start transcoder: {source}, output: {output}")]
    Spawn {
        source: std::io::Error,
        output: String,
    },

    #[error("transcoder finished with {status}, output: {output}")]
    Exit { status: ExitStatus, output: String },

    #[error("failed to wait for transcoder: {source}, output: {output}")]
    Wait {
        source: std::io::Error,
        output: String,
    },
}

impl TranscoderError {
    pub fn output(&self) -> &str {
        match self {
            TranscoderError::Spawn { output, .. }
            | TranscoderError::Exit { output, .. }
            | TranscoderError::Wait { output, .. } => output,
        }
    }
}

/// Setup errors reported synchronously by `Publisher::start`.
#[derive(Debug, thiserror::Error)]
pub enum PublisherError {
    #[error("publisher {0} already started")]
    AlreadyStarted(String),

    #[error("no {0} capability")]
    MissingCapability(MediaKind),

    #[error("codec {codec} not negotiated for {kind}")]
    MissingCodec { kind: MediaKind, codec: String },

    #[error("create {kind} session: {error:#}")]
    Session {
        kind: MediaKind,
        error: anyhow::Error,
    },
}
