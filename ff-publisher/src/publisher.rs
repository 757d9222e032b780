use std::sync::Arc;

use crate::{
    capability::{CapabilitySet, MediaInfo, MediaKind},
    command::{RtpTarget, TranscoderCommandBuilder},
    completion::{self, CompletionReceiver},
    error::PublisherError,
    process::{ControlChannel, TranscoderProcess, TranscoderSettings},
    session::{MediaSession, SessionFactory, UdpSessionFactory},
    track::IncomingStreamTrack,
};

/// Codec the video session is negotiated with
pub const VIDEO_CODEC: &str = "h264";
/// Codec the audio session is negotiated with
pub const AUDIO_CODEC: &str = "opus";

/// The part of a run the publisher keeps after spawning; the child itself is
/// owned by the completion watcher.
struct ProcessHandle {
    pid: Option<u32>,
    args: Vec<String>,
    control: Option<ControlChannel>,
}

/// Publishes a remote stream as two local RTP flows through an external
/// transcoder.
///
/// ```text
/// capabilities ─► video/audio sessions ─► ports + payload types ─► transcoder args ─► process
///                                                                                   │
///                                                          completion watcher ◄─────┘
/// ```
///
/// `start` and `stop` are meant to be called sequentially by the owner.
pub struct Publisher {
    id: String,
    stream_url: String,
    capabilities: CapabilitySet,
    factory: Arc<dyn SessionFactory>,
    transcoder: TranscoderSettings,
    process: Option<ProcessHandle>,
    video_session: Option<Box<dyn MediaSession>>,
    audio_session: Option<Box<dyn MediaSession>>,
}

impl Publisher {
    pub fn new(id: impl Into<String>, stream_url: impl Into<String>, capabilities: CapabilitySet) -> Self {
        Self {
            id: id.into(),
            stream_url: stream_url.into(),
            capabilities,
            factory: Arc::new(UdpSessionFactory::default()),
            transcoder: TranscoderSettings::default(),
            process: None,
            video_session: None,
            audio_session: None,
        }
    }

    pub fn with_session_factory(mut self, factory: Arc<dyn SessionFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_transcoder(mut self, transcoder: TranscoderSettings) -> Self {
        self.transcoder = transcoder;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }

    /// A transcoder run is held, i.e. started and not stopped yet
    pub fn is_running(&self) -> bool {
        self.process.is_some()
    }

    /// Transcoder arguments of the current run
    pub fn command_line(&self) -> Option<&[String]> {
        self.process.as_ref().map(|p| p.args.as_slice())
    }

    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(|p| p.pid)
    }

    pub fn video_track(&self) -> Option<IncomingStreamTrack> {
        self.video_session.as_ref().and_then(|s| s.track())
    }

    pub fn audio_track(&self) -> Option<IncomingStreamTrack> {
        self.audio_session.as_ref().and_then(|s| s.track())
    }

    /// Bind both sessions, launch the transcoder and return the channel that
    /// yields the outcome of the run.
    ///
    /// Returns as soon as the process is spawned. A spawn failure is not an
    /// error here, it is delivered through the returned channel. Must be
    /// called inside a tokio runtime.
    pub fn start(&mut self) -> Result<CompletionReceiver, PublisherError> {
        if self.process.is_some() {
            return Err(PublisherError::AlreadyStarted(self.id.clone()));
        }

        let (video_session, video_target) = self.create_session(MediaKind::Video, VIDEO_CODEC)?;
        let (audio_session, audio_target) = match self.create_session(MediaKind::Audio, AUDIO_CODEC) {
            Ok(created) => created,
            Err(e) => {
                let mut video_session = video_session;
                video_session.stop();
                return Err(e);
            }
        };

        let args = TranscoderCommandBuilder::new(self.stream_url.as_str())
            .with_video(video_target)
            .with_audio(audio_target)
            .build();

        log::info!(
            "Publisher {}: starting {} {}",
            self.id,
            self.transcoder.program,
            args.join(" ")
        );

        let mut process = TranscoderProcess::spawn(&self.transcoder, &args);
        if !process.is_spawned() {
            log::warn!("Publisher {}: transcoder did not start, failure follows on completion", self.id);
        }
        self.process = Some(ProcessHandle {
            pid: process.pid(),
            args,
            control: process.take_control(),
        });
        self.video_session = Some(video_session);
        self.audio_session = Some(audio_session);

        Ok(completion::watch(self.id.clone(), process))
    }

    /// Release the sessions (audio, then video) and ask the transcoder to
    /// quit. Does not wait for the process to exit; the outcome still arrives
    /// on the completion channel. Calling it with nothing started is a no-op.
    pub async fn stop(&mut self) {
        self.release_sessions();

        if let Some(process) = self.process.take() {
            if let Some(mut control) = process.control {
                match control.request_shutdown().await {
                    Ok(()) => {}
                    // the transcoder is already gone
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                        log::debug!("Publisher {}: transcoder already exited: {}", self.id, e)
                    }
                    Err(e) => {
                        log::warn!("Publisher {}: failed to signal transcoder: {}", self.id, e)
                    }
                }
            }
            log::info!("Publisher {}: stopped", self.id);
        }
    }

    /// Release the sessions after the transcoder ended on its own. Unlike
    /// [`Publisher::stop`] nothing is written to the finished process.
    pub fn finish(&mut self) {
        self.release_sessions();
        if self.process.take().is_some() {
            log::info!("Publisher {}: finished", self.id);
        }
    }

    fn release_sessions(&mut self) {
        if let Some(mut session) = self.audio_session.take() {
            session.stop();
        }

        if let Some(mut session) = self.video_session.take() {
            session.stop();
        }
    }

    fn create_session(
        &self,
        kind: MediaKind,
        codec: &str,
    ) -> Result<(Box<dyn MediaSession>, RtpTarget), PublisherError> {
        let capability = self
            .capabilities
            .get(kind.as_str())
            .ok_or(PublisherError::MissingCapability(kind))?;
        let info = MediaInfo::create(kind, capability);
        let codec_info = info
            .get_codec(codec)
            .ok_or_else(|| PublisherError::MissingCodec {
                kind,
                codec: codec.to_string(),
            })?;

        let session = self
            .factory
            .create(&info, codec_info)
            .map_err(|error| PublisherError::Session { kind, error })?;
        let target = RtpTarget::new(codec_info.payload_type(), session.local_port());
        Ok((session, target))
    }
}

#[cfg(test)]
#[path = "publisher_test.rs"]
mod publisher_test;
