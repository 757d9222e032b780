//! Supervises an external transcoder (ffmpeg) that pulls a remote stream and
//! republishes it as two RTP flows into locally bound receive sessions.

pub mod capability;
pub mod command;
pub mod completion;
pub mod error;
pub mod process;
pub mod publisher;
pub mod session;
pub mod track;

pub use capability::{Capability, CapabilitySet, CodecCapability, MediaKind};
pub use completion::{Completion, CompletionReceiver};
pub use error::{PublisherError, TranscoderError};
pub use process::TranscoderSettings;
pub use publisher::Publisher;
pub use track::{IncomingStreamTrack, RtpPacket};
