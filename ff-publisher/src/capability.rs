use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// Media kind of a capability entry or a receive session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    /// Key used in a [`CapabilitySet`]
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One negotiated codec as handed over by the signaling layer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodecCapability {
    // "h264", "opus", ...
    pub codec: String,
    pub payload_type: u8,
    // Hz
    pub clock_rate: u32,
    // audio only
    pub channels: Option<u8>,
}

impl CodecCapability {
    pub fn new(codec: impl Into<String>, payload_type: u8, clock_rate: u32) -> Self {
        Self {
            codec: codec.into(),
            payload_type,
            clock_rate,
            channels: None,
        }
    }

    pub fn with_channels(mut self, channels: u8) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn h264(payload_type: u8) -> Self {
        Self::new("h264", payload_type, 90_000)
    }

    pub fn opus(payload_type: u8) -> Self {
        Self::new("opus", payload_type, 48_000).with_channels(2)
    }
}

/// Capability descriptor for one media kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Capability {
    pub codecs: Vec<CodecCapability>,
}

impl Capability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_codec(mut self, codec: CodecCapability) -> Self {
        self.codecs.push(codec);
        self
    }
}

/// Capabilities keyed by media kind ("video", "audio").
pub type CapabilitySet = HashMap<String, Capability>;

/// Resolved codec of a [`MediaInfo`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodecInfo {
    name: String,
    payload_type: u8,
    clock_rate: u32,
    channels: Option<u8>,
}

impl CodecInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload_type(&self) -> u8 {
        self.payload_type
    }

    pub fn clock_rate(&self) -> u32 {
        self.clock_rate
    }

    pub fn channels(&self) -> Option<u8> {
        self.channels
    }
}

/// Media description for one kind, created from its capability descriptor.
///
/// Codec names are stored lowercase, so lookups through [`MediaInfo::get_codec`]
/// accept "H264" as well as "h264".
#[derive(Clone, Debug)]
pub struct MediaInfo {
    kind: MediaKind,
    codecs: Vec<CodecInfo>,
}

impl MediaInfo {
    pub fn create(kind: MediaKind, capability: &Capability) -> Self {
        let codecs = capability
            .codecs
            .iter()
            .map(|c| CodecInfo {
                name: c.codec.to_ascii_lowercase(),
                payload_type: c.payload_type,
                clock_rate: c.clock_rate,
                channels: c.channels,
            })
            .collect();
        Self { kind, codecs }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn codecs(&self) -> &[CodecInfo] {
        &self.codecs
    }

    /// First codec negotiated under `name`
    pub fn get_codec(&self, name: &str) -> Option<&CodecInfo> {
        self.codecs
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_codec_case_insensitive() {
        let capability = Capability::new()
            .with_codec(CodecCapability::new("VP8", 100, 90_000))
            .with_codec(CodecCapability::new("H264", 96, 90_000));
        let info = MediaInfo::create(MediaKind::Video, &capability);

        assert_eq!(info.kind(), MediaKind::Video);
        let codec = info.get_codec("h264").unwrap();
        assert_eq!(codec.name(), "h264");
        assert_eq!(codec.payload_type(), 96);
        assert_eq!(codec.clock_rate(), 90_000);
        assert!(info.get_codec("av1").is_none());
    }

    #[test]
    fn test_opus_defaults() {
        let capability = Capability::new().with_codec(CodecCapability::opus(111));
        let info = MediaInfo::create(MediaKind::Audio, &capability);

        let codec = info.get_codec("opus").unwrap();
        assert_eq!(codec.payload_type(), 111);
        assert_eq!(codec.clock_rate(), 48_000);
        assert_eq!(codec.channels(), Some(2));
        assert_eq!(info.codecs().len(), 1);
    }

    #[test]
    fn test_media_kind_keys() {
        assert_eq!(MediaKind::Video.as_str(), "video");
        assert_eq!(MediaKind::Audio.to_string(), "audio");
    }
}
