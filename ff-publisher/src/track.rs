use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Instant,
};

use bytes::Bytes;
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};

use crate::capability::{CodecInfo, MediaKind};

/// One datagram as received on a session port. The payload is not parsed.
#[derive(Clone, Debug)]
pub struct RtpPacket {
    pub data: Bytes,
    pub received_at: Instant,
}

type RtpPacketSender = tokio::sync::broadcast::Sender<RtpPacket>;

/// Track produced by a media session.
///
/// Cloning is cheap, all clones share the same subscribers and counters.
#[derive(Clone, Debug)]
pub struct IncomingStreamTrack {
    inner: Arc<TrackInner>,
}

#[derive(Debug)]
struct TrackInner {
    id: String,
    kind: MediaKind,
    codec: String,
    payload_type: u8,
    clock_rate: u32,
    channels: Option<u8>,
    sender: RtpPacketSender,
    packets: AtomicU64,
    bytes: AtomicU64,
}

impl IncomingStreamTrack {
    pub fn new(kind: MediaKind, codec: &CodecInfo) -> Self {
        Self::with_capacity(kind, codec, 1024)
    }

    pub fn with_capacity(kind: MediaKind, codec: &CodecInfo, capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity);
        Self {
            inner: Arc::new(TrackInner {
                id: uuid::Uuid::new_v4().to_string(),
                kind,
                codec: codec.name().to_string(),
                payload_type: codec.payload_type(),
                clock_rate: codec.clock_rate(),
                channels: codec.channels(),
                sender,
                packets: AtomicU64::new(0),
                bytes: AtomicU64::new(0),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn kind(&self) -> MediaKind {
        self.inner.kind
    }

    pub fn codec(&self) -> &str {
        &self.inner.codec
    }

    pub fn payload_type(&self) -> u8 {
        self.inner.payload_type
    }

    pub fn clock_rate(&self) -> u32 {
        self.inner.clock_rate
    }

    /// Set for audio tracks only
    pub fn channels(&self) -> Option<u8> {
        self.inner.channels
    }

    pub fn packets_received(&self) -> u64 {
        self.inner.packets.load(Ordering::Relaxed)
    }

    pub fn bytes_received(&self) -> u64 {
        self.inner.bytes.load(Ordering::Relaxed)
    }

    /// Packets received from now on. Lagging subscribers skip what they missed.
    pub fn subscribe(&self) -> impl Stream<Item = RtpPacket> + Send + use<> {
        let track_id = self.inner.id.clone();
        BroadcastStream::new(self.inner.sender.subscribe()).filter_map(move |res| match res {
            Ok(packet) => Some(packet),
            Err(e) => {
                log::debug!("Track {}: subscriber lagged: {}", track_id, e);
                None
            }
        })
    }

    pub(crate) fn push(&self, data: Bytes) {
        self.inner.packets.fetch_add(1, Ordering::Relaxed);
        self.inner
            .bytes
            .fetch_add(data.len() as u64, Ordering::Relaxed);
        // no subscriber is not an error
        let _ = self.inner.sender.send(RtpPacket {
            data,
            received_at: Instant::now(),
        });
    }
}
