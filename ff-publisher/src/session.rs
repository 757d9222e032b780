use std::net::{IpAddr, Ipv4Addr};

use anyhow::Context as _;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::{
    capability::{CodecInfo, MediaInfo, MediaKind},
    track::IncomingStreamTrack,
};

const MAX_DATAGRAM_SIZE: usize = 65_536;

/// Receive endpoint for one media kind.
pub trait MediaSession: Send + Sync {
    fn kind(&self) -> MediaKind;

    /// Local port the session is bound to. Fixed for the session lifetime.
    fn local_port(&self) -> u16;

    fn track(&self) -> Option<IncomingStreamTrack>;

    fn stop(&mut self);

    fn is_stopped(&self) -> bool;
}

/// Creates media sessions from negotiated media info.
pub trait SessionFactory: Send + Sync {
    fn create(&self, info: &MediaInfo, codec: &CodecInfo) -> anyhow::Result<Box<dyn MediaSession>>;
}

/// Binds loopback UDP sessions on OS-assigned ports.
#[derive(Clone, Debug)]
pub struct UdpSessionFactory {
    host: IpAddr,
}

impl UdpSessionFactory {
    pub fn new(host: IpAddr) -> Self {
        Self { host }
    }
}

impl Default for UdpSessionFactory {
    fn default() -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }
}

impl SessionFactory for UdpSessionFactory {
    fn create(&self, info: &MediaInfo, codec: &CodecInfo) -> anyhow::Result<Box<dyn MediaSession>> {
        let session = UdpStreamerSession::bind(self.host, info, codec)?;
        Ok(Box::new(session))
    }
}

/// UDP receive session forwarding every datagram into its track.
///
/// Must be created inside a tokio runtime, the receive loop runs as a task
/// until [`MediaSession::stop`] or drop.
pub struct UdpStreamerSession {
    kind: MediaKind,
    local_port: u16,
    track: IncomingStreamTrack,
    cancel: CancellationToken,
}

impl UdpStreamerSession {
    pub fn bind(host: IpAddr, info: &MediaInfo, codec: &CodecInfo) -> anyhow::Result<Self> {
        let kind = info.kind();
        let socket = std::net::UdpSocket::bind((host, 0))
            .with_context(|| format!("bind {} session on {}", kind, host))?;
        socket.set_nonblocking(true)?;
        let local_port = socket.local_addr()?.port();
        let socket = tokio::net::UdpSocket::from_std(socket)
            .context("register session socket with tokio runtime")?;

        let track = IncomingStreamTrack::new(kind, codec);
        let cancel = CancellationToken::new();

        let cancel_clone = cancel.clone();
        let track_clone = track.clone();
        tokio::spawn(async move {
            receive_loop(socket, track_clone, cancel_clone).await;
        });

        log::info!(
            "Session: {} bound on {}:{} (codec {}, pt {})",
            kind,
            host,
            local_port,
            codec.name(),
            codec.payload_type()
        );

        Ok(Self {
            kind,
            local_port,
            track,
            cancel,
        })
    }
}

impl MediaSession for UdpStreamerSession {
    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn local_port(&self) -> u16 {
        self.local_port
    }

    fn track(&self) -> Option<IncomingStreamTrack> {
        Some(self.track.clone())
    }

    fn stop(&mut self) {
        if !self.cancel.is_cancelled() {
            log::info!("Session: {} on port {} stopped", self.kind, self.local_port);
        }
        self.cancel.cancel();
    }

    fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for UdpStreamerSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn receive_loop(
    socket: tokio::net::UdpSocket,
    track: IncomingStreamTrack,
    cancel: CancellationToken,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                break;
            }
            res = socket.recv_from(&mut buf) => {
                match res {
                    Ok((len, _)) => track.push(Bytes::copy_from_slice(&buf[..len])),
                    Err(e) => {
                        log::warn!("Session: {} receive failed: {}", track.kind(), e);
                        break;
                    }
                }
            }
        }
    }
    log::debug!("Session: {} receive loop finished", track.kind());
}
