use axum::{
    Json, Router,
    extract::Path,
    routing::{get, post},
};
use ff_publisher::{Capability, CapabilitySet, CodecCapability, IncomingStreamTrack};
use serde::{Deserialize, Serialize};

use crate::{config, handler::ApiJsonResult, manager};

const DEFAULT_VIDEO_PAYLOAD_TYPE: u8 = 96;
const DEFAULT_AUDIO_PAYLOAD_TYPE: u8 = 111;

pub fn publisher_router() -> Router {
    Router::new()
        .route("/", get(index))
        .route("/list", get(list_publishers))
        .route("/add", post(add_publisher))
        .route("/remove/{id}", get(remove_publisher))
        .route("/status/{id}", get(get_publisher_status))
}

#[derive(Serialize, Deserialize)]
struct PublisherRequest {
    id: String,
    url: String,
    video: Option<CodecRequest>,
    audio: Option<CodecRequest>,
}

#[derive(Serialize, Deserialize)]
struct CodecRequest {
    payload_type: u8,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct TrackStatus {
    id: String,
    codec: String,
    payload_type: u8,
    clock_rate: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    channels: Option<u8>,
    packets: u64,
    bytes: u64,
}

impl From<IncomingStreamTrack> for TrackStatus {
    fn from(track: IncomingStreamTrack) -> Self {
        Self {
            id: track.id().to_string(),
            codec: track.codec().to_string(),
            payload_type: track.payload_type(),
            clock_rate: track.clock_rate(),
            channels: track.channels(),
            packets: track.packets_received(),
            bytes: track.bytes_received(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct PublisherStatus {
    id: String,
    url: String,
    running: bool,
    pid: Option<u32>,
    args: Vec<String>,
    video: Option<TrackStatus>,
    audio: Option<TrackStatus>,
}

impl PublisherRequest {
    fn capabilities(&self) -> CapabilitySet {
        let video_pt = self
            .video
            .as_ref()
            .map_or(DEFAULT_VIDEO_PAYLOAD_TYPE, |c| c.payload_type);
        let audio_pt = self
            .audio
            .as_ref()
            .map_or(DEFAULT_AUDIO_PAYLOAD_TYPE, |c| c.payload_type);

        let mut caps = CapabilitySet::new();
        caps.insert(
            "video".to_string(),
            Capability::new().with_codec(CodecCapability::h264(video_pt)),
        );
        caps.insert(
            "audio".to_string(),
            Capability::new().with_codec(CodecCapability::opus(audio_pt)),
        );
        caps
    }
}

async fn index() -> &'static str {
    "publisher route!"
}

async fn list_publishers() -> Json<Vec<String>> {
    let publishers = manager::get_publisher_manager().read().await;
    Json(publishers.keys().cloned().collect())
}

async fn add_publisher(Json(request): Json<PublisherRequest>) -> ApiJsonResult<String> {
    if request.url.is_empty() {
        return Err(anyhow::anyhow!("url is required").into());
    }
    let capabilities = request.capabilities();
    manager::add_publisher(
        &request.id,
        &request.url,
        capabilities,
        config::config().transcoder(),
    )
    .await?;
    Ok(Json("success".to_string()))
}

async fn remove_publisher(Path(id): Path<String>) -> ApiJsonResult<String> {
    manager::remove_publisher(&id).await?;
    Ok(Json("success".to_string()))
}

async fn get_publisher_status(Path(id): Path<String>) -> ApiJsonResult<Option<PublisherStatus>> {
    let Some(publisher) = manager::get_publisher(&id).await else {
        return Ok(Json(None));
    };
    let publisher = publisher.lock().await;
    Ok(Json(Some(PublisherStatus {
        id: publisher.id().to_string(),
        url: publisher.stream_url().to_string(),
        running: publisher.is_running(),
        pid: publisher.pid(),
        args: publisher.command_line().map(<[String]>::to_vec).unwrap_or_default(),
        video: publisher.video_track().map(TrackStatus::from),
        audio: publisher.audio_track().map(TrackStatus::from),
    })))
}
