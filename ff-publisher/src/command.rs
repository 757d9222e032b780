//! Transcoder argument construction.
//!
//! Produces the ffmpeg argument vector that pulls `input` and republishes
//! video (copied, reframed to Annex B) and audio (re-encoded to opus) as two
//! RTP flows on the loopback interface:
//!
//! ```text
//! -fflags nobuffer -i <input>
//!   -vcodec copy -an -bsf:v h264_mp4toannexb -f rtp -payload_type <vpt> rtp://127.0.0.1:<vport>
//!   -acodec libopus -vn -ar 48000 -ac 2 -f rtp -payload_type <apt> rtp://127.0.0.1:<aport>
//! ```

pub const RTP_HOST: &str = "127.0.0.1";
pub const VIDEO_BITSTREAM_FILTER: &str = "h264_mp4toannexb";
pub const AUDIO_ENCODER: &str = "libopus";
pub const AUDIO_SAMPLE_RATE: u32 = 48_000;
pub const AUDIO_CHANNELS: u8 = 2;

/// Where one media kind is sent: a payload type and a local port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RtpTarget {
    pub payload_type: u8,
    pub port: u16,
}

impl RtpTarget {
    pub fn new(payload_type: u8, port: u16) -> Self {
        Self { payload_type, port }
    }

    pub fn url(&self) -> String {
        format!("rtp://{}:{}", RTP_HOST, self.port)
    }
}

#[derive(Clone, Debug)]
pub struct TranscoderCommandBuilder {
    input: String,
    video: Option<RtpTarget>,
    audio: Option<RtpTarget>,
}

impl TranscoderCommandBuilder {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            video: None,
            audio: None,
        }
    }

    pub fn with_video(mut self, target: RtpTarget) -> Self {
        self.video = Some(target);
        self
    }

    pub fn with_audio(mut self, target: RtpTarget) -> Self {
        self.audio = Some(target);
        self
    }

    pub fn build(&self) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-fflags".to_string(),
            "nobuffer".to_string(),
            "-i".to_string(),
            self.input.clone(),
        ];

        if let Some(video) = &self.video {
            args.extend([
                "-vcodec".to_string(),
                "copy".to_string(),
                "-an".to_string(),
                "-bsf:v".to_string(),
                VIDEO_BITSTREAM_FILTER.to_string(),
            ]);
            push_rtp_output(&mut args, video);
        }

        if let Some(audio) = &self.audio {
            args.extend([
                "-acodec".to_string(),
                AUDIO_ENCODER.to_string(),
                "-vn".to_string(),
                "-ar".to_string(),
                AUDIO_SAMPLE_RATE.to_string(),
                "-ac".to_string(),
                AUDIO_CHANNELS.to_string(),
            ]);
            push_rtp_output(&mut args, audio);
        }

        args
    }
}

fn push_rtp_output(args: &mut Vec<String>, target: &RtpTarget) {
    args.extend([
        "-f".to_string(),
        "rtp".to_string(),
        "-payload_type".to_string(),
        target.payload_type.to_string(),
        target.url(),
    ]);
}
