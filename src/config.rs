use std::sync::LazyLock;

use ff_publisher::TranscoderSettings;

const DEFAULT_API_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_FFMPEG: &str = "ffmpeg";
const DEFAULT_FFMPEG_ARGS: &str = "-hide_banner";

pub struct RouterConfig {
    api_addr: String,
    ffmpeg_path: String,
    ffmpeg_args: Vec<String>,
}

impl RouterConfig {
    pub fn new(api_addr: &str, ffmpeg_path: &str, ffmpeg_args: &str) -> Self {
        Self {
            api_addr: api_addr.to_string(),
            ffmpeg_path: ffmpeg_path.to_string(),
            ffmpeg_args: ffmpeg_args.split_whitespace().map(String::from).collect(),
        }
    }

    /// Reads `ROUTER_API_ADDR`, `ROUTER_FFMPEG` and `ROUTER_FFMPEG_ARGS`.
    pub fn from_env() -> Self {
        let var = |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.to_string());
        Self::new(
            &var("ROUTER_API_ADDR", DEFAULT_API_ADDR),
            &var("ROUTER_FFMPEG", DEFAULT_FFMPEG),
            &var("ROUTER_FFMPEG_ARGS", DEFAULT_FFMPEG_ARGS),
        )
    }

    pub fn api_addr(&self) -> &str {
        &self.api_addr
    }

    pub fn transcoder(&self) -> TranscoderSettings {
        TranscoderSettings::new(self.ffmpeg_path.as_str()).with_pre_args(self.ffmpeg_args.iter().cloned())
    }
}

pub fn config() -> &'static RouterConfig {
    static CONFIG: LazyLock<RouterConfig> = LazyLock::new(|| RouterConfig::from_env());
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcoder_settings() {
        let config = RouterConfig::new("127.0.0.1:9000", "/usr/bin/ffmpeg", "-hide_banner  -loglevel warning");
        let transcoder = config.transcoder();

        assert_eq!(config.api_addr(), "127.0.0.1:9000");
        assert_eq!(transcoder.program, "/usr/bin/ffmpeg");
        assert_eq!(transcoder.pre_args, vec!["-hide_banner", "-loglevel", "warning"]);
    }

    #[test]
    fn test_empty_pre_args() {
        let config = RouterConfig::new(DEFAULT_API_ADDR, DEFAULT_FFMPEG, "");
        assert!(config.transcoder().pre_args.is_empty());
    }
}
