#[derive(Debug, Clone)]
pub struct Config {
    // 串口配置
    pub serial_port: &'static str,
    pub serial_baud_rate: u32,
    pub serial_settle_ms: u64,
    pub serial_line_buffer: usize,

    // 音频配置
    pub audio_file: &'static str,
    pub audio_sink: &'static str,
    pub audio_playback_device: &'static str,
    pub audio_period_size: usize,

    // 播放时长上下限（秒）
    pub playback_min_sec: f64,
    pub playback_max_sec: f64,

    // 远端接口（静态部分）
    pub remote_endpoint: &'static str,
    pub remote_timeout_sec: u64,

    // 用户标识（动态部分，可被命令行参数覆盖）
    pub user_id: String,
}

impl Config {
    /// 从编译时设置的环境变量创建配置
    /// 所有参数都在编译时从 config.toml 中读取
    pub fn new() -> Result<Self, &'static str> {
        let config = Self {
            serial_port: env!("SERIAL_PORT"),
            serial_baud_rate: env!("SERIAL_BAUD_RATE").parse()
                .map_err(|_| "Failed to parse SERIAL_BAUD_RATE")?,
            serial_settle_ms: env!("SERIAL_SETTLE_MS").parse()
                .map_err(|_| "Failed to parse SERIAL_SETTLE_MS")?,
            serial_line_buffer: env!("SERIAL_LINE_BUFFER").parse()
                .map_err(|_| "Failed to parse SERIAL_LINE_BUFFER")?,

            audio_file: env!("AUDIO_FILE"),
            audio_sink: env!("AUDIO_SINK"),
            audio_playback_device: env!("AUDIO_PLAYBACK_DEVICE"),
            audio_period_size: env!("AUDIO_PERIOD_SIZE").parse()
                .map_err(|_| "Failed to parse AUDIO_PERIOD_SIZE")?,

            playback_min_sec: env!("PLAYBACK_MIN_SEC").parse()
                .map_err(|_| "Failed to parse PLAYBACK_MIN_SEC")?,
            playback_max_sec: env!("PLAYBACK_MAX_SEC").parse()
                .map_err(|_| "Failed to parse PLAYBACK_MAX_SEC")?,

            remote_endpoint: env!("REMOTE_ENDPOINT"),
            remote_timeout_sec: env!("REMOTE_TIMEOUT_SEC").parse()
                .map_err(|_| "Failed to parse REMOTE_TIMEOUT_SEC")?,

            user_id: env!("REMOTE_USER_ID").to_string(),
        };

        if !(config.playback_min_sec > 0.0 && config.playback_min_sec <= config.playback_max_sec) {
            return Err("PLAYBACK_MIN_SEC must be positive and not above PLAYBACK_MAX_SEC");
        }

        Ok(config)
    }

    /// User id to fetch audio and parameters for, if any.
    pub fn user_id(&self) -> Option<&str> {
        let id = self.user_id.trim();
        if id.is_empty() { None } else { Some(id) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_time_config_parses() {
        let config = Config::new().unwrap();
        assert!(config.serial_baud_rate > 0);
        assert!(config.playback_min_sec <= config.playback_max_sec);
    }

    #[test]
    fn blank_user_id_means_local_file() {
        let mut config = Config::new().unwrap();
        config.user_id = "  ".to_string();
        assert_eq!(config.user_id(), None);
        config.user_id = "u42".to_string();
        assert_eq!(config.user_id(), Some("u42"));
    }
}
