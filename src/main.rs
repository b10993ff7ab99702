use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;

use interval_player::audio::{create_sink, decode_wav, AudioConfig, OutputFormat};
use interval_player::config::Config;
use interval_player::controller::CoreController;
use interval_player::interval::DurationBounds;
use interval_player::protocol::ControlLine;
use interval_player::remote::{self, RemoteClient};
use interval_player::scheduler::PlaybackScheduler;
use interval_player::serial_link::{self, SerialConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    env_logger::init();

    // 加载配置
    let mut config = Config::new().map_err(anyhow::Error::msg)?;

    // 命令行第一个参数覆盖 user_id
    if let Some(user_id) = std::env::args().nth(1) {
        config.user_id = user_id;
    }

    log::info!("{} {} starting", env!("APP_NAME"), env!("APP_VERSION"));

    // 有 user_id 时先拉取音频和参数，失败只告警，沿用本地文件
    let control_line = match config.user_id() {
        Some(user_id) => fetch_user_assets(&config, user_id).await,
        None => None,
    };

    // 加载音频，格式不对直接拒绝启动
    let bytes = std::fs::read(config.audio_file)
        .with_context(|| format!("Failed to read audio file {}", config.audio_file))?;
    let buffer = decode_wav(&bytes).with_context(|| format!("Unusable audio file {}", config.audio_file))?;
    log::info!(
        "Loaded {}: {} frames, {} ch, {} Hz",
        config.audio_file,
        buffer.total_frames(),
        buffer.channels(),
        buffer.sample_rate()
    );

    let format = OutputFormat {
        sample_rate: buffer.sample_rate(),
        channels: buffer.channels(),
    };
    let sink = create_sink(&AudioConfig::from(&config), format)?;

    // 打开串口
    let (mut reader, mut writer) = serial_link::open(&SerialConfig::from(&config)).await?;
    if let Some(line) = control_line {
        if let Err(e) = writer.send(&line).await {
            log::warn!("Failed to send control line: {}", e);
        }
    }

    let bounds = DurationBounds::new(config.playback_min_sec, config.playback_max_sec);
    let scheduler = Arc::new(PlaybackScheduler::new(buffer, bounds));
    let mut controller = CoreController::new(scheduler, sink)?;

    log::info!("Listening on {}. Ctrl+C to quit.", config.serial_port);

    // 主事件循环
    let result = controller
        .run(&mut reader, async {
            if let Err(e) = signal::ctrl_c().await {
                log::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    controller.shutdown();
    log::info!("Stopped");
    result
}

/// Download the user's audio over the configured file and build the control
/// line from their parameters. Each half fails independently.
async fn fetch_user_assets(config: &Config, user_id: &str) -> Option<ControlLine> {
    let remote = match RemoteClient::from_config(config) {
        Ok(remote) => remote,
        Err(e) => {
            log::warn!("Remote disabled: {:#}", e);
            return None;
        }
    };

    match remote.fetch_audio(user_id).await {
        Ok(bytes) => match remote::save_atomically(Path::new(config.audio_file), &bytes).await {
            Ok(()) => log::info!("Audio downloaded -> {}", config.audio_file),
            Err(e) => log::warn!("Failed to save audio: {:#}", e),
        },
        Err(e) => log::warn!("Audio download failed: {:#}", e),
    }

    match remote.fetch_params(user_id).await {
        Ok(params) => {
            let line = params.control_line();
            log::info!("Control line for {}: {}", user_id, line);
            Some(line)
        }
        Err(e) => {
            log::warn!("Parameter fetch failed: {:#}", e);
            None
        }
    }
}
