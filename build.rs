use std::fs;
use std::path::Path;
use serde::Deserialize;

#[derive(Deserialize)]
struct Config {
    application: Application,
    serial: Serial,
    audio: Audio,
    playback: Playback,
    remote: Remote,
}

#[derive(Deserialize)]
struct Application {
    name: String,
    version: String,
}

#[derive(Deserialize)]
struct Serial {
    port: String,
    baud_rate: u32,
    settle_ms: u64,
    line_buffer: usize,
}

#[derive(Deserialize)]
struct Audio {
    file: String,
    sink: String,
    playback_device: String,
    period_size: usize,
}

#[derive(Deserialize)]
struct Playback {
    min_sec: f64,
    max_sec: f64,
}

#[derive(Deserialize)]
struct Remote {
    endpoint: String,
    user_id: String,
    timeout_sec: u64,
}

// 在编译时读取 config.toml 并设置环境变量
fn main() {
    println!("cargo:rerun-if-changed=config.toml");

    let config_path = Path::new("config.toml");
    if !config_path.exists() {
        panic!("config.toml not found!");
    }

    let config_str = fs::read_to_string(config_path).expect("Failed to read config.toml");
    let config: Config = toml::from_str(&config_str).expect("Failed to parse config.toml");

    println!("cargo:rustc-env=APP_NAME={}", config.application.name);
    println!("cargo:rustc-env=APP_VERSION={}", config.application.version);

    // 串口配置
    println!("cargo:rustc-env=SERIAL_PORT={}", config.serial.port);
    println!("cargo:rustc-env=SERIAL_BAUD_RATE={}", config.serial.baud_rate);
    println!("cargo:rustc-env=SERIAL_SETTLE_MS={}", config.serial.settle_ms);
    println!("cargo:rustc-env=SERIAL_LINE_BUFFER={}", config.serial.line_buffer);

    // 音频配置
    println!("cargo:rustc-env=AUDIO_FILE={}", config.audio.file);
    println!("cargo:rustc-env=AUDIO_SINK={}", config.audio.sink);
    println!("cargo:rustc-env=AUDIO_PLAYBACK_DEVICE={}", config.audio.playback_device);
    println!("cargo:rustc-env=AUDIO_PERIOD_SIZE={}", config.audio.period_size);

    // 播放时长上下限
    println!("cargo:rustc-env=PLAYBACK_MIN_SEC={}", config.playback.min_sec);
    println!("cargo:rustc-env=PLAYBACK_MAX_SEC={}", config.playback.max_sec);

    // 远端接口
    println!("cargo:rustc-env=REMOTE_ENDPOINT={}", config.remote.endpoint);
    println!("cargo:rustc-env=REMOTE_USER_ID={}", config.remote.user_id);
    println!("cargo:rustc-env=REMOTE_TIMEOUT_SEC={}", config.remote.timeout_sec);
}
