//! Line-oriented serial transport to the actuator board.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf,
};
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};

use crate::config::Config;
use crate::protocol::ControlLine;

#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    /// Wait after opening before the first write (board resets on open)
    pub settle: Duration,
    /// Longest accepted line in bytes
    pub line_buffer: usize,
}

impl From<&Config> for SerialConfig {
    fn from(config: &Config) -> Self {
        Self {
            port: config.serial_port.to_string(),
            baud_rate: config.serial_baud_rate,
            settle: Duration::from_millis(config.serial_settle_ms),
            line_buffer: config.serial_line_buffer,
        }
    }
}

/// Reads newline-terminated lines from the device.
pub struct EventReader<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    max_line: usize,
}

impl<R: AsyncRead + Unpin> EventReader<R> {
    /// Lines longer than `max_line` bytes are cut into `max_line` chunks.
    pub fn new(inner: R, max_line: usize) -> Self {
        let max_line = max_line.max(16);
        Self {
            reader: BufReader::with_capacity(max_line.max(64), inner),
            buf: Vec::with_capacity(max_line),
            max_line,
        }
    }

    /// Next line with the terminator and surrounding whitespace stripped.
    /// Invalid UTF-8 is replaced, never an error. `None` at end of stream.
    ///
    /// A run of `max_line` bytes without a newline is returned as a line of
    /// its own so noise on the wire cannot grow the buffer.
    ///
    /// Cancel safe: bytes of a partially read line stay buffered for the
    /// next call.
    pub async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let room = self.max_line.saturating_sub(self.buf.len()) as u64;
        let n = (&mut self.reader).take(room).read_until(b'\n', &mut self.buf).await?;
        if n == 0 && self.buf.is_empty() {
            return Ok(None);
        }
        if self.buf.len() >= self.max_line && self.buf.last() != Some(&b'\n') {
            log::warn!("No line terminator within {} bytes, splitting", self.max_line);
        }
        let line = String::from_utf8_lossy(&self.buf).trim().to_string();
        self.buf.clear();
        Ok(Some(line))
    }
}

/// Writes control lines to the device.
pub struct ControlWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> ControlWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn send(&mut self, line: &ControlLine) -> std::io::Result<()> {
        self.writer.write_all(line.to_wire().as_bytes()).await?;
        self.writer.flush().await?;
        log::info!("[send] {}", line);
        Ok(())
    }
}

pub type SerialReader = EventReader<ReadHalf<SerialStream>>;
pub type SerialWriter = ControlWriter<WriteHalf<SerialStream>>;

/// Open the serial port and split it into reader and writer halves.
pub async fn open(config: &SerialConfig) -> Result<(SerialReader, SerialWriter)> {
    log::info!("Opening serial port {} at {} baud", config.port, config.baud_rate);

    let mut port = tokio_serial::new(&config.port, config.baud_rate)
        .timeout(Duration::from_millis(100))
        .open_native_async()
        .with_context(|| format!("Failed to open serial port {}", config.port))?;

    // 拉低 DTR/RTS，尽量避免开发板在打开串口时自动复位
    if let Err(e) = port.write_data_terminal_ready(false) {
        log::warn!("Failed to clear DTR: {}", e);
    }
    if let Err(e) = port.write_request_to_send(false) {
        log::warn!("Failed to clear RTS: {}", e);
    }

    if !config.settle.is_zero() {
        log::debug!("Waiting {:?} for the board to settle", config.settle);
        tokio::time::sleep(config.settle).await;
    }

    let (read_half, write_half) = tokio::io::split(port);
    Ok((
        EventReader::new(read_half, config.line_buffer),
        ControlWriter::new(write_half),
    ))
}
