use std::fmt;
use std::time::Instant;

/// One classified inbound line.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Start of an actuation interval, stamped at classification time.
    Open(Instant),
    /// End of an actuation interval.
    Close(Instant),
    /// Anything else the device prints (boot banners, debug logs...).
    Other(String),
}

impl Event {
    /// Classify a raw line. Tokens are matched exactly after trimming and
    /// lower-casing; `now` becomes the timestamp of `Open`/`Close`.
    pub fn classify(line: &str, now: Instant) -> Self {
        let trimmed = line.trim();
        match trimmed.to_lowercase().as_str() {
            "open" => Event::Open(now),
            "close" => Event::Close(now),
            _ => Event::Other(trimmed.to_string()),
        }
    }
}

/// Outbound actuator command: `<up>,<hold>,<down>,<d5>,<d6>\n`.
///
/// The first three fields are milliseconds, the last two percentage duty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlLine {
    pub up: u32,
    pub hold: u32,
    pub down: u32,
    pub d5: u32,
    pub d6: u32,
}

impl ControlLine {
    /// Exactly one newline-terminated line, no prefix tokens.
    pub fn to_wire(&self) -> String {
        format!("{}\n", self)
    }
}

impl fmt::Display for ControlLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{},{}", self.up, self.hold, self.down, self.d5, self.d6)
    }
}
