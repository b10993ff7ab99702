//! Texture parameters to actuator timing.

use serde::Deserialize;
use serde_json::Value;

use crate::protocol::ControlLine;

/// Parameter used when the remote value is missing or not an integer.
pub const DEFAULT_LEVEL: u8 = 5;

/// chewiness 1..=10 -> (up, hold, down) ms
const CHEWINESS_TO_SEQ: [(u32, u32, u32); 10] = [
    (15, 30, 10),
    (30, 60, 20),
    (50, 100, 33),
    (60, 120, 40),
    (75, 150, 50),
    (88, 176, 59),
    (107, 214, 71),
    (120, 240, 80),
    (136, 273, 91),
    (150, 300, 100),
];

/// firmness 1..=10 -> (d5, d6) duty
const FIRMNESS_TO_DUTY: [(u32, u32); 10] = [
    (40, 42),
    (40, 44),
    (45, 46),
    (50, 48),
    (55, 50),
    (60, 52),
    (65, 54),
    (70, 56),
    (75, 58),
    (80, 60),
];

/// Per-user texture parameters as served by the remote `/param` endpoint.
///
/// Values are kept raw; the service has been seen sending strings and floats.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextureParams {
    #[serde(default)]
    pub chewiness: Value,
    #[serde(default)]
    pub firmness: Value,
}

impl TextureParams {
    pub fn control_line(&self) -> ControlLine {
        compose(clamp_level(&self.chewiness), clamp_level(&self.firmness))
    }
}

/// Coerce a JSON value to a level in 1..=10.
///
/// Numbers are truncated and clamped, integer strings are parsed, booleans
/// count as 1 or 0; anything else falls back to [`DEFAULT_LEVEL`].
pub fn clamp_level(value: &Value) -> u8 {
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    };
    match parsed {
        Some(v) => v.clamp(1, 10) as u8,
        None => DEFAULT_LEVEL,
    }
}

/// Build the control line for two levels; out-of-range input is clamped.
pub fn compose(chewiness: u8, firmness: u8) -> ControlLine {
    let (up, hold, down) = CHEWINESS_TO_SEQ[usize::from(chewiness.clamp(1, 10)) - 1];
    let (d5, d6) = FIRMNESS_TO_DUTY[usize::from(firmness.clamp(1, 10)) - 1];
    ControlLine { up, hold, down, d5, d6 }
}
