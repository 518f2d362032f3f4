//! Response-line parsing for the meter reader protocol.

use crate::{InstrumentError, InstrumentResult};
use hdrcal_math::Vec3;
use regex::Regex;
use std::sync::OnceLock;

/// Marker the reader prints once it is ready to take readings.
pub const READY_MARKER: &str = "key to take a reading:";

/// Marker of a completed reading's result line.
pub const RESULT_MARKER: &str = "Result is XYZ:";

/// Marker the reader prints when it wants a white-reference
/// calibration before the next reading.
pub const NEEDS_CALIBRATION_MARKER: &str = "needs a calibration";

fn result_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"XYZ: (.+), Yxy: (.+)").expect("static regex"))
}

/// Parses a `Result is XYZ: X Y Z, Yxy: ...` line into absolute XYZ.
///
/// # Example
///
/// ```rust
/// use hdrcal_instrument::proto::parse_result_line;
///
/// let xyz = parse_result_line(
///     " Result is XYZ: 152.291761 160.109201 173.322211, Yxy: 160.109201 0.3136 0.3297",
/// )
/// .unwrap();
/// assert!((xyz.y - 160.109201).abs() < 1e-9);
/// ```
pub fn parse_result_line(line: &str) -> InstrumentResult<Vec3> {
    let caps = result_regex()
        .captures(line)
        .ok_or_else(|| InstrumentError::MalformedResponse(line.to_string()))?;
    let mut parts = caps[1].split_whitespace();
    let mut take = || -> InstrumentResult<f64> {
        parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(|| InstrumentError::MalformedResponse(line.to_string()))
    };
    Ok(Vec3::new(take()?, take()?, take()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_result_line() {
        let xyz = parse_result_line(
            "Result is XYZ: 12.5 13.25 14.0, Yxy: 13.25 0.3140 0.3330",
        )
        .unwrap();
        assert_eq!(xyz, Vec3::new(12.5, 13.25, 14.0));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_result_line("Spot read failed").is_err());
        assert!(parse_result_line("Result is XYZ: 1.0 nope 3.0, Yxy: x").is_err());
    }
}
