//! Marshaling of buffered samples into generic key/value records.
//!
//! Each record carries exactly `x`, `y`, `validity` (`"Valid"`/`"Invalid"`)
//! and `timestamp_us`, the shape scripting callers consume.

use serde::Serialize;

use crate::types::GazePoint;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GazeRecord {
    pub x: f32,
    pub y: f32,
    pub validity: &'static str,
    pub timestamp_us: i64,
}

impl From<&GazePoint> for GazeRecord {
    fn from(point: &GazePoint) -> Self {
        GazeRecord {
            x: point.x,
            y: point.y,
            validity: point.validity.as_str(),
            timestamp_us: point.timestamp_us,
        }
    }
}

/// Serialize records as a JSON array of objects.
pub fn records_to_json(records: &[GazeRecord]) -> Result<String> {
    Ok(serde_json::to_string(records)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Validity;

    #[test]
    fn test_json_shape() {
        let records: Vec<GazeRecord> = [
            GazePoint {
                x: 1280.5,
                y: 720.0,
                validity: Validity::Valid,
                timestamp_us: 1_596_313_963,
            },
            GazePoint {
                x: 0.0,
                y: 0.0,
                validity: Validity::Invalid,
                timestamp_us: 1_596_330_629,
            },
        ]
        .iter()
        .map(GazeRecord::from)
        .collect();

        let json = records_to_json(&records).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 2);

        let first = rows[0].as_object().unwrap();
        assert_eq!(first.len(), 4);
        assert_eq!(first["x"], 1280.5);
        assert_eq!(first["validity"], "Valid");
        assert_eq!(first["timestamp_us"], 1_596_313_963i64);
        assert_eq!(rows[1]["validity"], "Invalid");
    }

    #[test]
    fn test_empty_buffer_is_empty_array() {
        assert_eq!(records_to_json(&[]).unwrap(), "[]");
    }
}
