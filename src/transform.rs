use crate::types::{GazePoint, RawGaze};

/// Maps normalized device gaze onto the configured display area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateTransform {
    pub width: f32,
    pub height: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Default for CoordinateTransform {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl CoordinateTransform {
    /// Invalid samples keep their raw coordinates.
    pub fn apply(&self, raw: RawGaze) -> GazePoint {
        let (x, y) = if raw.validity.is_valid() {
            (
                raw.x * self.width - self.offset_x,
                raw.y * self.height - self.offset_y,
            )
        } else {
            (raw.x, raw.y)
        };
        GazePoint {
            x,
            y,
            validity: raw.validity,
            timestamp_us: raw.timestamp_us,
        }
    }
}
