use std::fmt;

use crate::{Result, TrackerError};

/// Whether the tracker could resolve a gaze position for a sample.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Valid = 0,
    Invalid = 1,
}

impl Validity {
    pub fn as_str(self) -> &'static str {
        match self {
            Validity::Valid => "Valid",
            Validity::Invalid => "Invalid",
        }
    }

    pub fn is_valid(self) -> bool {
        self == Validity::Valid
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One gaze observation in display-area coordinates.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazePoint {
    /// Horizontal position, in the units of the configured display width.
    pub x: f32,
    /// Vertical position, in the units of the configured display height.
    pub y: f32,
    pub validity: Validity,
    /// Capture timestamp in microseconds.
    pub timestamp_us: i64,
}

/// A gaze sample as reported by the device, before the coordinate transform.
///
/// `x` and `y` are normalized to the display area: (0, 0) is the top-left
/// corner, (1, 1) the bottom-right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawGaze {
    pub x: f32,
    pub y: f32,
    pub validity: Validity,
    pub timestamp_us: i64,
}

/// Physical display area the tracker maps gaze onto.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayArea {
    pub width: f32,
    pub height: f32,
    /// Origin offset, applied to both axes.
    pub offset: f32,
}

impl DisplayArea {
    pub fn new(width: f32, height: f32, offset: f32) -> Result<DisplayArea> {
        if !(width.is_finite() && width > 0.0) {
            return Err(TrackerError::InvalidConfig(format!(
                "display width must be positive, got {}",
                width
            )));
        }
        if !(height.is_finite() && height > 0.0) {
            return Err(TrackerError::InvalidConfig(format!(
                "display height must be positive, got {}",
                height
            )));
        }
        if !offset.is_finite() {
            return Err(TrackerError::InvalidConfig(format!(
                "display offset must be finite, got {}",
                offset
            )));
        }
        Ok(DisplayArea {
            width,
            height,
            offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity_strings() {
        assert_eq!(Validity::Valid.to_string(), "Valid");
        assert_eq!(Validity::Invalid.as_str(), "Invalid");
        assert!(!Validity::Invalid.is_valid());
    }

    #[test]
    fn test_display_area_rejects_degenerate_sizes() {
        assert!(DisplayArea::new(2560.0, 1440.0, 0.0).is_ok());
        assert!(matches!(
            DisplayArea::new(0.0, 1440.0, 0.0),
            Err(TrackerError::InvalidConfig(_))
        ));
        assert!(DisplayArea::new(2560.0, f32::NAN, 0.0).is_err());
        assert!(DisplayArea::new(2560.0, 1440.0, f32::INFINITY).is_err());
    }
}
