use crate::types::GazePoint;
use crate::Result;

/// The tracker runtime a session drives.
///
/// Mirrors the interaction-library calls a session needs: display-area and
/// origin-offset configuration, and a pump that delivers pending gaze points.
/// `wait_and_update` must only call `sink` before it returns.
///
/// Opening the runtime in its interactive field-of-use mode is the backend's
/// job, done before the backend is handed to a session. Sessions never
/// select or change the mode.
pub trait GazeBackend {
    fn add_or_update_display_area(&mut self, width: f32, height: f32) -> Result<()>;

    fn set_origin_offset(&mut self, x: f32, y: f32) -> Result<()>;

    /// Wait for pending data and hand every available gaze point to `sink`.
    fn wait_and_update(&mut self, sink: &mut dyn FnMut(GazePoint)) -> Result<()>;
}

impl<B: GazeBackend + ?Sized> GazeBackend for Box<B> {
    fn add_or_update_display_area(&mut self, width: f32, height: f32) -> Result<()> {
        (**self).add_or_update_display_area(width, height)
    }

    fn set_origin_offset(&mut self, x: f32, y: f32) -> Result<()> {
        (**self).set_origin_offset(x, y)
    }

    fn wait_and_update(&mut self, sink: &mut dyn FnMut(GazePoint)) -> Result<()> {
        (**self).wait_and_update(sink)
    }
}
