//! Capture-side frame types and the frame-source boundary.

use ar_markers_core::{GrayImage, RgbImage};

/// One captured frame: the grayscale channel feeds detection, the RGB
/// channel is the display buffer the pipeline annotates in place.
#[derive(Clone, Debug)]
pub struct Frame {
    pub gray: GrayImage,
    pub rgb: RgbImage,
}

impl Frame {
    /// Pair a grayscale and an RGB buffer. `None` when dimensions differ.
    pub fn new(gray: GrayImage, rgb: RgbImage) -> Option<Self> {
        if gray.width != rgb.width || gray.height != rgb.height {
            return None;
        }
        Some(Self { gray, rgb })
    }

    /// Build a frame whose display buffer starts as the gray channel
    /// replicated to RGB.
    pub fn from_gray(gray: GrayImage) -> Self {
        let rgb = RgbImage::from_gray(&gray.view());
        Self { gray, rgb }
    }

    pub fn width(&self) -> usize {
        self.gray.width
    }

    pub fn height(&self) -> usize {
        self.gray.height
    }
}

/// Boundary trait toward whatever produces frames: a camera device, a video
/// file, or a test fixture. The pipeline only ever pulls; pacing and capture
/// threading stay on the source's side of the boundary.
pub trait FrameSource {
    /// Begin producing frames.
    fn start(&mut self);

    /// Stop producing frames; pending frames may still be returned.
    fn stop(&mut self);

    /// Fetch the next frame, or `None` when the source is stopped or
    /// exhausted.
    fn next_frame(&mut self) -> Option<Frame>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_buffers_are_rejected() {
        let gray = GrayImage::new(4, 4);
        let rgb = RgbImage::filled(5, 4, [0, 0, 0]);
        assert!(Frame::new(gray, rgb).is_none());
    }

    #[test]
    fn from_gray_matches_dimensions() {
        let frame = Frame::from_gray(GrayImage::new(6, 3));
        assert_eq!(frame.width(), 6);
        assert_eq!(frame.height(), 3);
        assert_eq!(frame.rgb.data.len(), 6 * 3 * 3);
    }
}
