//! Conversions between workspace buffers and `image` crate buffers.
//!
//! File-based workflows (annotating a photo, saving an overlay for
//! inspection) go through these helpers; the live pipeline never touches
//! the `image` crate.

use ar_markers_core::{GrayImage, RgbImage};

use crate::source::Frame;

/// Copy an `image` grayscale buffer into the workspace representation.
pub fn gray_from_image(img: &image::GrayImage) -> GrayImage {
    GrayImage {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw().clone(),
    }
}

/// Build a processable frame from any decoded image: the luma channel feeds
/// detection, the RGB copy becomes the annotation target.
pub fn frame_from_image(img: &image::DynamicImage) -> Frame {
    let luma = img.to_luma8();
    let rgb = img.to_rgb8();
    Frame {
        gray: GrayImage {
            width: luma.width() as usize,
            height: luma.height() as usize,
            data: luma.into_raw(),
        },
        rgb: RgbImage {
            width: rgb.width() as usize,
            height: rgb.height() as usize,
            data: rgb.into_raw(),
        },
    }
}

/// Export an annotated display buffer for saving with the `image` crate.
///
/// `None` when the buffer dimensions do not fit `u32`.
pub fn rgb_to_image(rgb: &RgbImage) -> Option<image::RgbImage> {
    let width = u32::try_from(rgb.width).ok()?;
    let height = u32::try_from(rgb.height).ok()?;
    image::RgbImage::from_raw(width, height, rgb.data.clone())
}
