use serde::{Deserialize, Serialize};

/// Borrowed single-channel intensity image, row-major, `len = width * height`.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8],
}

/// Owned single-channel intensity image.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    /// Allocate a zeroed image.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width * height],
        }
    }

    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }
}

/// Owned interleaved RGB image, row-major, `len = width * height * 3`.
///
/// This is the display frame the pipeline annotates with overlays; nothing
/// in the detection path reads from it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl RgbImage {
    /// Allocate an image filled with a single color.
    pub fn filled(width: usize, height: usize, color: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity(width * height * 3);
        for _ in 0..width * height {
            data.extend_from_slice(&color);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Expand a grayscale image into three identical channels.
    pub fn from_gray(gray: &GrayImageView<'_>) -> Self {
        let mut data = Vec::with_capacity(gray.width * gray.height * 3);
        for &v in gray.data {
            data.extend_from_slice(&[v, v, v]);
        }
        Self {
            width: gray.width,
            height: gray.height,
            data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Write a pixel; out-of-bounds coordinates are ignored.
    #[inline]
    pub fn put(&mut self, x: i32, y: i32, color: [u8; 3]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let i = (y as usize * self.width + x as usize) * 3;
        self.data[i..i + 3].copy_from_slice(&color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_put_ignores_out_of_bounds() {
        let mut img = RgbImage::filled(4, 4, [0, 0, 0]);
        img.put(-1, 2, [255, 0, 0]);
        img.put(4, 0, [255, 0, 0]);
        img.put(1, 1, [9, 8, 7]);
        assert_eq!(img.get(1, 1), [9, 8, 7]);
        assert_eq!(img.get(0, 2), [0, 0, 0]);
    }

    #[test]
    fn from_gray_replicates_channels() {
        let gray = GrayImage {
            width: 2,
            height: 1,
            data: vec![10, 200],
        };
        let rgb = RgbImage::from_gray(&gray.view());
        assert_eq!(rgb.get(0, 0), [10, 10, 10]);
        assert_eq!(rgb.get(1, 0), [200, 200, 200]);
    }
}
