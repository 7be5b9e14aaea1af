//! Bit decoding of one quad candidate.
//!
//! The quad is assumed to cover the whole printed marker including its
//! one-cell black border: a 6x6 dictionary therefore samples an 8x8 cell
//! grid. Sampling goes through the canonical-square-to-image homography with
//! a 3x3 mean per cell center, binarized against an Otsu threshold computed
//! from the sampled patch itself.

use ar_markers_core::{homography_from_4pt, GrayImageView};
use nalgebra::Point2;

use crate::quads::QuadCandidate;
use crate::threshold::otsu_threshold_from_samples;

const BORDER_BITS: usize = 1;

/// Sample and decode the cell grid of one candidate into its inner payload
/// bits, row-major, black = 1.
///
/// Returns `None` when the quad is partially outside the frame or its border
/// is not black enough. Minimum quad size is already enforced during quad
/// extraction.
pub(crate) fn decode_quad(
    gray: &GrayImageView<'_>,
    quad: &QuadCandidate,
    marker_bits: usize,
    inset_frac: f32,
    min_border_score: f32,
    samples: &mut Vec<u8>,
) -> Option<u64> {
    let cells = marker_bits + 2 * BORDER_BITS;
    if marker_bits * marker_bits > 64 {
        return None;
    }

    // Canonical frame: one unit per cell, corner 0 at the grid's top-left.
    let c = cells as f64;
    let canonical = [
        Point2::new(0.0, 0.0),
        Point2::new(c, 0.0),
        Point2::new(c, c),
        Point2::new(0.0, c),
    ];
    let image = quad
        .corners
        .map(|p| Point2::new(p.x as f64, p.y as f64));
    let h = homography_from_4pt(&canonical, &image)?;

    // Inset shrinks the sample lattice toward the grid center so cell-center
    // samples stay clear of printing bleed at cell boundaries.
    let shrink = 1.0 - inset_frac.clamp(0.0, 0.4) as f64;
    let mid = c / 2.0;
    samples.clear();
    for cy in 0..cells {
        for cx in 0..cells {
            let u = mid + (cx as f64 + 0.5 - mid) * shrink;
            let v = mid + (cy as f64 + 0.5 - mid) * shrink;
            let p = h.apply_f64(Point2::new(u, v));
            let s = sample_mean_3x3(gray, p.x as f32, p.y as f32)?;
            samples.push(s);
        }
    }

    let thr = otsu_threshold_from_samples(samples);

    let mut border_total = 0u32;
    let mut border_black = 0u32;
    let mut code = 0u64;
    for cy in 0..cells {
        for cx in 0..cells {
            let is_black = samples[cy * cells + cx] < thr;
            let on_border =
                cx < BORDER_BITS || cy < BORDER_BITS || cx >= cells - BORDER_BITS || cy >= cells - BORDER_BITS;
            if on_border {
                border_total += 1;
                if is_black {
                    border_black += 1;
                }
            } else if is_black {
                let bx = cx - BORDER_BITS;
                let by = cy - BORDER_BITS;
                code |= 1u64 << (by * marker_bits + bx);
            }
        }
    }

    let border_score = border_black as f32 / border_total.max(1) as f32;
    if border_score < min_border_score {
        return None;
    }

    Some(code)
}

fn sample_mean_3x3(img: &GrayImageView<'_>, x: f32, y: f32) -> Option<u8> {
    let ix = x.floor() as i32;
    let iy = y.floor() as i32;
    if ix - 1 < 0 || iy - 1 < 0 || ix + 1 >= img.width as i32 || iy + 1 >= img.height as i32 {
        return None;
    }

    let mut sum = 0u32;
    for dy in -1..=1 {
        for dx in -1..=1 {
            let idx = (iy + dy) as usize * img.width + (ix + dx) as usize;
            sum += img.data[idx] as u32;
        }
    }
    Some((sum / 9) as u8)
}
