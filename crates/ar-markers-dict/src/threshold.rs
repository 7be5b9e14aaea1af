//! Thresholding: global Otsu for bit decoding, adaptive mean for segmentation.

use ar_markers_core::GrayImageView;

/// Compute an Otsu threshold from a set of sample intensities.
pub(crate) fn otsu_threshold_from_samples(samples: &[u8]) -> u8 {
    if samples.is_empty() {
        return 127;
    }

    let mut min_v = 255u8;
    let mut max_v = 0u8;
    for &v in samples {
        min_v = min_v.min(v);
        max_v = max_v.max(v);
    }
    if min_v == max_v {
        return min_v;
    }

    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }
    let nonzero_bins = hist.iter().filter(|&&h| h > 0).count();
    if nonzero_bins <= 2 {
        return ((min_v as u16 + max_v as u16) / 2) as u8;
    }

    let total = samples.len() as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| (i as f64) * (h as f64))
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 127u8;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        sum_b += (t as f64) * (h as f64);
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;

        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }

    best_t
}

/// Adaptive mean threshold: a pixel is foreground (dark) when its intensity
/// is below the mean of the surrounding `2*radius+1` box minus `offset`.
///
/// Writes 1 for foreground, 0 for background into `mask` (len = w*h).
pub(crate) fn binarize_adaptive(src: &GrayImageView<'_>, radius: usize, offset: i32, mask: &mut Vec<u8>) {
    let (w, h) = (src.width, src.height);
    mask.clear();
    mask.resize(w * h, 0);
    if w == 0 || h == 0 {
        return;
    }

    // Summed-area table with a 1-row/col zero border.
    let iw = w + 1;
    let mut integral = vec![0u64; iw * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += src.data[y * w + x] as u64;
            integral[(y + 1) * iw + (x + 1)] = integral[y * iw + (x + 1)] + row_sum;
        }
    }

    let r = radius as i64;
    for y in 0..h {
        let y0 = (y as i64 - r).max(0) as usize;
        let y1 = ((y as i64 + r + 1).min(h as i64)) as usize;
        for x in 0..w {
            let x0 = (x as i64 - r).max(0) as usize;
            let x1 = ((x as i64 + r + 1).min(w as i64)) as usize;

            let area = ((x1 - x0) * (y1 - y0)) as i64;
            let sum = (integral[y1 * iw + x1] + integral[y0 * iw + x0]
                - integral[y0 * iw + x1]
                - integral[y1 * iw + x0]) as i64;
            let mean = sum / area;

            if (src.data[y * w + x] as i64) < mean - offset as i64 {
                mask[y * w + x] = 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ar_markers_core::GrayImage;

    #[test]
    fn otsu_separates_bimodal_samples() {
        let samples: Vec<u8> = [10u8; 20]
            .iter()
            .chain([240u8; 20].iter())
            .copied()
            .collect();
        let t = otsu_threshold_from_samples(&samples);
        assert!(t > 10 && t < 240, "threshold {t} not between modes");
    }

    #[test]
    fn otsu_flat_samples_return_value() {
        assert_eq!(otsu_threshold_from_samples(&[42u8; 9]), 42);
        assert_eq!(otsu_threshold_from_samples(&[]), 127);
    }

    #[test]
    fn adaptive_marks_dark_blob_on_white() {
        let mut img = GrayImage::new(32, 32);
        img.data.fill(255);
        for y in 10..20 {
            for x in 10..20 {
                img.data[y * 32 + x] = 0;
            }
        }

        let mut mask = Vec::new();
        binarize_adaptive(&img.view(), 7, 10, &mut mask);
        assert_eq!(mask[15 * 32 + 15], 1);
        assert_eq!(mask[2 * 32 + 2], 0);
    }

    #[test]
    fn adaptive_uniform_image_has_no_foreground() {
        let mut img = GrayImage::new(16, 16);
        img.data.fill(200);
        let mut mask = Vec::new();
        binarize_adaptive(&img.view(), 4, 10, &mut mask);
        assert!(mask.iter().all(|&m| m == 0));
    }
}
