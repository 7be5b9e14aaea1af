//! Overlay rasterization into the display frame.
//!
//! Segments are clipped to the frame rectangle before the Bresenham walk, so
//! the cost of drawing is bounded by the frame size. Projected overlay
//! geometry can land arbitrarily far outside the image: a cube corner that
//! sits barely in front of the camera plane still projects to finite pixel
//! coordinates in the billions, and walking there pixel by pixel would stall
//! the frame.

use ar_markers_core::RgbImage;
use ar_markers_pose::overlay::Segment;

/// Liang-Barsky clip of segment `a`-`b` to `[min.0, max.0] x [min.1, max.1]`.
fn clip_segment(
    a: (f64, f64),
    b: (f64, f64),
    min: (f64, f64),
    max: (f64, f64),
) -> Option<((f64, f64), (f64, f64))> {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;

    for (p, q) in [
        (-dx, a.0 - min.0),
        (dx, max.0 - a.0),
        (-dy, a.1 - min.1),
        (dy, max.1 - a.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = t1.min(r);
            }
        }
    }

    Some((
        (a.0 + t0 * dx, a.1 + t0 * dy),
        (a.0 + t1 * dx, a.1 + t1 * dy),
    ))
}

/// Draw one line with the given half-thickness (0 = single pixel).
pub fn draw_line(img: &mut RgbImage, a: (f32, f32), b: (f32, f32), color: [u8; 3], thickness: i32) {
    if !(a.0.is_finite() && a.1.is_finite() && b.0.is_finite() && b.1.is_finite()) {
        return;
    }

    // Clip in f64: intersection math on pixel-frame-sized numbers stays
    // exact enough even when the raw endpoints are huge.
    let margin = f64::from(thickness.max(0) + 1);
    let Some((ca, cb)) = clip_segment(
        (f64::from(a.0), f64::from(a.1)),
        (f64::from(b.0), f64::from(b.1)),
        (-margin, -margin),
        (
            img.width as f64 - 1.0 + margin,
            img.height as f64 - 1.0 + margin,
        ),
    ) else {
        return;
    };

    let (mut x0, mut y0) = (ca.0.round() as i64, ca.1.round() as i64);
    let (x1, y1) = (cb.0.round() as i64, cb.1.round() as i64);

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        put_thick(img, x0, y0, color, thickness);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

fn put_thick(img: &mut RgbImage, x: i64, y: i64, color: [u8; 3], thickness: i32) {
    let t = i64::from(thickness.max(0));
    for oy in -t..=t {
        for ox in -t..=t {
            // Clipped coordinates fit i32 comfortably.
            img.put((x + ox) as i32, (y + oy) as i32, color);
        }
    }
}

pub fn draw_segment(img: &mut RgbImage, seg: &Segment, thickness: i32) {
    draw_line(img, (seg.a.x, seg.a.y), (seg.b.x, seg.b.y), seg.color, thickness);
}

pub fn draw_segments(img: &mut RgbImage, segments: &[Segment], thickness: i32) {
    for seg in segments {
        draw_segment(img, seg, thickness);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ar_markers_core::{CameraIntrinsics, CameraModel, Distortion};
    use ar_markers_pose::overlay::cube_segments;
    use ar_markers_pose::{MarkerGeometry, Pose};
    use nalgebra::{Point2, Vector3};

    #[test]
    fn horizontal_line_paints_every_pixel() {
        let mut img = RgbImage::filled(10, 4, [0, 0, 0]);
        draw_line(&mut img, (1.0, 2.0), (8.0, 2.0), [255, 0, 0], 0);
        for x in 1..=8 {
            assert_eq!(img.get(x, 2), [255, 0, 0]);
        }
        assert_eq!(img.get(0, 2), [0, 0, 0]);
        assert_eq!(img.get(9, 2), [0, 0, 0]);
    }

    #[test]
    fn diagonal_line_hits_both_endpoints() {
        let mut img = RgbImage::filled(8, 8, [0, 0, 0]);
        draw_line(&mut img, (0.0, 0.0), (7.0, 7.0), [0, 255, 0], 0);
        assert_eq!(img.get(0, 0), [0, 255, 0]);
        assert_eq!(img.get(7, 7), [0, 255, 0]);
        assert_eq!(img.get(3, 3), [0, 255, 0]);
    }

    #[test]
    fn off_frame_segments_are_clipped_silently() {
        let mut img = RgbImage::filled(4, 4, [0, 0, 0]);
        let seg = Segment {
            a: Point2::new(-10.0, 1.0),
            b: Point2::new(10.0, 1.0),
            color: [1, 2, 3],
        };
        draw_segment(&mut img, &seg, 0);
        for x in 0..4 {
            assert_eq!(img.get(x, 1), [1, 2, 3]);
        }
    }

    #[test]
    fn fully_outside_segment_draws_nothing() {
        let mut img = RgbImage::filled(8, 8, [0, 0, 0]);
        draw_line(&mut img, (-20.0, -5.0), (30.0, -5.0), [255, 255, 255], 0);
        draw_line(&mut img, (12.0, -40.0), (12.0, 40.0), [255, 255, 255], 0);
        assert!(img.data.iter().all(|&v| v == 0));
    }

    #[test]
    fn non_finite_endpoints_draw_nothing() {
        let mut img = RgbImage::filled(4, 4, [0, 0, 0]);
        draw_line(&mut img, (f32::NAN, 0.0), (2.0, 2.0), [255, 255, 255], 0);
        assert!(img.data.iter().all(|&v| v == 0));
    }

    #[test]
    fn distant_endpoints_cost_one_frame_width() {
        let mut img = RgbImage::filled(64, 64, [0, 0, 0]);
        draw_line(&mut img, (-1.0e9, 32.0), (1.0e9, 32.0), [255, 0, 0], 0);
        for x in 0..64 {
            assert_eq!(img.get(x, 32), [255, 0, 0]);
        }
    }

    #[test]
    fn near_plane_cube_overlay_rasterizes_within_bounds() {
        // A pose with a comfortably positive tvec.z can still tip a cube
        // corner to within nanometers of the camera plane; its projection
        // is finite but enormous. The draw must stay frame-bounded.
        let camera = CameraModel::new(
            CameraIntrinsics {
                fx: 800.0,
                fy: 800.0,
                cx: 320.0,
                cy: 240.0,
            },
            Distortion::default(),
        );
        let pose = Pose {
            rvec: Vector3::new(std::f64::consts::FRAC_PI_2, 0.0, 0.0),
            tvec: Vector3::new(0.0, 0.0, 0.02 + 1e-8),
        };

        let segs = cube_segments(&pose, MarkerGeometry::new(0.04), &camera);
        assert!(!segs.is_empty());
        let far = segs
            .iter()
            .flat_map(|s| [s.a.x.abs(), s.a.y.abs(), s.b.x.abs(), s.b.y.abs()])
            .fold(0.0f32, f32::max);
        assert!(far > 1.0e6, "expected a near-plane blowup, max |coord| = {far}");

        let mut img = RgbImage::filled(640, 480, [0, 0, 0]);
        draw_segments(&mut img, &segs, 1);
    }
}
