//! 4-point homography estimation.
//!
//! Marker decoding maps a canonical square into the image, and planar pose
//! initialisation maps the marker plane into normalized image coordinates.
//! Both only ever have four correspondences, so the general DLT is not
//! carried here.

use nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector3};

/// Projective mapping `dst ~ H * src`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    #[inline]
    pub fn apply_f64(&self, p: Point2<f64>) -> Point2<f64> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        Point2::new(v[0] / v[2], v[1] / v[2])
    }
}

// Hartley normalization: translate points to their centroid and scale so the
// mean distance from it is sqrt(2). Conditioning, not correctness, for the
// typical pixel-magnitude inputs.
fn normalizing_transform(pts: &[Point2<f64>; 4]) -> Matrix3<f64> {
    let mut cx = 0.0;
    let mut cy = 0.0;
    for p in pts {
        cx += p.x;
        cy += p.y;
    }
    cx /= 4.0;
    cy /= 4.0;

    let mut mean_dist = 0.0;
    for p in pts {
        mean_dist += ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt();
    }
    mean_dist /= 4.0;

    let s = if mean_dist > 1e-12 {
        (2.0_f64).sqrt() / mean_dist
    } else {
        1.0
    };
    Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

fn transform_points(t: &Matrix3<f64>, pts: &[Point2<f64>; 4]) -> [Point2<f64>; 4] {
    pts.map(|p| {
        let v = t * Vector3::new(p.x, p.y, 1.0);
        Point2::new(v[0], v[1])
    })
}

// A quad with a near-collinear corner triple does not determine a projective
// map; the threshold is relative to the quad extent.
fn is_degenerate(pts: &[Point2<f64>; 4]) -> bool {
    let mut extent = 0.0_f64;
    for i in 0..4 {
        for j in (i + 1)..4 {
            let d = ((pts[i].x - pts[j].x).powi(2) + (pts[i].y - pts[j].y).powi(2)).sqrt();
            extent = extent.max(d);
        }
    }
    if extent < 1e-9 {
        return true;
    }

    for i in 0..4 {
        let a = pts[i];
        let b = pts[(i + 1) % 4];
        let c = pts[(i + 2) % 4];
        let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
        if cross.abs() < 1e-6 * extent * extent {
            return true;
        }
    }
    false
}

/// Compute `H` such that `dst ~ H * src` from four correspondences.
///
/// Corner order must be consistent between `src` and `dst`. Returns `None`
/// for degenerate configurations (collinear points, repeated points).
pub fn homography_from_4pt(src: &[Point2<f64>; 4], dst: &[Point2<f64>; 4]) -> Option<Homography> {
    if is_degenerate(src) || is_degenerate(dst) {
        return None;
    }

    let t_src = normalizing_transform(src);
    let t_dst = normalizing_transform(dst);
    let src_n = transform_points(&t_src, src);
    let dst_n = transform_points(&t_dst, dst);

    // Unknowns [h11 .. h32] with h33 = 1. Each correspondence (x,y)->(u,v)
    // contributes:
    //   h11 x + h12 y + h13 - u h31 x - u h32 y = u
    //   h21 x + h22 y + h23 - v h31 x - v h32 y = v
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for k in 0..4 {
        let (x, y) = (src_n[k].x, src_n[k].y);
        let (u, v) = (dst_n[k].x, dst_n[k].y);

        let r = 2 * k;
        a[(r, 0)] = x;
        a[(r, 1)] = y;
        a[(r, 2)] = 1.0;
        a[(r, 6)] = -u * x;
        a[(r, 7)] = -u * y;
        b[r] = u;

        a[(r + 1, 3)] = x;
        a[(r + 1, 4)] = y;
        a[(r + 1, 5)] = 1.0;
        a[(r + 1, 6)] = -v * x;
        a[(r + 1, 7)] = -v * y;
        b[r + 1] = v;
    }

    let x = a.lu().solve(&b)?;
    let hn = Matrix3::new(x[0], x[1], x[2], x[3], x[4], x[5], x[6], x[7], 1.0);

    let h = t_dst.try_inverse()? * hn * t_src;
    let scale = h[(2, 2)];
    if scale.abs() < 1e-12 {
        return None;
    }
    Some(Homography::new(h / scale))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point2<f64>, b: Point2<f64>, tol: f64) {
        assert!(
            (a.x - b.x).abs() < tol && (a.y - b.y).abs() < tol,
            "expected ({:.6},{:.6}) ~ ({:.6},{:.6})",
            a.x,
            a.y,
            b.x,
            b.y
        );
    }

    #[test]
    fn recovers_known_projective_map() {
        let ground_truth = Homography::new(Matrix3::new(
            0.8, 0.05, 120.0, //
            -0.02, 1.1, 80.0, //
            0.0009, -0.0004, 1.0,
        ));

        let square = [
            Point2::new(0.0, 0.0),
            Point2::new(180.0, 0.0),
            Point2::new(180.0, 130.0),
            Point2::new(0.0, 130.0),
        ];
        let dst = square.map(|p| ground_truth.apply_f64(p));

        let recovered = homography_from_4pt(&square, &dst).expect("recoverable");
        for p in [
            Point2::new(0.0, 0.0),
            Point2::new(60.0, 40.0),
            Point2::new(150.0, 120.0),
        ] {
            assert_close(recovered.apply_f64(p), ground_truth.apply_f64(p), 1e-6);
        }
    }

    #[test]
    fn collinear_points_are_rejected() {
        let src = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(2.0, 2.0),
            Point2::new(3.0, 3.0),
        ];
        let dst = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        assert!(homography_from_4pt(&src, &dst).is_none());
    }
}
