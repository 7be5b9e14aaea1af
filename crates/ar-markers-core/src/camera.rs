//! Pinhole camera model with Brown-Conrady distortion.
//!
//! The model is a plain value type: the pipeline snapshots it once per frame
//! and a one-frame-stale value is acceptable, so no interior locking lives
//! here.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Frame size assumed when no capture dimensions are known yet.
pub const FALLBACK_FRAME: (usize, usize) = (640, 480);

/// Pinhole intrinsics in pixel units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CameraIntrinsics {
    /// Focal length in x (pixels).
    pub fx: f64,
    /// Focal length in y (pixels).
    pub fy: f64,
    /// Principal point x (pixels).
    pub cx: f64,
    /// Principal point y (pixels).
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Returns `true` when focal lengths are finite and positive.
    pub fn is_valid(self) -> bool {
        self.fx.is_finite()
            && self.fy.is_finite()
            && self.cx.is_finite()
            && self.cy.is_finite()
            && self.fx > 0.0
            && self.fy > 0.0
    }

    /// Convert pixel coordinates to normalized pinhole coordinates.
    #[inline]
    pub fn pixel_to_normalized(self, p: Point2<f64>) -> Point2<f64> {
        Point2::new((p.x - self.cx) / self.fx, (p.y - self.cy) / self.fy)
    }

    /// Convert normalized pinhole coordinates to pixel coordinates.
    #[inline]
    pub fn normalized_to_pixel(self, n: Point2<f64>) -> Point2<f64> {
        Point2::new(self.fx * n.x + self.cx, self.fy * n.y + self.cy)
    }
}

/// Brown-Conrady distortion coefficients in OpenCV order `[k1, k2, p1, p2, k3]`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Distortion {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

impl Distortion {
    pub fn from_coeffs(c: [f64; 5]) -> Self {
        Self {
            k1: c[0],
            k2: c[1],
            p1: c[2],
            p2: c[3],
            k3: c[4],
        }
    }

    pub fn coeffs(self) -> [f64; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    pub fn is_zero(self) -> bool {
        self.coeffs().iter().all(|&c| c == 0.0)
    }

    /// Apply distortion to normalized coordinates.
    pub fn distort_normalized(self, n: Point2<f64>) -> Point2<f64> {
        let (x, y) = (n.x, n.y);
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;
        let radial = 1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;
        let x_tan = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
        let y_tan = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
        Point2::new(x * radial + x_tan, y * radial + y_tan)
    }
}

const UNDISTORT_ITERS: usize = 15;
const UNDISTORT_EPS: f64 = 1e-12;

/// Complete camera model for the active session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CameraModel {
    pub intrinsics: CameraIntrinsics,
    pub distortion: Distortion,
}

impl CameraModel {
    pub fn new(intrinsics: CameraIntrinsics, distortion: Distortion) -> Self {
        Self {
            intrinsics,
            distortion,
        }
    }

    /// Default heuristic model for a frame of the given size:
    /// `fx = 0.8 * width`, `fy = 0.8 * height`, principal point at the center,
    /// zero distortion.
    pub fn default_for_frame(width: usize, height: usize) -> Self {
        Self {
            intrinsics: CameraIntrinsics {
                fx: width as f64 * 0.8,
                fy: height as f64 * 0.8,
                cx: width as f64 / 2.0,
                cy: height as f64 / 2.0,
            },
            distortion: Distortion::default(),
        }
    }

    /// Heuristic model when no frame dimensions are known yet.
    pub fn fallback() -> Self {
        Self::default_for_frame(FALLBACK_FRAME.0, FALLBACK_FRAME.1)
    }

    pub fn is_valid(self) -> bool {
        self.intrinsics.is_valid()
    }

    /// Project normalized coordinates through distortion to a pixel.
    #[inline]
    pub fn normalized_to_distorted_pixel(self, n: Point2<f64>) -> Point2<f64> {
        self.intrinsics
            .normalized_to_pixel(self.distortion.distort_normalized(n))
    }

    /// Invert distortion for one pixel via fixed-point iteration and return
    /// the ideal normalized coordinates. `None` when the iteration diverges.
    pub fn undistort_pixel_to_normalized(self, p: Point2<f64>) -> Option<Point2<f64>> {
        let target = self.intrinsics.pixel_to_normalized(p);
        if self.distortion.is_zero() {
            return Some(target);
        }

        let mut x = target.x;
        let mut y = target.y;
        for _ in 0..UNDISTORT_ITERS {
            let r2 = x * x + y * y;
            let r4 = r2 * r2;
            let r6 = r4 * r2;
            let d = self.distortion;
            let radial = 1.0 + d.k1 * r2 + d.k2 * r4 + d.k3 * r6;
            if !radial.is_finite() || radial.abs() < 1e-12 {
                return None;
            }
            let x_tan = 2.0 * d.p1 * x * y + d.p2 * (r2 + 2.0 * x * x);
            let y_tan = d.p1 * (r2 + 2.0 * y * y) + 2.0 * d.p2 * x * y;
            let x_next = (target.x - x_tan) / radial;
            let y_next = (target.y - y_tan) / radial;
            if !x_next.is_finite() || !y_next.is_finite() {
                return None;
            }

            let step = ((x_next - x).powi(2) + (y_next - y).powi(2)).sqrt();
            x = x_next;
            y = y_next;
            if step <= UNDISTORT_EPS {
                break;
            }
        }
        Some(Point2::new(x, y))
    }
}
