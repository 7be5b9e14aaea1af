//! Four-point planar PnP.
//!
//! The marker is a known square on its own `z = 0` plane, so pose recovery
//! is a plane-induced homography decomposition followed by a damped
//! Gauss-Newton polish of the full reprojection error (distortion included).

use ar_markers_core::{homography_from_4pt, CameraModel};
use nalgebra::{Matrix3, Point2, Point3, Rotation3, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::project::project_point;

/// Physical marker geometry; one value shared by all markers in a session.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MarkerGeometry {
    /// Side length of the printed square, in physical units.
    pub side_length: f64,
}

impl MarkerGeometry {
    pub fn new(side_length: f64) -> Self {
        Self { side_length }
    }

    pub fn is_valid(self) -> bool {
        self.side_length.is_finite() && self.side_length > 0.0
    }

    /// Marker-local 3D corners in detector corner order (printed top-left
    /// first, clockwise): x right, y down the printed face, z out of plane.
    pub fn object_corners(self) -> [Point3<f64>; 4] {
        let h = self.side_length / 2.0;
        [
            Point3::new(-h, -h, 0.0),
            Point3::new(h, -h, 0.0),
            Point3::new(h, h, 0.0),
            Point3::new(-h, h, 0.0),
        ]
    }
}

/// Rigid marker-to-camera transform.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Rotation in Rodrigues axis-angle form (radians times unit axis).
    pub rvec: Vector3<f64>,
    /// Translation in camera frame, same units as the marker side length.
    pub tvec: Vector3<f64>,
}

impl Pose {
    pub fn rotation(&self) -> Rotation3<f64> {
        Rotation3::from_scaled_axis(self.rvec)
    }
}

/// A solved pose plus its fit quality.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseEstimate {
    pub pose: Pose,
    /// Mean reprojection error over the four corners, in pixels.
    pub mean_reproj_px: f64,
    /// Refinement iterations actually taken.
    pub iterations: usize,
}

/// Per-marker pose failures; recovered locally by the pipeline.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PoseError {
    /// Corner quad is unusable: non-finite coordinates or degenerate
    /// (near-collinear) geometry. Checked before any solving.
    #[error("malformed marker corners")]
    MalformedCorners,
    /// The homography decomposition or the refinement did not produce a
    /// finite camera-facing pose.
    #[error("pose solve failed to converge")]
    SolveFailed,
}

const REFINE_MAX_ITERS: usize = 10;
const REFINE_STEP_EPS: f64 = 1e-12;

/// Solve the marker's 6-DOF pose from its four detected corners.
///
/// Corner order must match [`MarkerGeometry::object_corners`]. Translation
/// comes back in the units of `geometry.side_length` with `tvec.z > 0` for a
/// visible marker.
pub fn estimate_marker_pose(
    corners: &[Point2<f32>; 4],
    geometry: MarkerGeometry,
    camera: &CameraModel,
) -> Result<PoseEstimate, PoseError> {
    if !geometry.is_valid() || !camera.is_valid() {
        return Err(PoseError::SolveFailed);
    }
    if corners.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(PoseError::MalformedCorners);
    }

    // Ideal (undistorted) normalized coordinates of the observed corners.
    let mut normalized = [Point2::new(0.0f64, 0.0); 4];
    for (n, c) in normalized.iter_mut().zip(corners.iter()) {
        let p = Point2::new(c.x as f64, c.y as f64);
        *n = camera
            .undistort_pixel_to_normalized(p)
            .ok_or(PoseError::SolveFailed)?;
    }

    let object = geometry.object_corners();
    let plane = object.map(|p| Point2::new(p.x, p.y));

    // Degenerate quads fail the homography; report them as malformed input
    // rather than a solver failure.
    let h = homography_from_4pt(&plane, &normalized).ok_or(PoseError::MalformedCorners)?;

    let initial = decompose_planar_homography(&h.h).ok_or(PoseError::SolveFailed)?;
    let (pose, mean_reproj_px, iterations) =
        refine_pose(initial, &object, corners, camera).ok_or(PoseError::SolveFailed)?;

    if !(pose.tvec.z.is_finite() && pose.tvec.z > 0.0) || !mean_reproj_px.is_finite() {
        return Err(PoseError::SolveFailed);
    }

    log::debug!(
        "pnp: refined in {iterations} iteration(s), mean reprojection {:.3} px",
        mean_reproj_px
    );

    Ok(PoseEstimate {
        pose,
        mean_reproj_px,
        iterations,
    })
}

/// Classic decomposition of a plane-induced homography (normalized image
/// coordinates, so `K = I`): `H ~ [r1 r2 t]` for the plane `z = 0`.
fn decompose_planar_homography(h: &Matrix3<f64>) -> Option<Pose> {
    let h1 = h.column(0).into_owned();
    let h2 = h.column(1).into_owned();
    let h3 = h.column(2).into_owned();

    let norm1 = h1.norm();
    let norm2 = h2.norm();
    if norm1 <= 1e-12 || norm2 <= 1e-12 {
        return None;
    }
    let lambda = 2.0 / (norm1 + norm2);

    let mut r1 = h1 * lambda;
    let mut r2 = h2 * lambda;
    let mut t = h3 * lambda;
    if t.z < 0.0 {
        r1 = -r1;
        r2 = -r2;
        t = -t;
    }

    let r3 = r1.cross(&r2);
    if r3.norm() <= 1e-12 {
        return None;
    }

    let mut r = Matrix3::zeros();
    r.set_column(0, &r1);
    r.set_column(1, &r2);
    r.set_column(2, &r3);

    // Project onto SO(3) (polar decomposition via SVD).
    let svd = r.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let mut r_orth = u * v_t;
    if r_orth.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r_orth = u_flipped * v_t;
    }

    let rvec = Rotation3::from_matrix_unchecked(r_orth).scaled_axis();
    if !rvec.iter().all(|v| v.is_finite()) || !t.iter().all(|v| v.is_finite()) {
        return None;
    }

    Some(Pose { rvec, tvec: t })
}

fn corner_residuals(
    theta: &SVector<f64, 6>,
    object: &[Point3<f64>; 4],
    observed: &[Point2<f32>; 4],
    camera: &CameraModel,
) -> Option<SVector<f64, 8>> {
    let pose = Pose {
        rvec: Vector3::new(theta[0], theta[1], theta[2]),
        tvec: Vector3::new(theta[3], theta[4], theta[5]),
    };

    let mut r = SVector::<f64, 8>::zeros();
    for (i, (obj, obs)) in object.iter().zip(observed.iter()).enumerate() {
        let p = project_point(obj, &pose, camera)?;
        r[2 * i] = p.x - obs.x as f64;
        r[2 * i + 1] = p.y - obs.y as f64;
    }
    Some(r)
}

/// Damped Gauss-Newton over `(rvec, tvec)` with a numeric Jacobian.
///
/// Returns the refined pose, mean corner reprojection error in pixels, and
/// the number of accepted iterations.
fn refine_pose(
    initial: Pose,
    object: &[Point3<f64>; 4],
    observed: &[Point2<f32>; 4],
    camera: &CameraModel,
) -> Option<(Pose, f64, usize)> {
    let mut theta = SVector::<f64, 6>::from_column_slice(&[
        initial.rvec.x,
        initial.rvec.y,
        initial.rvec.z,
        initial.tvec.x,
        initial.tvec.y,
        initial.tvec.z,
    ]);

    let mut residual = corner_residuals(&theta, object, observed, camera)?;
    let mut err = residual.norm_squared();
    let mut damping = 1e-9;
    let mut iterations = 0usize;

    for _ in 0..REFINE_MAX_ITERS {
        let mut jac = SMatrix::<f64, 8, 6>::zeros();
        for k in 0..6 {
            let delta = 1e-6 * theta[k].abs().max(1.0);
            let mut plus = theta;
            plus[k] += delta;
            let mut minus = theta;
            minus[k] -= delta;
            let rp = corner_residuals(&plus, object, observed, camera)?;
            let rm = corner_residuals(&minus, object, observed, camera)?;
            jac.set_column(k, &((rp - rm) / (2.0 * delta)));
        }

        let jt = jac.transpose();
        let mut accepted = false;
        for _ in 0..4 {
            let lhs = jt * jac + SMatrix::<f64, 6, 6>::identity() * damping;
            let rhs = -jt * residual;
            let Some(step) = lhs.lu().solve(&rhs) else {
                damping *= 10.0;
                continue;
            };

            let candidate = theta + step;
            let Some(cand_res) = corner_residuals(&candidate, object, observed, camera) else {
                damping *= 10.0;
                continue;
            };
            let cand_err = cand_res.norm_squared();
            if cand_err.is_finite() && cand_err <= err {
                let step_norm = step.norm();
                theta = candidate;
                residual = cand_res;
                err = cand_err;
                damping = (damping / 10.0).max(1e-12);
                iterations += 1;
                accepted = step_norm >= REFINE_STEP_EPS;
                break;
            }
            damping *= 10.0;
        }
        if !accepted {
            break;
        }
    }

    let pose = Pose {
        rvec: Vector3::new(theta[0], theta[1], theta[2]),
        tvec: Vector3::new(theta[3], theta[4], theta[5]),
    };
    let mean_px = (0..4)
        .map(|i| (residual[2 * i].powi(2) + residual[2 * i + 1].powi(2)).sqrt())
        .sum::<f64>()
        / 4.0;
    Some((pose, mean_px, iterations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::project::project_points;

    fn camera_800() -> CameraModel {
        use ar_markers_core::{CameraIntrinsics, Distortion};
        CameraModel::new(
            CameraIntrinsics {
                fx: 800.0,
                fy: 800.0,
                cx: 320.0,
                cy: 240.0,
            },
            Distortion::default(),
        )
    }

    fn project_corners(pose: &Pose, geometry: MarkerGeometry, cam: &CameraModel) -> [Point2<f32>; 4] {
        let pts = project_points(&geometry.object_corners(), pose, cam);
        let mut out = [Point2::new(0.0f32, 0.0); 4];
        for (o, p) in out.iter_mut().zip(pts.iter()) {
            let p = p.expect("corner projects");
            *o = Point2::new(p.x as f32, p.y as f32);
        }
        out
    }

    #[test]
    fn round_trip_recovers_pose() {
        let cam = camera_800();
        let geometry = MarkerGeometry::new(0.04);
        let truth = Pose {
            rvec: Vector3::new(0.15, -0.1, 0.35),
            tvec: Vector3::new(0.02, -0.015, 0.5),
        };

        let corners = project_corners(&truth, geometry, &cam);
        let est = estimate_marker_pose(&corners, geometry, &cam).expect("solvable");

        assert_relative_eq!(est.pose.tvec.x, truth.tvec.x, epsilon = 1e-4);
        assert_relative_eq!(est.pose.tvec.y, truth.tvec.y, epsilon = 1e-4);
        assert_relative_eq!(est.pose.tvec.z, truth.tvec.z, epsilon = 1e-4);
        assert_relative_eq!(est.pose.rvec.x, truth.rvec.x, epsilon = 1e-3);
        assert_relative_eq!(est.pose.rvec.y, truth.rvec.y, epsilon = 1e-3);
        assert_relative_eq!(est.pose.rvec.z, truth.rvec.z, epsilon = 1e-3);
        assert!(est.mean_reproj_px < 1e-3);
    }

    #[test]
    fn round_trip_with_distortion() {
        use ar_markers_core::{CameraIntrinsics, Distortion};
        let cam = CameraModel::new(
            CameraIntrinsics {
                fx: 760.0,
                fy: 780.0,
                cx: 310.0,
                cy: 250.0,
            },
            Distortion {
                k1: -0.1,
                k2: 0.02,
                p1: 0.0005,
                p2: -0.0004,
                k3: 0.0,
            },
        );
        let geometry = MarkerGeometry::new(0.05);
        let truth = Pose {
            rvec: Vector3::new(-0.2, 0.12, 0.1),
            tvec: Vector3::new(-0.01, 0.02, 0.4),
        };

        let corners = project_corners(&truth, geometry, &cam);
        let est = estimate_marker_pose(&corners, geometry, &cam).expect("solvable");
        assert!(est.mean_reproj_px < 1e-2, "err = {}", est.mean_reproj_px);
        assert_relative_eq!(est.pose.tvec.z, truth.tvec.z, epsilon = 1e-3);
    }

    #[test]
    fn frontal_square_matches_reference_numbers() {
        // 40x40 px square centered on the principal axis side, 0.04 m marker,
        // f = 800 px: depth must come out near f * size / px_size = 0.8 m.
        let cam = camera_800();
        let corners = [
            Point2::new(300.0f32, 200.0),
            Point2::new(340.0, 200.0),
            Point2::new(340.0, 240.0),
            Point2::new(300.0, 240.0),
        ];
        let est =
            estimate_marker_pose(&corners, MarkerGeometry::new(0.04), &cam).expect("solvable");

        assert!(est.pose.tvec.z > 0.0);
        assert!(est.mean_reproj_px < 1.0, "err = {}", est.mean_reproj_px);
        assert_relative_eq!(est.pose.tvec.z, 0.8, epsilon = 1e-2);
    }

    #[test]
    fn non_finite_corners_are_malformed() {
        let cam = camera_800();
        let corners = [
            Point2::new(f32::NAN, 200.0),
            Point2::new(340.0, 200.0),
            Point2::new(340.0, 240.0),
            Point2::new(300.0, 240.0),
        ];
        assert_eq!(
            estimate_marker_pose(&corners, MarkerGeometry::new(0.04), &cam),
            Err(PoseError::MalformedCorners)
        );
    }

    #[test]
    fn collinear_corners_are_malformed() {
        let cam = camera_800();
        let corners = [
            Point2::new(100.0f32, 100.0),
            Point2::new(150.0, 100.0),
            Point2::new(200.0, 100.0),
            Point2::new(250.0, 100.0),
        ];
        assert_eq!(
            estimate_marker_pose(&corners, MarkerGeometry::new(0.04), &cam),
            Err(PoseError::MalformedCorners)
        );
    }

    #[test]
    fn invalid_camera_fails_cleanly() {
        use ar_markers_core::{CameraIntrinsics, Distortion};
        let cam = CameraModel::new(
            CameraIntrinsics {
                fx: 0.0,
                fy: 0.0,
                cx: 0.0,
                cy: 0.0,
            },
            Distortion::default(),
        );
        let corners = [
            Point2::new(300.0f32, 200.0),
            Point2::new(340.0, 200.0),
            Point2::new(340.0, 240.0),
            Point2::new(300.0, 240.0),
        ];
        assert_eq!(
            estimate_marker_pose(&corners, MarkerGeometry::new(0.04), &cam),
            Err(PoseError::SolveFailed)
        );
    }
}
