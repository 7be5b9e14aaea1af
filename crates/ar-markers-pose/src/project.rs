//! Forward projection of 3D points through a solved pose.

use ar_markers_core::CameraModel;
use nalgebra::{Point2, Point3};

use crate::pnp::Pose;

/// Points closer to the camera plane than this are not projectable.
const MIN_CAMERA_Z: f64 = 1e-9;

/// Project one marker-frame point to distorted pixel coordinates.
///
/// `None` when the transformed point sits on or behind the camera plane, or
/// the projection is not finite. Callers drop the affected primitive rather
/// than drawing through infinity.
pub fn project_point(point: &Point3<f64>, pose: &Pose, camera: &CameraModel) -> Option<Point2<f64>> {
    let cam_pt = pose.rotation() * point + pose.tvec;
    if !(cam_pt.z.is_finite() && cam_pt.z > MIN_CAMERA_Z) {
        return None;
    }

    let n = Point2::new(cam_pt.x / cam_pt.z, cam_pt.y / cam_pt.z);
    let p = camera.normalized_to_distorted_pixel(n);
    if p.x.is_finite() && p.y.is_finite() {
        Some(p)
    } else {
        None
    }
}

/// Project a batch of marker-frame points; per-point failures stay `None`.
pub fn project_points(
    points: &[Point3<f64>],
    pose: &Pose,
    camera: &CameraModel,
) -> Vec<Option<Point2<f64>>> {
    points
        .iter()
        .map(|p| project_point(p, pose, camera))
        .collect()
}
