//! Reprojection overlay geometry.
//!
//! Everything here is pure geometry: it turns a solved pose into colored 2D
//! line segments and leaves rasterization to the caller. A segment whose
//! endpoint fails to project (behind the camera, non-finite) is dropped
//! instead of being clamped.

use ar_markers_core::CameraModel;
use nalgebra::{Point2, Point3};

use crate::pnp::{MarkerGeometry, Pose};
use crate::project::project_point;

/// One colored line segment in pixel coordinates, RGB color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub a: Point2<f32>,
    pub b: Point2<f32>,
    pub color: [u8; 3],
}

pub const COLOR_AXIS_X: [u8; 3] = [255, 0, 0];
pub const COLOR_AXIS_Y: [u8; 3] = [0, 255, 0];
pub const COLOR_AXIS_Z: [u8; 3] = [0, 0, 255];
pub const COLOR_CUBE: [u8; 3] = [0, 255, 0];
pub const COLOR_OUTLINE: [u8; 3] = [255, 0, 0];

fn segment(
    from: Point3<f64>,
    to: Point3<f64>,
    color: [u8; 3],
    pose: &Pose,
    camera: &CameraModel,
) -> Option<Segment> {
    let a = project_point(&from, pose, camera)?;
    let b = project_point(&to, pose, camera)?;
    Some(Segment {
        a: Point2::new(a.x as f32, a.y as f32),
        b: Point2::new(b.x as f32, b.y as f32),
        color,
    })
}

/// Axis triad anchored at the marker center: x red, y green, z blue.
///
/// The z arm points along negative marker z, out of the printed face toward
/// the camera for a frontal marker.
pub fn axis_segments(pose: &Pose, length: f64, camera: &CameraModel) -> Vec<Segment> {
    let origin = Point3::origin();
    [
        (Point3::new(length, 0.0, 0.0), COLOR_AXIS_X),
        (Point3::new(0.0, length, 0.0), COLOR_AXIS_Y),
        (Point3::new(0.0, 0.0, -length), COLOR_AXIS_Z),
    ]
    .into_iter()
    .filter_map(|(tip, color)| segment(origin, tip, color, pose, camera))
    .collect()
}

/// Wireframe cube sitting on the marker plane with the marker as its base.
///
/// Twelve edges: base ring, top ring, four verticals. Edges with an
/// unprojectable endpoint are omitted individually.
pub fn cube_segments(pose: &Pose, geometry: MarkerGeometry, camera: &CameraModel) -> Vec<Segment> {
    let size = geometry.side_length;
    let h = size / 2.0;
    let base = [
        Point3::new(-h, -h, 0.0),
        Point3::new(-h, h, 0.0),
        Point3::new(h, h, 0.0),
        Point3::new(h, -h, 0.0),
    ];
    let top = base.map(|p| Point3::new(p.x, p.y, size));

    let mut out = Vec::with_capacity(12);
    for i in 0..4 {
        let j = (i + 1) % 4;
        out.extend(segment(base[i], base[j], COLOR_CUBE, pose, camera));
        out.extend(segment(top[i], top[j], COLOR_CUBE, pose, camera));
        out.extend(segment(base[i], top[i], COLOR_CUBE, pose, camera));
    }
    out
}

/// Closed outline through the four detected corners, in image space.
///
/// Works straight from the observation, so it is available even when pose
/// estimation fails for the marker.
pub fn marker_outline_segments(corners: &[Point2<f32>; 4]) -> Vec<Segment> {
    (0..4)
        .map(|i| Segment {
            a: corners[i],
            b: corners[(i + 1) % 4],
            color: COLOR_OUTLINE,
        })
        .collect()
}
