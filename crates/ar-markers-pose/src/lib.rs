//! Pose estimation and reprojection overlay geometry.
//!
//! Given one marker's four image corners, its physical side length, and the
//! session camera model, [`estimate_marker_pose`] solves the four-point
//! planar Perspective-n-Point problem. The [`overlay`] module projects
//! reference geometry (axis triad, cube, marker outline) back through a
//! solved pose for visual verification.

mod pnp;
mod project;
pub mod overlay;

pub use pnp::{estimate_marker_pose, MarkerGeometry, Pose, PoseError, PoseEstimate};
pub use project::{project_point, project_points};
