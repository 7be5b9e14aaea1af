//! High-level facade crate for the `ar-markers-*` workspace.
//!
//! This crate ties the detector, pose estimator and overlay geometry into a
//! per-frame pipeline:
//! - [`Session`] owns the detector and marker geometry for one capture run;
//! - [`Session::process_frame`] detects markers in a grayscale frame, solves
//!   each marker's pose, annotates the paired RGB frame with outline, axis
//!   triad and cube overlays, and dispatches a render transform per marker;
//! - [`RenderSink`] and [`FrameSource`] are the boundary traits toward the
//!   renderer and the capture device.
//!
//! ## Quickstart
//!
//! ```no_run
//! use ar_markers::{ChannelRenderSink, Frame, Session, SessionConfig};
//! use ar_markers::core::{CameraModel, GrayImage};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = Session::new(SessionConfig::default())?;
//! session.set_camera(CameraModel::default_for_frame(640, 480));
//!
//! let (sink, transforms) = ChannelRenderSink::new();
//! let mut frame = Frame::from_gray(GrayImage::new(640, 480));
//!
//! let report = session.process_frame(&mut frame, &sink);
//! println!("markers: {}", report.markers().len());
//! for t in transforms.try_iter() {
//!     println!("transform: x={} y={} z={}", t.x, t.y, t.z);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `ar_markers::core`: image buffers, camera model, homography primitives.
//! - `ar_markers::dict`: marker dictionaries, code matching, quad detection.
//! - `ar_markers::pose`: planar PnP and reprojection overlay geometry.
//! - `ar_markers::io` (feature `image`): conversions to and from `image`
//!   buffers for file-based workflows.

pub use ar_markers_core as core;
pub use ar_markers_dict as dict;
pub use ar_markers_pose as pose;

pub mod adapter;
pub mod draw;
pub mod error;
pub mod pipeline;
pub mod session;
pub mod source;

#[cfg(feature = "image")]
pub mod io;

pub use adapter::{adapt_pose, ChannelRenderSink, RenderSink, RenderTransform, TRANSLATION_SCALE};
pub use error::{MarkerError, SessionError};
pub use pipeline::{FrameOutcome, FrameReport, MarkerResult, MarkerSuccess};
pub use session::{Session, SessionConfig, SharedCamera};
pub use source::{Frame, FrameSource};

pub use ar_markers_dict::{DetectorParams, MarkerObservation};
pub use ar_markers_pose::{Pose, PoseEstimate};
