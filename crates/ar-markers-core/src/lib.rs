//! Core types for square-marker AR tracking.
//!
//! This crate is intentionally small and purely geometric. It holds the
//! image buffer types shared across the workspace, the pinhole camera model
//! with Brown-Conrady distortion, and the 4-point homography estimate used
//! both by marker decoding and by planar pose initialisation.

mod camera;
mod homography;
mod image;
mod logger;

pub use camera::{CameraIntrinsics, CameraModel, Distortion, FALLBACK_FRAME};
pub use homography::{homography_from_4pt, Homography};
pub use image::{GrayImage, GrayImageView, RgbImage};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
