//! Square-marker dictionary and full-frame detection.
//!
//! This crate owns:
//! - the embedded built-in dictionary (compiled into the binary),
//! - matching observed marker codes against the dictionary under rotation,
//! - quad candidate extraction from a grayscale frame,
//! - bit decoding of each candidate into a [`MarkerObservation`].
//!
//! The detector is stateless per call but holds preallocated scratch, so it
//! is constructed once per session and must not be invoked concurrently.

pub mod builtins;
mod decode;
mod dictionary;
mod matcher;
mod quads;
mod threshold;

mod detector;

pub use detector::{DetectorParams, MarkerDetector, MarkerObservation};
pub use dictionary::Dictionary;
pub use matcher::{rotate_code, CodeMatch, Matcher};
pub use quads::QuadCandidate;
