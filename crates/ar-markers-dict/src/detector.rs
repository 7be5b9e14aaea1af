//! Session-scoped marker detector.

use ar_markers_core::GrayImageView;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::decode::decode_quad;
use crate::quads::{find_quads, QuadCandidate, QuadLimits};
use crate::threshold::binarize_adaptive;
use crate::{Dictionary, Matcher};

/// Detection parameter set, constructed once per session.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DetectorParams {
    /// Adaptive threshold box radius in pixels.
    pub adaptive_radius: usize,
    /// Adaptive threshold offset below the local mean.
    pub adaptive_offset: i32,
    /// Minimum contour perimeter, as a fraction of the larger frame dimension.
    pub min_perimeter_rate: f32,
    /// Maximum contour perimeter, as a fraction of the larger frame dimension.
    pub max_perimeter_rate: f32,
    /// Douglas-Peucker tolerance as a fraction of the contour perimeter.
    pub approx_eps_frac: f32,
    /// Minimum distance from quad corners to the frame border, in pixels.
    pub min_border_distance: f32,
    /// Bit-sampling inset toward the cell-grid center (fraction).
    pub bit_inset_frac: f32,
    /// Minimum fraction of border cells that must read black.
    pub min_border_score: f32,
    /// Maximum Hamming distance accepted by the dictionary matcher.
    pub max_hamming: u8,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            adaptive_radius: 15,
            adaptive_offset: 7,
            min_perimeter_rate: 0.03,
            max_perimeter_rate: 4.0,
            approx_eps_frac: 0.04,
            min_border_distance: 3.0,
            bit_inset_frac: 0.08,
            min_border_score: 0.85,
            max_hamming: 2,
        }
    }
}

/// One detected marker instance.
///
/// Corners are ordered clockwise in image coordinates starting at the
/// marker's printed top-left corner, so downstream 3D correspondences are
/// rotation-independent. The same id may appear more than once when several
/// physical copies are visible; each instance is independent.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MarkerObservation {
    pub id: u32,
    pub corners: [Point2<f32>; 4],
    /// Bit errors corrected while matching against the dictionary.
    pub hamming: u8,
}

/// Full-frame marker detector.
///
/// Holds the dictionary matcher and reusable scratch buffers. Scratch is
/// reset at the start of every call; nothing derived from one frame survives
/// into the next. Not reentrant: the per-frame pipeline is the only caller
/// and processes one frame at a time.
pub struct MarkerDetector {
    matcher: Matcher,
    params: DetectorParams,
    mask: Vec<u8>,
    visited: Vec<u8>,
    quads: Vec<QuadCandidate>,
    samples: Vec<u8>,
}

impl MarkerDetector {
    pub fn new(dictionary: Dictionary, params: DetectorParams) -> Self {
        Self {
            matcher: Matcher::new(dictionary, params.max_hamming),
            params,
            mask: Vec::new(),
            visited: Vec::new(),
            quads: Vec::new(),
            samples: Vec::new(),
        }
    }

    pub fn dictionary(&self) -> Dictionary {
        self.matcher.dictionary()
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    /// Detect all markers visible in a grayscale frame.
    ///
    /// Regions that fail any stage (contrast, quad shape, border, bit
    /// matching) are silently omitted; an empty result is a valid outcome.
    pub fn detect(&mut self, gray: &GrayImageView<'_>) -> Vec<MarkerObservation> {
        if gray.width == 0 || gray.height == 0 || gray.data.len() != gray.width * gray.height {
            log::warn!("detector given malformed frame ({}x{})", gray.width, gray.height);
            return Vec::new();
        }

        binarize_adaptive(
            gray,
            self.params.adaptive_radius,
            self.params.adaptive_offset,
            &mut self.mask,
        );

        let max_dim = gray.width.max(gray.height) as f32;
        let limits = QuadLimits {
            min_perimeter: self.params.min_perimeter_rate * max_dim,
            max_perimeter: self.params.max_perimeter_rate * max_dim,
            approx_eps_frac: self.params.approx_eps_frac,
            min_border_distance: self.params.min_border_distance,
            min_side: MIN_QUAD_SIDE_PX,
        };
        find_quads(
            &self.mask,
            gray.width,
            gray.height,
            &limits,
            &mut self.visited,
            &mut self.quads,
        );

        let marker_bits = self.matcher.dictionary().marker_size;
        let mut out = Vec::new();
        for quad in &self.quads {
            let Some(code) = decode_quad(
                gray,
                quad,
                marker_bits,
                self.params.bit_inset_frac,
                self.params.min_border_score,
                &mut self.samples,
            ) else {
                continue;
            };
            let Some(m) = self.matcher.match_code(code) else {
                continue;
            };

            out.push(MarkerObservation {
                id: m.id,
                corners: rotate_corners(&quad.corners, m.rotation),
                hamming: m.hamming,
            });
        }

        log::debug!(
            "detect: {} quad candidate(s), {} marker(s)",
            self.quads.len(),
            out.len()
        );
        out
    }
}

const MIN_QUAD_SIDE_PX: f32 = 12.0;

/// Re-index quad corners so index 0 is the marker's printed top-left.
///
/// The matcher reports rotation `r` when the observed code equals the
/// dictionary code rotated `r` quarter-turns clockwise; the printed top-left
/// then sits at sampled corner `r`.
fn rotate_corners(corners: &[Point2<f32>; 4], rotation: u8) -> [Point2<f32>; 4] {
    let r = rotation as usize;
    [
        corners[r],
        corners[(r + 1) % 4],
        corners[(r + 2) % 4],
        corners[(r + 3) % 4],
    ]
}
