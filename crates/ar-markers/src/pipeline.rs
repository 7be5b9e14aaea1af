//! Per-frame orchestration: detect, solve, annotate, dispatch.

use ar_markers_core::{CameraModel, RgbImage};
use ar_markers_dict::MarkerObservation;
use ar_markers_pose::overlay::{axis_segments, cube_segments, marker_outline_segments};
use ar_markers_pose::estimate_marker_pose;

use crate::adapter::adapt_pose;
use crate::draw::draw_segments;
use crate::error::MarkerError;
use crate::session::Session;
use crate::source::Frame;
use crate::RenderSink;

const OUTLINE_THICKNESS: i32 = 0;
const AXIS_THICKNESS: i32 = 1;
const CUBE_THICKNESS: i32 = 0;

/// What happened to one frame.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    /// No (valid) camera model was available; the frame was left untouched.
    SkippedNoIntrinsics,
    /// Detection ran and found nothing.
    NoMarkers,
    /// One entry per detected marker, in detection order.
    Processed(Vec<MarkerResult>),
}

/// Per-frame report returned by [`Session::process_frame`].
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    pub outcome: FrameOutcome,
}

impl FrameReport {
    /// Marker results, empty for skipped and markerless frames.
    pub fn markers(&self) -> &[MarkerResult] {
        match &self.outcome {
            FrameOutcome::Processed(results) => results,
            _ => &[],
        }
    }

    pub fn dispatched(&self) -> usize {
        self.markers()
            .iter()
            .filter(|m| matches!(m.outcome, Ok(s) if s.dispatched))
            .count()
    }
}

/// Outcome for one marker observation. Failures stay local: they never
/// affect sibling markers in the same frame.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerResult {
    pub id: u32,
    pub outcome: Result<MarkerSuccess, MarkerError>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerSuccess {
    /// Mean corner reprojection error of the solved pose, pixels.
    pub reproj_error: f64,
    /// Whether a render transform was sent for this marker.
    pub dispatched: bool,
}

impl Session {
    /// Run the full pipeline on one frame.
    ///
    /// Detects markers in `frame.gray`, solves each marker's pose, draws the
    /// outline, axis triad and cube overlays into `frame.rgb`, and sends one
    /// render transform per successfully solved marker to `sink`.
    pub fn process_frame(&mut self, frame: &mut Frame, sink: &dyn RenderSink) -> FrameReport {
        self.run_frame(frame, Some(sink))
    }

    /// Single-image mode: same pipeline, no render dispatch.
    ///
    /// A markerless image reports [`FrameOutcome::NoMarkers`] so callers can
    /// surface "no marker found" instead of showing an unchanged picture.
    pub fn annotate_image(&mut self, frame: &mut Frame) -> FrameReport {
        self.run_frame(frame, None)
    }

    fn run_frame(&mut self, frame: &mut Frame, sink: Option<&dyn RenderSink>) -> FrameReport {
        let Some(camera) = self.camera().snapshot().filter(|c| c.is_valid()) else {
            log::warn!("frame skipped: no valid camera intrinsics yet");
            return FrameReport {
                outcome: FrameOutcome::SkippedNoIntrinsics,
            };
        };

        let observations = self.detector.detect(&frame.gray.view());
        if observations.is_empty() {
            return FrameReport {
                outcome: FrameOutcome::NoMarkers,
            };
        }

        let results = self.process_observations(&observations, &camera, &mut frame.rgb, sink);
        let solved = results.iter().filter(|r| r.outcome.is_ok()).count();
        log::debug!(
            "frame: {} marker(s) detected, {} pose(s) solved, {} dispatched",
            results.len(),
            solved,
            results
                .iter()
                .filter(|r| matches!(r.outcome, Ok(s) if s.dispatched))
                .count()
        );

        FrameReport {
            outcome: FrameOutcome::Processed(results),
        }
    }

    fn process_observations(
        &mut self,
        observations: &[MarkerObservation],
        camera: &CameraModel,
        rgb: &mut RgbImage,
        sink: Option<&dyn RenderSink>,
    ) -> Vec<MarkerResult> {
        observations
            .iter()
            .map(|obs| MarkerResult {
                id: obs.id,
                outcome: self.process_one(obs, camera, rgb, sink),
            })
            .collect()
    }

    fn process_one(
        &self,
        obs: &MarkerObservation,
        camera: &CameraModel,
        rgb: &mut RgbImage,
        sink: Option<&dyn RenderSink>,
    ) -> Result<MarkerSuccess, MarkerError> {
        let estimate = estimate_marker_pose(&obs.corners, self.geometry, camera).map_err(|e| {
            log::warn!("marker {}: pose solve failed ({e})", obs.id);
            MarkerError::from(e)
        })?;

        draw_segments(rgb, &marker_outline_segments(&obs.corners), OUTLINE_THICKNESS);
        draw_segments(
            rgb,
            &axis_segments(&estimate.pose, self.geometry.side_length, camera),
            AXIS_THICKNESS,
        );
        draw_segments(
            rgb,
            &cube_segments(&estimate.pose, self.geometry, camera),
            CUBE_THICKNESS,
        );

        let dispatched = if let Some(sink) = sink {
            sink.transform(adapt_pose(&estimate.pose, self.translation_scale));
            true
        } else {
            false
        };

        Ok(MarkerSuccess {
            reproj_error: estimate.mean_reproj_px,
            dispatched,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionConfig;
    use nalgebra::Point2;

    fn session() -> Session {
        Session::new(SessionConfig::default()).unwrap()
    }

    #[test]
    fn marker_failure_does_not_suppress_siblings() {
        let mut session = session();
        let camera = CameraModel::new(
            ar_markers_core::CameraIntrinsics {
                fx: 800.0,
                fy: 800.0,
                cx: 320.0,
                cy: 240.0,
            },
            ar_markers_core::Distortion::default(),
        );

        let bad = MarkerObservation {
            id: 7,
            corners: [
                Point2::new(f32::NAN, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(1.0, 1.0),
                Point2::new(0.0, 1.0),
            ],
            hamming: 0,
        };
        let good = MarkerObservation {
            id: 7,
            corners: [
                Point2::new(300.0, 200.0),
                Point2::new(340.0, 200.0),
                Point2::new(340.0, 240.0),
                Point2::new(300.0, 240.0),
            ],
            hamming: 0,
        };

        let (sink, rx) = crate::ChannelRenderSink::new();
        let mut rgb = RgbImage::filled(640, 480, [0, 0, 0]);
        let results =
            session.process_observations(&[bad, good], &camera, &mut rgb, Some(&sink));

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].outcome, Err(MarkerError::MalformedCorners));
        let success = results[1].outcome.unwrap();
        assert!(success.dispatched);
        assert!(success.reproj_error < 1.0);
        assert_eq!(rx.try_iter().count(), 1);
    }
}
