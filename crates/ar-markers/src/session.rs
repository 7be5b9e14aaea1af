//! Session context: configuration, detector ownership and the shared
//! camera store.

use std::sync::{Arc, RwLock};

use ar_markers_core::CameraModel;
use ar_markers_dict::builtins::builtin_dictionary;
use ar_markers_dict::{DetectorParams, MarkerDetector};
use ar_markers_pose::MarkerGeometry;
use serde::{Deserialize, Serialize};

use crate::adapter::TRANSLATION_SCALE;
use crate::error::SessionError;

/// Everything a session needs up front. Built once; the per-frame pipeline
/// never consults configuration sources again.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Builtin dictionary name, e.g. `"DICT_6X6_50"`.
    pub dictionary: String,
    pub detector: DetectorParams,
    /// Physical marker side length; sets the unit of the solved translation.
    pub side_length: f64,
    /// Scale applied to translation when adapting poses for the renderer.
    pub translation_scale: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dictionary: "DICT_6X6_50".to_owned(),
            detector: DetectorParams::default(),
            side_length: 0.04,
            translation_scale: TRANSLATION_SCALE,
        }
    }
}

/// Shared camera model store.
///
/// Calibration arrives asynchronously from the capture side while the
/// pipeline reads once per frame. Writers replace the whole model; readers
/// take a value snapshot, so a frame may run on a model that is one update
/// stale. That staleness is accepted.
#[derive(Clone, Debug, Default)]
pub struct SharedCamera {
    inner: Arc<RwLock<Option<CameraModel>>>,
}

impl SharedCamera {
    pub fn set(&self, model: CameraModel) {
        let mut slot = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(model);
    }

    pub fn clear(&self) {
        let mut slot = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }

    /// Copy out the current model, if any.
    pub fn snapshot(&self) -> Option<CameraModel> {
        *self.inner.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// One capture run's worth of marker-tracking state.
///
/// Owns the detector (not reentrant) and the shared camera handle. Frame
/// processing takes `&mut self`, which is the whole single-frame-in-flight
/// contract.
pub struct Session {
    pub(crate) detector: MarkerDetector,
    pub(crate) geometry: MarkerGeometry,
    pub(crate) translation_scale: f64,
    camera: SharedCamera,
}

impl Session {
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        let dictionary = builtin_dictionary(&config.dictionary).ok_or_else(|| {
            SessionError::DictionaryUnavailable {
                name: config.dictionary.clone(),
            }
        })?;
        let geometry = MarkerGeometry::new(config.side_length);
        if !geometry.is_valid() {
            return Err(SessionError::InvalidSideLength {
                side_length: config.side_length,
            });
        }
        log::info!(
            "session start: dictionary {} ({} ids), marker side {}",
            dictionary.name,
            dictionary.len(),
            config.side_length
        );
        Ok(Self {
            detector: MarkerDetector::new(dictionary, config.detector),
            geometry,
            translation_scale: config.translation_scale,
            camera: SharedCamera::default(),
        })
    }

    /// Handle for calibration writers on other threads.
    pub fn camera(&self) -> SharedCamera {
        self.camera.clone()
    }

    /// Push a new camera model; takes effect from the next frame.
    pub fn set_camera(&self, model: CameraModel) {
        self.camera.set(model);
    }

    pub fn geometry(&self) -> MarkerGeometry {
        self.geometry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ar_markers_core::CameraIntrinsics;
    use ar_markers_core::Distortion;

    #[test]
    fn unknown_dictionary_is_fatal() {
        let config = SessionConfig {
            dictionary: "DICT_9X9_1000".to_owned(),
            ..SessionConfig::default()
        };
        assert_eq!(
            Session::new(config).err(),
            Some(SessionError::DictionaryUnavailable {
                name: "DICT_9X9_1000".to_owned()
            })
        );
    }

    #[test]
    fn camera_store_snapshots_latest_value() {
        let store = SharedCamera::default();
        assert!(store.snapshot().is_none());

        store.set(CameraModel::default_for_frame(640, 480));
        let first = store.snapshot().unwrap();
        assert_eq!(first.intrinsics.fx, 512.0);

        store.set(CameraModel::new(
            CameraIntrinsics {
                fx: 800.0,
                fy: 800.0,
                cx: 320.0,
                cy: 240.0,
            },
            Distortion::default(),
        ));
        assert_eq!(store.snapshot().unwrap().intrinsics.fx, 800.0);

        store.clear();
        assert!(store.snapshot().is_none());
    }

    #[test]
    fn non_positive_side_length_is_rejected_at_construction() {
        for side_length in [0.0, -0.04, f64::NAN] {
            let config = SessionConfig {
                side_length,
                ..SessionConfig::default()
            };
            assert!(
                matches!(
                    Session::new(config),
                    Err(SessionError::InvalidSideLength { .. })
                ),
                "side_length {side_length} accepted"
            );
        }
    }

    #[test]
    fn session_config_serde_round_trip() {
        let config = SessionConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: SessionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.dictionary, config.dictionary);
        assert_eq!(back.side_length, config.side_length);
        assert_eq!(back.translation_scale, config.translation_scale);
        assert_eq!(back.detector.max_hamming, config.detector.max_hamming);
    }

    #[test]
    fn camera_handle_shares_state_with_session() {
        let session = Session::new(SessionConfig::default()).unwrap();
        let handle = session.camera();
        handle.set(CameraModel::fallback());
        assert!(session.camera().snapshot().is_some());
    }
}
