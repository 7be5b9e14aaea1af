//! Pose-to-render-transform adapter and the render dispatch boundary.

use std::sync::mpsc;

use ar_markers_pose::Pose;
use serde::{Deserialize, Serialize};

/// Default scale from camera-frame translation units to renderer units.
pub const TRANSLATION_SCALE: f64 = 50.0;

/// One model transform for the 3D renderer.
///
/// `yaw`, `pitch` and `roll` carry the raw Rodrigues components in z, y, x
/// order. This is a relabeling, not a Euler decomposition; renderers that
/// consume these fields inherit that convention.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderTransform {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

/// Map a solved pose into renderer coordinates.
///
/// The renderer's y and z axes point opposite the camera's, so both
/// translation components flip sign.
pub fn adapt_pose(pose: &Pose, translation_scale: f64) -> RenderTransform {
    RenderTransform {
        x: pose.tvec.x * translation_scale,
        y: -pose.tvec.y * translation_scale,
        z: -pose.tvec.z * translation_scale,
        yaw: pose.rvec.z,
        pitch: pose.rvec.y,
        roll: pose.rvec.x,
    }
}

/// Boundary trait toward the renderer. Dispatch is fire-and-forget: the
/// pipeline never blocks on, nor observes, the consumer.
pub trait RenderSink {
    fn transform(&self, t: RenderTransform);
}

/// Channel-backed [`RenderSink`].
///
/// The consumer drains the receiver at its own pace; a renderer that only
/// wants the freshest pose reads the last pending value and drops the rest.
/// A disconnected receiver is logged and otherwise ignored.
pub struct ChannelRenderSink {
    tx: mpsc::Sender<RenderTransform>,
}

impl ChannelRenderSink {
    pub fn new() -> (Self, mpsc::Receiver<RenderTransform>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl RenderSink for ChannelRenderSink {
    fn transform(&self, t: RenderTransform) {
        if self.tx.send(t).is_err() {
            log::warn!("render sink disconnected, transform dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn adapt_scales_and_flips_translation() {
        let pose = Pose {
            rvec: Vector3::new(0.1, 0.2, 0.3),
            tvec: Vector3::new(0.02, -0.01, 0.5),
        };
        let t = adapt_pose(&pose, TRANSLATION_SCALE);
        assert_relative_eq!(t.x, 1.0);
        assert_relative_eq!(t.y, 0.5);
        assert_relative_eq!(t.z, -25.0);
    }

    #[test]
    fn adapt_relabels_rotation_components() {
        let pose = Pose {
            rvec: Vector3::new(0.1, 0.2, 0.3),
            tvec: Vector3::zeros(),
        };
        let t = adapt_pose(&pose, 1.0);
        assert_relative_eq!(t.yaw, 0.3);
        assert_relative_eq!(t.pitch, 0.2);
        assert_relative_eq!(t.roll, 0.1);
    }

    #[test]
    fn channel_consumer_can_keep_only_the_freshest() {
        let (sink, rx) = ChannelRenderSink::new();
        for i in 1..=4 {
            sink.transform(RenderTransform {
                x: i as f64,
                y: 0.0,
                z: 0.0,
                yaw: 0.0,
                pitch: 0.0,
                roll: 0.0,
            });
        }
        let last = rx.try_iter().last().unwrap();
        assert_relative_eq!(last.x, 4.0);
        assert!(rx.try_iter().next().is_none());
    }

    #[test]
    fn disconnected_receiver_does_not_panic() {
        let (sink, rx) = ChannelRenderSink::new();
        drop(rx);
        sink.transform(RenderTransform {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
        });
    }
}
