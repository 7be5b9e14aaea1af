//! Detect markers in an image file and save the annotated overlay.
//!
//! Usage: cargo run -p ar-markers --example annotate -- input.png [output.png]

use std::env;
use std::path::PathBuf;

use ar_markers::core::{init_with_level, CameraModel};
use ar_markers::io::{frame_from_image, rgb_to_image};
use ar_markers::{Session, SessionConfig};
use image::ImageReader;
use log::{info, warn, LevelFilter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_with_level(LevelFilter::Debug)?;

    let input = env::args()
        .nth(1)
        .ok_or("usage: annotate <input> [output]")?;
    let output = env::args()
        .nth(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("annotated.png"));

    let img = ImageReader::open(&input)?.decode()?;
    let mut frame = frame_from_image(&img);
    info!("loaded {} ({}x{})", input, frame.width(), frame.height());

    let mut session = Session::new(SessionConfig::default())?;
    session.set_camera(CameraModel::default_for_frame(
        frame.width(),
        frame.height(),
    ));

    let report = session.annotate_image(&mut frame);
    let markers = report.markers();
    if markers.is_empty() {
        warn!("no marker found");
    }
    for m in markers {
        match &m.outcome {
            Ok(s) => info!("marker {}: mean reprojection {:.3} px", m.id, s.reproj_error),
            Err(e) => warn!("marker {}: {e}", m.id),
        }
    }

    let out = rgb_to_image(&frame.rgb).ok_or("display buffer too large to export")?;
    out.save(&output)?;
    println!("wrote annotated image to {}", output.display());
    Ok(())
}
