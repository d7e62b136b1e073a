use super::{DetectionReport, RedactionOptions, RedactionOutcome, redact_coordinates, redact_detections};
use crate::error::RedactError;
use crate::shapes::RectInput;
use crate::sources::SourceSet;
use image::DynamicImage;
use serde::Serialize;
use tracing::{Level, debug, span};

/// IoU (percent) above which a detection-pass region is counted as a
/// re-detection of a coordinate-pass region.
const REDETECT_OVERLAP_PCT: f32 = 30.;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HybridReport {
    pub coordinates: RedactionOutcome,
    pub detection: DetectionReport,
    /// Detection-pass faces sitting on an already blurred region. They are
    /// still counted in `faces_processed`.
    pub redetected: usize,
}

impl HybridReport {
    pub fn faces_processed(&self) -> usize {
        self.coordinates.faces_processed + self.detection.faces_processed()
    }
}

/// Blur the caller's rectangles, then run detection over the blurred result.
///
/// The passes run strictly in that order and the second one sees the pixels
/// written by the first. Faces found on already blurred regions are painted
/// and counted again.
pub fn redact_hybrid(
    img: &mut DynamicImage,
    inputs: &[RectInput],
    sources: &SourceSet,
    opts: &RedactionOptions,
) -> Result<HybridReport, RedactError> {
    let span = span!(Level::DEBUG, "redact_hybrid");
    let _guard = span.enter();

    let coordinates = redact_coordinates(img, inputs, opts)?;
    let detection = redact_detections(img, sources, opts)?;

    let redetected = detection
        .outcome
        .regions()
        .filter(|d| {
            coordinates
                .regions()
                .any(|c| c.overlap_pct(d) > REDETECT_OVERLAP_PCT)
        })
        .count();
    if redetected > 0 {
        debug!("{redetected} detections overlap already blurred regions");
    }

    Ok(HybridReport {
        coordinates,
        detection,
        redetected,
    })
}
