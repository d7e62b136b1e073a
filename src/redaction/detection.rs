use super::{RedactionOptions, RedactionOutcome, paint};
use crate::error::RedactError;
use crate::shapes::FaceRect;
use crate::sources::{Availability, SourceSet};
use image::DynamicImage;
use serde::Serialize;
use tracing::{Level, debug, span, trace, warn};

/// A new candidate is dropped when more than this share of its own area is
/// already covered by an accepted one.
pub const DEDUP_OVERLAP: f64 = 0.5;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectionReport {
    pub outcome: RedactionOutcome,
    /// Raw candidates returned by all ready sources.
    pub candidates: usize,
    /// Candidates dropped as duplicates of an earlier one.
    pub duplicates: usize,
    /// One entry per source that could not run.
    pub degraded: Vec<String>,
}

impl DetectionReport {
    pub fn faces_processed(&self) -> usize {
        self.outcome.faces_processed
    }

    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

/// Append each of `found` to `accepted` unless it overlaps an accepted rect
/// by more than [`DEDUP_OVERLAP`] of its own area. Returns how many were
/// dropped.
pub fn dedup_into(accepted: &mut Vec<FaceRect>, found: impl IntoIterator<Item = FaceRect>) -> usize {
    let mut dropped = 0;
    for rect in found {
        let duplicate = accepted
            .iter()
            .any(|a| rect.overlap_fraction(a) > DEDUP_OVERLAP);

        if duplicate {
            trace!("Dropping duplicate {rect:?}");
            dropped += 1;
        } else {
            accepted.push(rect);
        }
    }

    dropped
}

/// Query every ready source in priority order and merge the results.
///
/// Returns the merged candidates, the raw candidate count, the number of
/// duplicates dropped and a note for each source that could not run.
pub fn detect_candidates(
    img: &DynamicImage,
    sources: &SourceSet,
) -> (Vec<FaceRect>, usize, usize, Vec<String>) {
    let mut accepted = Vec::new();
    let mut candidates = 0;
    let mut duplicates = 0;
    let mut degraded = Vec::new();

    if sources.is_empty() {
        degraded.push("no detection sources configured".to_string());
    }

    for source in sources.iter() {
        match source.availability() {
            Availability::Ready => {
                let found = source.detect(img);
                debug!("{} returned {} candidates", source.name(), found.len());
                candidates += found.len();
                duplicates += dedup_into(&mut accepted, found);
            }
            Availability::Unavailable(reason) => {
                degraded.push(format!("{}: {reason}", source.name()));
            }
        }
    }

    (accepted, candidates, duplicates, degraded)
}

/// Find faces with every available source and blur the deduplicated set.
///
/// Having no usable source is not an error: the image is left untouched and
/// the report lists why in `degraded`.
pub fn redact_detections(
    img: &mut DynamicImage,
    sources: &SourceSet,
    opts: &RedactionOptions,
) -> Result<DetectionReport, RedactError> {
    let span = span!(Level::DEBUG, "redact_detections");
    let _guard = span.enter();

    let (accepted, candidates, duplicates, degraded) = detect_candidates(img, sources);
    for note in &degraded {
        warn!("Face detection degraded: {note}");
    }

    let outcome = paint(img, accepted.iter(), opts)?;
    debug!(
        "Blurred {} faces from {candidates} candidates ({duplicates} duplicates)",
        outcome.faces_processed
    );

    Ok(DetectionReport {
        outcome,
        candidates,
        duplicates,
        degraded,
    })
}
