use crate::error::RedactError;
use crate::shapes::{FaceRect, Rect, RectInput};
use crate::sources::SourceSet;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::trace;

pub use blur::Blur;
pub use coordinates::redact_coordinates;
pub use detection::{DEDUP_OVERLAP, DetectionReport, dedup_into, detect_candidates, redact_detections};
pub use hybrid::{HybridReport, redact_hybrid};
pub use kernel::{DEFAULT_STRENGTH, Kernel, MIN_KERNEL};
pub use sanitize::{MIN_PADDING, sanitize};

mod blur;
mod coordinates;
mod detection;
mod hybrid;
mod kernel;
mod sanitize;

/// Where the face rectangles come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RedactionMode {
    /// Only rectangles supplied by the caller.
    Coordinates,
    /// Only rectangles found by the configured detection sources.
    Detection,
    /// Caller rectangles first, then detection over the result.
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedactionOptions {
    pub strength: u32,
    pub pad: bool,
}

impl Default for RedactionOptions {
    fn default() -> Self {
        Self {
            strength: DEFAULT_STRENGTH,
            pad: true,
        }
    }
}

impl RedactionOptions {
    pub fn with_strength(strength: u32) -> Self {
        Self {
            strength,
            ..Default::default()
        }
    }

    pub fn kernel(&self) -> Kernel {
        Kernel::from_strength(self.strength)
    }
}

/// A face that made it through sanitization and was painted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaintedFace {
    pub rect: FaceRect,
    pub region: Rect,
}

/// Result of one redaction pass. The image itself is mutated in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RedactionOutcome {
    pub faces_processed: usize,
    pub faces: Vec<PaintedFace>,
}

impl RedactionOutcome {
    pub fn regions(&self) -> impl Iterator<Item = Rect> + '_ {
        self.faces.iter().map(|f| f.region)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum RedactionReport {
    Coordinates(RedactionOutcome),
    Detection(DetectionReport),
    Hybrid(HybridReport),
}

impl RedactionReport {
    pub fn faces_processed(&self) -> usize {
        match self {
            RedactionReport::Coordinates(o) => o.faces_processed,
            RedactionReport::Detection(d) => d.faces_processed(),
            RedactionReport::Hybrid(h) => h.faces_processed(),
        }
    }

    /// Every painted face, in painting order.
    pub fn faces(&self) -> Vec<&PaintedFace> {
        match self {
            RedactionReport::Coordinates(o) => o.faces.iter().collect(),
            RedactionReport::Detection(d) => d.outcome.faces.iter().collect(),
            RedactionReport::Hybrid(h) => h
                .coordinates
                .faces
                .iter()
                .chain(h.detection.outcome.faces.iter())
                .collect(),
        }
    }

    pub fn degraded(&self) -> &[String] {
        match self {
            RedactionReport::Coordinates(_) => &[],
            RedactionReport::Detection(d) => &d.degraded,
            RedactionReport::Hybrid(h) => &h.detection.degraded,
        }
    }
}

/// Run the redaction pass(es) selected by `mode` over `img`.
///
/// Fails only when `img` cannot be painted at all; rectangles that fall
/// outside the image just lower the count.
pub fn redact(
    img: &mut DynamicImage,
    mode: RedactionMode,
    inputs: &[RectInput],
    sources: &SourceSet,
    opts: &RedactionOptions,
) -> Result<RedactionReport, RedactError> {
    Ok(match mode {
        RedactionMode::Coordinates => {
            RedactionReport::Coordinates(redact_coordinates(img, inputs, opts)?)
        }
        RedactionMode::Detection => RedactionReport::Detection(redact_detections(img, sources, opts)?),
        RedactionMode::Hybrid => {
            RedactionReport::Hybrid(redact_hybrid(img, inputs, sources, opts)?)
        }
    })
}

trait Executable {
    fn execute(&self, img: &mut DynamicImage) -> Result<(), RedactError>;
}

/// Sanitize and blur each rect in order. Rects that sanitize to nothing are
/// skipped and do not count; a rect that cannot be painted fails the pass.
fn paint<'a>(
    img: &mut DynamicImage,
    rects: impl IntoIterator<Item = &'a FaceRect>,
    opts: &RedactionOptions,
) -> Result<RedactionOutcome, RedactError> {
    let kernel = opts.kernel();
    let (width, height) = (img.width(), img.height());
    let mut outcome = RedactionOutcome::default();

    for rect in rects {
        let Some(region) = sanitize(rect, width, height, opts.pad) else {
            trace!("Dropping {rect:?}, nothing inside {width}x{height}");
            continue;
        };

        Blur::new(region, kernel).execute(img)?;
        trace!("Blurred {region:?} with kernel {}", kernel.size());
        outcome.faces.push(PaintedFace {
            rect: rect.clone(),
            region,
        });
    }

    outcome.faces_processed = outcome.faces.len();
    Ok(outcome)
}
