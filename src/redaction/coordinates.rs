use super::{RedactionOptions, RedactionOutcome, paint};
use crate::error::RedactError;
use crate::shapes::RectInput;
use image::DynamicImage;
use tracing::{Level, debug, span};

/// Blur every caller supplied rectangle, in order.
///
/// Malformed entries are skipped one by one; they only lower
/// `faces_processed`. Touches nothing but `img`.
pub fn redact_coordinates(
    img: &mut DynamicImage,
    inputs: &[RectInput],
    opts: &RedactionOptions,
) -> Result<RedactionOutcome, RedactError> {
    let span = span!(Level::DEBUG, "redact_coordinates");
    let _guard = span.enter();

    let rects = inputs.iter().filter_map(|input| match input {
        RectInput::Rect(r) => Some(r),
        RectInput::Malformed(v) => {
            debug!("Skipping malformed face rectangle {v}");
            None
        }
    });

    let outcome = paint(img, rects, opts)?;
    debug!(
        "Blurred {} of {} supplied rectangles",
        outcome.faces_processed,
        inputs.len()
    );

    Ok(outcome)
}
