use super::{ImageContainer, TagTable};
use crate::error::RedactError;
use image::{DynamicImage, ImageBuffer, Pixel};
use tracing::{Level, debug, span};

/// Copy the pixel grid into a fresh container of the same size and color
/// type. The original container and its tag table are dropped.
pub fn scrub(container: ImageContainer) -> Result<ImageContainer, RedactError> {
    let span = span!(Level::DEBUG, "scrub");
    let _guard = span.enter();

    let ImageContainer { pixels, tags } = container;
    if !tags.is_empty() {
        debug!("Discarding tag table: {:?}", tags.summary().keys().collect::<Vec<_>>());
    }

    let fresh = match &pixels {
        DynamicImage::ImageLuma8(b) => DynamicImage::ImageLuma8(rebuild(b)?),
        DynamicImage::ImageLumaA8(b) => DynamicImage::ImageLumaA8(rebuild(b)?),
        DynamicImage::ImageRgb8(b) => DynamicImage::ImageRgb8(rebuild(b)?),
        DynamicImage::ImageRgba8(b) => DynamicImage::ImageRgba8(rebuild(b)?),
        DynamicImage::ImageLuma16(b) => DynamicImage::ImageLuma16(rebuild(b)?),
        DynamicImage::ImageLumaA16(b) => DynamicImage::ImageLumaA16(rebuild(b)?),
        DynamicImage::ImageRgb16(b) => DynamicImage::ImageRgb16(rebuild(b)?),
        DynamicImage::ImageRgba16(b) => DynamicImage::ImageRgba16(rebuild(b)?),
        DynamicImage::ImageRgb32F(b) => DynamicImage::ImageRgb32F(rebuild(b)?),
        DynamicImage::ImageRgba32F(b) => DynamicImage::ImageRgba32F(rebuild(b)?),
        other => {
            return Err(RedactError::Encode(format!(
                "cannot rebuild color type {:?}",
                other.color()
            )));
        }
    };

    Ok(ImageContainer {
        pixels: fresh,
        tags: TagTable::default(),
    })
}

fn rebuild<P: Pixel>(
    buf: &ImageBuffer<P, Vec<P::Subpixel>>,
) -> Result<ImageBuffer<P, Vec<P::Subpixel>>, RedactError> {
    ImageBuffer::from_raw(buf.width(), buf.height(), buf.as_raw().to_vec()).ok_or_else(|| {
        RedactError::Encode(format!(
            "pixel buffer does not fit {}x{}",
            buf.width(),
            buf.height()
        ))
    })
}
