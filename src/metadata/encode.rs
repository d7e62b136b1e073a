use crate::error::RedactError;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageEncoder, ImageFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{Level, debug, span};

pub const JPEG_QUALITY: u8 = 95;

/// Container format of the processed file, picked from the upload's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
}

impl OutputFormat {
    pub fn from_extension(ext: &str) -> Option<OutputFormat> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            "webp" => Some(OutputFormat::WebP),
            _ => None,
        }
    }

    pub fn from_filename(name: &str) -> Option<OutputFormat> {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(OutputFormat::from_extension)
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::WebP => ImageFormat::WebP,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
        }
    }
}

/// Encode with each format's native options: JPEG at quality 95, PNG at
/// best compression with adaptive filtering, WebP lossless.
///
/// Nothing but pixels is written; the encoders get no EXIF or ICC data.
pub fn encode(img: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>, RedactError> {
    let span = span!(Level::DEBUG, "encode");
    let _guard = span.enter();

    let mut buffer = Vec::new();
    let (width, height) = (img.width(), img.height());

    let res = match format {
        OutputFormat::Jpeg => {
            // JPEG has no alpha channel
            let opaque = if img.color().has_color() {
                DynamicImage::ImageRgb8(img.to_rgb8())
            } else {
                DynamicImage::ImageLuma8(img.to_luma8())
            };
            JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY).write_image(
                opaque.as_bytes(),
                width,
                height,
                opaque.color().into(),
            )
        }
        OutputFormat::Png => {
            PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, PngFilter::Adaptive)
                .write_image(img.as_bytes(), width, height, img.color().into())
        }
        OutputFormat::WebP => {
            let img = match img {
                DynamicImage::ImageLuma8(_)
                | DynamicImage::ImageLumaA8(_)
                | DynamicImage::ImageRgb8(_)
                | DynamicImage::ImageRgba8(_) => img.clone(),
                other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
                other => DynamicImage::ImageRgb8(other.to_rgb8()),
            };
            WebPEncoder::new_lossless(&mut buffer).write_image(
                img.as_bytes(),
                width,
                height,
                img.color().into(),
            )
        }
    };
    res.map_err(|e| RedactError::Encode(e.to_string()))?;

    debug!("Encoded {width}x{height} as {format:?}: {} bytes", buffer.len());
    Ok(buffer)
}
