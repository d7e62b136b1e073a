use crate::error::{RedactError, Rejection};
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader};
use std::collections::BTreeMap;
use std::io::Cursor;
use tracing::{Level, debug, span, warn};

pub use encode::{JPEG_QUALITY, OutputFormat, encode};
pub use scrub::scrub;

mod encode;
mod scrub;

const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// Auxiliary data carried next to the pixels in the uploaded container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagTable {
    pub exif: Option<Vec<u8>>,
    pub icc_profile: Option<Vec<u8>>,
    pub orientation: Option<Orientation>,
}

impl TagTable {
    pub fn is_empty(&self) -> bool {
        self.exif.is_none() && self.icc_profile.is_none() && self.orientation.is_none()
    }

    /// Human readable view of the EXIF IFD0 entries, keyed by tag name.
    pub fn summary(&self) -> BTreeMap<String, String> {
        let mut summary = self
            .exif
            .as_deref()
            .map(summarize_exif)
            .unwrap_or_default();

        if let Some(icc) = &self.icc_profile {
            summary.insert("ICCProfile".to_string(), format!("{} bytes", icc.len()));
        }

        summary
    }
}

fn summarize_exif(raw: &[u8]) -> BTreeMap<String, String> {
    let tiff = raw.strip_prefix(EXIF_HEADER).unwrap_or(raw);
    let parsed = match exif::Reader::new().read_raw(tiff.to_vec()) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Unreadable EXIF block: {e}");
            return BTreeMap::new();
        }
    };

    parsed
        .fields()
        .filter(|f| f.ifd_num == exif::In::PRIMARY)
        .map(|f| {
            let value = match &f.value {
                exif::Value::Ascii(parts) => parts
                    .iter()
                    .map(|p| String::from_utf8_lossy(p).trim_end_matches('\0').trim().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                _ => f.display_value().to_string(),
            };
            (f.tag.to_string(), value)
        })
        .collect()
}

/// Decoded pixels plus the tag table they arrived with.
#[derive(Debug, Clone)]
pub struct ImageContainer {
    pub pixels: DynamicImage,
    pub tags: TagTable,
}

impl ImageContainer {
    pub fn new(pixels: DynamicImage) -> Self {
        Self {
            pixels,
            tags: TagTable::default(),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Decode an uploaded file, keeping its tag table.
///
/// The EXIF orientation is applied to the pixels so rectangles supplied by
/// clients line up with what they displayed. Wide sample types are brought
/// down to 8 bits per channel.
pub fn decode(bytes: &[u8]) -> Result<ImageContainer, RedactError> {
    let span = span!(Level::DEBUG, "decode");
    let _guard = span.enter();

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| RedactError::Decode(e.to_string()))?;
    match reader.format() {
        Some(ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP) => {}
        Some(other) => {
            return Err(Rejection::UnsupportedFormat(format!("{other:?} content")).into());
        }
        None => return Err(RedactError::Decode("unrecognized image content".to_string())),
    }
    let mut decoder = reader
        .into_decoder()
        .map_err(|e| RedactError::Decode(e.to_string()))?;

    let exif = decoder.exif_metadata().unwrap_or_else(|e| {
        warn!("Unreadable EXIF block: {e}");
        None
    });
    let icc_profile = decoder.icc_profile().unwrap_or_else(|e| {
        warn!("Unreadable ICC profile: {e}");
        None
    });
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);

    let mut pixels =
        DynamicImage::from_decoder(decoder).map_err(|e| RedactError::Decode(e.to_string()))?;
    if pixels.width() == 0 || pixels.height() == 0 {
        return Err(RedactError::Decode("image dimensions are zero".to_string()));
    }
    pixels.apply_orientation(orientation);

    let tags = TagTable {
        exif,
        icc_profile,
        orientation: (orientation != Orientation::NoTransforms).then_some(orientation),
    };
    debug!(
        "Decoded {}x{} {:?}, tags present: {}",
        pixels.width(),
        pixels.height(),
        pixels.color(),
        !tags.is_empty()
    );

    Ok(ImageContainer {
        pixels: to_8bit(pixels),
        tags,
    })
}

fn to_8bit(img: DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_) => img,
        DynamicImage::ImageLuma16(_) => DynamicImage::ImageLuma8(img.to_luma8()),
        DynamicImage::ImageLumaA16(_) => DynamicImage::ImageLumaA8(img.to_luma_alpha8()),
        other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}
