use crate::error::Rejection;
use crate::metadata::OutputFormat;
use std::path::Path;
use uuid::Uuid;

pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Check an upload before anything is decoded. Returns the output format
/// implied by the file name.
pub fn validate_upload(filename: &str, bytes: &[u8], max_bytes: usize) -> Result<OutputFormat, Rejection> {
    if filename.trim().is_empty() {
        return Err(Rejection::MissingFile);
    }

    let format = OutputFormat::from_filename(filename).ok_or_else(|| {
        Rejection::UnsupportedFormat(
            Path::new(filename)
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_else(|| "no extension".to_string()),
        )
    })?;

    if bytes.len() > max_bytes {
        return Err(Rejection::TooLarge {
            size: bytes.len(),
            max: max_bytes,
        });
    }
    if bytes.is_empty() {
        return Err(Rejection::EmptyFile);
    }

    Ok(format)
}

/// Reduce a client supplied name to a plain basename made of
/// `[A-Za-z0-9._-]`.
pub fn secure_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches(['.', '_']);

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

pub fn processed_name(id: Uuid, safe_name: &str) -> String {
    format!("processed_{id}_{safe_name}")
}

pub fn download_name(id: Uuid, safe_name: &str) -> String {
    format!("privacy_protected_{id}_{safe_name}")
}
