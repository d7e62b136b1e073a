use crate::error::RedactError;
use crate::metadata::{OutputFormat, decode, encode, scrub};
use crate::redaction::{DEFAULT_STRENGTH, RedactionMode, RedactionOptions, RedactionReport, redact};
use crate::shapes::RectInput;
use crate::sources::SourceSet;
use crate::stats::{FaceDetection, ProcessingRecord, StatsStore};
use crate::upload::{MAX_UPLOAD_BYTES, download_name, processed_name, secure_filename, validate_upload};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Level, info, span, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub max_upload_bytes: usize,
    pub pad_faces: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: MAX_UPLOAD_BYTES,
            pad_faces: true,
        }
    }
}

/// One uploaded file plus the caller's processing choices.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub filename: String,
    pub bytes: Vec<u8>,
    /// `None` leaves faces alone.
    pub mode: Option<RedactionMode>,
    pub faces: Vec<RectInput>,
    pub strength: u32,
    pub strip_metadata: bool,
    pub source_identity: Option<String>,
    pub user_agent: Option<String>,
}

impl ProcessRequest {
    /// Blur with every available means and strip metadata.
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
            mode: Some(RedactionMode::Hybrid),
            faces: Vec::new(),
            strength: DEFAULT_STRENGTH,
            strip_metadata: true,
            source_identity: None,
            user_agent: None,
        }
    }

    pub fn mode(mut self, mode: Option<RedactionMode>) -> Self {
        self.mode = mode;
        self
    }

    pub fn faces(mut self, faces: Vec<RectInput>) -> Self {
        self.faces = faces;
        self
    }

    pub fn strength(mut self, strength: u32) -> Self {
        self.strength = strength;
        self
    }

    pub fn strip_metadata(mut self, strip: bool) -> Self {
        self.strip_metadata = strip;
        self
    }

    pub fn source(mut self, identity: impl Into<String>, user_agent: Option<String>) -> Self {
        self.source_identity = Some(identity.into());
        self.user_agent = user_agent;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessedImage {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub filename: String,
    pub download_name: String,
    pub width: u32,
    pub height: u32,
    pub original_size: usize,
    pub processed_size: usize,
    /// Percent saved relative to the upload, one decimal.
    pub size_reduction: f64,
    pub original_metadata: BTreeMap<String, String>,
    pub redaction: Option<RedactionReport>,
}

impl ProcessedImage {
    pub fn faces_processed(&self) -> usize {
        self.redaction
            .as_ref()
            .map(|r| r.faces_processed())
            .unwrap_or(0)
    }
}

/// Result of one invocation. `record` has the same shape whether or not
/// processing succeeded and has already been handed to the stats store.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub record: ProcessingRecord,
    pub result: Result<ProcessedImage, RedactError>,
}

impl ProcessOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Upload-to-output processing with explicit collaborators: the detection
/// sources used for automated redaction and the store that records every
/// outcome.
pub struct Pipeline {
    sources: SourceSet,
    store: Arc<dyn StatsStore>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(sources: SourceSet, store: Arc<dyn StatsStore>) -> Pipeline {
        Pipeline {
            sources,
            store,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Pipeline {
        self.config = config;
        self
    }

    pub fn process(&self, req: ProcessRequest) -> ProcessOutcome {
        let span = span!(Level::INFO, "process");
        let _guard = span.enter();

        let start = Instant::now();
        let id = Uuid::new_v4();
        let mut record = ProcessingRecord {
            source_identity: req.source_identity.clone(),
            user_agent: req.user_agent.clone(),
            original_filename: Some(req.filename.clone()),
            original_size: req.bytes.len() as u64,
            strength: req.mode.map(|_| req.strength),
            ..ProcessingRecord::started(id)
        };

        let result = self.run(&req, id, &mut record);
        record.processing_time_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(out) => {
                record.success = true;
                record.processed_size = out.processed_size as u64;
                record.processed_filename = Some(out.filename.clone());
                info!(
                    "Processed {} in {}ms: {} faces, {} -> {} bytes",
                    req.filename,
                    record.processing_time_ms,
                    record.faces_detected,
                    out.original_size,
                    out.processed_size
                );
            }
            Err(e) => {
                record.success = false;
                record.error = Some(e.to_string());
                warn!("Processing {} failed ({}): {e}", req.filename, e.kind());
            }
        }

        if let Err(e) = self.store.record(record.clone()) {
            warn!("Could not record session {id}: {e}");
        }

        ProcessOutcome { record, result }
    }

    fn run(
        &self,
        req: &ProcessRequest,
        id: Uuid,
        record: &mut ProcessingRecord,
    ) -> Result<ProcessedImage, RedactError> {
        let format = validate_upload(&req.filename, &req.bytes, self.config.max_upload_bytes)?;
        let safe_name = secure_filename(&req.filename);

        let mut container = decode(&req.bytes)?;
        let original_metadata = container.tags.summary();

        let opts = RedactionOptions {
            strength: req.strength,
            pad: self.config.pad_faces,
        };
        let redaction = req
            .mode
            .map(|mode| redact(&mut container.pixels, mode, &req.faces, &self.sources, &opts))
            .transpose()?;

        if let Some(report) = &redaction {
            record.faces_blurred = true;
            record.faces_detected = report.faces_processed();
            record.faces = report
                .faces()
                .into_iter()
                .enumerate()
                .map(|(i, f)| FaceDetection {
                    index: i + 1,
                    confidence: f.rect.confidence,
                    x: f.rect.x,
                    y: f.rect.y,
                    width: f.rect.width,
                    height: f.rect.height,
                    expression: f.rect.expression.clone(),
                })
                .collect();
        }

        let (width, height) = (container.width(), container.height());
        let bytes = if redaction.is_none() && !req.strip_metadata {
            req.bytes.clone()
        } else {
            let container = if req.strip_metadata {
                scrub(container)?
            } else {
                container
            };
            encode(&container.pixels, format)?
        };
        record.metadata_removed = req.strip_metadata;

        let original_size = req.bytes.len();
        let processed_size = bytes.len();
        let size_reduction =
            ((original_size as f64 - processed_size as f64) / original_size as f64 * 1000.).round() / 10.;

        Ok(ProcessedImage {
            bytes,
            format,
            filename: processed_name(id, &safe_name),
            download_name: download_name(id, &safe_name),
            width,
            height,
            original_size,
            processed_size,
            size_reduction,
            original_metadata,
            redaction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Rejection;
    use crate::shapes::FaceRect;
    use crate::stats::MemoryStatsStore;
    use image::{DynamicImage, Rgb, RgbImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 251) as u8, (y % 241) as u8, ((x ^ y) % 256) as u8])
        }));
        encode(&img, OutputFormat::Png).unwrap()
    }

    fn pipeline() -> (Pipeline, Arc<MemoryStatsStore>) {
        let store = Arc::new(MemoryStatsStore::new());
        (Pipeline::new(SourceSet::new(), store.clone()), store)
    }

    #[test]
    fn coordinates_only_request() {
        let (pipeline, store) = pipeline();
        let req = ProcessRequest::new("party.png", png(120, 80))
            .mode(Some(RedactionMode::Coordinates))
            .faces(vec![
                FaceRect::new(10., 10., 30., 30.).with_confidence(0.9).into(),
                FaceRect::new(500., 10., 30., 30.).into(),
            ]);

        let outcome = pipeline.process(req);
        let out = outcome.result.as_ref().unwrap();

        assert_eq!(out.faces_processed(), 1);
        assert_eq!(out.format, OutputFormat::Png);
        assert!(out.filename.starts_with("processed_"));
        assert!(out.filename.ends_with("_party.png"));
        assert_eq!((out.width, out.height), (120, 80));

        let record = &outcome.record;
        assert!(record.success);
        assert_eq!(record.faces_detected, 1);
        assert!(record.faces_blurred);
        assert!(record.metadata_removed);
        assert_eq!(record.strength, Some(50));
        assert_eq!(record.faces[0].index, 1);
        assert_eq!(record.faces[0].confidence, Some(0.9));
        assert_eq!(store.sessions().unwrap().len(), 1);
    }

    #[test]
    fn untouched_upload_is_returned_verbatim() {
        let (pipeline, _) = pipeline();
        let bytes = png(20, 20);
        let req = ProcessRequest::new("a.png", bytes.clone())
            .mode(None)
            .strip_metadata(false);

        let outcome = pipeline.process(req);
        let out = outcome.result.unwrap();

        assert_eq!(out.bytes, bytes);
        assert_eq!(out.size_reduction, 0.);
        assert!(out.redaction.is_none());
        assert!(!outcome.record.faces_blurred);
        assert!(!outcome.record.metadata_removed);
        assert_eq!(outcome.record.strength, None);
    }

    #[test]
    fn rejection_is_recorded_as_failure() {
        let (pipeline, store) = pipeline();
        let outcome = pipeline.process(ProcessRequest::new("notes.txt", b"hello".to_vec()));

        assert!(matches!(
            outcome.result,
            Err(RedactError::Rejected(Rejection::UnsupportedFormat(_)))
        ));
        assert!(!outcome.record.success);
        assert!(outcome.record.error.is_some());
        assert_eq!(store.sessions().unwrap().len(), 1);
        assert!(store.daily(outcome.record.date()).unwrap().is_none());
    }

    #[test]
    fn oversize_upload_respects_config() {
        let store = Arc::new(MemoryStatsStore::new());
        let pipeline = Pipeline::new(SourceSet::new(), store).with_config(PipelineConfig {
            max_upload_bytes: 10,
            ..Default::default()
        });

        let outcome = pipeline.process(ProcessRequest::new("a.png", png(30, 30)));
        assert!(matches!(
            outcome.result,
            Err(RedactError::Rejected(Rejection::TooLarge { max: 10, .. }))
        ));
    }

    #[test]
    fn corrupt_image_fails_whole_invocation() {
        let (pipeline, _) = pipeline();
        let outcome = pipeline.process(ProcessRequest::new("a.jpg", b"\xFF\xD8garbage".to_vec()));
        assert!(matches!(outcome.result, Err(RedactError::Decode(_))));
        assert!(outcome.record.processed_filename.is_none());
    }

    #[test]
    fn detection_without_sources_is_degraded_not_failed() {
        let (pipeline, store) = pipeline();
        let outcome = pipeline.process(
            ProcessRequest::new("a.webp", png(40, 40)).mode(Some(RedactionMode::Detection)),
        );

        let out = outcome.result.as_ref().unwrap();
        assert_eq!(out.faces_processed(), 0);
        assert_eq!(out.format, OutputFormat::WebP);
        let report = out.redaction.as_ref().unwrap();
        assert_eq!(report.degraded().len(), 1);

        let agg = store.daily(outcome.record.date()).unwrap().unwrap();
        assert_eq!(agg.total_images, 1);
        assert_eq!(agg.total_face_blurs, 1);
        assert_eq!(agg.total_faces_detected, 0);
    }
}
