use super::{Availability, DetectionSource};
use crate::shapes::FaceRect;
use image::DynamicImage;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{Level, span, trace, warn};

/// Tuning for one SeetaFace cascade sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeetaProfile {
    pub min_face_size: u32,
    pub score_thresh: f64,
    pub pyramid_scale_factor: f32,
    pub slide_window_step: u32,
}

impl SeetaProfile {
    /// General purpose frontal sweep, 30px minimum face.
    pub fn frontal() -> Self {
        Self {
            min_face_size: 30,
            score_thresh: 2.0,
            pyramid_scale_factor: 0.8,
            slide_window_step: 4,
        }
    }

    /// Finer sweep that picks up smaller and less confident faces.
    pub fn small_faces() -> Self {
        Self {
            min_face_size: 20,
            score_thresh: 1.5,
            pyramid_scale_factor: 0.85,
            slide_window_step: 2,
        }
    }

    /// Fast sweep over large faces only.
    pub fn coarse() -> Self {
        Self {
            min_face_size: 60,
            score_thresh: 2.5,
            pyramid_scale_factor: 0.7,
            slide_window_step: 6,
        }
    }
}

impl Default for SeetaProfile {
    fn default() -> Self {
        Self::frontal()
    }
}

/// Detection source backed by the `rustface` SeetaFace engine.
///
/// The model is read once on construction. A missing or unreadable model
/// file leaves the source unavailable rather than failing.
pub struct SeetaSource {
    name: String,
    profile: SeetaProfile,
    model: Result<rustface::Model, String>,
}

impl SeetaSource {
    pub fn load(name: impl Into<String>, model_path: impl AsRef<Path>, profile: SeetaProfile) -> Self {
        let name = name.into();
        let path = model_path.as_ref();
        let model = File::open(path)
            .map_err(|e| format!("cannot open {}: {e}", path.display()))
            .and_then(|f| {
                rustface::read_model(BufReader::new(f))
                    .map_err(|e| format!("cannot read {}: {e}", path.display()))
            });

        if let Err(e) = &model {
            warn!("Face detection source {name} unavailable: {e}");
        }

        Self {
            name,
            profile,
            model,
        }
    }

    /// The three standard sweeps over one model file, highest priority first.
    pub fn standard_set(model_path: impl AsRef<Path>) -> Vec<SeetaSource> {
        let path = model_path.as_ref();
        vec![
            SeetaSource::load("seeta-frontal", path, SeetaProfile::frontal()),
            SeetaSource::load("seeta-small", path, SeetaProfile::small_faces()),
            SeetaSource::load("seeta-coarse", path, SeetaProfile::coarse()),
        ]
    }

    pub fn profile(&self) -> SeetaProfile {
        self.profile
    }
}

impl DetectionSource for SeetaSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn availability(&self) -> Availability {
        match &self.model {
            Ok(_) => Availability::Ready,
            Err(e) => Availability::Unavailable(e.clone()),
        }
    }

    fn detect(&self, img: &DynamicImage) -> Vec<FaceRect> {
        let span = span!(Level::DEBUG, "seeta_detect");
        let _guard = span.enter();

        let Ok(model) = &self.model else {
            return Vec::new();
        };

        let gray = img.to_luma8();
        let mut detector = rustface::create_detector_with_model(model.clone());
        detector.set_min_face_size(self.profile.min_face_size);
        detector.set_score_thresh(self.profile.score_thresh);
        detector.set_pyramid_scale_factor(self.profile.pyramid_scale_factor);
        detector.set_slide_window_step(self.profile.slide_window_step, self.profile.slide_window_step);

        let faces = detector.detect(&rustface::ImageData::new(
            gray.as_raw(),
            gray.width(),
            gray.height(),
        ));
        trace!("{} found {} faces", self.name, faces.len());

        faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceRect::new(
                    bbox.x() as f64,
                    bbox.y() as f64,
                    bbox.width() as f64,
                    bbox.height() as f64,
                )
                .with_confidence(face.score())
            })
            .collect()
    }
}
