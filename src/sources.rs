use crate::shapes::FaceRect;
use image::DynamicImage;
use std::fmt;

#[cfg(feature = "rustface")]
pub use seeta::{SeetaProfile, SeetaSource};

#[cfg(feature = "rustface")]
mod seeta;

/// Whether a source can currently produce detections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Ready,
    Unavailable(String),
}

/// Something that finds candidate face rectangles in an image.
///
/// A source that cannot run (missing model file, unsupported platform) says
/// so through [`DetectionSource::availability`] instead of returning an
/// empty list, so callers can tell "no faces" from "no detector".
pub trait DetectionSource: Send + Sync {
    fn name(&self) -> &str;

    fn availability(&self) -> Availability;

    /// Raw candidates in image pixel coordinates. Only called on ready
    /// sources.
    fn detect(&self, img: &DynamicImage) -> Vec<FaceRect>;
}

/// Detection sources in priority order: earlier sources win overlaps.
#[derive(Default)]
pub struct SourceSet {
    sources: Vec<Box<dyn DetectionSource>>,
}

impl fmt::Debug for SourceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.sources.iter().map(|s| s.name()))
            .finish()
    }
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl DetectionSource + 'static) -> Self {
        self.push(Box::new(source));
        self
    }

    pub fn push(&mut self, source: Box<dyn DetectionSource>) {
        self.sources.push(source);
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn DetectionSource> {
        self.sources.iter().map(|s| s.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, Availability);

    impl DetectionSource for Fixed {
        fn name(&self) -> &str {
            self.0
        }
        fn availability(&self) -> Availability {
            self.1.clone()
        }
        fn detect(&self, _img: &DynamicImage) -> Vec<FaceRect> {
            Vec::new()
        }
    }

    #[test]
    fn keeps_insertion_order() {
        let set = SourceSet::new()
            .with(Fixed("a", Availability::Ready))
            .with(Fixed("b", Availability::Unavailable("no model".into())))
            .with(Fixed("c", Availability::Ready));

        let names: Vec<_> = set.iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(set.len(), 3);
        assert_eq!(format!("{set:?}"), r#"["a", "b", "c"]"#);
    }
}
