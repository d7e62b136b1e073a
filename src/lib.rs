pub mod error;
pub mod metadata;
pub mod pipeline;
pub mod redaction;
pub mod shapes;
pub mod sources;
pub mod stats;
pub mod upload;

pub use error::{RedactError, Rejection};
pub use pipeline::{Pipeline, PipelineConfig, ProcessOutcome, ProcessRequest, ProcessedImage};
pub use redaction::{RedactionMode, RedactionOptions, RedactionReport};
pub use shapes::{FaceRect, Rect, RectInput};
pub use sources::{Availability, DetectionSource, SourceSet};
