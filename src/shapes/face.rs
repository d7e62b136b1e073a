use serde::{Deserialize, Serialize};
use tracing::warn;

/// Candidate face region as reported by a client or a detection source.
///
/// Coordinates are in pixels of the image the producer looked at. When the
/// producer saw the image at a different size it may say so through
/// `image_width`/`image_height`, and the rect is rescaled before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_height: Option<f64>,
}

impl FaceRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> FaceRect {
        FaceRect {
            x,
            y,
            width,
            height,
            confidence: None,
            expression: None,
            image_width: None,
            image_height: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> FaceRect {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_expression(mut self, expression: impl Into<String>) -> FaceRect {
        self.expression = Some(expression.into());
        self
    }

    pub fn with_reference_size(mut self, width: f64, height: f64) -> FaceRect {
        self.image_width = Some(width);
        self.image_height = Some(height);
        self
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    pub fn area(&self) -> f64 {
        if self.width <= 0. || self.height <= 0. {
            0.
        } else {
            self.width * self.height
        }
    }

    pub fn intersection_area(&self, other: &FaceRect) -> f64 {
        let x_min = self.x.max(other.x);
        let x_max = self.right().min(other.right());
        let y_min = self.y.max(other.y);
        let y_max = self.bottom().min(other.bottom());

        if x_min < x_max && y_min < y_max {
            (x_max - x_min) * (y_max - y_min)
        } else {
            0.
        }
    }

    /// Share of this rect's own area covered by `other`, in `[0, 1]`.
    ///
    /// Asymmetric: a small rect inside a large one overlaps it fully, the
    /// large one overlaps the small one only partially.
    pub fn overlap_fraction(&self, other: &FaceRect) -> f64 {
        let area = self.area();
        if area > 0. {
            self.intersection_area(other) / area
        } else {
            0.
        }
    }

    /// Map the rect from its reference size into a `width` x `height` image.
    /// Rects without a usable reference size are returned unchanged.
    pub fn rescaled_to(&self, width: u32, height: u32) -> FaceRect {
        let (Some(ref_w), Some(ref_h)) = (self.image_width, self.image_height) else {
            return self.clone();
        };
        if !(ref_w.is_finite() && ref_h.is_finite()) || ref_w <= 0. || ref_h <= 0. {
            return self.clone();
        }

        let scale_x = width as f64 / ref_w;
        let scale_y = height as f64 / ref_h;
        if scale_x == 1. && scale_y == 1. {
            return self.clone();
        }

        FaceRect {
            x: self.x * scale_x,
            y: self.y * scale_y,
            width: self.width * scale_x,
            height: self.height * scale_y,
            image_width: Some(width as f64),
            image_height: Some(height as f64),
            ..self.clone()
        }
    }
}

/// One element of a client rectangle payload.
///
/// Elements missing a coordinate or carrying a non-numeric one land in
/// `Malformed` instead of failing the whole payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RectInput {
    Rect(FaceRect),
    Malformed(serde_json::Value),
}

impl From<FaceRect> for RectInput {
    fn from(r: FaceRect) -> RectInput {
        RectInput::Rect(r)
    }
}

/// Parse a JSON array of client rectangles. Anything that is not an array
/// yields an empty list.
pub fn parse_rect_inputs(payload: &str) -> Vec<RectInput> {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Vec<RectInput>>(trimmed) {
        Ok(inputs) => inputs,
        Err(e) => {
            warn!("Ignoring face coordinate payload: {e}");
            Vec::new()
        }
    }
}
