pub mod face;
pub mod rect;

pub use face::{FaceRect, RectInput, parse_rect_inputs};
pub use rect::Rect;
