use serde::{Deserialize, Serialize};

/// Integer pixel rectangle anchored at its top-left corner.
///
/// Rects produced by the sanitizer always satisfy `right() <= image width`,
/// `bottom() <= image height` and have non-zero width and height.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Rect {
        Rect { x, y, w, h }
    }

    pub fn left(&self) -> u32 {
        self.x
    }
    pub fn right(&self) -> u32 {
        self.x + self.w
    }
    pub fn top(&self) -> u32 {
        self.y
    }
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.left() && x < self.right() && y >= self.top() && y < self.bottom()
    }

    pub fn intersection_area(&self, other: &Rect) -> u64 {
        let x_min = self.left().max(other.left());
        let x_max = self.right().min(other.right());
        let y_min = self.top().max(other.top());
        let y_max = self.bottom().min(other.bottom());

        if x_min < x_max && y_min < y_max {
            (x_max - x_min) as u64 * (y_max - y_min) as u64
        } else {
            0
        }
    }

    /// Intersection over union, in percent.
    pub fn overlap_pct(&self, other: &Rect) -> f32 {
        let overlap_area = self.intersection_area(other);
        let area_delta = self.area() + other.area() - overlap_area;

        if area_delta > 0 {
            overlap_area as f32 / area_delta as f32 * 100.
        } else {
            0.
        }
    }
}
