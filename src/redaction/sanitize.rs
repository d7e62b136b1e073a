use crate::shapes::{FaceRect, Rect};

/// Lower bound on the margin added around each face when padding.
pub const MIN_PADDING: u32 = 5;

/// Fit a candidate rect inside a `width` x `height` image.
///
/// The rect is first mapped from its reference size (if any), then cut down
/// to the part that lies inside the image. With `pad` set it is grown on all
/// sides by `max(5, min(w, h) / 10)` pixels and cut down again. Returns
/// `None` for rects with no pixel inside the image or non-finite coordinates.
pub fn sanitize(rect: &FaceRect, width: u32, height: u32, pad: bool) -> Option<Rect> {
    if width == 0 || height == 0 || !rect.is_finite() {
        return None;
    }

    let rect = rect.rescaled_to(width, height);
    let clamped = clamp_edges(
        rect.x.floor(),
        rect.y.floor(),
        rect.right().ceil(),
        rect.bottom().ceil(),
        width,
        height,
    )?;

    if !pad {
        return Some(clamped);
    }

    let p = padding(&clamped) as f64;
    clamp_edges(
        clamped.left() as f64 - p,
        clamped.top() as f64 - p,
        clamped.right() as f64 + p,
        clamped.bottom() as f64 + p,
        width,
        height,
    )
}

pub fn padding(rect: &Rect) -> u32 {
    (rect.w.min(rect.h) / 10).max(MIN_PADDING)
}

fn clamp_edges(left: f64, top: f64, right: f64, bottom: f64, width: u32, height: u32) -> Option<Rect> {
    let left = left.max(0.);
    let top = top.max(0.);
    let right = right.min(width as f64);
    let bottom = bottom.min(height as f64);

    if right - left < 1. || bottom - top < 1. {
        return None;
    }

    Some(Rect::new(
        left as u32,
        top as u32,
        (right - left) as u32,
        (bottom - top) as u32,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn within(r: &Rect, width: u32, height: u32) -> bool {
        r.w >= 1 && r.h >= 1 && r.right() <= width && r.bottom() <= height
    }

    #[test]
    fn spill_past_both_edges_is_clamped() {
        let r = sanitize(&FaceRect::new(700., 550., 200., 200.), 800, 600, false).unwrap();
        assert_eq!(r, Rect::new(700, 550, 100, 50));
    }

    #[test]
    fn spill_past_both_edges_with_padding() {
        let r = sanitize(&FaceRect::new(700., 550., 200., 200.), 800, 600, true).unwrap();
        assert_eq!(r, Rect::new(695, 545, 105, 55));
        assert!(within(&r, 800, 600));
    }

    #[test]
    fn padding_grows_with_face_size() {
        let r = sanitize(&FaceRect::new(100., 100., 200., 300.), 800, 600, true).unwrap();
        assert_eq!(r, Rect::new(80, 80, 240, 340));
    }

    #[test]
    fn fully_outside_is_dropped() {
        for rect in [
            FaceRect::new(900., 10., 50., 50.),
            FaceRect::new(10., 700., 50., 50.),
            FaceRect::new(-100., 10., 50., 50.),
            FaceRect::new(10., -60., 50., 50.),
            FaceRect::new(800., 600., 10., 10.),
        ] {
            assert_eq!(sanitize(&rect, 800, 600, true), None, "{rect:?}");
        }
    }

    #[test]
    fn degenerate_and_non_finite_are_dropped() {
        assert_eq!(sanitize(&FaceRect::new(10., 10., 0., 50.), 100, 100, true), None);
        assert_eq!(sanitize(&FaceRect::new(10., 10., -5., 50.), 100, 100, true), None);
        assert_eq!(sanitize(&FaceRect::new(f64::NAN, 10., 5., 5.), 100, 100, true), None);
        assert_eq!(sanitize(&FaceRect::new(10., 10., f64::INFINITY, 5.), 100, 100, true), None);
        assert_eq!(sanitize(&FaceRect::new(0., 0., 5., 5.), 0, 100, true), None);
    }

    #[test]
    fn negative_origin_keeps_visible_part() {
        let r = sanitize(&FaceRect::new(-20., -10., 50., 40.), 100, 100, false).unwrap();
        assert_eq!(r, Rect::new(0, 0, 30, 30));
    }

    #[test]
    fn fractional_rect_covers_touched_pixels() {
        let r = sanitize(&FaceRect::new(10.3, 4.6, 0.4, 0.2), 100, 100, false).unwrap();
        assert_eq!(r, Rect::new(10, 4, 1, 1));
    }

    #[test]
    fn result_always_inside_image() {
        for x in (-50..850).step_by(37) {
            for y in (-50..650).step_by(41) {
                let rect = FaceRect::new(x as f64, y as f64, 120., 90.);
                if let Some(r) = sanitize(&rect, 800, 600, true) {
                    assert!(within(&r, 800, 600), "{rect:?} -> {r:?}");
                }
            }
        }
    }

    #[test]
    fn reference_size_is_applied_before_clamping() {
        let rect = FaceRect::new(50., 50., 10., 10.).with_reference_size(100., 100.);
        let r = sanitize(&rect, 200, 200, false).unwrap();
        assert_eq!(r, Rect::new(100, 100, 20, 20));
    }
}
