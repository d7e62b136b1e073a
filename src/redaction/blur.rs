use super::Executable;
use super::kernel::Kernel;
use crate::error::RedactError;
use crate::shapes::Rect;
use image::{DynamicImage, GenericImage, ImageBuffer, Pixel, imageops};
use imageproc::definitions::Clamp;
use imageproc::filter;

/// Gaussian smoothing over exactly one rectangular region.
#[derive(Debug, Clone, Copy)]
pub struct Blur {
    target: Rect,
    kernel: Kernel,
}

impl Blur {
    pub fn new(target: Rect, kernel: Kernel) -> Blur {
        Blur { target, kernel }
    }

    /// Sigma actually applied. Beyond the region's longest side a wider
    /// kernel only averages the same pixels again, so it is capped there.
    fn sigma(&self) -> f32 {
        let longest = self.target.w.max(self.target.h).max(1) as f32;
        self.kernel.sigma().min(longest)
    }
}

impl Executable for Blur {
    fn execute(&self, img: &mut DynamicImage) -> Result<(), RedactError> {
        let (r, sigma) = (self.target, self.sigma());
        match img {
            DynamicImage::ImageLuma8(buf) => blur_region(buf, r, sigma),
            DynamicImage::ImageLumaA8(buf) => blur_region(buf, r, sigma),
            DynamicImage::ImageRgb8(buf) => blur_region(buf, r, sigma),
            DynamicImage::ImageRgba8(buf) => blur_region(buf, r, sigma),
            DynamicImage::ImageLuma16(buf) => blur_region(buf, r, sigma),
            DynamicImage::ImageLumaA16(buf) => blur_region(buf, r, sigma),
            DynamicImage::ImageRgb16(buf) => blur_region(buf, r, sigma),
            DynamicImage::ImageRgba16(buf) => blur_region(buf, r, sigma),
            DynamicImage::ImageRgb32F(buf) => blur_region(buf, r, sigma),
            DynamicImage::ImageRgba32F(buf) => blur_region(buf, r, sigma),
            other => Err(RedactError::Paint(format!(
                "unsupported color type {:?}",
                other.color()
            ))),
        }
    }
}

fn blur_region<P>(buf: &mut ImageBuffer<P, Vec<P::Subpixel>>, r: Rect, sigma: f32) -> Result<(), RedactError>
where
    P: Pixel + 'static,
    P::Subpixel: Into<f32> + Clamp<f32>,
{
    if r.w == 0 || r.h == 0 || r.right() > buf.width() || r.bottom() > buf.height() {
        return Err(RedactError::Paint(format!(
            "{r:?} outside {}x{} image",
            buf.width(),
            buf.height()
        )));
    }

    let region = imageops::crop_imm(buf, r.x, r.y, r.w, r.h).to_image();
    let blurred = filter::gaussian_blur_f32(&region, sigma);
    buf.copy_from(&blurred, r.x, r.y)
        .map_err(|e| RedactError::Paint(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage, Rgba, RgbaImage};
    use std::time::{Duration, Instant};

    fn checkerboard(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        })
    }

    #[test]
    fn only_target_region_changes() {
        let original = DynamicImage::ImageRgb8(checkerboard(40, 30));
        let mut img = original.clone();
        let target = Rect::new(10, 5, 12, 8);

        Blur::new(target, Kernel::from_strength(9))
            .execute(&mut img)
            .unwrap();

        let mut changed_inside = false;
        for (x, y, before) in original.pixels() {
            let after = img.get_pixel(x, y);
            if target.contains(x, y) {
                changed_inside |= before != after;
            } else {
                assert_eq!(before, after, "pixel ({x}, {y}) outside target changed");
            }
        }
        assert!(changed_inside);
    }

    #[test]
    fn keeps_alpha_images_in_their_color_type() {
        let mut img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(20, 20, Rgba([10, 20, 30, 40])));
        Blur::new(Rect::new(0, 0, 20, 20), Kernel::default())
            .execute(&mut img)
            .unwrap();
        assert!(matches!(img, DynamicImage::ImageRgba8(_)));
    }

    #[test]
    fn tiny_region_smaller_than_kernel() {
        let mut img = DynamicImage::ImageRgb8(checkerboard(8, 8));
        Blur::new(Rect::new(7, 7, 1, 1), Kernel::from_strength(51))
            .execute(&mut img)
            .unwrap();
    }

    #[test]
    fn out_of_bounds_region_is_an_error() {
        let mut img = DynamicImage::ImageRgb8(checkerboard(8, 8));
        let res = Blur::new(Rect::new(4, 4, 8, 2), Kernel::default()).execute(&mut img);
        assert!(matches!(res, Err(RedactError::Paint(_))));
    }

    #[test]
    fn blurs_sixteen_bit_buffers() {
        let original = DynamicImage::ImageRgb16(ImageBuffer::from_fn(60, 60, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([u16::MAX; 3])
            } else {
                Rgb([0; 3])
            }
        }));
        let mut img = original.clone();
        Blur::new(Rect::new(10, 10, 30, 30), Kernel::default())
            .execute(&mut img)
            .unwrap();

        assert!(matches!(img, DynamicImage::ImageRgb16(_)));
        assert_ne!(img, original);
        assert_eq!(img.get_pixel(0, 0), original.get_pixel(0, 0));
    }

    #[test]
    fn blurs_float_buffers() {
        let mut img = DynamicImage::ImageRgba32F(ImageBuffer::from_fn(20, 20, |x, _| {
            Rgba([x as f32 / 20., 0.5, 0.25, 1.])
        }));
        Blur::new(Rect::new(2, 2, 10, 10), Kernel::from_strength(9))
            .execute(&mut img)
            .unwrap();
        assert!(matches!(img, DynamicImage::ImageRgba32F(_)));
    }

    #[test]
    fn sigma_is_capped_by_region() {
        let blur = Blur::new(Rect::new(0, 0, 40, 12), Kernel::from_strength(u32::MAX));
        assert_eq!(blur.sigma(), 40.);
        let small = Blur::new(Rect::new(0, 0, 40, 12), Kernel::default());
        assert_eq!(small.sigma(), Kernel::default().sigma());
    }

    #[test]
    fn huge_strength_finishes_quickly() {
        let mut img = DynamicImage::ImageRgb8(checkerboard(40, 40));
        let start = Instant::now();
        Blur::new(Rect::new(0, 0, 40, 40), Kernel::from_strength(u32::MAX))
            .execute(&mut img)
            .unwrap();
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
