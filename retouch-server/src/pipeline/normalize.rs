//! Format normalization: guarantee an alpha channel before submission.
//!
//! The generation service requires RGBA input. Sources arrive as
//! whatever the user uploaded somewhere else (often opaque JPEG), so
//! every image passes through here before leaving the pipeline.

use image::{DynamicImage, RgbaImage};
use retouch_common::{Error, Result};

/// Return an RGBA copy of `image`.
///
/// Already-RGBA images pass through as an equivalent copy; RGB images
/// gain a fully opaque alpha channel. Any other channel layout fails
/// with an unsupported-format error rather than being coerced.
/// Idempotent: normalizing a normalized image changes nothing.
pub fn ensure_alpha(image: &DynamicImage) -> Result<RgbaImage> {
    match image {
        DynamicImage::ImageRgba8(rgba) => Ok(rgba.clone()),
        DynamicImage::ImageRgb8(_) => Ok(image.to_rgba8()),
        other => Err(Error::UnsupportedFormat(format!(
            "{:?} channel layout cannot be normalized to RGBA",
            other.color()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Rgb, RgbImage, Rgba};

    #[test]
    fn rgb_gains_opaque_alpha() {
        let rgb = RgbImage::from_pixel(3, 2, Rgb([7, 8, 9]));
        let out = ensure_alpha(&DynamicImage::ImageRgb8(rgb)).unwrap();

        assert_eq!(out.dimensions(), (3, 2));
        for px in out.pixels() {
            assert_eq!(px.0, [7, 8, 9, 255]);
        }
    }

    #[test]
    fn rgba_passes_through_unchanged() {
        let mut rgba = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 128]));
        rgba.put_pixel(0, 0, Rgba([4, 5, 6, 0]));

        let out = ensure_alpha(&DynamicImage::ImageRgba8(rgba.clone())).unwrap();
        assert_eq!(out, rgba);
    }

    #[test]
    fn idempotent() {
        let rgb = RgbImage::from_pixel(5, 5, Rgb([40, 50, 60]));
        let once = ensure_alpha(&DynamicImage::ImageRgb8(rgb)).unwrap();
        let twice = ensure_alpha(&DynamicImage::ImageRgba8(once.clone())).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn grayscale_is_rejected() {
        let gray = GrayImage::new(2, 2);
        let err = ensure_alpha(&DynamicImage::ImageLuma8(gray)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }
}
