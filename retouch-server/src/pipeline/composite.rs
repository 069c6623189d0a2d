//! Alpha compositing: apply a rasterized mask to a source image.
//!
//! Pixels inside the mask become fully transparent; pixels outside keep
//! their original color and opacity. The input is never mutated; the
//! result is always a fresh RGBA buffer.

use image::{DynamicImage, GenericImageView, RgbaImage};
use retouch_common::{Error, Result};

use crate::pipeline::raster::MaskGrid;

/// Clear the masked region of `image` to transparency.
///
/// Accepts RGB (treated as fully opaque) and RGBA sources; any other
/// channel layout is an unsupported format. A dimension mismatch
/// between image and grid indicates a rasterization bug upstream and is
/// reported as an internal error rather than an input error.
pub fn apply_mask(image: &DynamicImage, grid: &MaskGrid) -> Result<RgbaImage> {
    let (width, height) = image.dimensions();
    if (width, height) != (grid.width(), grid.height()) {
        return Err(Error::Internal(format!(
            "mask grid {}x{} does not match image {}x{}",
            grid.width(),
            grid.height(),
            width,
            height
        )));
    }

    let mut out = match image {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => image.to_rgba8(),
        other => {
            return Err(Error::UnsupportedFormat(format!(
                "cannot composite over {:?} channel layout",
                other.color()
            )))
        }
    };

    for y in 0..height {
        for x in 0..width {
            if grid.contains(x, y) {
                // RGB is preserved for fidelity; only opacity changes.
                out.get_pixel_mut(x, y).0[3] = 0;
            }
        }
    }

    Ok(out)
}
