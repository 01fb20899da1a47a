//! Target size and font size computation.

use image::{DynamicImage, imageops::FilterType};

use crate::options::FONT_HEIGHT_RATIO;

/// Fits `(width, height)` inside `(max_width, max_height)` keeping the aspect ratio.
///
/// Images already inside the box are returned unchanged, never enlarged.
pub fn fit_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 || (width <= max_width && height <= max_height) {
        return (width, height);
    }

    let ratio = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );

    let scaled_width = ((width as f64 * ratio).round() as u32).clamp(1, max_width.max(1));
    let scaled_height = ((height as f64 * ratio).round() as u32).clamp(1, max_height.max(1));

    (scaled_width, scaled_height)
}

/// Explicit sizes are capped at the image height, glyphs are rasterized
/// at full size before clipping.
pub fn font_size_for(image_height: u32, explicit: Option<f32>) -> f32 {
    match explicit {
        Some(size) if size.is_finite() && size > 0.0 => size.min(image_height.max(1) as f32),
        _ => (image_height as f64 * FONT_HEIGHT_RATIO).floor().max(1.0) as f32,
    }
}

pub fn resize_to_fit(image: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    let (width, height) = fit_dimensions(image.width(), image.height(), max_width, max_height);

    if (width, height) == (image.width(), image.height()) {
        return image;
    }

    image.resize_exact(width, height, FilterType::Lanczos3)
}
