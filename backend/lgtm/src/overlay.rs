//! Text rasterization and alpha compositing.

use ab_glyph::{Font, Glyph, PxScale, ScaleFont, point};
use image::{GrayImage, Luma, Rgba, RgbaImage, imageops};

use crate::options::Shadow;

/// Lays `text` out on one line, centered on `(center_x, center_y)` with a middle baseline.
fn layout(font: &impl Font, text: &str, size: f32, center_x: f32, center_y: f32) -> Vec<Glyph> {
    let scale = PxScale::from(size);
    let scaled = font.as_scaled(scale);

    let mut glyphs = Vec::with_capacity(text.len());
    let mut caret = 0.0f32;
    let mut previous = None;

    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(previous) = previous {
            caret += scaled.kern(previous, id);
        }

        glyphs.push(id.with_scale_and_position(scale, point(caret, 0.0)));
        caret += scaled.h_advance(id);
        previous = Some(id);
    }

    let origin_x = center_x - caret / 2.0;
    let baseline = center_y + (scaled.ascent() + scaled.descent()) / 2.0;

    for glyph in &mut glyphs {
        glyph.position.x += origin_x;
        glyph.position.y += baseline;
    }

    glyphs
}

/// Coverage mask of `text` for a canvas of `width` x `height`, shifted by `offset`.
pub fn text_mask(
    font: &impl Font,
    text: &str,
    size: f32,
    width: u32,
    height: u32,
    offset: (i32, i32),
) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    let center_x = width as f32 / 2.0 + offset.0 as f32;
    let center_y = height as f32 / 2.0 + offset.1 as f32;

    for glyph in layout(font, text, size, center_x, center_y) {
        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };

        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, coverage| {
            let x = bounds.min.x as i32 + gx as i32;
            let y = bounds.min.y as i32 + gy as i32;

            if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
                return;
            }

            let pixel = mask.get_pixel_mut(x as u32, y as u32);
            let value = (coverage.clamp(0.0, 1.0) * 255.0).round() as u16;
            pixel.0[0] = (pixel.0[0] as u16 + value).min(255) as u8;
        });
    }

    mask
}

/// Source-over blend of `color` into `canvas`, weighted by `mask`.
pub fn composite(canvas: &mut RgbaImage, mask: &GrayImage, color: Rgba<u8>) {
    let color_alpha = color.0[3] as f32 / 255.0;

    for (x, y, Luma([coverage])) in mask.enumerate_pixels() {
        if *coverage == 0 || x >= canvas.width() || y >= canvas.height() {
            continue;
        }

        let alpha = color_alpha * (*coverage as f32 / 255.0);
        let pixel = canvas.get_pixel_mut(x, y);
        let dst_alpha = pixel.0[3] as f32 / 255.0;
        let out_alpha = alpha + dst_alpha * (1.0 - alpha);

        if out_alpha <= 0.0 {
            continue;
        }

        for channel in 0..3 {
            let src = color.0[channel] as f32;
            let dst = pixel.0[channel] as f32;
            let blended = (src * alpha + dst * dst_alpha * (1.0 - alpha)) / out_alpha;
            pixel.0[channel] = blended.round().clamp(0.0, 255.0) as u8;
        }
        pixel.0[3] = (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
    }
}

/// Draws `text` centered on `canvas`, preceded by its shadow when one is set.
pub fn draw_centered_text(
    canvas: &mut RgbaImage,
    font: &impl Font,
    text: &str,
    size: f32,
    color: Rgba<u8>,
    shadow: Option<&Shadow>,
) {
    if text.is_empty() {
        return;
    }

    let (width, height) = canvas.dimensions();

    if let Some(shadow) = shadow.filter(|s| s.color.0[3] > 0) {
        let mut mask = text_mask(font, text, size, width, height, (shadow.offset_x, shadow.offset_y));
        if shadow.blur > 0.0 {
            mask = imageops::blur(&mask, shadow.blur / 2.0);
        }
        composite(canvas, &mask, shadow.color);
    }

    let mask = text_mask(font, text, size, width, height, (0, 0));
    composite(canvas, &mask, color);
}
