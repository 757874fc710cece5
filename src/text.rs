use std::path::Path;

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};

use crate::{error::MoodpaperResult, model::Rgb};

/// Fallback face; a request may point at its own TTF/OTF but must never fail
/// for lack of one.
static EMBEDDED_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");

/// Load the requested font, falling back to the embedded face on any problem
/// with the requested one.
pub fn load_font(path: Option<&Path>) -> MoodpaperResult<FontArc> {
    if let Some(p) = path {
        match std::fs::read(p) {
            Ok(bytes) => match FontArc::try_from_vec(bytes) {
                Ok(font) => return Ok(font),
                Err(err) => {
                    tracing::warn!(path = %p.display(), %err, "font did not parse, using embedded face");
                }
            },
            Err(err) => {
                tracing::warn!(path = %p.display(), %err, "font not readable, using embedded face");
            }
        }
    }
    FontArc::try_from_slice(EMBEDDED_FONT)
        .map_err(|err| anyhow::anyhow!("embedded font is invalid: {err}").into())
}

/// Bounding box of `text` at `size`, in pixels, before any rotation.
pub fn measure(font: &FontArc, text: &str, size: f32) -> (u32, u32) {
    let scaled = font.as_scaled(PxScale::from(size));

    let mut width = 0.0f32;
    let mut prev: Option<ab_glyph::GlyphId> = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = prev {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }

    let padding = 2;
    (
        width.ceil() as u32 + padding,
        scaled.height().ceil() as u32 + padding,
    )
}

/// Rasterize `text` into a tight transparent buffer at the given color and
/// opacity. The caller rotates and composites.
pub fn render(font: &FontArc, text: &str, size: f32, color: Rgb, alpha: u8) -> RgbaImage {
    let scale = PxScale::from(size);
    let scaled = font.as_scaled(scale);
    let (w, h) = measure(font, text, size);
    let mut buf = RgbaImage::new(w.max(1), h.max(1));

    let baseline = scaled.ascent();
    let mut cursor = 0.0f32;
    let mut prev: Option<ab_glyph::GlyphId> = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = prev {
            cursor += scaled.kern(prev, id);
        }

        let glyph = id.with_scale_and_position(scale, ab_glyph::point(cursor, baseline));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let x = px as i32 + bounds.min.x as i32;
                let y = py as i32 + bounds.min.y as i32;
                if x < 0 || y < 0 || x >= buf.width() as i32 || y >= buf.height() as i32 {
                    return;
                }
                let a = (coverage.clamp(0.0, 1.0) * f32::from(alpha)).round() as u8;
                let existing = buf.get_pixel(x as u32, y as u32).0[3];
                // single-color text: overlapping outlines keep the denser alpha
                buf.put_pixel(
                    x as u32,
                    y as u32,
                    Rgba([color[0], color[1], color[2], a.max(existing)]),
                );
            });
        }

        cursor += scaled.h_advance(id);
        prev = Some(id);
    }

    buf
}

/// Rotate clockwise by `degrees` with bounding-box expansion and bilinear
/// sampling; pixels falling outside the source stay transparent.
pub fn rotate(img: &RgbaImage, degrees: f32) -> RgbaImage {
    if degrees % 360.0 == 0.0 {
        return img.clone();
    }

    let radians = -degrees.to_radians();
    let (cos, sin) = (radians.cos(), radians.sin());

    let src_w = img.width() as f32;
    let src_h = img.height() as f32;
    let cx = src_w / 2.0;
    let cy = src_h / 2.0;

    let corners = [
        (-cx, -cy),
        (src_w - cx, -cy),
        (-cx, src_h - cy),
        (src_w - cx, src_h - cy),
    ];
    let mut min_x = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for (x, y) in corners {
        let rx = x * cos - y * sin;
        let ry = x * sin + y * cos;
        min_x = min_x.min(rx);
        max_x = max_x.max(rx);
        min_y = min_y.min(ry);
        max_y = max_y.max(ry);
    }

    let dst_w = ((max_x - min_x).ceil() as u32).max(1);
    let dst_h = ((max_y - min_y).ceil() as u32).max(1);
    let mut out = RgbaImage::new(dst_w, dst_h);

    let dst_cx = dst_w as f32 / 2.0;
    let dst_cy = dst_h as f32 / 2.0;
    let inv_cos = (-radians).cos();
    let inv_sin = (-radians).sin();

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let rx = dx as f32 - dst_cx;
            let ry = dy as f32 - dst_cy;
            let sx = rx * inv_cos - ry * inv_sin + cx;
            let sy = rx * inv_sin + ry * inv_cos + cy;

            if sx < 0.0 || sy < 0.0 || sx >= src_w - 1.0 || sy >= src_h - 1.0 {
                continue;
            }
            let x0 = sx.floor() as u32;
            let y0 = sy.floor() as u32;
            let fx = sx - x0 as f32;
            let fy = sy - y0 as f32;

            let p00 = img.get_pixel(x0, y0).0;
            let p10 = img.get_pixel(x0 + 1, y0).0;
            let p01 = img.get_pixel(x0, y0 + 1).0;
            let p11 = img.get_pixel(x0 + 1, y0 + 1).0;

            let mut px = [0u8; 4];
            for c in 0..4 {
                let v = f32::from(p00[c]) * (1.0 - fx) * (1.0 - fy)
                    + f32::from(p10[c]) * fx * (1.0 - fy)
                    + f32::from(p01[c]) * (1.0 - fx) * fy
                    + f32::from(p11[c]) * fx * fy;
                px[c] = v.round().clamp(0.0, 255.0) as u8;
            }
            out.put_pixel(dx, dy, Rgba(px));
        }
    }

    out
}
