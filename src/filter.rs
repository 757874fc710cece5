use image::RgbaImage;

use crate::{blur, error::MoodpaperResult};

/// Closed set of canvas filters, resolved from a request string once at the
/// boundary. Unknown names resolve to `None` (identity) rather than erroring.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterKind {
    None,
    Grayscale,
    Sepia,
    Blur,
    Vintage,
    Vignette,
    EdgeEnhance,
    Emboss,
    Sharpen,
    ColorSwap,
}

impl FilterKind {
    pub fn parse(name: &str) -> FilterKind {
        match name.trim().to_ascii_lowercase().as_str() {
            "grayscale" | "greyscale" => FilterKind::Grayscale,
            "sepia" => FilterKind::Sepia,
            "blur" => FilterKind::Blur,
            "vintage" => FilterKind::Vintage,
            "vignette" => FilterKind::Vignette,
            "edge_enhance" | "edge-enhance" | "edgeenhance" => FilterKind::EdgeEnhance,
            "emboss" => FilterKind::Emboss,
            "sharpen" => FilterKind::Sharpen,
            "color_swap" | "color-swap" | "colorswap" => FilterKind::ColorSwap,
            _ => FilterKind::None,
        }
    }
}

/// Fixed blur radius for the `blur` filter.
const BLUR_RADIUS: u32 = 5;
/// Vignette mask blur radius.
const VIGNETTE_BLUR_RADIUS: u32 = 10;

/// Apply one filter to the whole canvas. Pure: owned buffer in, owned buffer
/// out; every color computation clamps to [0, 255] before writing back.
pub fn apply(canvas: RgbaImage, kind: FilterKind) -> MoodpaperResult<RgbaImage> {
    match kind {
        FilterKind::None => Ok(canvas),
        FilterKind::Grayscale => Ok(map_rgb(canvas, |[r, g, b]| {
            let l = luminance(r, g, b);
            [l, l, l]
        })),
        FilterKind::Sepia => Ok(map_rgb(canvas, sepia_px)),
        FilterKind::Blur => blur::blur_rgba(&canvas, BLUR_RADIUS),
        FilterKind::Vintage => {
            let toned = map_rgb(canvas, sepia_px);
            Ok(scale_contrast(toned, 0.8))
        }
        FilterKind::Vignette => vignette(canvas),
        FilterKind::EdgeEnhance => {
            // PIL EDGE_ENHANCE
            Ok(convolve3x3(&canvas, [-1, -1, -1, -1, 10, -1, -1, -1, -1], 2, 0))
        }
        FilterKind::Emboss => {
            // PIL EMBOSS
            Ok(convolve3x3(&canvas, [-1, 0, 0, 0, 1, 0, 0, 0, 0], 1, 128))
        }
        FilterKind::Sharpen => {
            // PIL SHARPEN
            Ok(convolve3x3(
                &canvas,
                [-2, -2, -2, -2, 32, -2, -2, -2, -2],
                16,
                0,
            ))
        }
        FilterKind::ColorSwap => Ok(map_rgb(canvas, |[r, g, b]| [b, r, g])),
    }
}

/// ITU-R 601 integer luminance, the same weights PIL's `L` mode uses.
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    ((299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b)) / 1000) as u8
}

fn sepia_px([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (r, g, b) = (u32::from(r), u32::from(g), u32::from(b));
    [
        (((393 * r + 769 * g + 189 * b) / 1000).min(255)) as u8,
        (((349 * r + 686 * g + 168 * b) / 1000).min(255)) as u8,
        (((272 * r + 534 * g + 131 * b) / 1000).min(255)) as u8,
    ]
}

fn map_rgb(mut canvas: RgbaImage, f: impl Fn([u8; 3]) -> [u8; 3]) -> RgbaImage {
    for px in canvas.pixels_mut() {
        let [r, g, b, a] = px.0;
        let [r, g, b] = f([r, g, b]);
        px.0 = [r, g, b, a];
    }
    canvas
}

/// Global contrast about the mean luminance of the image itself, the pivot
/// PIL's contrast enhancer uses.
fn scale_contrast(mut canvas: RgbaImage, factor: f32) -> RgbaImage {
    let (w, h) = canvas.dimensions();
    let count = u64::from(w) * u64::from(h);
    if count == 0 {
        return canvas;
    }
    let mut sum = 0u64;
    for px in canvas.pixels() {
        sum += u64::from(luminance(px.0[0], px.0[1], px.0[2]));
    }
    let mean = (sum as f64 / count as f64).round() as f32;

    for px in canvas.pixels_mut() {
        for c in 0..3 {
            let v = mean + (f32::from(px.0[c]) - mean) * factor;
            px.0[c] = v.round().clamp(0.0, 255.0) as u8;
        }
    }
    canvas
}

/// Radial darkening: a stepped edge-distance mask (255 at the border, minus
/// 10 per 10px ring for 20 rings, 0 inside), blurred, then composited toward
/// black so edges darken and the center stays untouched.
fn vignette(mut canvas: RgbaImage) -> MoodpaperResult<RgbaImage> {
    let (w, h) = canvas.dimensions();
    if w == 0 || h == 0 {
        return Ok(canvas);
    }

    let mut mask = vec![0u8; (w as usize) * (h as usize)];
    for y in 0..h {
        for x in 0..w {
            let edge_dist = x.min(y).min(w - 1 - x).min(h - 1 - y);
            let step = edge_dist / 10;
            let v = if step < 20 { 255 - 10 * step } else { 0 };
            mask[(y as usize) * (w as usize) + (x as usize)] = v as u8;
        }
    }
    let sigma = VIGNETTE_BLUR_RADIUS as f32 / 2.0;
    let mask = blur::blur_interleaved(&mask, w, h, 1, VIGNETTE_BLUR_RADIUS, sigma)?;

    for (x, y, px) in canvas.enumerate_pixels_mut() {
        let m = u16::from(mask[(y as usize) * (w as usize) + (x as usize)]);
        let keep = 255 - m;
        for c in 0..3 {
            px.0[c] = crate::composite::mul_div255(u16::from(px.0[c]), keep);
        }
    }
    Ok(canvas)
}

/// 3x3 convolution with replicated edges; `out = sum / scale + offset`,
/// rounded and clamped per channel. Alpha passes through.
fn convolve3x3(src: &RgbaImage, kernel: [i32; 9], scale: i32, offset: i32) -> RgbaImage {
    let (w, h) = src.dimensions();
    let mut out = src.clone();
    if w == 0 || h == 0 {
        return out;
    }
    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let mut acc = [0i32; 3];
            for ky in 0..3i64 {
                for kx in 0..3i64 {
                    let sx = (x + kx - 1).clamp(0, w as i64 - 1) as u32;
                    let sy = (y + ky - 1).clamp(0, h as i64 - 1) as u32;
                    let kw = kernel[(ky * 3 + kx) as usize];
                    let px = src.get_pixel(sx, sy).0;
                    for c in 0..3 {
                        acc[c] += kw * i32::from(px[c]);
                    }
                }
            }
            let a = src.get_pixel(x as u32, y as u32).0[3];
            let mut px = [0u8; 4];
            for c in 0..3 {
                let v = (acc[c] as f32 / scale as f32 + offset as f32).round();
                px[c] = v.clamp(0.0, 255.0) as u8;
            }
            px[3] = a;
            out.put_pixel(x as u32, y as u32, image::Rgba(px));
        }
    }
    out
}
