use image::{Rgba, RgbaImage};

pub type Rgba8 = [u8; 4];

/// Source-over for straight-alpha pixels. The destination canvas is opaque
/// for the whole compose call, so output alpha stays 255.
pub fn over(dst: Rgba8, src: Rgba8) -> Rgba8 {
    let sa = u16::from(src[3]);
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return [src[0], src[1], src[2], dst[3]];
    }

    let inv = 255u16 - sa;
    let mut out = [0u8; 4];
    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), sa);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out[3] = dst[3];
    out
}

/// Alpha-composite `src` onto `canvas` with its top-left at `(x, y)`,
/// clipping at the canvas edges. Out-of-range coordinates are fine.
pub fn overlay(canvas: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) {
    let (cw, ch) = canvas.dimensions();
    for (sx, sy, px) in src.enumerate_pixels() {
        let dx = x + i64::from(sx);
        let dy = y + i64::from(sy);
        if dx < 0 || dy < 0 || dx >= i64::from(cw) || dy >= i64::from(ch) {
            continue;
        }
        let (dx, dy) = (dx as u32, dy as u32);
        let dst = canvas.get_pixel(dx, dy).0;
        canvas.put_pixel(dx, dy, Rgba(over(dst, px.0)));
    }
}

/// Replace canvas pixels with `src` at `(x, y)`, clipping at the edges.
/// Matches an unmasked paste: no alpha blending.
pub fn paste(canvas: &mut RgbaImage, src: &RgbaImage, x: u32, y: u32) {
    let (cw, ch) = canvas.dimensions();
    for (sx, sy, px) in src.enumerate_pixels() {
        let dx = x + sx;
        let dy = y + sy;
        if dx >= cw || dy >= ch {
            continue;
        }
        canvas.put_pixel(dx, dy, Rgba([px.0[0], px.0[1], px.0[2], 255]));
    }
}

/// Blend every pixel toward white by `255 - opacity`; `opacity == 255` is a
/// no-op, `opacity == 0` yields solid white.
pub fn blend_toward_white(img: &mut RgbaImage, opacity: u8) {
    if opacity == 255 {
        return;
    }
    let op = u16::from(opacity);
    let lift = 255 - opacity;
    for px in img.pixels_mut() {
        for c in 0..3 {
            px.0[c] = mul_div255(u16::from(px.0[c]), op).saturating_add(lift);
        }
    }
}

pub(crate) fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn over_src_alpha_0_is_noop() {
        let dst = [10, 20, 30, 255];
        let src = [255, 255, 255, 0];
        assert_eq!(over(dst, src), dst);
    }

    #[test]
    fn over_src_opaque_replaces_color() {
        let dst = [0, 0, 0, 255];
        let src = [255, 0, 0, 255];
        assert_eq!(over(dst, src), [255, 0, 0, 255]);
    }

    #[test]
    fn over_half_alpha_mixes_channels() {
        let dst = [0, 0, 0, 255];
        let src = [255, 255, 255, 128];
        let out = over(dst, src);
        assert!(out[0] > 120 && out[0] < 136);
        assert_eq!(out[3], 255);
    }

    #[test]
    fn overlay_clips_at_edges() {
        let mut canvas = RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 255]));
        let src = RgbaImage::from_pixel(3, 3, image::Rgba([255, 0, 0, 255]));
        overlay(&mut canvas, &src, 2, 2);
        assert_eq!(canvas.get_pixel(3, 3).0, [255, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(1, 1).0, [0, 0, 0, 255]);

        // fully off-canvas draws nothing
        overlay(&mut canvas, &src, -10, -10);
        assert_eq!(canvas.get_pixel(0, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn paste_replaces_without_blending() {
        let mut canvas = RgbaImage::from_pixel(4, 4, image::Rgba([9, 9, 9, 255]));
        let src = RgbaImage::from_pixel(2, 2, image::Rgba([1, 2, 3, 0]));
        paste(&mut canvas, &src, 1, 1);
        // alpha of the source is ignored, pixels are replaced
        assert_eq!(canvas.get_pixel(1, 1).0, [1, 2, 3, 255]);
        assert_eq!(canvas.get_pixel(3, 3).0, [9, 9, 9, 255]);
    }

    #[test]
    fn blend_toward_white_endpoints() {
        let mut a = RgbaImage::from_pixel(1, 1, image::Rgba([10, 20, 30, 255]));
        blend_toward_white(&mut a, 255);
        assert_eq!(a.get_pixel(0, 0).0, [10, 20, 30, 255]);

        let mut b = RgbaImage::from_pixel(1, 1, image::Rgba([10, 20, 30, 255]));
        blend_toward_white(&mut b, 0);
        assert_eq!(b.get_pixel(0, 0).0, [255, 255, 255, 255]);
    }
}
