use image::{Rgba, RgbaImage, imageops::FilterType};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::{
    composite,
    error::{MoodpaperError, MoodpaperResult},
    filter::{self, FilterKind},
    model::{ComposeRequest, Rgb, SourceImage},
    palette::{self, Palette},
    sticker,
    template::{self, CANVAS_HEIGHT, CANVAS_WIDTH, Template},
    text,
};

/// Vertical offset of the title center from the canvas top.
const TITLE_OFFSET_Y: i64 = 50;

/// Compose a wallpaper and encode it as PNG.
///
/// Only invalid input and an underivable palette abort; per-element problems
/// (undecodable slot image, unplaceable sticker, missing font file) degrade
/// to the element being absent from the output.
#[tracing::instrument(
    skip(request, images),
    fields(template = %request.template, filter = %request.filter, images = images.len())
)]
pub fn compose(request: &ComposeRequest, images: &[SourceImage]) -> MoodpaperResult<Vec<u8>> {
    let canvas = render_canvas(request, images)?;
    encode_png(&canvas)
}

/// The compose pipeline up to the final canvas, in fixed stage order:
/// background, slot images, filter, title, stickers, border.
pub fn render_canvas(
    request: &ComposeRequest,
    images: &[SourceImage],
) -> MoodpaperResult<RgbaImage> {
    request.validate()?;

    let filter_kind = FilterKind::parse(&request.filter);
    let choice = template::parse_template(&request.template)?;
    let palette = match &request.palette {
        Some(p) => p.clone(),
        None => palette::extract_palette(images, request.color_count)?,
    };

    let mut rng = match request.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let tpl = template::select(choice, &mut rng);
    tracing::debug!(kind = ?tpl.kind, "template selected");

    let mut canvas = paint_background(&palette, request.gradient_background);

    paste_slot_images(&mut canvas, &tpl, images, request.album_opacity);

    let mut canvas = filter::apply(canvas, filter_kind)?;

    let font = text::load_font(
        request
            .title
            .as_ref()
            .and_then(|t| t.font.as_deref()),
    )?;

    if let Some(title) = &request.title
        && !title.text.trim().is_empty()
    {
        let color = title.color.unwrap_or(palette[1]);
        let (tw, th) = text::measure(&font, &title.text, title.size);
        let buf = text::render(&font, &title.text, title.size, color, 255);
        let x = (i64::from(CANVAS_WIDTH) - i64::from(tw)) / 2;
        let y = TITLE_OFFSET_Y - i64::from(th) / 2;
        composite::overlay(&mut canvas, &buf, x, y);
    }

    if let Some(stickers) = &request.stickers
        && !stickers.texts.is_empty()
    {
        let color = palette[2 % palette.len()];
        let placed = sticker::place_stickers(
            &mut canvas,
            stickers,
            color,
            tpl.slots,
            &font,
            &mut rng,
        );
        tracing::debug!(
            requested = stickers.texts.len(),
            placed = placed.len(),
            "sticker placement finished"
        );
    }

    if request.border_width > 0 {
        let color = request.border_color.unwrap_or(palette[1]);
        draw_border(&mut canvas, request.border_width, color);
    }

    Ok(canvas)
}

/// Flat `palette[0]`, or a vertical gradient from `palette[0]` to the last
/// palette color with integer-truncated interpolation per row.
fn paint_background(palette: &Palette, gradient: bool) -> RgbaImage {
    let c1 = palette[0];
    if !gradient {
        return RgbaImage::from_pixel(
            CANVAS_WIDTH,
            CANVAS_HEIGHT,
            Rgba([c1[0], c1[1], c1[2], 255]),
        );
    }

    let c2 = palette[palette.len() - 1];
    let mut canvas = RgbaImage::new(CANVAS_WIDTH, CANVAS_HEIGHT);
    let h = CANVAS_HEIGHT as i32;
    for y in 0..CANVAS_HEIGHT {
        let mut row = [0u8; 3];
        for c in 0..3 {
            let a = i32::from(c1[c]);
            let b = i32::from(c2[c]);
            row[c] = (a + (b - a) * y as i32 / h) as u8;
        }
        for x in 0..CANVAS_WIDTH {
            canvas.put_pixel(x, y, Rgba([row[0], row[1], row[2], 255]));
        }
    }
    canvas
}

/// Resize each available source image to its slot and paste it. Slots beyond
/// the image list stay blank; an undecodable buffer leaves its slot blank.
fn paste_slot_images(
    canvas: &mut RgbaImage,
    tpl: &Template,
    images: &[SourceImage],
    album_opacity: u8,
) {
    for (i, slot) in tpl.slots.iter().enumerate() {
        let Some(source) = images.get(i) else {
            continue;
        };
        let decoded = match image::load_from_memory(&source.bytes) {
            Ok(img) => img.to_rgba8(),
            Err(err) => {
                tracing::warn!(name = %source.name, %err, "slot image failed to decode, leaving slot blank");
                continue;
            }
        };
        let mut resized = image::imageops::resize(
            &decoded,
            slot.width(),
            slot.height(),
            FilterType::Lanczos3,
        );
        if album_opacity < 255 {
            composite::blend_toward_white(&mut resized, album_opacity);
        }
        composite::paste(canvas, &resized, slot.left, slot.top);
    }
}

/// Rectangular outline of `width` px inset at the canvas edge.
fn draw_border(canvas: &mut RgbaImage, width: u32, color: Rgb) {
    let (cw, ch) = canvas.dimensions();
    let bw = width.min(cw / 2).min(ch / 2);
    let px = Rgba([color[0], color[1], color[2], 255]);
    for y in 0..ch {
        for x in 0..cw {
            if x < bw || y < bw || x >= cw - bw || y >= ch - bw {
                canvas.put_pixel(x, y, px);
            }
        }
    }
}

/// Encode the finished canvas as lossless PNG bytes.
pub fn encode_png(canvas: &RgbaImage) -> MoodpaperResult<Vec<u8>> {
    let mut out = Vec::new();
    canvas
        .write_to(
            &mut std::io::Cursor::new(&mut out),
            image::ImageFormat::Png,
        )
        .map_err(|err| MoodpaperError::encode(format!("png encode failed: {err}")))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_color_palette() -> Vec<Rgb> {
        vec![[10, 20, 30], [200, 210, 220]]
    }

    #[test]
    fn flat_background_is_palette_zero() {
        let canvas = paint_background(&two_color_palette(), false);
        assert_eq!(canvas.get_pixel(0, 0).0, [10, 20, 30, 255]);
        assert_eq!(
            canvas.get_pixel(CANVAS_WIDTH - 1, CANVAS_HEIGHT - 1).0,
            [10, 20, 30, 255]
        );
    }

    #[test]
    fn gradient_background_interpolates_rows() {
        let canvas = paint_background(&two_color_palette(), true);
        assert_eq!(canvas.get_pixel(0, 0).0, [10, 20, 30, 255]);
        let last = canvas.get_pixel(0, CANVAS_HEIGHT - 1).0;
        // last row is one step short of c2 by integer truncation
        assert!(last[0] >= 199 && last[0] <= 200);
        let mid = canvas.get_pixel(0, CANVAS_HEIGHT / 2).0;
        assert!(mid[0] > 10 && mid[0] < 200);
    }

    #[test]
    fn border_paints_edges_only() {
        let palette = two_color_palette();
        let mut canvas = paint_background(&palette, false);
        draw_border(&mut canvas, 12, [255, 0, 0]);
        assert_eq!(canvas.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(11, CANVAS_HEIGHT / 2).0, [255, 0, 0, 255]);
        assert_eq!(
            canvas.get_pixel(12, CANVAS_HEIGHT / 2).0,
            [10, 20, 30, 255]
        );
    }

    #[test]
    fn encode_png_roundtrips() {
        let canvas = RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255]));
        let bytes = encode_png(&canvas).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (8, 8));
        assert_eq!(decoded.get_pixel(4, 4).0, [1, 2, 3, 255]);
    }
}
