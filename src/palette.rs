use std::collections::HashMap;

use crate::{
    error::{MoodpaperError, MoodpaperResult},
    model::{Rgb, SourceImage},
};

pub type Palette = Vec<Rgb>;

/// Derive one merged palette from a set of source images.
///
/// Each decodable image is quantized independently to exactly `color_count`
/// colors ranked by population; the merged palette takes, per index, the
/// integer-truncated mean of each channel across images. Images that fail to
/// decode are skipped; if none decode this is an `EmptyPalette` error.
pub fn extract_palette(images: &[SourceImage], color_count: u32) -> MoodpaperResult<Palette> {
    if color_count < 2 {
        return Err(MoodpaperError::input("color_count must be >= 2"));
    }
    if images.is_empty() {
        return Err(MoodpaperError::empty_palette(
            "no source images to derive a palette from",
        ));
    }

    let k = color_count as usize;
    let mut per_image = Vec::<Palette>::with_capacity(images.len());
    for img in images {
        match image::load_from_memory(&img.bytes) {
            Ok(decoded) => per_image.push(quantize(&decoded.to_rgb8(), k)),
            Err(err) => {
                tracing::warn!(name = %img.name, %err, "skipping undecodable image for palette");
            }
        }
    }
    if per_image.is_empty() {
        return Err(MoodpaperError::empty_palette(
            "no source image could be decoded",
        ));
    }

    Ok(merge(&per_image, k))
}

/// Median-cut quantization to exactly `k` colors, ordered by population rank.
///
/// Deterministic per image: the histogram is sorted before cutting and every
/// tie-break is positional. An image with fewer distinct colors than `k` is
/// padded by cycling its ranked colors instead of erroring.
pub fn quantize(img: &image::RgbImage, k: usize) -> Palette {
    debug_assert!(k >= 1);

    let mut counts = HashMap::<Rgb, u64>::new();
    for px in img.pixels() {
        *counts.entry(px.0).or_insert(0) += 1;
    }
    let mut entries: Vec<(Rgb, u64)> = counts.into_iter().collect();
    entries.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    if entries.is_empty() {
        return vec![[0, 0, 0]; k];
    }

    let mut buckets = vec![entries];
    while buckets.len() < k {
        let Some((idx, channel)) = widest_bucket(&buckets) else {
            break;
        };
        let bucket = buckets.remove(idx);
        let (lo, hi) = split_at_median(bucket, channel);
        buckets.push(lo);
        buckets.push(hi);
    }

    let mut ranked: Vec<(Rgb, u64)> = buckets
        .iter()
        .map(|b| (bucket_mean(b), bucket_population(b)))
        .collect();
    ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut out: Palette = ranked.into_iter().map(|(c, _)| c).collect();
    let distinct = out.len();
    let mut i = 0usize;
    while out.len() < k {
        out.push(out[i % distinct]);
        i += 1;
    }
    out.truncate(k);
    out
}

/// Per-index channel mean across the per-image palettes, integer-truncated.
/// All palettes must have length `k`; `quantize` guarantees that.
fn merge(palettes: &[Palette], k: usize) -> Palette {
    let n = palettes.len() as u64;
    let mut out = Vec::with_capacity(k);
    for i in 0..k {
        let mut sums = [0u64; 3];
        for p in palettes {
            for c in 0..3 {
                sums[c] += u64::from(p[i][c]);
            }
        }
        out.push([
            (sums[0] / n) as u8,
            (sums[1] / n) as u8,
            (sums[2] / n) as u8,
        ]);
    }
    out
}

/// Bucket with the widest channel range among those that can still split.
/// Ties go to the larger population, then the lower index.
fn widest_bucket(buckets: &[Vec<(Rgb, u64)>]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize, u8, u64)> = None;
    for (idx, bucket) in buckets.iter().enumerate() {
        if bucket.len() < 2 {
            continue;
        }
        let (channel, range) = widest_channel(bucket);
        let pop = bucket_population(bucket);
        let better = match best {
            None => true,
            Some((_, _, r, p)) => range > r || (range == r && pop > p),
        };
        if better {
            best = Some((idx, channel, range, pop));
        }
    }
    best.map(|(idx, channel, _, _)| (idx, channel))
}

fn widest_channel(bucket: &[(Rgb, u64)]) -> (usize, u8) {
    let mut min = [255u8; 3];
    let mut max = [0u8; 3];
    for (color, _) in bucket {
        for c in 0..3 {
            min[c] = min[c].min(color[c]);
            max[c] = max[c].max(color[c]);
        }
    }
    let mut channel = 0;
    let mut range = 0u8;
    for c in 0..3 {
        let r = max[c] - min[c];
        if r > range {
            range = r;
            channel = c;
        }
    }
    (channel, range)
}

/// Split a bucket at its population median along `channel`. Both halves are
/// guaranteed non-empty for buckets of 2+ entries.
fn split_at_median(mut bucket: Vec<(Rgb, u64)>, channel: usize) -> (Vec<(Rgb, u64)>, Vec<(Rgb, u64)>) {
    bucket.sort_unstable_by(|a, b| a.0[channel].cmp(&b.0[channel]).then(a.0.cmp(&b.0)));
    let total = bucket_population(&bucket);
    let mut acc = 0u64;
    let mut cut = bucket.len() - 1;
    for (i, (_, count)) in bucket.iter().enumerate() {
        acc += count;
        if acc * 2 >= total {
            cut = i + 1;
            break;
        }
    }
    let cut = cut.clamp(1, bucket.len() - 1);
    let hi = bucket.split_off(cut);
    (bucket, hi)
}

fn bucket_population(bucket: &[(Rgb, u64)]) -> u64 {
    bucket.iter().map(|(_, count)| count).sum()
}

fn bucket_mean(bucket: &[(Rgb, u64)]) -> Rgb {
    let mut sums = [0u64; 3];
    let mut total = 0u64;
    for (color, count) in bucket {
        for c in 0..3 {
            sums[c] += u64::from(color[c]) * count;
        }
        total += count;
    }
    if total == 0 {
        return [0, 0, 0];
    }
    [
        (sums[0] / total) as u8,
        (sums[1] / total) as u8,
        (sums[2] / total) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_of(color: Rgb, w: u32, h: u32) -> SourceImage {
        let img = image::RgbImage::from_pixel(w, h, image::Rgb(color));
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
        SourceImage::new("solid", bytes)
    }

    #[test]
    fn extract_returns_exactly_k_colors_in_range() {
        let imgs = vec![png_of([200, 10, 10], 8, 8), png_of([10, 10, 200], 8, 8)];
        let palette = extract_palette(&imgs, 5).unwrap();
        assert_eq!(palette.len(), 5);
    }

    #[test]
    fn merge_is_per_index_channel_mean() {
        // pure red + pure blue at k=1 each merge to (127, 0, 127)
        let merged = merge(&[vec![[255, 0, 0]], vec![[0, 0, 255]]], 1);
        assert_eq!(merged, vec![[127, 0, 127]]);
    }

    #[test]
    fn extract_merges_two_solid_images() {
        let imgs = vec![png_of([255, 0, 0], 4, 4), png_of([0, 0, 255], 4, 4)];
        let palette = extract_palette(&imgs, 2).unwrap();
        // both images pad their single color, so every index is the mean
        assert_eq!(palette, vec![[127, 0, 127], [127, 0, 127]]);
    }

    #[test]
    fn extract_rejects_empty_image_list() {
        assert!(matches!(
            extract_palette(&[], 5),
            Err(MoodpaperError::EmptyPalette(_))
        ));
    }

    #[test]
    fn extract_rejects_zero_color_count() {
        let imgs = vec![png_of([1, 2, 3], 2, 2)];
        assert!(matches!(
            extract_palette(&imgs, 0),
            Err(MoodpaperError::Input(_))
        ));
    }

    #[test]
    fn extract_errors_when_nothing_decodes() {
        let imgs = vec![SourceImage::new("junk", vec![1, 2, 3, 4])];
        assert!(matches!(
            extract_palette(&imgs, 5),
            Err(MoodpaperError::EmptyPalette(_))
        ));
    }

    #[test]
    fn quantize_is_deterministic() {
        let mut img = image::RgbImage::new(16, 16);
        for (x, y, px) in img.enumerate_pixels_mut() {
            px.0 = [(x * 16) as u8, (y * 16) as u8, ((x + y) * 8) as u8];
        }
        let a = quantize(&img, 5);
        let b = quantize(&img, 5);
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
    }

    #[test]
    fn quantize_pads_low_variety_images() {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([9, 9, 9]));
        let palette = quantize(&img, 4);
        assert_eq!(palette, vec![[9, 9, 9]; 4]);
    }

    #[test]
    fn quantize_ranks_dominant_color_first() {
        let mut img = image::RgbImage::from_pixel(10, 10, image::Rgb([0, 200, 0]));
        for x in 0..3 {
            img.put_pixel(x, 0, image::Rgb([200, 0, 0]));
        }
        let palette = quantize(&img, 2);
        // 97 green pixels vs 3 red ones
        assert_eq!(palette[0], [0, 200, 0]);
        assert_eq!(palette[1], [200, 0, 0]);
    }
}
