//! Aspect-fill crop geometry

/// Region of the source image kept before resizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width of the region
    pub width: u32,
    /// Height of the region
    pub height: u32,
}

/// Computes the centered crop of a `src_w`x`src_h` image that has the aspect
/// ratio of `dst_w`x`dst_h`
///
/// A source narrower than the target keeps its full width and loses rows; any
/// other source keeps its full height and loses columns. The crop length is
/// rounded to the nearest pixel (at least one). When the excess is odd the
/// origin is floored, so the extra pixel comes off the right or bottom edge.
///
/// All dimensions must be non-zero.
#[must_use]
pub fn fill_crop(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> CropRect {
    let narrower = u64::from(src_w) * u64::from(dst_h) < u64::from(dst_w) * u64::from(src_h);

    if narrower {
        let height = scaled_length(src_w, dst_h, dst_w, src_h);
        CropRect {
            x: 0,
            y: (src_h - height) / 2,
            width: src_w,
            height,
        }
    } else {
        let width = scaled_length(src_h, dst_w, dst_h, src_w);
        CropRect {
            x: (src_w - width) / 2,
            y: 0,
            width,
            height: src_h,
        }
    }
}

/// `round(len * num / den)` clamped to `1..=limit`, rounding halves up
fn scaled_length(len: u32, num: u32, den: u32, limit: u32) -> u32 {
    let numerator = u64::from(len) * u64::from(num);
    let den = u64::from(den);
    let rounded = (2 * numerator + den) / (2 * den);
    let clamped = rounded.clamp(1, u64::from(limit));
    u32::try_from(clamped).unwrap_or(limit)
}
