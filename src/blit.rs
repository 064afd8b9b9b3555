//! Binary image blitter.
//!
//! Combines a source bitmap into a destination bitmap at an arbitrary pixel
//! position, with full support for partially overlapping bitmaps and
//! optional source and destination regions (usable for clipping or for
//! extracting parts of a bitmap).
//!
//! Each row is processed as up to three parts: a masked head byte, a run of
//! whole destination bytes, and a masked tail byte. An 8-bit shift register
//! presents the source data byte-aligned to the destination regardless of
//! the relative sub-byte offset of the two bitmaps.

use crate::bitmap::Bitmap;

/// Operator used to combine a source pixel with a destination pixel.
///
/// The first five operators carry the JBIG2 wire codes 0 to 4 and describe
/// how a region bitmap is drawn onto a page ("7.4.1.5"). `Not` has no wire
/// code; it only exists for internal compositing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinationOperator {
    /// 0 OR
    Or,
    /// 1 AND
    And,
    /// 2 XOR
    Xor,
    /// 3 XNOR
    Xnor,
    /// 4 REPLACE
    Replace,
    /// Inverted copy of the source. Not expressible in the wire format.
    Not,
}

impl CombinationOperator {
    /// Translate a wire-level operator code (0 to 4).
    pub(crate) fn from_wire(value: u8) -> crate::error::Result<Self> {
        match value {
            0 => Ok(Self::Or),
            1 => Ok(Self::And),
            2 => Ok(Self::Xor),
            3 => Ok(Self::Xnor),
            4 => Ok(Self::Replace),
            _ => crate::error::err!(crate::error::DecodeError::InvalidHeaderValue),
        }
    }
}

/// A rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// The x coordinate of the upper-left corner.
    pub x: i32,
    /// The y coordinate of the upper-left corner.
    pub y: i32,
    /// The width in pixels.
    pub width: i32,
    /// The height in pixels.
    pub height: i32,
}

impl Rect {
    /// Create a rectangle.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Combine `src` into `dst` with the upper-left corner of `src` at (x, y).
///
/// Parts of the source that fall outside the destination are ignored.
pub fn combine(src: &Bitmap, dst: &mut Bitmap, x: i32, y: i32, operator: CombinationOperator) {
    blit(src, None, dst, None, x, y, operator);
}

/// Extract a copy of the given region of `src` as a new bitmap.
///
/// Pixels of the region that lie outside of `src` are white.
pub fn extract(roi: Rect, src: &Bitmap) -> Bitmap {
    let mut dst = Bitmap::new(roi.width.max(0) as u32, roi.height.max(0) as u32);
    blit(
        src,
        Some(roi),
        &mut dst,
        None,
        0,
        0,
        CombinationOperator::Replace,
    );
    dst
}

/// Combine a region of `src` into a region of `dst` at (x, y) using the
/// given operator.
///
/// Coordinate normalization happens in the order:
///
/// 1. the source rectangle is narrowed to `src_region`, if given;
/// 2. a negative x or y advances the source by the same amount;
/// 3. the position is translated by `dst_region` and clipped against it;
/// 4. the result is clipped against the destination extent. If nothing
///    remains, the destination is left untouched.
pub fn blit(
    src: &Bitmap,
    src_region: Option<Rect>,
    dst: &mut Bitmap,
    dst_region: Option<Rect>,
    x: i32,
    y: i32,
    operator: CombinationOperator,
) {
    let mut src_x = 0_i32;
    let mut src_y = 0_i32;
    let mut src_width = src.width() as i32;
    let mut src_height = src.height() as i32;
    let mut dst_width = dst.width() as i32;
    let mut dst_height = dst.height() as i32;
    let mut dst_x = x;
    let mut dst_y = y;

    if let Some(region) = src_region {
        src_x = region.x;
        src_y = region.y;
        src_width = src_width.min(src_width - region.x).min(region.width);
        src_height = src_height.min(src_height - region.y).min(region.height);
    }

    if dst_x < 0 {
        src_width += dst_x;
        src_x -= dst_x;
        dst_x = 0;
    }

    if dst_y < 0 {
        src_height += dst_y;
        src_y -= dst_y;
        dst_y = 0;
    }

    if let Some(region) = dst_region {
        dst_x += region.x;
        dst_y += region.y;
        dst_width = dst_width.min(region.x + region.width);
        dst_height = dst_height.min(region.y + region.height);
    }

    src_width = src_width.min(dst_width - dst_x);
    if src_width <= 0 {
        return;
    }

    src_height = src_height.min(dst_height - dst_y);
    if src_height <= 0 {
        return;
    }

    debug_assert!(src_x >= 0 && src_y >= 0);

    let shift_left = (src_x & 7) as u32;
    let shift_right = (dst_x & 7) as u32;
    let src_stride = src.row_stride() as usize;
    let dst_stride = dst.row_stride() as usize;
    let src_offset = (src_x / 8) as usize + src_y as usize * src_stride;
    let dst_offset = (dst_x / 8) as usize + dst_y as usize * dst_stride;

    // The head byte is limited on both sides, the tail byte on the right
    // only; both source and destination widths may carry padding bits.
    let head_bits = (8 - shift_right as i32).min(src_width);
    let full_bytes = (src_width - head_bits) / 8;
    let tail_bits = (src_width - head_bits) % 8;

    let head_mask = trim_byte(0xFF, shift_right, (8 - head_bits) as u32 - shift_right);
    let tail_mask = trim_byte(0xFF, 0, (8 - tail_bits) as u32);

    // The inner loop only ever shifts right; a left shift is turned into a
    // right shift by offsetting the register by 8, loading one extra source
    // byte up front when the head needs bits from it.
    let mut shift_delta = shift_right as i32 - shift_left as i32;
    let mut pre_shift = 0_i32;
    if shift_left > shift_right {
        shift_delta += 8;
        pre_shift = if (8 - shift_left as i32) < head_bits {
            -1
        } else {
            1
        };
    }

    let row = RowLayout {
        src_offset,
        src_stride,
        dst_offset,
        dst_stride,
        height: src_height,
        shift_delta: shift_delta as u32,
        pre_shift,
        full_bytes: full_bytes as usize,
        tail_bits: tail_bits as u32,
        head_mask,
        tail_mask,
    };

    match operator {
        CombinationOperator::Or => blit_rows(src.data(), dst.data_mut(), &row, false, |s, d| s | d),
        CombinationOperator::And => {
            blit_rows(src.data(), dst.data_mut(), &row, false, |s, d| s & d)
        }
        CombinationOperator::Xor => {
            blit_rows(src.data(), dst.data_mut(), &row, false, |s, d| s ^ d)
        }
        CombinationOperator::Xnor => {
            blit_rows(src.data(), dst.data_mut(), &row, false, |s, d| !(s ^ d))
        }
        CombinationOperator::Replace => {
            blit_rows(src.data(), dst.data_mut(), &row, true, |s, _| s)
        }
        CombinationOperator::Not => blit_rows(src.data(), dst.data_mut(), &row, false, |s, _| !s),
    }
}

/// Per-row geometry shared by all operators.
struct RowLayout {
    src_offset: usize,
    src_stride: usize,
    dst_offset: usize,
    dst_stride: usize,
    height: i32,
    shift_delta: u32,
    pre_shift: i32,
    full_bytes: usize,
    tail_bits: u32,
    head_mask: u32,
    tail_mask: u32,
}

fn blit_rows(
    src: &[u8],
    dst: &mut [u8],
    row: &RowLayout,
    is_replace: bool,
    op: impl Fn(u32, u32) -> u32 + Copy,
) {
    let mut src_offset = row.src_offset;
    let mut dst_offset = row.dst_offset;

    for _ in 0..row.height {
        let mut input = src_offset;
        let mut out = dst_offset;

        let mut reg = src[input] as u32;
        input += 1;
        if row.pre_shift != 0 {
            reg <<= 8;
            if row.pre_shift < 0 {
                reg |= src[input] as u32;
                input += 1;
            }
        }

        let d = dst[out] as u32;
        dst[out] = ((d & !row.head_mask) | (row.head_mask & op(reg >> row.shift_delta, d))) as u8;

        if row.full_bytes > 0 {
            if row.shift_delta == 0 {
                if is_replace {
                    dst[out + 1..out + 1 + row.full_bytes]
                        .copy_from_slice(&src[input..input + row.full_bytes]);
                    input += row.full_bytes;
                    out += row.full_bytes;
                } else {
                    for _ in 0..row.full_bytes {
                        out += 1;
                        let d = dst[out] as u32;
                        dst[out] = op(src[input] as u32, d) as u8;
                        input += 1;
                    }
                }
            } else {
                for _ in 0..row.full_bytes {
                    out += 1;
                    reg = (reg << 8) | src[input] as u32;
                    input += 1;
                    let d = dst[out] as u32;
                    dst[out] = op(reg >> row.shift_delta, d) as u8;
                }
            }
        }

        if row.tail_bits != 0 {
            reg <<= 8;
            if row.shift_delta < row.tail_bits {
                reg |= src[input] as u32;
            }

            out += 1;
            let d = dst[out] as u32;
            dst[out] =
                ((d & !row.tail_mask) | (row.tail_mask & op(reg >> row.shift_delta, d))) as u8;
        }

        src_offset += row.src_stride;
        dst_offset += row.dst_stride;
    }
}

/// Mask out `left` bits on the left and `right` bits on the right of a byte.
#[inline(always)]
fn trim_byte(value: u32, left: u32, right: u32) -> u32 {
    (0xFF >> left) & (0xFF << right) & value
}
