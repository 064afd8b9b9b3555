//! Halftone region decoding (6.6, 7.4.5).
//!
//! A halftone region is a grid of cells, each holding an index into the
//! patterns of a referenced pattern dictionary. The indices are decoded as
//! a gray-scale image (Annex C), then the referenced patterns are painted
//! onto the region under the halftone combination operator.

use crate::bitmap::Bitmap;
use crate::blit::{CombinationOperator, combine};
use crate::error::{DecodeError, Result, bail};
use crate::gray_scale::{GrayScaleParams, decode_gray_scale_image};
use crate::reader::Reader;
use crate::region::generic::GbTemplate;
use crate::region::pattern::PatternDictionary;
use crate::region::{DecodedRegion, RegionKind, RegionSegmentInfo, parse_region_segment_info};

/// Parsed halftone region segment data header (7.4.5.1).
#[derive(Debug, Clone)]
struct HalftoneRegionHeader {
    region_info: RegionSegmentInfo,
    /// `HDEFPIXEL`: initial value of every region pixel (bit 7 of the flags).
    default_pixel: bool,
    /// `HCOMBOP`: how patterns are drawn into the region (bits 4 to 6).
    combination_operator: CombinationOperator,
    /// `HENABLESKIP`: whether off-region grid cells are skipped (bit 3).
    enable_skip: bool,
    /// `HTEMPLATE`: template for the gray-scale bit-planes (bits 1 and 2).
    template: GbTemplate,
    /// `HGW`: grid width in cells.
    grid_width: u32,
    /// `HGH`: grid height in cells.
    grid_height: u32,
    /// `HGX`: grid origin, in 1/256 of a pixel.
    grid_x: i32,
    /// `HGY`: grid origin, in 1/256 of a pixel.
    grid_y: i32,
    /// `HRX`: grid vector, in 1/256 of a pixel.
    vector_x: u16,
    /// `HRY`: grid vector, in 1/256 of a pixel.
    vector_y: u16,
}

/// Parse a halftone region segment data header (7.4.5.1).
fn parse(reader: &mut Reader<'_>) -> Result<HalftoneRegionHeader> {
    let region_info = parse_region_segment_info(reader)?;

    let flags = reader.read_byte()?;
    let mmr = flags & 0x01 != 0;
    let template = GbTemplate::from_bits(flags >> 1);
    let enable_skip = flags & 0x08 != 0;
    let combination_operator = CombinationOperator::from_wire((flags >> 4) & 0x07)?;
    let default_pixel = flags & 0x80 != 0;

    // MMR-coded gray-scale planes are outside the scope of this decoder.
    if mmr {
        bail!(DecodeError::InvalidHeaderValue);
    }

    let grid_width = reader.read_u32()?;
    let grid_height = reader.read_u32()?;
    let grid_x = reader.read_i32()?;
    let grid_y = reader.read_i32()?;
    let vector_x = reader.read_u16()?;
    let vector_y = reader.read_u16()?;

    Ok(HalftoneRegionHeader {
        region_info,
        default_pixel,
        combination_operator,
        enable_skip,
        template,
        grid_width,
        grid_height,
        grid_x,
        grid_y,
        vector_x,
        vector_y,
    })
}

/// Decode a halftone region segment (7.4.5.2, 6.6.5).
pub(crate) fn decode(
    reader: &mut Reader<'_>,
    pattern_dict: &PatternDictionary,
) -> Result<DecodedRegion> {
    let header = parse(reader)?;
    let info = &header.region_info;

    log::trace!(
        "halftone region: {}x{} at ({}, {}), grid {}x{}, {} patterns",
        info.width,
        info.height,
        info.x_location,
        info.y_location,
        header.grid_width,
        header.grid_height,
        pattern_dict.patterns.len(),
    );

    // An empty grid cannot cover a non-empty region.
    if (header.grid_width == 0 || header.grid_height == 0) && info.width > 0 && info.height > 0 {
        bail!(DecodeError::InvalidHeaderValue);
    }

    // "1) Fill a bitmap HTREG, of the size given by the region segment
    // information field, with the HDEFPIXEL value." (6.6.5)
    let mut region = Bitmap::with_default_pixel(info.width, info.height, header.default_pixel);

    // "2) If HENABLESKIP equals 1, compute a bitmap HSKIP as shown in
    // 6.6.5.1." (6.6.5)
    let skip = if header.enable_skip {
        Some(compute_skip_bitmap(&header, pattern_dict))
    } else {
        None
    };

    // "3) Set HBPP to ceil(log2(HNUMPATS))." (6.6.5)
    let num_patterns = pattern_dict.patterns.len() as u32;
    let bits_per_value = if num_patterns <= 1 {
        0
    } else {
        (num_patterns - 1).ilog2() + 1
    };

    // "4) Decode an image GI of size HGW by HGH with HBPP bits per pixel
    // using the gray-scale image decoding procedure of Annex C." (6.6.5)
    let gray_params = GrayScaleParams {
        bits_per_value,
        width: header.grid_width,
        height: header.grid_height,
        template: header.template,
        skip: skip.as_ref(),
    };
    let values = decode_gray_scale_image(reader.tail()?, &gray_params)?;

    // "5) Place the patterns corresponding to the values in GI into HTREG
    // as described in 6.6.5.2." (6.6.5)
    render_patterns(&mut region, &values, &header, pattern_dict)?;

    Ok(DecodedRegion {
        kind: RegionKind::Halftone,
        bitmap: region,
        x_location: info.x_location,
        y_location: info.y_location,
        combination_operator: info.combination_operator,
    })
}

/// The fixed-point position of grid cell (m, n), in pixels (6.6.5.2):
///
/// ```text
/// x = (HGX + m * HRY + n * HRX) >> 8
/// y = (HGY + m * HRX - n * HRY) >> 8
/// ```
///
/// The arithmetic right shift converts from 1/256-pixel units and rounds
/// toward negative infinity, so -1 stays -1.
fn grid_position(header: &HalftoneRegionHeader, m: u32, n: u32) -> (i64, i64) {
    let rx = header.vector_x as i64;
    let ry = header.vector_y as i64;
    let m = m as i64;
    let n = n as i64;

    let x = (header.grid_x as i64 + m * ry + n * rx) >> 8;
    let y = (header.grid_y as i64 + m * rx - n * ry) >> 8;

    (x, y)
}

/// The placement of cell (m, n) inside the region, offset by the grid
/// origin as drawn.
fn cell_location(header: &HalftoneRegionHeader, m: u32, n: u32) -> (i32, i32) {
    let (x, y) = grid_position(header, m, n);

    (
        clamp_coordinate(x + header.grid_x as i64),
        clamp_coordinate(y + header.grid_y as i64),
    )
}

/// Clamp a cell coordinate for the blitter; anything this far out is
/// clipped away entirely.
fn clamp_coordinate(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Compute the HSKIP bitmap (6.6.5.1): cells whose pattern falls entirely
/// outside the region are flagged and their values never decoded.
fn compute_skip_bitmap(header: &HalftoneRegionHeader, pattern_dict: &PatternDictionary) -> Bitmap {
    let pattern_width = pattern_dict.pattern_width as i64;
    let pattern_height = pattern_dict.pattern_height as i64;
    let region_width = header.region_info.width as i64;
    let region_height = header.region_info.height as i64;

    let mut skip = Bitmap::new(header.grid_width, header.grid_height);

    for m in 0..header.grid_height {
        for n in 0..header.grid_width {
            let (x, y) = cell_location(header, m, n);
            let x = x as i64;
            let y = y as i64;

            // "If ((x + HPW <= 0) OR (x >= HBW) OR (y + HPH <= 0) OR
            // (y >= HBH)) then set: HSKIP[n, m] = 1" (6.6.5.1)
            let outside = x + pattern_width <= 0
                || x >= region_width
                || y + pattern_height <= 0
                || y >= region_height;

            skip.set_pixel(n, m, outside);
        }
    }

    skip
}

/// Draw the referenced patterns into the region (6.6.5.2).
fn render_patterns(
    region: &mut Bitmap,
    values: &[u32],
    header: &HalftoneRegionHeader,
    pattern_dict: &PatternDictionary,
) -> Result<()> {
    for m in 0..header.grid_height {
        for n in 0..header.grid_width {
            let index = values[(m * header.grid_width + n) as usize] as usize;
            let pattern = pattern_dict
                .patterns
                .get(index)
                .ok_or(DecodeError::IndexOutOfBounds)?;

            // "Draw the pattern HPATS[GI[n, m]] into HTREG such that its
            // upper left pixel is at location (x, y)." (6.6.5.2)
            let (x, y) = cell_location(header, m, n);
            combine(pattern, region, x, y, header.combination_operator);
        }
    }

    Ok(())
}
