//! Region decoding procedures and the region segment information field
//! (7.4.1).

pub mod generic;
pub(crate) mod halftone;
pub(crate) mod pattern;

use crate::bitmap::Bitmap;
use crate::blit::CombinationOperator;
use crate::error::{DecodeError, Result, bail};
use crate::reader::Reader;

/// Parsed region segment information field (7.4.1).
///
/// "A region segment information field contains the following subfields:
/// bitmap width, bitmap height, bitmap X location, bitmap Y location and
/// region segment flags." (7.4.1)
#[derive(Debug, Clone)]
pub(crate) struct RegionSegmentInfo {
    /// Width in pixels of the bitmap encoded in this segment (7.4.1.1).
    pub width: u32,
    /// Height in pixels of the bitmap encoded in this segment (7.4.1.2).
    pub height: u32,
    /// Horizontal offset of the bitmap relative to the page (7.4.1.3).
    pub x_location: u32,
    /// Vertical offset of the bitmap relative to the page (7.4.1.4).
    pub y_location: u32,
    /// "Bits 0-2: External combination operator." (7.4.1.5)
    pub combination_operator: CombinationOperator,
}

/// Parse the region segment information field (7.4.1).
pub(crate) fn parse_region_segment_info(reader: &mut Reader<'_>) -> Result<RegionSegmentInfo> {
    let width = reader.read_u32()?;
    let height = reader.read_u32()?;
    let x_location = reader.read_u32()?;
    let y_location = reader.read_u32()?;

    let flags = reader.read_byte()?;
    let combination_operator = CombinationOperator::from_wire(flags & 0x07)?;

    Ok(RegionSegmentInfo {
        width,
        height,
        x_location,
        y_location,
        combination_operator,
    })
}

/// A decoded region bitmap together with its placement on the page.
#[derive(Debug, Clone)]
pub(crate) struct DecodedRegion {
    /// The decoding procedure that produced the bitmap.
    pub kind: RegionKind,
    /// The decoded pixels.
    pub bitmap: Bitmap,
    /// Horizontal position on the page.
    pub x_location: u32,
    /// Vertical position on the page.
    pub y_location: u32,
    /// How the bitmap is combined with the page.
    pub combination_operator: CombinationOperator,
}

/// Discriminates the region decoding procedures this crate implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegionKind {
    /// Generic region coding (6.2).
    Generic,
    /// Halftone region coding (6.6).
    Halftone,
}

/// An adaptive template pixel position.
///
/// A neighborhood location supplied per region rather than fixed by the
/// template. Parsed values fit a signed byte; synthesized values (the
/// pattern dictionary uses the negated pattern width) may not.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdaptiveTemplatePixel {
    /// Horizontal offset relative to the current pixel.
    pub x: i16,
    /// Vertical offset relative to the current pixel.
    pub y: i16,
}

impl AdaptiveTemplatePixel {
    /// Create an adaptive template pixel offset.
    pub fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }
}

/// Parse one adaptive template pixel (7.4.6.3) and check that it references
/// an already-decoded location: above the current row, or to its left
/// within the current row.
pub(crate) fn parse_adaptive_template_pixel(
    reader: &mut Reader<'_>,
) -> Result<AdaptiveTemplatePixel> {
    let x = reader.read_byte()? as i8 as i16;
    let y = reader.read_byte()? as i8 as i16;

    if y > 0 || (y == 0 && x >= 0) {
        bail!(DecodeError::InvalidHeaderValue);
    }

    Ok(AdaptiveTemplatePixel { x, y })
}
