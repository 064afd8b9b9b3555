//! Generic region decoding (6.2, 7.4.6).
//!
//! A generic region is decoded pixel by pixel, top to bottom and left to
//! right. For every pixel a context is gathered from a causal neighborhood
//! of previously decoded pixels and handed to the arithmetic decoder, which
//! yields the pixel value.

use alloc::vec::Vec;

use crate::arithmetic_decoder::{ArithmeticDecoder, ContextMemory};
use crate::bitmap::Bitmap;
use crate::error::{DecodeError, Result, bail};
use crate::reader::Reader;
use crate::region::{
    AdaptiveTemplatePixel, DecodedRegion, RegionKind, RegionSegmentInfo,
    parse_adaptive_template_pixel, parse_region_segment_info,
};

/// Template used for arithmetic coding (6.2.5.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GbTemplate {
    /// Template 0: 16 context pixels (Figure 3).
    Template0,
    /// Template 1: 13 context pixels (Figure 4).
    Template1,
    /// Template 2: 10 context pixels (Figure 5).
    Template2,
    /// Template 3: 10 context pixels (Figure 6).
    Template3,
}

impl GbTemplate {
    /// Translate the two-bit template field of a region header.
    pub(crate) fn from_bits(value: u8) -> Self {
        match value & 0x03 {
            0 => Self::Template0,
            1 => Self::Template1,
            2 => Self::Template2,
            _ => Self::Template3,
        }
    }

    /// Number of context bits used by this template.
    pub fn context_bits(self) -> u32 {
        match self {
            Self::Template0 => 16,
            Self::Template1 => 13,
            Self::Template2 | Self::Template3 => 10,
        }
    }

    /// Number of adaptive template pixels this template carries.
    pub fn at_pixel_count(self) -> usize {
        match self {
            Self::Template0 => 4,
            _ => 1,
        }
    }

    /// The context under which the typical-prediction flag of a row is
    /// decoded (6.2.5.7, Figures 8 to 11).
    fn sltp_context(self) -> usize {
        match self {
            Self::Template0 => 0x9B25,
            Self::Template1 => 0x0795,
            Self::Template2 => 0x00E5,
            Self::Template3 => 0x0195,
        }
    }
}

/// Parameters of one generic region decoding procedure (6.2.2, Table 2).
#[derive(Debug, Clone)]
pub struct GenericRegionParams<'a> {
    /// `GBW`: width of the region in pixels.
    pub width: u32,
    /// `GBH`: height of the region in pixels.
    pub height: u32,
    /// `GBTEMPLATE`: the context template.
    pub template: GbTemplate,
    /// `TPGDON`: whether typical prediction is used.
    pub tpgdon: bool,
    /// `GBAT`: adaptive template pixel offsets; one per
    /// [`GbTemplate::at_pixel_count`].
    pub at_pixels: &'a [AdaptiveTemplatePixel],
    /// `SKIP`: pixels set in this bitmap are not decoded and stay 0.
    pub skip: Option<&'a Bitmap>,
}

/// Decode a generic region bitmap with a caller-provided decoder and
/// context memory (6.2.5.7).
///
/// The context memory must hold `1 << template.context_bits()` contexts;
/// sharing decoder and contexts across invocations is what the gray-scale
/// procedure of Annex C relies on.
pub fn decode_bitmap(
    decoder: &mut ArithmeticDecoder<'_>,
    contexts: &mut ContextMemory,
    params: &GenericRegionParams<'_>,
) -> Result<Bitmap> {
    if params.at_pixels.len() != params.template.at_pixel_count() {
        bail!(DecodeError::InvalidHeaderValue);
    }

    let mut region = Bitmap::new(params.width, params.height);

    // "1) Set: LTP = 0" (6.2.5.7)
    let mut ltp = false;

    for y in 0..params.height {
        // "b) If TPGDON is 1, then decode a bit using the arithmetic entropy
        // coder [...] Let SLTP be the value of this bit. Set:
        // LTP = LTP XOR SLTP" (6.2.5.7)
        if params.tpgdon {
            let sltp = decoder.decode(contexts, params.template.sltp_context())?;
            ltp ^= sltp != 0;
        }

        if ltp {
            // "c) If LTP = 1 then set every pixel of the current row of GBREG
            // equal to the corresponding pixel of the row immediately above."
            // (6.2.5.7)
            if y > 0 {
                region.copy_row_from_above(y);
            }
        } else {
            // "d) If LTP = 0 then, from left to right, decode each pixel of
            // the current row of GBREG." (6.2.5.7)
            for x in 0..params.width {
                // Pixels flagged in the skip bitmap are not decoded.
                if let Some(skip) = params.skip {
                    if skip.get_pixel(x, y) != 0 {
                        continue;
                    }
                }

                let context = gather_context(&region, x, y, params.template, params.at_pixels);
                let pixel = decoder.decode(contexts, context)?;
                region.set_pixel(x, y, pixel != 0);
            }
        }
    }

    Ok(region)
}

/// Gather the context for the pixel at (x, y) (6.2.5.3).
///
/// All pixels outside the bitmap read as 0. The bit order within the
/// context is template specific.
fn gather_context(
    region: &Bitmap,
    x: u32,
    y: u32,
    template: GbTemplate,
    at: &[AdaptiveTemplatePixel],
) -> usize {
    let x = x as i32;
    let y = y as i32;
    let at_pixel = |index: usize| {
        let pixel = at[index];
        region.pixel_at(x + pixel.x as i32, y + pixel.y as i32)
    };

    let mut context = 0_u32;

    match template {
        // Figure 3, 16 pixels.
        GbTemplate::Template0 => {
            context = (context << 1) | at_pixel(3);
            context = (context << 1) | region.pixel_at(x - 1, y - 2);
            context = (context << 1) | region.pixel_at(x, y - 2);
            context = (context << 1) | region.pixel_at(x + 1, y - 2);
            context = (context << 1) | at_pixel(2);

            context = (context << 1) | at_pixel(1);
            context = (context << 1) | region.pixel_at(x - 2, y - 1);
            context = (context << 1) | region.pixel_at(x - 1, y - 1);
            context = (context << 1) | region.pixel_at(x, y - 1);
            context = (context << 1) | region.pixel_at(x + 1, y - 1);
            context = (context << 1) | region.pixel_at(x + 2, y - 1);
            context = (context << 1) | at_pixel(0);

            context = (context << 1) | region.pixel_at(x - 4, y);
            context = (context << 1) | region.pixel_at(x - 3, y);
            context = (context << 1) | region.pixel_at(x - 2, y);
            context = (context << 1) | region.pixel_at(x - 1, y);
        }
        // Figure 4, 13 pixels.
        GbTemplate::Template1 => {
            context = (context << 1) | region.pixel_at(x - 1, y - 2);
            context = (context << 1) | region.pixel_at(x, y - 2);
            context = (context << 1) | region.pixel_at(x + 1, y - 2);
            context = (context << 1) | region.pixel_at(x + 2, y - 2);

            context = (context << 1) | region.pixel_at(x - 2, y - 1);
            context = (context << 1) | region.pixel_at(x - 1, y - 1);
            context = (context << 1) | region.pixel_at(x, y - 1);
            context = (context << 1) | region.pixel_at(x + 1, y - 1);
            context = (context << 1) | region.pixel_at(x + 2, y - 1);
            context = (context << 1) | at_pixel(0);

            context = (context << 1) | region.pixel_at(x - 3, y);
            context = (context << 1) | region.pixel_at(x - 2, y);
            context = (context << 1) | region.pixel_at(x - 1, y);
        }
        // Figure 5, 10 pixels.
        GbTemplate::Template2 => {
            context = (context << 1) | region.pixel_at(x - 1, y - 2);
            context = (context << 1) | region.pixel_at(x, y - 2);
            context = (context << 1) | region.pixel_at(x + 1, y - 2);

            context = (context << 1) | region.pixel_at(x - 2, y - 1);
            context = (context << 1) | region.pixel_at(x - 1, y - 1);
            context = (context << 1) | region.pixel_at(x, y - 1);
            context = (context << 1) | region.pixel_at(x + 1, y - 1);
            context = (context << 1) | at_pixel(0);

            context = (context << 1) | region.pixel_at(x - 2, y);
            context = (context << 1) | region.pixel_at(x - 1, y);
        }
        // Figure 6, 10 pixels.
        GbTemplate::Template3 => {
            context = (context << 1) | region.pixel_at(x - 3, y - 1);
            context = (context << 1) | region.pixel_at(x - 2, y - 1);
            context = (context << 1) | region.pixel_at(x - 1, y - 1);
            context = (context << 1) | region.pixel_at(x, y - 1);
            context = (context << 1) | region.pixel_at(x + 1, y - 1);
            context = (context << 1) | at_pixel(0);

            context = (context << 1) | region.pixel_at(x - 4, y);
            context = (context << 1) | region.pixel_at(x - 3, y);
            context = (context << 1) | region.pixel_at(x - 2, y);
            context = (context << 1) | region.pixel_at(x - 1, y);
        }
    }

    context as usize
}

/// Parsed generic region segment data header (7.4.6.1).
#[derive(Debug, Clone)]
pub(crate) struct GenericRegionHeader {
    pub region_info: RegionSegmentInfo,
    pub template: GbTemplate,
    pub tpgdon: bool,
    pub at_pixels: Vec<AdaptiveTemplatePixel>,
}

/// Parse a generic region segment data header (7.4.6.1).
pub(crate) fn parse(reader: &mut Reader<'_>) -> Result<GenericRegionHeader> {
    let region_info = parse_region_segment_info(reader)?;

    // 7.4.6.2: Generic region segment flags
    let flags = reader.read_byte()?;
    let mmr = flags & 0x01 != 0;
    let template = GbTemplate::from_bits(flags >> 1);
    let tpgdon = flags & 0x08 != 0;
    let ext_template = flags & 0x10 != 0;

    // MMR coding and the 12-pixel extended template are outside the scope
    // of this decoder.
    if mmr || ext_template {
        bail!(DecodeError::InvalidHeaderValue);
    }

    let mut at_pixels = Vec::with_capacity(template.at_pixel_count());
    for _ in 0..template.at_pixel_count() {
        at_pixels.push(parse_adaptive_template_pixel(reader)?);
    }

    Ok(GenericRegionHeader {
        region_info,
        template,
        tpgdon,
        at_pixels,
    })
}

/// Decode a complete generic region segment (7.4.6).
pub(crate) fn decode(reader: &mut Reader<'_>) -> Result<DecodedRegion> {
    let header = parse(reader)?;

    log::trace!(
        "generic region: {}x{} at ({}, {}), template {:?}, tpgdon {}",
        header.region_info.width,
        header.region_info.height,
        header.region_info.x_location,
        header.region_info.y_location,
        header.template,
        header.tpgdon,
    );

    let mut decoder = ArithmeticDecoder::new(Reader::new(reader.tail()?))?;
    let mut contexts = ContextMemory::new(1 << header.template.context_bits());

    let params = GenericRegionParams {
        width: header.region_info.width,
        height: header.region_info.height,
        template: header.template,
        tpgdon: header.tpgdon,
        at_pixels: &header.at_pixels,
        skip: None,
    };

    let bitmap = decode_bitmap(&mut decoder, &mut contexts, &params)?;

    Ok(DecodedRegion {
        kind: RegionKind::Generic,
        bitmap,
        x_location: header.region_info.x_location,
        y_location: header.region_info.y_location,
        combination_operator: header.region_info.combination_operator,
    })
}
