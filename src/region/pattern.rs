//! Pattern dictionary decoding (6.7, 7.4.4).
//!
//! The patterns of a dictionary are coded as one collective bitmap, all
//! patterns concatenated left to right, which is decoded with the generic
//! region procedure and then sliced.

use alloc::vec;
use alloc::vec::Vec;

use crate::arithmetic_decoder::{ArithmeticDecoder, ContextMemory};
use crate::bitmap::Bitmap;
use crate::blit::{Rect, extract};
use crate::error::{DecodeError, Result, bail};
use crate::reader::{Reader, read_nonzero_byte};
use crate::region::AdaptiveTemplatePixel;
use crate::region::generic::{GbTemplate, GenericRegionParams, decode_bitmap};

/// A decoded pattern dictionary.
#[derive(Debug, Clone)]
pub(crate) struct PatternDictionary {
    /// `HDPATS`: the patterns, indexed by gray-scale value.
    pub patterns: Vec<Bitmap>,
    /// `HDPW`: width of every pattern.
    pub pattern_width: u32,
    /// `HDPH`: height of every pattern.
    pub pattern_height: u32,
}

/// Parsed pattern dictionary segment header (7.4.4.1).
#[derive(Debug, Clone)]
struct PatternDictionaryHeader {
    template: GbTemplate,
    /// `HDPW`
    pattern_width: u32,
    /// `HDPH`
    pattern_height: u32,
    /// `GRAYMAX`
    gray_max: u32,
}

/// Parse a pattern dictionary segment header (7.4.4.1).
fn parse(reader: &mut Reader<'_>) -> Result<PatternDictionaryHeader> {
    let flags = reader.read_byte()?;
    let mmr = flags & 0x01 != 0;
    let template = GbTemplate::from_bits(flags >> 1);

    if mmr {
        bail!(DecodeError::InvalidHeaderValue);
    }

    let pattern_width = read_nonzero_byte(reader)? as u32;
    let pattern_height = read_nonzero_byte(reader)? as u32;
    let gray_max = reader.read_u32()?;

    Ok(PatternDictionaryHeader {
        template,
        pattern_width,
        pattern_height,
        gray_max,
    })
}

/// Decode a pattern dictionary segment (7.4.4.2, 6.7.5).
pub(crate) fn decode(reader: &mut Reader<'_>) -> Result<PatternDictionary> {
    let header = parse(reader)?;

    let num_patterns = header
        .gray_max
        .checked_add(1)
        .ok_or(DecodeError::InvalidHeaderValue)?;

    // "1) Create a bitmap B_HDC. The height of this bitmap is HDPH. The
    // width of the bitmap is (GRAYMAX + 1) x HDPW." (6.7.5)
    let collective_width = num_patterns
        .checked_mul(header.pattern_width)
        .ok_or(DecodeError::InvalidHeaderValue)?;

    log::trace!(
        "pattern dictionary: {} patterns of {}x{}",
        num_patterns,
        header.pattern_width,
        header.pattern_height,
    );

    // Table 27: the first adaptive pixel sits one pattern width to the left.
    let first = AdaptiveTemplatePixel::new(-(header.pattern_width as i16), 0);
    let at_pixels: Vec<AdaptiveTemplatePixel> = match header.template {
        GbTemplate::Template0 => vec![
            first,
            AdaptiveTemplatePixel::new(-3, -1),
            AdaptiveTemplatePixel::new(2, -2),
            AdaptiveTemplatePixel::new(-2, -2),
        ],
        _ => vec![first],
    };

    // "2) Decode the collective bitmap using a generic region decoding
    // procedure as described in 6.2." (6.7.5)
    let mut decoder = ArithmeticDecoder::new(Reader::new(reader.tail()?))?;
    let mut contexts = ContextMemory::new(1 << header.template.context_bits());

    let params = GenericRegionParams {
        width: collective_width,
        height: header.pattern_height,
        template: header.template,
        tpgdon: false,
        at_pixels: &at_pixels,
        skip: None,
    };

    let collective = decode_bitmap(&mut decoder, &mut contexts, &params)?;

    // "4) While GRAY <= GRAYMAX: let the subimage consisting of columns
    // HDPW x GRAY through HDPW x (GRAY + 1) - 1 be HDPATS[GRAY]." (6.7.5)
    let mut patterns = Vec::with_capacity(num_patterns as usize);
    for gray in 0..num_patterns {
        let roi = Rect::new(
            (gray * header.pattern_width) as i32,
            0,
            header.pattern_width as i32,
            header.pattern_height as i32,
        );
        patterns.push(extract(roi, &collective));
    }

    Ok(PatternDictionary {
        patterns,
        pattern_width: header.pattern_width,
        pattern_height: header.pattern_height,
    })
}
