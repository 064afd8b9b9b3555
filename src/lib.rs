/*!
A memory-safe, pure-Rust JBIG2 decoder.

`jbig2-decode` decodes JBIG2 images as specified in ITU-T T.88 (also known
as ISO/IEC 14492). JBIG2 is the bi-level image compression standard commonly
used in PDF documents for black-and-white scans.

The crate centers on the arithmetic decoding pipeline: the MQ-style entropy
decoder with its adaptive probability contexts, the template-driven generic
region coder, the halftone renderer, and the packed-bitmap blitter they all
share. Segment streams are accepted standalone (with a file header), bare
(as embedded in PDF), or together with a shared globals stream.

# Example
```rust,no_run
let data = std::fs::read("image.jb2").unwrap();
let page = jbig2_decode::decode(&data).unwrap();

println!("{}x{} page", page.width(), page.height());
```

# Safety
This crate forbids unsafe code via a crate-level attribute.
*/

#![no_std]
#![forbid(unsafe_code)]
#![allow(missing_docs)]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod arithmetic_decoder;
pub mod bitmap;
pub mod blit;
mod error;
mod file;
mod gray_scale;
pub mod integer_decoder;
mod page_info;
pub mod reader;
pub mod region;
mod segment;

use alloc::vec::Vec;

pub use crate::bitmap::Bitmap;
pub use crate::blit::{CombinationOperator, Rect};
pub use crate::error::{DecodeError, Result};

use crate::blit::combine;
use crate::file::{File, parse_file, parse_file_with_globals};
use crate::page_info::{PageInformation, parse_page_information};
use crate::reader::Reader;
use crate::region::pattern::PatternDictionary;
use crate::region::{DecodedRegion, generic, halftone, pattern};
use crate::segment::{Segment, SegmentType};

/// Decode the first page of a JBIG2 byte stream.
///
/// The stream may be a standalone file (with the JBIG2 file header) or a
/// bare segment sequence as embedded in PDF.
pub fn decode(data: &[u8]) -> Result<Bitmap> {
    let file = parse_file(data)?;
    decode_page(&file)
}

/// Decode the first page of an embedded JBIG2 stream together with its
/// shared globals stream (the PDF `JBIG2Globals` case).
pub fn decode_with_globals(data: &[u8], globals: &[u8]) -> Result<Bitmap> {
    let file = parse_file_with_globals(data, globals)?;
    decode_page(&file)
}

fn decode_page(file: &File<'_>) -> Result<Bitmap> {
    let height_from_stripes = scan_for_stripe_height(file);

    let mut ctx: Option<DecodeContext> = None;

    for segment in &file.segments {
        let mut reader = Reader::new(segment.data);

        match segment.header.segment_type {
            SegmentType::PageInformation => {
                ctx = Some(DecodeContext::new(&mut reader, height_from_stripes)?);
            }
            SegmentType::ImmediateGenericRegion | SegmentType::ImmediateLosslessGenericRegion => {
                let ctx = require_page(&mut ctx)?;
                let region = generic::decode(&mut reader)?;
                ctx.draw(&region);
            }
            SegmentType::PatternDictionary => {
                let ctx = require_page(&mut ctx)?;
                let dictionary = pattern::decode(&mut reader)?;
                ctx.store_pattern_dictionary(segment.header.segment_number, dictionary);
            }
            SegmentType::ImmediateHalftoneRegion
            | SegmentType::ImmediateLosslessHalftoneRegion => {
                let ctx = require_page(&mut ctx)?;
                let patterns = ctx.referred_patterns(segment)?;
                let region = halftone::decode(&mut reader, &patterns)?;
                ctx.draw(&region);
            }
            SegmentType::EndOfStripe => {
                // Consumed by the pre-scan.
            }
            SegmentType::EndOfPage | SegmentType::EndOfFile => {
                break;
            }
            other => {
                // Symbol and text decoding, refinement regions (and with
                // them the intermediate region types that only exist to be
                // refined) and the auxiliary segment types are outside the
                // scope of this decoder.
                log::warn!(
                    "skipping unsupported segment {} of type {:?}",
                    segment.header.segment_number,
                    other,
                );
            }
        }
    }

    let ctx = ctx.ok_or(DecodeError::CorruptedStream)?;
    Ok(ctx.page_bitmap)
}

fn require_page(ctx: &mut Option<DecodeContext>) -> Result<&mut DecodeContext> {
    // A region before any page information segment has nothing to draw on.
    ctx.as_mut().ok_or(DecodeError::CorruptedStream)
}

/// Pre-scan the segments for the page height from end-of-stripe segments
/// (7.4.10): the largest end row plus one.
fn scan_for_stripe_height(file: &File<'_>) -> Option<u32> {
    let mut max_y: Option<u32> = None;

    for segment in &file.segments {
        if segment.header.segment_type != SegmentType::EndOfStripe {
            continue;
        }

        let Ok(row) = Reader::new(segment.data).read_u32() else {
            log::warn!("ignoring malformed end-of-stripe segment");
            continue;
        };

        let height = row.checked_add(1)?;
        max_y = Some(max_y.map_or(height, |m| m.max(height)));
    }

    max_y
}

/// Decoding state of one page.
struct DecodeContext {
    /// The page bitmap regions are drawn into.
    page_bitmap: Bitmap,
    /// Decoded pattern dictionaries, as (segment number, dictionary) pairs,
    /// sorted by segment number.
    pattern_dictionaries: Vec<(u32, PatternDictionary)>,
}

impl DecodeContext {
    /// Build the page from its page information segment.
    fn new(reader: &mut Reader<'_>, height_from_stripes: Option<u32>) -> Result<Self> {
        let info: PageInformation = parse_page_information(reader)?;

        // "A page's bitmap height may be declared in its page information
        // segment to be unknown (by specifying a height of 0xFFFFFFFF). In
        // this case, the page must be striped." (7.4.8.2)
        let height = if info.height == 0xFFFF_FFFF {
            height_from_stripes.ok_or(DecodeError::InvalidHeaderValue)?
        } else {
            info.height
        };

        log::debug!(
            "page: {}x{}, default pixel {}",
            info.width,
            height,
            info.default_pixel as u8,
        );

        let page_bitmap = Bitmap::with_default_pixel(info.width, height, info.default_pixel);

        Ok(Self {
            page_bitmap,
            pattern_dictionaries: Vec::new(),
        })
    }

    /// Draw a decoded region onto the page under its combination operator.
    fn draw(&mut self, region: &DecodedRegion) {
        log::trace!(
            "drawing {:?} region at ({}, {})",
            region.kind,
            region.x_location,
            region.y_location,
        );

        let x = region.x_location.min(i32::MAX as u32) as i32;
        let y = region.y_location.min(i32::MAX as u32) as i32;

        combine(
            &region.bitmap,
            &mut self.page_bitmap,
            x,
            y,
            region.combination_operator,
        );
    }

    /// Store a decoded pattern dictionary for later reference.
    fn store_pattern_dictionary(&mut self, segment_number: u32, dictionary: PatternDictionary) {
        self.pattern_dictionaries.push((segment_number, dictionary));
    }

    /// Look up a pattern dictionary by segment number.
    fn pattern_dictionary(&self, segment_number: u32) -> Option<&PatternDictionary> {
        // Segments arrive in ascending order, so binary search works.
        self.pattern_dictionaries
            .binary_search_by_key(&segment_number, |(number, _)| *number)
            .ok()
            .map(|index| &self.pattern_dictionaries[index].1)
    }

    /// Flatten the patterns of all dictionaries a halftone region refers to
    /// into one indexed list.
    fn referred_patterns(&self, segment: &Segment<'_>) -> Result<PatternDictionary> {
        let mut patterns = Vec::new();
        let mut pattern_width = 0;
        let mut pattern_height = 0;

        for &referred in &segment.header.referred_to_segments {
            let Some(dictionary) = self.pattern_dictionary(referred) else {
                continue;
            };

            if patterns.is_empty() {
                pattern_width = dictionary.pattern_width;
                pattern_height = dictionary.pattern_height;
            }

            patterns.extend(dictionary.patterns.iter().cloned());
        }

        if patterns.is_empty() {
            // A halftone region without patterns cannot be rendered.
            return Err(DecodeError::InvalidHeaderValue);
        }

        Ok(PatternDictionary {
            patterns,
            pattern_width,
            pattern_height,
        })
    }
}
