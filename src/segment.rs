//! Segment header parsing (7.2).
//!
//! Every JBIG2 segment starts with a header carrying its number, type, the
//! segments it refers to, its page association and the length of its data
//! part. Only the fields the decoding core consumes are kept.

use alloc::vec::Vec;

use crate::error::{DecodeError, Result, bail, err};
use crate::reader::Reader;

/// "The segment type is a number between 0 and 63, inclusive. Not all
/// values are allowed." (7.3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SegmentType {
    /// Symbol dictionary (type 0).
    SymbolDictionary,
    /// Intermediate text region (type 4).
    IntermediateTextRegion,
    /// Immediate text region (type 6).
    ImmediateTextRegion,
    /// Immediate lossless text region (type 7).
    ImmediateLosslessTextRegion,
    /// Pattern dictionary (type 16).
    PatternDictionary,
    /// Intermediate halftone region (type 20).
    IntermediateHalftoneRegion,
    /// Immediate halftone region (type 22).
    ImmediateHalftoneRegion,
    /// Immediate lossless halftone region (type 23).
    ImmediateLosslessHalftoneRegion,
    /// Intermediate generic region (type 36).
    IntermediateGenericRegion,
    /// Immediate generic region (type 38).
    ImmediateGenericRegion,
    /// Immediate lossless generic region (type 39).
    ImmediateLosslessGenericRegion,
    /// Intermediate generic refinement region (type 40).
    IntermediateGenericRefinementRegion,
    /// Immediate generic refinement region (type 42).
    ImmediateGenericRefinementRegion,
    /// Immediate lossless generic refinement region (type 43).
    ImmediateLosslessGenericRefinementRegion,
    /// Page information (type 48).
    PageInformation,
    /// End of page (type 49).
    EndOfPage,
    /// End of stripe (type 50).
    EndOfStripe,
    /// End of file (type 51).
    EndOfFile,
    /// Profiles (type 52).
    Profiles,
    /// Tables (type 53).
    Tables,
    /// Colour palette (type 54).
    ColourPalette,
    /// Extension (type 62).
    Extension,
}

impl SegmentType {
    /// "All other segment types are reserved and must not be used." (7.3)
    fn from_type_value(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::SymbolDictionary),
            4 => Ok(Self::IntermediateTextRegion),
            6 => Ok(Self::ImmediateTextRegion),
            7 => Ok(Self::ImmediateLosslessTextRegion),
            16 => Ok(Self::PatternDictionary),
            20 => Ok(Self::IntermediateHalftoneRegion),
            22 => Ok(Self::ImmediateHalftoneRegion),
            23 => Ok(Self::ImmediateLosslessHalftoneRegion),
            36 => Ok(Self::IntermediateGenericRegion),
            38 => Ok(Self::ImmediateGenericRegion),
            39 => Ok(Self::ImmediateLosslessGenericRegion),
            40 => Ok(Self::IntermediateGenericRefinementRegion),
            42 => Ok(Self::ImmediateGenericRefinementRegion),
            43 => Ok(Self::ImmediateLosslessGenericRefinementRegion),
            48 => Ok(Self::PageInformation),
            49 => Ok(Self::EndOfPage),
            50 => Ok(Self::EndOfStripe),
            51 => Ok(Self::EndOfFile),
            52 => Ok(Self::Profiles),
            53 => Ok(Self::Tables),
            54 => Ok(Self::ColourPalette),
            62 => Ok(Self::Extension),
            _ => err!(DecodeError::InvalidHeaderValue),
        }
    }
}

/// A parsed segment header (7.2.1).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SegmentHeader {
    /// The segment's number (7.2.2).
    pub segment_number: u32,
    /// "Bits 0-5: Segment type." (7.2.3)
    pub segment_type: SegmentType,
    /// The segment numbers this segment refers to (7.2.5).
    pub referred_to_segments: Vec<u32>,
    /// The segment's data length in bytes (7.2.7); `None` if unknown
    /// (0xFFFFFFFF), which is only valid for immediate generic regions.
    pub data_length: Option<u32>,
}

/// A parsed segment with its header and data.
#[derive(Debug)]
pub(crate) struct Segment<'a> {
    /// The segment header.
    pub header: SegmentHeader,
    /// The segment data.
    pub data: &'a [u8],
}

/// Parse a segment header (7.2).
pub(crate) fn parse_segment_header(reader: &mut Reader<'_>) -> Result<SegmentHeader> {
    // 7.2.2: Segment number
    let segment_number = reader.read_u32()?;

    // 7.2.3: Segment header flags
    let flags = reader.read_byte()?;
    let segment_type = SegmentType::from_type_value(flags & 0x3F)?;

    // "Bit 6: Page association field size." (7.2.6)
    let page_association_long = flags & 0x40 != 0;

    // 7.2.4: Referred-to segment count and retention flags
    //
    // "The three most significant bits of the first byte in this field
    // determine the length of the field. If the value of this three-bit
    // subfield is between 0 and 4, then the field is one byte long. If the
    // value of this three-bit subfield is 7, then the field is at least five
    // bytes long. This subfield must not contain values of 5 and 6."
    let count_and_retention = reader.read_byte()?;
    let short_count = count_and_retention >> 5;

    if short_count == 5 || short_count == 6 {
        bail!(DecodeError::InvalidHeaderValue);
    }

    let referred_to_count = if short_count < 7 {
        short_count as u32
    } else {
        // Long form: a four-byte count (bits 0 to 28) followed by retention
        // flag bytes, one bit per referred segment plus one.
        let rest = reader.read_bytes(3)?;
        let count =
            u32::from_be_bytes([count_and_retention & 0x1F, rest[0], rest[1], rest[2]]);

        let retention_bytes = (count as usize + 1).div_ceil(8);
        reader.skip_bytes(retention_bytes)?;

        count
    };

    // 7.2.5: Referred-to segment numbers
    //
    // "When the current segment's number is 256 or less, then each
    // referred-to segment number is one byte long. Otherwise, when the
    // current segment's number is 65536 or less, each referred-to segment
    // number is two bytes long. Otherwise, each is four bytes long."
    let mut referred_to_segments = Vec::with_capacity(referred_to_count as usize);
    for _ in 0..referred_to_count {
        let referred = if segment_number <= 256 {
            reader.read_byte()? as u32
        } else if segment_number <= 65536 {
            reader.read_u16()? as u32
        } else {
            reader.read_u32()?
        };

        // A segment may only refer to segments with lower numbers.
        if referred >= segment_number {
            bail!(DecodeError::InvalidHeaderValue);
        }

        referred_to_segments.push(referred);
    }

    // 7.2.6: Segment page association
    if page_association_long {
        reader.read_u32()?;
    } else {
        reader.read_byte()?;
    }

    // 7.2.7: Segment data length
    let data_length_raw = reader.read_u32()?;
    let data_length = if data_length_raw == 0xFFFFFFFF {
        if segment_type != SegmentType::ImmediateGenericRegion {
            bail!(DecodeError::InvalidHeaderValue);
        }
        None
    } else {
        Some(data_length_raw)
    };

    Ok(SegmentHeader {
        segment_number,
        segment_type,
        referred_to_segments,
        data_length,
    })
}

/// Parse a complete segment (header plus data).
pub(crate) fn parse_segment<'a>(reader: &mut Reader<'a>) -> Result<Segment<'a>> {
    let header = parse_segment_header(reader)?;
    parse_segment_data(reader, header)
}

/// Attach the data part to a previously parsed header.
pub(crate) fn parse_segment_data<'a>(
    reader: &mut Reader<'a>,
    header: SegmentHeader,
) -> Result<Segment<'a>> {
    let data = match header.data_length {
        Some(len) => reader.read_bytes(len as usize)?,
        None => {
            // "In order for the decoder to correctly decode the segment, it
            // needs to read the four-byte row count field, which is stored
            // in the last four bytes of the segment's data part. These four
            // bytes can be detected without knowing the length of the data
            // part in advance: if MMR is 1, they are preceded by the
            // two-byte sequence 0x00 0x00; if MMR is 0, they are preceded
            // by the two-byte sequence 0xFF 0xAC." (7.2.7)
            let len = scan_for_unknown_data_length(reader)?;
            reader.read_bytes(len)?
        }
    };

    Ok(Segment { header, data })
}

/// Find the data length of an immediate generic region whose header
/// declares it unknown (7.2.7, 7.4.6.4).
fn scan_for_unknown_data_length(reader: &Reader<'_>) -> Result<usize> {
    let mut scan = reader.clone();
    let start = scan.position();

    // The region segment information field is 17 bytes; the flags byte
    // follows it, and the end sequence can occur anywhere after it.
    scan.skip_bytes(17)?;
    let flags = scan.read_byte()?;
    let end_marker: [u8; 2] = if flags & 1 != 0 {
        [0x00, 0x00]
    } else {
        [0xFF, 0xAC]
    };

    loop {
        let bytes = scan.peek_bytes(6)?;
        if bytes[..2] == end_marker {
            // Marker plus the four-byte row count.
            return Ok(scan.position() - start + 2 + 4);
        }
        scan.skip_bytes(1)?;
    }
}
