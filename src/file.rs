//! File-level parsing (Annex D).
//!
//! A standalone JBIG2 file starts with a fixed ID string and organizes its
//! segments sequentially or for random access. Streams embedded in a PDF
//! carry no file header; they are a bare sequence of segment headers and
//! data, optionally preceded by a shared "globals" stream.

use alloc::vec::Vec;

use crate::error::{DecodeError, Result, bail};
use crate::reader::Reader;
use crate::segment::{Segment, SegmentType, parse_segment, parse_segment_data, parse_segment_header};

/// "This is an 8-byte sequence containing 0x97 0x4A 0x42 0x32 0x0D 0x0A
/// 0x1A 0x0A." (D.4.1)
const FILE_HEADER_ID: [u8; 8] = [0x97, 0x4A, 0x42, 0x32, 0x0D, 0x0A, 0x1A, 0x0A];

/// "There are two standalone file organizations possible for a JBIG2
/// bitstream." (Annex D)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FileOrganization {
    /// Segment headers and data interleaved, for streaming decoders (D.1).
    Sequential,
    /// All segment headers first, then all data parts (D.2).
    RandomAccess,
}

/// A parsed segment stream.
#[derive(Debug)]
pub(crate) struct File<'a> {
    /// The segments, sorted by segment number.
    pub segments: Vec<Segment<'a>>,
}

/// Parse a JBIG2 byte stream: a standalone file if it starts with the file
/// header ID string, a bare embedded segment sequence otherwise.
pub(crate) fn parse_file(data: &[u8]) -> Result<File<'_>> {
    let mut segments = Vec::new();
    parse_into(data, &mut segments)?;

    // The standard mandates ascending segment numbers; sort to be safe, so
    // referred-to lookups can binary search.
    segments.sort_by_key(|segment| segment.header.segment_number);

    Ok(File { segments })
}

/// Parse a stream, prepending the segments of a shared globals stream (the
/// PDF `JBIG2Globals` case).
pub(crate) fn parse_file_with_globals<'a>(data: &'a [u8], globals: &'a [u8]) -> Result<File<'a>> {
    let mut segments = Vec::new();
    parse_into(globals, &mut segments)?;
    parse_into(data, &mut segments)?;

    segments.sort_by_key(|segment| segment.header.segment_number);

    Ok(File { segments })
}

fn parse_into<'a>(data: &'a [u8], segments: &mut Vec<Segment<'a>>) -> Result<()> {
    let mut reader = Reader::new(data);

    if data.starts_with(&FILE_HEADER_ID) {
        let organization = parse_file_header(&mut reader)?;

        match organization {
            FileOrganization::Sequential => parse_segments_sequential(&mut reader, segments),
            FileOrganization::RandomAccess => parse_segments_random_access(&mut reader, segments),
        }
    } else {
        // Embedded streams are always sequentially organized.
        parse_segments_sequential(&mut reader, segments)
    }
}

/// Parse a standalone file header (D.4), returning the file organization.
fn parse_file_header(reader: &mut Reader<'_>) -> Result<FileOrganization> {
    reader.skip_bytes(FILE_HEADER_ID.len())?;

    // D.4.2: File header flags
    let flags = reader.read_byte()?;

    // "Bit 0: File organization type. If this bit is 1, the file uses the
    // sequential organization." (D.4.2)
    let organization = if flags & 0x01 != 0 {
        FileOrganization::Sequential
    } else {
        FileOrganization::RandomAccess
    };

    // "Bit 1: Unknown number of pages." (D.4.2)
    let unknown_page_count = flags & 0x02 != 0;

    // "Bits 4-7: Reserved; must be 0." (D.4.2)
    if flags & 0xF0 != 0 {
        bail!(DecodeError::InvalidHeaderValue);
    }

    // D.4.3: Number of pages, absent when unknown.
    if !unknown_page_count {
        reader.read_u32()?;
    }

    Ok(organization)
}

/// Parse segments in sequential organization (D.1): each header directly
/// followed by its data.
fn parse_segments_sequential<'a>(
    reader: &mut Reader<'a>,
    segments: &mut Vec<Segment<'a>>,
) -> Result<()> {
    while !reader.at_end() {
        let segment = parse_segment(reader)?;

        // "If a file contains an end of file segment, it must be the last
        // segment." (7.4.11)
        let is_end = segment.header.segment_type == SegmentType::EndOfFile;
        segments.push(segment);

        if is_end {
            break;
        }
    }

    Ok(())
}

/// Parse segments in random-access organization (D.2): all headers first,
/// then all data parts in the same order.
fn parse_segments_random_access<'a>(
    reader: &mut Reader<'a>,
    segments: &mut Vec<Segment<'a>>,
) -> Result<()> {
    let mut headers = Vec::new();

    while !reader.at_end() {
        let header = parse_segment_header(reader)?;
        let is_end = header.segment_type == SegmentType::EndOfFile;
        headers.push(header);

        if is_end {
            break;
        }
    }

    for header in headers {
        segments.push(parse_segment_data(reader, header)?);
    }

    Ok(())
}
