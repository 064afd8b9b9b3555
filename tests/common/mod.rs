//! Shared helpers for the integration tests: a reference MQ encoder and
//! builders for synthetic segment streams.
//!
//! The encoder implements the arithmetic encoding procedures of ITU-T T.88
//! Annex E (CODEMPS, CODELPS, BYTEOUT, FLUSH) and is the inverse of the
//! crate's decoder; the decoder itself never encodes. Streams it produces
//! end in the 0xFF 0xAC marker, as real region data parts do.

#![allow(dead_code)]

use jbig2_decode::Bitmap;

/// Table E.1 rows: (Qe, NMPS, NLPS, switch).
#[rustfmt::skip]
const QE: [(u16, u8, u8, bool); 47] = [
    (0x5601, 1, 1, true), (0x3401, 2, 6, false), (0x1801, 3, 9, false),
    (0x0AC1, 4, 12, false), (0x0521, 5, 29, false), (0x0221, 38, 33, false),
    (0x5601, 7, 6, true), (0x5401, 8, 14, false), (0x4801, 9, 14, false),
    (0x3801, 10, 14, false), (0x3001, 11, 17, false), (0x2401, 12, 18, false),
    (0x1C01, 13, 20, false), (0x1601, 29, 21, false), (0x5601, 15, 14, true),
    (0x5401, 16, 14, false), (0x5101, 17, 15, false), (0x4801, 18, 16, false),
    (0x3801, 19, 17, false), (0x3401, 20, 18, false), (0x3001, 21, 19, false),
    (0x2801, 22, 19, false), (0x2401, 23, 20, false), (0x2201, 24, 21, false),
    (0x1C01, 25, 22, false), (0x1801, 26, 23, false), (0x1601, 27, 24, false),
    (0x1401, 28, 25, false), (0x1201, 29, 26, false), (0x1101, 30, 27, false),
    (0x0AC1, 31, 28, false), (0x09C1, 32, 29, false), (0x08A1, 33, 30, false),
    (0x0521, 34, 31, false), (0x0441, 35, 32, false), (0x02A1, 36, 33, false),
    (0x0221, 37, 34, false), (0x0141, 38, 35, false), (0x0111, 39, 36, false),
    (0x0085, 40, 37, false), (0x0049, 41, 38, false), (0x0025, 42, 39, false),
    (0x0015, 43, 40, false), (0x0009, 44, 41, false), (0x0005, 45, 42, false),
    (0x0001, 45, 43, false), (0x5601, 46, 46, false),
];

/// Reference MQ encoder (Annex E encoder procedures).
pub struct ArithEncoder {
    a: u32,
    c: u32,
    b: u8,
    ct: i32,
    bp: i32,
    /// Context states, packed as probability row index in bits 1-6 and the
    /// MPS sense in bit 0, mirroring the decoder's context memory.
    cx: Vec<u8>,
    pub data: Vec<u8>,
}

impl ArithEncoder {
    /// INITENC (E.3.8) with `cx_size` zeroed contexts.
    pub fn new(cx_size: usize) -> Self {
        Self {
            a: 0x8000,
            c: 0,
            b: 0,
            ct: 12,
            bp: -1,
            cx: vec![0; cx_size],
            data: Vec::new(),
        }
    }

    /// Encode decision `d` under the context at `index` (CODEMPS and
    /// CODELPS, Figures E.5 to E.7).
    pub fn encode_bit(&mut self, index: usize, d: bool) {
        let state = self.cx[index];
        let mut mps = state & 1;
        let (qe, nmps, nlps, switch) = QE[(state >> 1) as usize];
        let qe = qe as u32;

        if d != (mps != 0) {
            // CODELPS with conditional exchange.
            self.a = self.a.wrapping_sub(qe);
            if self.a < qe {
                self.c = self.c.wrapping_add(qe);
            } else {
                self.a = qe;
            }

            if switch {
                mps ^= 1;
            }
            self.cx[index] = (nlps << 1) | mps;
            self.renorm();
        } else {
            // CODEMPS.
            self.a = self.a.wrapping_sub(qe);
            if self.a & 0x8000 == 0 {
                if self.a < qe {
                    self.a = qe;
                } else {
                    self.c = self.c.wrapping_add(qe);
                }
                self.cx[index] = (nmps << 1) | mps;
                self.renorm();
            } else {
                self.c = self.c.wrapping_add(qe);
            }
        }
    }

    /// RENORME (E.3.7).
    fn renorm(&mut self) {
        loop {
            self.a <<= 1;
            self.c <<= 1;
            self.ct -= 1;

            if self.ct == 0 {
                self.byte_out();
            }

            if self.a & 0x8000 != 0 {
                break;
            }
        }
    }

    /// BYTEOUT (E.3.7, Figure E.9), with bit stuffing after 0xFF bytes.
    fn byte_out(&mut self) {
        if self.b == 0xFF {
            self.push_pending();
            self.b = (self.c >> 20) as u8;
            self.bp += 1;
            self.c &= 0x0F_FFFF;
            self.ct = 7;
            return;
        }

        if self.c < 0x800_0000 {
            self.push_pending();
            self.b = (self.c >> 19) as u8;
            self.bp += 1;
            self.c &= 0x07_FFFF;
            self.ct = 8;
            return;
        }

        // Propagate the carry into the pending byte.
        self.b = self.b.wrapping_add(1);
        if self.b == 0xFF {
            self.c &= 0x7FF_FFFF;
            self.push_pending();
            self.b = (self.c >> 20) as u8;
            self.bp += 1;
            self.c &= 0x0F_FFFF;
            self.ct = 7;
        } else {
            self.push_pending();
            self.b = (self.c >> 19) as u8;
            self.bp += 1;
            self.c &= 0x07_FFFF;
            self.ct = 8;
        }
    }

    fn push_pending(&mut self) {
        if self.bp >= 0 {
            self.data.push(self.b);
        }
    }

    /// FLUSH (E.3.9), terminated with the 0xFF 0xAC marker.
    pub fn flush(&mut self) {
        let temp_c = self.c + self.a;
        self.c |= 0xFFFF;
        if self.c >= temp_c {
            self.c -= 0x8000;
        }

        self.c <<= self.ct;
        self.byte_out();
        self.c <<= self.ct;
        self.byte_out();

        self.push_pending();
        self.data.push(0xFF);
        self.data.push(0xAC);
    }

    /// Finish and return the encoded bytes.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.flush();
        self.data
    }
}

/// The PREV path-register update of the integer procedures (A.2).
fn update_prev(prev: u32, bit: u32) -> u32 {
    if prev < 256 {
        (prev << 1) | bit
    } else {
        (((prev << 1) | bit) & 511) | 256
    }
}

/// Encode one signed integer (or the out-of-band value as `None`), the
/// inverse of the Annex A.2 decoding procedure. The encoder needs 512
/// contexts.
pub fn encode_integer(encoder: &mut ArithEncoder, value: Option<i64>) {
    let (sign, magnitude) = match value {
        Some(v) if v >= 0 => (0_u32, v as u64),
        Some(v) => (1, v.unsigned_abs()),
        // OOB is coded as a negative zero.
        None => (1, 0),
    };

    let mut prev = 1_u32;
    let mut emit = |encoder: &mut ArithEncoder, bit: u32| {
        encoder.encode_bit(prev as usize, bit != 0);
        prev = update_prev(prev, bit);
    };

    emit(encoder, sign);

    // Range prefix, then the value bits MSB first (Figure A.1).
    let (prefix_ones, bits, offset): (u32, u32, u64) = match magnitude {
        0..=3 => (0, 2, 0),
        4..=19 => (1, 4, 4),
        20..=83 => (2, 6, 20),
        84..=339 => (3, 8, 84),
        340..=4435 => (4, 12, 340),
        _ => (5, 32, 4436),
    };

    for _ in 0..prefix_ones {
        emit(encoder, 1);
    }
    if prefix_ones < 5 {
        emit(encoder, 0);
    }

    let v = magnitude - offset;
    for i in (0..bits).rev() {
        emit(encoder, ((v >> i) & 1) as u32);
    }
}

/// Encode a symbol ID, the inverse of the IAID procedure (A.3). The
/// encoder needs `1 << (sym_code_len + 1)` contexts.
pub fn encode_iaid(encoder: &mut ArithEncoder, sym_code_len: u32, value: u32) {
    let mut prev = 1_u32;

    for i in (0..sym_code_len).rev() {
        let bit = (value >> i) & 1;
        encoder.encode_bit(prev as usize, bit != 0);
        prev = (prev << 1) | bit;
    }
}

/// The nominal template-0 adaptive pixel offsets.
pub const NOMINAL_AT: [(i32, i32); 4] = [(3, -1), (-3, -1), (2, -2), (-2, -2)];

/// The adaptive pixel offsets the gray-scale procedure fixes for
/// template 0 (Table C.4).
pub const GRAY_SCALE_AT: [(i32, i32); 4] = [(3, -1), (-3, -1), (2, -2), (-2, -2)];

/// Adaptive pixels for a pattern dictionary's collective bitmap (Table 27).
pub fn pattern_dictionary_at(pattern_width: u32) -> [(i32, i32); 4] {
    [(-(pattern_width as i32), 0), (-3, -1), (2, -2), (-2, -2)]
}

fn pixel(bitmap: &Bitmap, x: i32, y: i32) -> u32 {
    if x < 0 || y < 0 || x >= bitmap.width() as i32 || y >= bitmap.height() as i32 {
        0
    } else {
        bitmap.get_pixel(x as u32, y as u32) as u32
    }
}

/// Template-0 context of pixel (x, y), assembled independently of the
/// decoder (offsets per T.88 Figure 3).
fn template0_context(bitmap: &Bitmap, x: i32, y: i32, at: &[(i32, i32); 4]) -> usize {
    let p = |dx: i32, dy: i32| pixel(bitmap, x + dx, y + dy) as usize;
    let a = |i: usize| pixel(bitmap, x + at[i].0, y + at[i].1) as usize;

    a(3) << 15
        | p(-1, -2) << 14
        | p(0, -2) << 13
        | p(1, -2) << 12
        | a(2) << 11
        | a(1) << 10
        | p(-2, -1) << 9
        | p(-1, -1) << 8
        | p(0, -1) << 7
        | p(1, -1) << 6
        | p(2, -1) << 5
        | a(0) << 4
        | p(-4, 0) << 3
        | p(-3, 0) << 2
        | p(-2, 0) << 1
        | p(-1, 0)
}

/// Encode a bitmap as a template-0 generic region into `encoder`.
///
/// With `tpgdon` set, rows identical to the row above are coded through the
/// typical-prediction flag instead of pixel by pixel. Pixels set in `skip`
/// are neither coded nor allowed to be set in `bitmap`.
pub fn encode_generic_region_into(
    encoder: &mut ArithEncoder,
    bitmap: &Bitmap,
    at: &[(i32, i32); 4],
    tpgdon: bool,
    skip: Option<&Bitmap>,
) {
    const SLTP_CONTEXT: usize = 0x9B25;

    let mut ltp = false;

    for y in 0..bitmap.height() as i32 {
        if tpgdon {
            let typical = row_equals_previous(bitmap, y as u32);
            let sltp = ltp != typical;
            encoder.encode_bit(SLTP_CONTEXT, sltp);
            ltp = typical;

            if ltp {
                continue;
            }
        }

        for x in 0..bitmap.width() as i32 {
            if let Some(skip) = skip {
                if skip.get_pixel(x as u32, y as u32) != 0 {
                    assert_eq!(pixel(bitmap, x, y), 0, "skipped pixels must be 0");
                    continue;
                }
            }

            let context = template0_context(bitmap, x, y, at);
            encoder.encode_bit(context, pixel(bitmap, x, y) != 0);
        }
    }
}

/// Encode a bitmap as a standalone template-0 generic region data stream.
pub fn encode_generic_region(bitmap: &Bitmap, at: &[(i32, i32); 4]) -> Vec<u8> {
    let mut encoder = ArithEncoder::new(1 << 16);
    encode_generic_region_into(&mut encoder, bitmap, at, false, None);
    encoder.into_bytes()
}

fn row_equals_previous(bitmap: &Bitmap, y: u32) -> bool {
    (0..bitmap.width()).all(|x| {
        let above = if y == 0 { 0 } else { bitmap.get_pixel(x, y - 1) };
        bitmap.get_pixel(x, y) == above
    })
}

/// Build a bitmap from `#`/`.` rows.
pub fn bitmap_from_art(rows: &[&str]) -> Bitmap {
    let height = rows.len() as u32;
    let width = rows.first().map_or(0, |row| row.len()) as u32;
    let mut bitmap = Bitmap::new(width, height);

    for (y, row) in rows.iter().enumerate() {
        assert_eq!(row.len() as u32, width);
        for (x, cell) in row.bytes().enumerate() {
            bitmap.set_pixel(x as u32, y as u32, cell == b'#');
        }
    }

    bitmap
}

// Segment stream builders (T.88 section 7.2 wire layout).

/// Wrap a data part in a segment header. Referred-to segment numbers must
/// be below 257 (the short encoding).
pub fn segment(number: u32, segment_type: u8, referred: &[u32], data: &[u8]) -> Vec<u8> {
    assert!(referred.len() <= 4);

    let mut out = Vec::new();
    out.extend(number.to_be_bytes());
    out.push(segment_type);
    out.push((referred.len() as u8) << 5);
    for &r in referred {
        assert!(number <= 256 && r < number);
        out.push(r as u8);
    }
    // Page association (one byte), always page 1 here.
    out.push(1);
    out.extend((data.len() as u32).to_be_bytes());
    out.extend(data);
    out
}

/// A page information segment (type 48). An unknown height (0xFFFFFFFF)
/// marks the page as striped (7.4.8.6).
pub fn page_info_segment(number: u32, width: u32, height: u32, default_pixel: bool) -> Vec<u8> {
    let striping: u16 = if height == 0xFFFF_FFFF { 0x8000 } else { 0 };

    let mut data = Vec::new();
    data.extend(width.to_be_bytes());
    data.extend(height.to_be_bytes());
    data.extend(0_u32.to_be_bytes());
    data.extend(0_u32.to_be_bytes());
    data.push((default_pixel as u8) << 2);
    data.extend(striping.to_be_bytes());

    segment(number, 48, &[], &data)
}

/// An end-of-stripe segment (type 50): carries the Y coordinate of the
/// stripe's final row (7.4.10).
pub fn end_of_stripe_segment(number: u32, end_row: u32) -> Vec<u8> {
    segment(number, 50, &[], &end_row.to_be_bytes())
}

/// An immediate generic region segment (type 38), template 0.
pub fn generic_region_segment(
    number: u32,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    operator: u8,
    at: &[(i32, i32); 4],
    payload: &[u8],
) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend(width.to_be_bytes());
    data.extend(height.to_be_bytes());
    data.extend(x.to_be_bytes());
    data.extend(y.to_be_bytes());
    data.push(operator);
    // Generic region flags: arithmetic coding, template 0, no typical
    // prediction.
    data.push(0);
    for &(ax, ay) in at {
        data.push(ax as i8 as u8);
        data.push(ay as i8 as u8);
    }
    data.extend(payload);

    segment(number, 38, &[], &data)
}

/// A pattern dictionary segment (type 16), template 0.
pub fn pattern_dictionary_segment(
    number: u32,
    pattern_width: u8,
    pattern_height: u8,
    gray_max: u32,
    payload: &[u8],
) -> Vec<u8> {
    let mut data = Vec::new();
    data.push(0);
    data.push(pattern_width);
    data.push(pattern_height);
    data.extend(gray_max.to_be_bytes());
    data.extend(payload);

    segment(number, 16, &[], &data)
}

/// An immediate halftone region segment (type 22), template 0, axis
/// aligned grid.
#[allow(clippy::too_many_arguments)]
pub fn halftone_region_segment(
    number: u32,
    referred: &[u32],
    width: u32,
    height: u32,
    operator: u8,
    default_pixel: bool,
    grid_width: u32,
    grid_height: u32,
    vector_x: u16,
    vector_y: u16,
    payload: &[u8],
) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend(width.to_be_bytes());
    data.extend(height.to_be_bytes());
    data.extend(0_u32.to_be_bytes());
    data.extend(0_u32.to_be_bytes());
    data.push(operator);
    // Halftone flags: arithmetic, template 0, no skip, the draw operator in
    // bits 4-6 and the default pixel in bit 7.
    data.push((operator << 4) | ((default_pixel as u8) << 7));
    data.extend(grid_width.to_be_bytes());
    data.extend(grid_height.to_be_bytes());
    data.extend(0_i32.to_be_bytes());
    data.extend(0_i32.to_be_bytes());
    data.extend(vector_x.to_be_bytes());
    data.extend(vector_y.to_be_bytes());
    data.extend(payload);

    segment(number, 22, referred, &data)
}

/// An end-of-page segment (type 49).
pub fn end_of_page_segment(number: u32) -> Vec<u8> {
    segment(number, 49, &[], &[])
}

/// The standalone file header (Annex D.4), sequential organization, one
/// page.
pub fn file_header() -> Vec<u8> {
    let mut out = vec![0x97, 0x4A, 0x42, 0x32, 0x0D, 0x0A, 0x1A, 0x0A];
    out.push(0x01);
    out.extend(1_u32.to_be_bytes());
    out
}
