//! Integer arithmetic decoder (Annex A).
//!
//! "An invocation of an arithmetic integer decoding procedure involves
//! decoding a sequence of bits, where each bit is decoded using a context
//! formed by the bits decoded previously in this invocation." (A.1)
//!
//! The value is built from a sign bit, a unary-style prefix selecting one of
//! six ranges, and that range's value bits. The running path identifier
//! `PREV` (nine bits, with a sticky top bit once eight bits have been
//! decoded) selects the context for every decision.

use crate::arithmetic_decoder::{ArithmeticDecoder, ContextMemory};
use crate::error::Result;

/// Number of contexts one integer decoding procedure requires.
///
/// "Each arithmetic integer decoding procedure requires 512 bytes of storage
/// for its context memory." (A.2)
const CONTEXT_SIZE: usize = 512;

/// Prefix ranges of the integer decoding procedure (Figure A.1): the number
/// of value bits to read and the offset added to them.
const RANGES: [(u32, i64); 6] = [
    (2, 0),
    (4, 4),
    (6, 20),
    (8, 84),
    (12, 340),
    (32, 4436),
];

/// An integer arithmetic decoding procedure with its own context memory.
#[derive(Debug, Clone)]
pub struct IntegerDecoder {
    contexts: ContextMemory,
}

impl IntegerDecoder {
    /// Create an integer decoder with fresh contexts.
    pub fn new() -> Self {
        Self {
            contexts: ContextMemory::new(CONTEXT_SIZE),
        }
    }

    /// Decode one signed integer.
    ///
    /// Returns `None` for the out-of-band value (S = 1 and V = 0), which
    /// higher-level segments use to signal the end of a list.
    pub fn decode(&mut self, decoder: &mut ArithmeticDecoder<'_>) -> Result<Option<i64>> {
        decode_with(decoder, &mut self.contexts)
    }
}

impl Default for IntegerDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode one signed integer using the given context memory (A.2).
///
/// The memory must hold 512 contexts.
pub fn decode_with(
    decoder: &mut ArithmeticDecoder<'_>,
    cx: &mut ContextMemory,
) -> Result<Option<i64>> {
    // "1) Set: PREV = 1" (A.2)
    let mut prev: u32 = 1;

    let s = decode_bit(decoder, cx, &mut prev)?;

    // Read prefix bits until a 0 appears or five 1s have been seen
    // (Figure A.1).
    let mut prefix = 0;
    while prefix < 5 && decode_bit(decoder, cx, &mut prev)? == 1 {
        prefix += 1;
    }

    let (bits_to_read, offset) = RANGES[prefix];

    let mut v: u64 = 0;
    for _ in 0..bits_to_read {
        let bit = decode_bit(decoder, cx, &mut prev)?;
        v = (v << 1) | bit as u64;
    }

    // "The result of the integer arithmetic decoding procedure is equal to:
    // - V if S = 0
    // - -V if S = 1 and V > 0
    // - OOB if S = 1 and V = 0" (A.2)
    let value = v as i64 + offset;
    if s == 0 {
        Ok(Some(value))
    } else if value > 0 {
        Ok(Some(-value))
    } else {
        Ok(None)
    }
}

/// The IAID decoding procedure (A.3): decode a `sym_code_len`-bit symbol ID.
///
/// The context memory must hold at least `1 << (sym_code_len + 1)` contexts.
pub fn decode_iaid(
    decoder: &mut ArithmeticDecoder<'_>,
    cx: &mut ContextMemory,
    sym_code_len: u32,
) -> Result<u32> {
    // "1) Set: PREV = 1" (A.3)
    let mut prev: u32 = 1;

    // "2) Decode each bit of the symbol ID" (A.3)
    for _ in 0..sym_code_len {
        let bit = decoder.decode(cx, prev as usize)?;
        prev = (prev << 1) | bit;
    }

    // "3) - 4)" (A.3)
    Ok(prev - (1 << sym_code_len))
}

/// Decode a single bit and update PREV.
///
/// "If PREV < 256 set: PREV = (PREV << 1) OR D. Otherwise set:
/// PREV = (((PREV << 1) OR D) AND 511) OR 256." (A.2)
#[inline]
fn decode_bit(
    decoder: &mut ArithmeticDecoder<'_>,
    cx: &mut ContextMemory,
    prev: &mut u32,
) -> Result<u32> {
    let d = decoder.decode(cx, *prev as usize)?;

    *prev = if *prev < 256 {
        (*prev << 1) | d
    } else {
        (((*prev << 1) | d) & 511) | 256
    };

    Ok(d)
}
