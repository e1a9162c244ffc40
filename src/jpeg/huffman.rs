//! Huffman entropy coding for JPEG scan data.
//!
//! Decode uses an 8-bit lookup table fast path with the canonical
//! per-length walk (ITU T.81 F.2.2.3) as fallback for longer codes.
//! Encode maps symbols straight to `(code, length)` pairs.
//!
//! Adapted from [jpeg-decoder](https://github.com/image-rs/jpeg-decoder)
//! and [jpeg-encoder](https://github.com/vstroebel/jpeg-encoder).

use super::parser::HuffmanSpec;
use crate::error::{HistegError, Result};

const LUT_BITS: u8 = 8;

fn invalid_table(reason: impl Into<String>) -> HistegError {
    HistegError::DecodeFailed {
        reason: reason.into(),
    }
}

/// Canonical `(code, length)` per symbol, in the table's symbol order
/// (ITU T.81 Figure C.1/C.2).
fn derive_codes(spec: &HuffmanSpec) -> Result<Vec<(u16, u8)>> {
    let total: usize = spec.counts.iter().map(|&n| n as usize).sum();
    if total != spec.symbols.len() {
        return Err(invalid_table("Huffman code counts disagree with symbol list"));
    }
    if total > 256 {
        return Err(invalid_table("Huffman table with more than 256 symbols"));
    }

    let mut codes = Vec::with_capacity(total);
    let mut code = 0u32;
    for (i, &n) in spec.counts.iter().enumerate() {
        let len = (i + 1) as u8;
        for _ in 0..n {
            if code >= 1u32 << len {
                return Err(invalid_table("oversubscribed Huffman table"));
            }
            codes.push((code as u16, len));
            code += 1;
        }
        code <<= 1;
    }
    Ok(codes)
}

/// Compiled Huffman table for decoding.
#[derive(Debug, Clone)]
pub struct DecodeTable {
    /// `(symbol, code_length)` for all codes of at most [`LUT_BITS`] bits;
    /// length 0 marks a longer code.
    lut: [(u8, u8); 1 << LUT_BITS],
    /// Lowest code of each length 1-16.
    mincode: [u16; 17],
    /// Highest code of each length, -1 when the length is unused.
    maxcode: [i32; 17],
    /// Index of the first symbol of each length.
    valptr: [usize; 17],
    symbols: Vec<u8>,
}

impl DecodeTable {
    pub fn build(spec: &HuffmanSpec) -> Result<Self> {
        let codes = derive_codes(spec)?;

        let mut lut = [(0u8, 0u8); 1 << LUT_BITS];
        for (&(code, len), &symbol) in codes.iter().zip(&spec.symbols) {
            if len <= LUT_BITS {
                let shift = LUT_BITS - len;
                let base = (code as usize) << shift;
                for slot in &mut lut[base..base + (1 << shift)] {
                    *slot = (symbol, len);
                }
            }
        }

        let mut mincode = [0u16; 17];
        let mut maxcode = [-1i32; 17];
        let mut valptr = [0usize; 17];
        let mut index = 0usize;
        for len in 1..=16usize {
            let n = spec.counts[len - 1] as usize;
            if n > 0 {
                valptr[len] = index;
                mincode[len] = codes[index].0;
                maxcode[len] = codes[index + n - 1].0 as i32;
                index += n;
            }
        }

        Ok(DecodeTable {
            lut,
            mincode,
            maxcode,
            valptr,
            symbols: spec.symbols.clone(),
        })
    }

    /// Resolve a code of the given length, if one exists.
    #[inline]
    fn lookup(&self, len: usize, code: u16) -> Option<u8> {
        if (code as i32) <= self.maxcode[len] && code >= self.mincode[len] {
            Some(self.symbols[self.valptr[len] + (code - self.mincode[len]) as usize])
        } else {
            None
        }
    }
}

/// Compiled Huffman table for encoding.
#[derive(Debug, Clone)]
pub struct EncodeTable {
    codes: [Option<(u16, u8)>; 256],
}

impl EncodeTable {
    pub fn build(spec: &HuffmanSpec) -> Result<Self> {
        let derived = derive_codes(spec)?;
        let mut codes = [None; 256];
        for (&(code, len), &symbol) in derived.iter().zip(&spec.symbols) {
            codes[symbol as usize] = Some((code, len));
        }
        Ok(EncodeTable { codes })
    }

    #[inline]
    pub fn code(&self, symbol: u8) -> Option<(u16, u8)> {
        self.codes[symbol as usize]
    }
}

/// Bit-level reader over entropy-coded scan bytes.
///
/// De-stuffs `FF 00` sequences and stops at any marker; restart markers
/// are crossed explicitly via [`BitReader::restart`].
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    bits: u32,
    len: u8,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        BitReader {
            data,
            pos: 0,
            bits: 0,
            len: 0,
        }
    }

    fn refill(&mut self) {
        while self.len <= 24 && self.pos < self.data.len() {
            let byte = self.data[self.pos];
            if byte == 0xFF {
                if self.data.get(self.pos + 1) == Some(&0x00) {
                    self.pos += 2;
                } else {
                    // a marker ends this entropy segment
                    break;
                }
            } else {
                self.pos += 1;
            }
            self.bits = (self.bits << 8) | byte as u32;
            self.len += 8;
        }
    }

    /// Peek `count` bits, or `None` if the segment has fewer left.
    #[inline]
    fn peek(&mut self, count: u8) -> Option<u16> {
        if self.len < count {
            self.refill();
            if self.len < count {
                return None;
            }
        }
        let shift = self.len - count;
        Some(((self.bits >> shift) & ((1u32 << count) - 1)) as u16)
    }

    #[inline]
    fn consume(&mut self, count: u8) {
        debug_assert!(count <= self.len);
        self.len -= count;
        self.bits &= (1u32 << self.len) - 1;
    }

    fn read_bit(&mut self) -> Result<u8> {
        let bit = self.peek(1).ok_or_else(|| HistegError::DecodeFailed {
            reason: "entropy-coded data exhausted".into(),
        })?;
        self.consume(1);
        Ok(bit as u8)
    }

    pub fn read_bits(&mut self, count: u8) -> Result<u16> {
        let value = self.peek(count).ok_or_else(|| HistegError::DecodeFailed {
            reason: "entropy-coded data exhausted".into(),
        })?;
        self.consume(count);
        Ok(value)
    }

    /// Decode one Huffman symbol.
    pub fn decode_symbol(&mut self, table: &DecodeTable) -> Result<u8> {
        if let Some(peek) = self.peek(LUT_BITS) {
            let (symbol, len) = table.lut[peek as usize];
            if len > 0 {
                self.consume(len);
                return Ok(symbol);
            }
            // longer than the LUT covers: extend the peeked prefix bit by bit
            let mut code = peek as u32;
            self.consume(LUT_BITS);
            for len in (LUT_BITS as usize + 1)..=16 {
                code = (code << 1) | self.read_bit()? as u32;
                if let Some(symbol) = table.lookup(len, code as u16) {
                    return Ok(symbol);
                }
            }
        } else {
            // tail of the segment: fewer than LUT_BITS bits remain
            let mut code = 0u32;
            for len in 1..=16 {
                code = (code << 1) | self.read_bit()? as u32;
                if let Some(symbol) = table.lookup(len, code as u16) {
                    return Ok(symbol);
                }
            }
        }
        Err(HistegError::DecodeFailed {
            reason: "invalid Huffman code".into(),
        })
    }

    /// Read a magnitude category's extra bits and sign-extend them
    /// (ITU T.81 Figure F.12).
    pub fn receive_extend(&mut self, size: u8) -> Result<i16> {
        if size == 0 {
            return Ok(0);
        }
        let value = self.read_bits(size)? as i32;
        let threshold = 1i32 << (size - 1);
        if value < threshold {
            Ok((value - (1i32 << size) + 1) as i16)
        } else {
            Ok(value as i16)
        }
    }

    /// Cross a restart marker: drop padding bits, verify the marker,
    /// and continue with the next entropy segment.
    pub fn restart(&mut self) -> Result<()> {
        self.bits = 0;
        self.len = 0;
        if self.pos + 1 < self.data.len()
            && self.data[self.pos] == 0xFF
            && matches!(self.data[self.pos + 1], 0xD0..=0xD7)
        {
            self.pos += 2;
            Ok(())
        } else {
            Err(HistegError::DecodeFailed {
                reason: "expected a restart marker".into(),
            })
        }
    }
}

/// Bit-level writer producing entropy-coded scan bytes.
///
/// Applies byte stuffing (`FF` → `FF 00`) and pads partial bytes with
/// 1-bits, both as the JPEG convention requires.
pub struct BitWriter {
    out: Vec<u8>,
    bits: u32,
    len: u8,
}

impl BitWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        BitWriter {
            out: Vec::with_capacity(capacity),
            bits: 0,
            len: 0,
        }
    }

    /// Append `count` bits of `value`, most significant first.
    #[inline]
    pub fn write_bits(&mut self, value: u16, count: u8) {
        debug_assert!(count <= 16);
        self.bits = (self.bits << count) | value as u32;
        self.len += count;
        while self.len >= 8 {
            self.len -= 8;
            self.put_byte((self.bits >> self.len) as u8);
        }
        self.bits &= (1u32 << self.len) - 1;
    }

    /// Append a Huffman-coded symbol.
    pub fn write_symbol(&mut self, symbol: u8, table: &EncodeTable) -> Result<()> {
        let (code, len) = table.code(symbol).ok_or_else(|| HistegError::EncodeFailed {
            reason: format!("symbol {symbol:#04x} not in the cover's Huffman table"),
        })?;
        self.write_bits(code, len);
        Ok(())
    }

    fn put_byte(&mut self, byte: u8) {
        self.out.push(byte);
        if byte == 0xFF {
            self.out.push(0x00);
        }
    }

    /// Pad to a byte boundary with 1-bits.
    pub fn pad(&mut self) {
        if self.len > 0 {
            let fill = 8 - self.len;
            let byte = (self.bits << fill) | ((1u32 << fill) - 1);
            self.put_byte(byte as u8);
            self.bits = 0;
            self.len = 0;
        }
    }

    /// Pad and emit restart marker `index` (taken modulo 8).
    pub fn restart(&mut self, index: u8) {
        self.pad();
        self.out.push(0xFF);
        self.out.push(0xD0 + (index & 7));
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.pad();
        self.out
    }
}

/// Split a coefficient into its magnitude category and extra bits.
///
/// Inverse of [`BitReader::receive_extend`]: positive values carry their
/// own bits, negative values the one's-complement form.
#[inline]
pub fn magnitude(value: i16) -> (u8, u16) {
    if value == 0 {
        return (0, 0);
    }
    let abs = value.unsigned_abs();
    let size = (16 - abs.leading_zeros()) as u8;
    let bits = if value < 0 {
        ((1u32 << size) - 1 - abs as u32) as u16
    } else {
        abs
    };
    (size, bits)
}
