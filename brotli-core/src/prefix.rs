//! Canonical prefix (Huffman) codes.
//!
//! Brotli, like DEFLATE, transmits a Huffman tree as a per-symbol code
//! length vector rather than as explicit codes, and recovers the canonical
//! assignment on the decoding side. Two encodings are available for the
//! length vector itself:
//!
//! - a **simple** code, for alphabets of 1-4 symbols, where the symbol
//!   values are written directly and the shape of the tree is implied by
//!   the symbol count (plus, for four symbols, a one-bit choice between the
//!   balanced and the zig-zag shape);
//! - a **complex** code, where the length vector is itself compressed with
//!   a small Huffman code over the 18-symbol code-length alphabet (0-15
//!   literal lengths, 16 = repeat the previous length, 17 = repeat a zero
//!   length), the same repeat-code trick RFC 1951 dynamic blocks use for
//!   their own code-length alphabet.
//!
//! `HuffmanTree` (the decode side) and [`build_canonical_codes`] (the
//! encode side) are the same canonical-code machinery for both the
//! length-vector alphabet and every data alphabet (literals, insert-and-copy
//! symbols, distances, block types, code lengths).

use crate::bitstream::{BitReader, BitWriter};
use crate::error::{BrotliError, Result};
use std::io::{Read, Write};

/// Maximum prefix code length the format allows.
pub const MAX_CODE_LENGTH: usize = 15;

/// Size of the code-length alphabet used to compress a symbol's code-length
/// vector (16 literal lengths plus the two repeat symbols).
pub const NUM_CODE_LENGTH_CODES: usize = 18;

/// Order in which code-length-code lengths are transmitted, chosen (as in
/// RFC 1951's `CODELEN_ORDER`) so that the common case — only small lengths
/// in use — lets the encoder truncate the list early.
pub const CODE_LENGTH_CODE_ORDER: [u8; NUM_CODE_LENGTH_CODES] =
    [1, 2, 3, 4, 0, 5, 17, 6, 16, 7, 8, 9, 10, 11, 12, 13, 14, 15];

/// Repeat-previous-length code: 2 extra bits, base repeat count 3.
const REPEAT_PREVIOUS: u8 = 16;
/// Repeat-zero-length code: 3 extra bits, base repeat count 3.
const REPEAT_ZERO: u8 = 17;

/// A canonical Huffman tree, built from a code-length vector, for
/// constant-time-ish symbol decoding.
///
/// Decoding uses a direct-index table for codes up to `FAST_BITS` long and
/// falls back to a bit-by-bit walk for the (rare) longer codes, the usual
/// two-tier fast-path/slow-path approach for canonical Huffman decoding.
#[derive(Debug, Clone)]
pub struct HuffmanTree {
    fast_table: Vec<(u16, u8)>,
    fast_bits: u8,
    max_code_length: u8,
    symbols: Vec<u16>,
    base_codes: [u32; MAX_CODE_LENGTH + 1],
    symbol_offsets: [u16; MAX_CODE_LENGTH + 2],
}

impl HuffmanTree {
    const FAST_BITS: u8 = 9;

    /// Build a decode tree from a per-symbol code-length vector. A length
    /// of 0 means the symbol is unused. The vector must form a complete
    /// code (Kraft sum exactly 1), except for the degenerate single-symbol
    /// case, which decodes with zero bits consumed.
    pub fn from_code_lengths(code_lengths: &[u8]) -> Result<Self> {
        let mut bl_count = [0u32; MAX_CODE_LENGTH + 1];
        let mut max_length = 0u8;
        let mut used_symbols = 0usize;

        for &len in code_lengths {
            if len > 0 {
                if len as usize > MAX_CODE_LENGTH {
                    return Err(BrotliError::HuffmanSpace {
                        message: format!("code length {} exceeds maximum {}", len, MAX_CODE_LENGTH),
                    });
                }
                bl_count[len as usize] += 1;
                max_length = max_length.max(len);
                used_symbols += 1;
            }
        }

        if max_length == 0 {
            return Err(BrotliError::HuffmanSpace {
                message: "code has no symbols".to_string(),
            });
        }

        if used_symbols > 1 {
            let kraft: u32 = (1..=max_length as usize)
                .map(|len| bl_count[len] << (max_length as usize - len))
                .sum();
            if kraft != 1u32 << max_length {
                return Err(BrotliError::HuffmanSpace {
                    message: format!("code does not satisfy the Kraft equality (sum {})", kraft),
                });
            }
        }

        let mut next_code = [0u32; MAX_CODE_LENGTH + 1];
        let mut code = 0u32;
        for bits in 1..=max_length as usize {
            code = (code + bl_count[bits - 1]) << 1;
            next_code[bits] = code;
        }

        let total_codes: u32 = bl_count[1..=max_length as usize].iter().sum();
        let mut symbols = vec![0u16; total_codes as usize];
        let mut symbol_offsets = [0u16; MAX_CODE_LENGTH + 2];
        let mut base_codes = [0u32; MAX_CODE_LENGTH + 1];

        let mut offset = 0u16;
        for bits in 1..=max_length as usize {
            symbol_offsets[bits] = offset;
            base_codes[bits] = next_code[bits];
            offset += bl_count[bits] as u16;
        }
        symbol_offsets[max_length as usize + 1] = offset;

        let mut current_code = next_code;
        for (symbol, &len) in code_lengths.iter().enumerate() {
            if len > 0 {
                let len = len as usize;
                let idx = symbol_offsets[len] as usize + (current_code[len] - base_codes[len]) as usize;
                symbols[idx] = symbol as u16;
                current_code[len] += 1;
            }
        }

        let fast_bits = Self::FAST_BITS.min(max_length);
        let fast_table_size = 1usize << fast_bits;
        let mut fast_table = vec![(0u16, 0u8); fast_table_size];

        let mut fill_code = next_code;
        for (symbol, &len) in code_lengths.iter().enumerate() {
            if len > 0 && len <= fast_bits {
                let len = len as usize;
                let code = reverse_bits(fill_code[len] as u16, len as u8);
                fill_code[len] += 1;

                let fill_count = 1usize << (fast_bits - len as u8);
                for i in 0..fill_count {
                    let index = code as usize | (i << len);
                    fast_table[index] = (symbol as u16, len as u8);
                }
            }
        }

        Ok(Self {
            fast_table,
            fast_bits,
            max_code_length: max_length,
            symbols,
            base_codes,
            symbol_offsets,
        })
    }

    /// Build a degenerate single-symbol tree that always decodes `symbol`
    /// while consuming zero bits, as the format allows for an alphabet that
    /// collapses to one value (e.g. a block-type tree when only one block
    /// type is used).
    pub fn single_symbol(symbol: u16) -> Self {
        Self {
            fast_table: Vec::new(),
            fast_bits: 0,
            max_code_length: 0,
            symbols: vec![symbol],
            base_codes: [0; MAX_CODE_LENGTH + 1],
            symbol_offsets: [0; MAX_CODE_LENGTH + 2],
        }
    }

    /// Decode one symbol from the bitstream.
    #[inline]
    pub fn decode<R: Read>(&self, reader: &mut BitReader<R>) -> Result<u16> {
        if self.max_code_length == 0 {
            return self
                .symbols
                .first()
                .copied()
                .ok_or_else(|| BrotliError::corrupted(reader.bit_position(), "empty Huffman tree"));
        }

        match reader.peek_bits(self.fast_bits) {
            Ok(bits) => {
                let (symbol, len) = self.fast_table[bits as usize];
                if len > 0 {
                    reader.consume_bits(len)?;
                    return Ok(symbol);
                }
                self.decode_slow(reader)
            }
            Err(_) => self.decode_slow(reader),
        }
    }

    fn decode_slow<R: Read>(&self, reader: &mut BitReader<R>) -> Result<u16> {
        let mut code = 0u32;
        for len in 1..=self.max_code_length as usize {
            code = (code << 1) | reader.read_bits(1)?;
            let count = self.symbol_offsets[len + 1] - self.symbol_offsets[len];
            if count > 0 && code >= self.base_codes[len] {
                let idx = code - self.base_codes[len];
                if idx < count as u32 {
                    return Ok(self.symbols[self.symbol_offsets[len] as usize + idx as usize]);
                }
            }
        }
        Err(BrotliError::corrupted(reader.bit_position(), "invalid prefix code"))
    }
}

fn reverse_bits(mut code: u16, length: u8) -> u16 {
    let mut reversed = 0u16;
    for _ in 0..length {
        reversed = (reversed << 1) | (code & 1);
        code >>= 1;
    }
    reversed
}

/// Build canonical `(code, length)` pairs (MSB-first) for every symbol with
/// a non-zero length, in the order `HuffmanTree` assigns them.
pub fn build_canonical_codes(code_lengths: &[u8]) -> Vec<(u32, u8)> {
    let mut bl_count = [0u32; MAX_CODE_LENGTH + 1];
    let mut max_length = 0usize;
    for &len in code_lengths {
        if len > 0 {
            bl_count[len as usize] += 1;
            max_length = max_length.max(len as usize);
        }
    }

    let mut next_code = [0u32; MAX_CODE_LENGTH + 1];
    let mut code = 0u32;
    for bits in 1..=max_length {
        code = (code + bl_count[bits - 1]) << 1;
        next_code[bits] = code;
    }

    let mut codes = vec![(0u32, 0u8); code_lengths.len()];
    for (symbol, &len) in code_lengths.iter().enumerate() {
        if len > 0 {
            let len = len as usize;
            codes[symbol] = (next_code[len], len as u8);
            next_code[len] += 1;
        }
    }
    codes
}

/// Write one symbol's canonical code, LSB-first.
pub fn write_symbol<W: Write>(writer: &mut BitWriter<W>, code: u32, length: u8) -> Result<()> {
    if length == 0 {
        return Ok(());
    }
    writer.write_bits(reverse_bits(code as u16, length) as u32, length)
}

/// Number of bits `build_canonical_codes` would assign to `code_lengths`
/// given symbol frequencies — the exact transmitted length, not an
/// estimate. Used by the meta-block builder to pick between candidate
/// trees.
pub fn encoded_bit_cost(code_lengths: &[u8], frequencies: &[u32]) -> u64 {
    code_lengths
        .iter()
        .zip(frequencies)
        .map(|(&len, &freq)| len as u64 * freq as u64)
        .sum()
}

/// Write a prefix code description: either the compact simple form (1-4
/// symbols) or the general complex form, whichever the caller has already
/// selected. `alphabet_bits` is `ceil(log2(alphabet_size))`, used to size
/// the literal symbol fields of the simple form.
pub fn write_prefix_code<W: Write>(
    writer: &mut BitWriter<W>,
    code_lengths: &[u8],
    alphabet_bits: u8,
) -> Result<()> {
    let mut used: Vec<u16> = code_lengths
        .iter()
        .enumerate()
        .filter(|&(_, &len)| len > 0)
        .map(|(sym, _)| sym as u16)
        .collect();
    // A complete 1-4 leaf binary tree has a length multiset that uniquely
    // determines each symbol's length by rank (1; 1,1; 1,2,2; or
    // 2,2,2,2/1,2,3,3) — sort so the reader's positional length assignment
    // lines up with what the writer actually encoded, not with symbol
    // index order.
    used.sort_by_key(|&sym| (code_lengths[sym as usize], sym));

    if used.len() <= 4 && !used.is_empty() {
        writer.write_bit(true)?;
        writer.write_bits((used.len() - 1) as u32, 2)?;
        for &symbol in &used {
            writer.write_bits(symbol as u32, alphabet_bits)?;
        }
        if used.len() == 4 {
            // Disambiguate the balanced {2,2,2,2} shape from the zig-zag
            // {1,2,3,3} shape, mirroring the one-bit tree-select the format
            // uses for four-symbol simple codes.
            let zigzag = code_lengths[used[0] as usize] == 1;
            writer.write_bit(zigzag)?;
        }
        return Ok(());
    }

    writer.write_bit(false)?;
    write_complex_prefix_code(writer, code_lengths)
}

/// Read back a prefix code description written by [`write_prefix_code`],
/// for an alphabet of `alphabet_size` symbols.
pub fn read_prefix_code<R: Read>(
    reader: &mut BitReader<R>,
    alphabet_size: usize,
    alphabet_bits: u8,
) -> Result<Vec<u8>> {
    let is_simple = reader.read_bit()?;
    let mut lengths = vec![0u8; alphabet_size];

    if is_simple {
        let nsym = reader.read_bits(2)? as usize + 1;
        let mut symbols = Vec::with_capacity(nsym);
        for _ in 0..nsym {
            let symbol = reader.read_bits(alphabet_bits)? as usize;
            if symbol >= alphabet_size {
                return Err(BrotliError::SimpleHuffmanDuplicate);
            }
            symbols.push(symbol);
        }
        if symbols.iter().collect::<std::collections::HashSet<_>>().len() != symbols.len() {
            return Err(BrotliError::SimpleHuffmanDuplicate);
        }

        match nsym {
            1 => lengths[symbols[0]] = 1,
            2 => {
                lengths[symbols[0]] = 1;
                lengths[symbols[1]] = 1;
            }
            3 => {
                lengths[symbols[0]] = 1;
                lengths[symbols[1]] = 2;
                lengths[symbols[2]] = 2;
            }
            4 => {
                let zigzag = reader.read_bit()?;
                if zigzag {
                    lengths[symbols[0]] = 1;
                    lengths[symbols[1]] = 2;
                    lengths[symbols[2]] = 3;
                    lengths[symbols[3]] = 3;
                } else {
                    for &s in &symbols {
                        lengths[s] = 2;
                    }
                }
            }
            _ => unreachable!("nsym is read from 2 bits, bounded to 1..=4"),
        }
        return Ok(lengths);
    }

    read_complex_prefix_code(reader, alphabet_size)
}

fn write_complex_prefix_code<W: Write>(writer: &mut BitWriter<W>, code_lengths: &[u8]) -> Result<()> {
    let rle = rle_encode_lengths(code_lengths);

    let mut cl_freqs = [0u32; NUM_CODE_LENGTH_CODES];
    for &(sym, _, _) in &rle {
        cl_freqs[sym as usize] += 1;
    }
    let cl_lengths = crate::histogram::build_length_limited_lengths(&cl_freqs, 7);

    let hskip = CODE_LENGTH_CODE_ORDER
        .iter()
        .take_while(|&&sym| cl_lengths[sym as usize] == 0)
        .count()
        .min(3);
    writer.write_bits(hskip as u32, 2)?;

    for &sym in CODE_LENGTH_CODE_ORDER.iter().skip(hskip) {
        writer.write_bits(cl_lengths[sym as usize] as u32, 3)?;
    }

    let cl_codes = build_canonical_codes(&cl_lengths);
    for &(sym, extra, extra_bits) in &rle {
        let (code, len) = cl_codes[sym as usize];
        write_symbol(writer, code, len)?;
        if extra_bits > 0 {
            writer.write_bits(extra as u32, extra_bits)?;
        }
    }

    Ok(())
}

fn read_complex_prefix_code<R: Read>(reader: &mut BitReader<R>, alphabet_size: usize) -> Result<Vec<u8>> {
    let hskip = reader.read_bits(2)? as usize;
    let mut cl_lengths = [0u8; NUM_CODE_LENGTH_CODES];
    for &sym in CODE_LENGTH_CODE_ORDER.iter().skip(hskip) {
        cl_lengths[sym as usize] = reader.read_bits(3)? as u8;
    }

    let cl_tree = HuffmanTree::from_code_lengths(&cl_lengths)?;

    let mut lengths = vec![0u8; alphabet_size];
    let mut i = 0usize;
    let mut previous_nonzero = 8u8;

    while i < alphabet_size {
        let symbol = cl_tree.decode(reader)?;
        match symbol as u8 {
            n if n < REPEAT_PREVIOUS => {
                lengths[i] = n;
                if n > 0 {
                    previous_nonzero = n;
                }
                i += 1;
            }
            REPEAT_PREVIOUS => {
                let extra = reader.read_bits(2)? as usize;
                let repeat = 3 + extra;
                for _ in 0..repeat {
                    if i >= alphabet_size {
                        break;
                    }
                    lengths[i] = previous_nonzero;
                    i += 1;
                }
            }
            REPEAT_ZERO => {
                let extra = reader.read_bits(3)? as usize;
                let repeat = 3 + extra;
                for _ in 0..repeat {
                    if i >= alphabet_size {
                        break;
                    }
                    lengths[i] = 0;
                    i += 1;
                }
            }
            _ => return Err(BrotliError::corrupted(reader.bit_position(), "invalid code-length symbol")),
        }
    }

    Ok(lengths)
}

/// Run-length encode a code-length vector into `(symbol, extra_value,
/// extra_bits)` triples over the 18-symbol code-length alphabet.
fn rle_encode_lengths(lengths: &[u8]) -> Vec<(u8, u8, u8)> {
    let mut out = Vec::new();
    let mut i = 0;
    let mut previous_nonzero = 8u8;

    while i < lengths.len() {
        let len = lengths[i];
        let mut run = 1;
        while i + run < lengths.len() && lengths[i + run] == len {
            run += 1;
        }

        if len == 0 {
            let mut remaining = run;
            while remaining > 0 {
                if remaining >= 3 {
                    let take = remaining.min(10);
                    out.push((REPEAT_ZERO, (take - 3) as u8, 3));
                    remaining -= take;
                } else {
                    out.push((0, 0, 0));
                    remaining -= 1;
                }
            }
        } else {
            out.push((len, 0, 0));
            previous_nonzero = len;
            let mut remaining = run - 1;
            while remaining > 0 {
                if remaining >= 3 {
                    let take = remaining.min(6);
                    out.push((REPEAT_PREVIOUS, (take - 3) as u8, 2));
                    remaining -= take;
                } else {
                    out.push((len, 0, 0));
                    remaining -= 1;
                }
            }
        }

        i += run;
    }

    let _ = previous_nonzero;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn canonical_roundtrip_small_alphabet() {
        let lengths = [1u8, 2, 2];
        let tree = HuffmanTree::from_code_lengths(&lengths).unwrap();
        let codes = build_canonical_codes(&lengths);

        let mut out = Vec::new();
        {
            let mut writer = BitWriter::new(&mut out);
            for &sym in &[0usize, 1, 2, 0] {
                let (code, len) = codes[sym];
                write_symbol(&mut writer, code, len).unwrap();
            }
            writer.flush().unwrap();
        }

        let mut reader = BitReader::new(Cursor::new(out));
        assert_eq!(tree.decode(&mut reader).unwrap(), 0);
        assert_eq!(tree.decode(&mut reader).unwrap(), 1);
        assert_eq!(tree.decode(&mut reader).unwrap(), 2);
        assert_eq!(tree.decode(&mut reader).unwrap(), 0);
    }

    #[test]
    fn single_symbol_tree_consumes_no_bits() {
        let tree = HuffmanTree::single_symbol(7);
        let mut reader = BitReader::new(Cursor::new(Vec::<u8>::new()));
        assert_eq!(tree.decode(&mut reader).unwrap(), 7);
        assert_eq!(tree.decode(&mut reader).unwrap(), 7);
    }

    #[test]
    fn rejects_incomplete_code() {
        let lengths = [1u8, 2, 0];
        assert!(HuffmanTree::from_code_lengths(&lengths).is_err());
    }

    #[test]
    fn simple_prefix_code_roundtrips() {
        let mut lengths = vec![0u8; 8];
        lengths[2] = 1;
        lengths[5] = 1;

        let mut out = Vec::new();
        {
            let mut writer = BitWriter::new(&mut out);
            write_prefix_code(&mut writer, &lengths, 3).unwrap();
            writer.flush().unwrap();
        }

        let mut reader = BitReader::new(Cursor::new(out));
        let decoded = read_prefix_code(&mut reader, 8, 3).unwrap();
        assert_eq!(decoded, lengths);
    }

    #[test]
    fn complex_prefix_code_roundtrips() {
        let mut lengths = vec![0u8; 40];
        for (i, len) in lengths.iter_mut().enumerate() {
            if i % 3 == 0 {
                *len = 3;
            } else if i % 5 == 0 {
                *len = 5;
            }
        }
        // Force at least 5 distinct symbols so write_prefix_code picks the
        // complex branch even if fewer than 5 happen to be non-zero above.
        lengths[1] = 2;
        lengths[2] = 2;
        lengths[4] = 4;
        lengths[7] = 4;
        lengths[8] = 1;

        let repaired = crate::histogram::repair_code_lengths(&lengths, MAX_CODE_LENGTH as u8);

        let mut out = Vec::new();
        {
            let mut writer = BitWriter::new(&mut out);
            write_prefix_code(&mut writer, &repaired, 6).unwrap();
            writer.flush().unwrap();
        }

        let mut reader = BitReader::new(Cursor::new(out));
        let decoded = read_prefix_code(&mut reader, 40, 6).unwrap();
        assert_eq!(decoded, repaired);
    }
}
