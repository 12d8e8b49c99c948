//! Meta-block assembly: the encoder-side counterpart of the block
//! splitter and prefix-code machinery, and the decoder-side counterpart
//! that reads one back.
//!
//! A meta-block carries one "chunk" of a stream's commands: independent
//! block splits (and therefore independent clustered prefix codes) for
//! the literal, insert-and-copy command, and distance streams, followed
//! by the commands themselves interleaved with their literal runs.
//! Mirrors the reference encoder's `BrotliEncoderCompressPart` /
//! `StoreMetaBlock` structure: each stream's block-type and block-length
//! symbols are woven inline between the data symbols themselves (a
//! "switch" symbol only appears at an actual type change, never an
//! upfront table), and the insert-and-copy command alphabet packs its
//! two length codes the way `CombineLengthCodes` does, including the
//! implicit-last-distance-reuse shortcut that lets a cheap enough
//! command skip transmitting a distance symbol altogether.

use crate::bitstream::{BitReader, BitWriter};
use crate::block_splitter::{split_symbols, BlockSplit};
use crate::command::{Command, DistanceRing, DistanceSlot, EncodedCommand};
use crate::error::{BrotliError, Result};
use crate::histogram::{build_length_limited_lengths, Histogram};
use crate::prefix::{build_canonical_codes, read_prefix_code, write_prefix_code, write_symbol, HuffmanTree};
use crate::tables;
use std::io::{Read, Write};

const LITERAL_ALPHABET: usize = tables::LITERAL_ALPHABET_SIZE;
const COMMAND_ALPHABET: usize = tables::COMMAND_ALPHABET_SIZE;
const DISTANCE_ALPHABET: usize = tables::DISTANCE_ALPHABET_SIZE;

/// Maximum number of distinct block types the splitter may produce for
/// any one stream within a meta-block.
const MAX_BLOCK_TYPES: usize = 8;

fn alphabet_bits(size: usize) -> u8 {
    let mut bits = 0u8;
    while (1usize << bits) < size {
        bits += 1;
    }
    bits
}

/// A decoded meta-block: the literal bytes and commands it carries, plus
/// whether it was marked as the stream's final meta-block.
#[derive(Debug, Clone)]
pub struct DecodedMetaBlock {
    pub commands: Vec<Command>,
    pub literals: Vec<u8>,
    pub is_last: bool,
}

/// Tracks the "current" and "second-to-last" block type for one stream,
/// implementing the reference format's inline block-switch alphabet: a
/// switch symbol is one of `0..num_types` (switch directly to that type),
/// `num_types` (switch back to the second-to-last type used), or
/// `num_types + 1` (switch to `current + 1 mod num_types`) — the latter
/// two covering the overwhelmingly common "go back to the type before
/// this one" and "advance to the next type" transitions in one symbol
/// instead of spelling out the type index every time.
#[derive(Debug, Clone, Copy)]
struct BlockTypeState {
    num_types: u8,
    current: u8,
    second_to_last: u8,
}

impl BlockTypeState {
    fn new(num_types: u8) -> Self {
        Self {
            num_types,
            current: 0,
            second_to_last: if num_types > 1 { 1 % num_types } else { 0 },
        }
    }

    fn encode_switch(&mut self, next_type: u8) -> u8 {
        let symbol = if next_type == self.second_to_last {
            self.num_types
        } else if next_type == (self.current + 1) % self.num_types {
            self.num_types + 1
        } else {
            next_type
        };
        self.second_to_last = self.current;
        self.current = next_type;
        symbol
    }

    fn decode_switch(&mut self, symbol: u8) -> u8 {
        let next_type = if symbol == self.num_types {
            self.second_to_last
        } else if symbol == self.num_types + 1 {
            (self.current + 1) % self.num_types
        } else {
            symbol
        };
        self.second_to_last = self.current;
        self.current = next_type;
        next_type
    }
}

/// Relabel a block split's type ids so the first block is always type 0
/// (in first-appearance order), the layout the inline switch state
/// machine assumes its initial `current = 0` matches.
fn canonicalize_block_split<const N: usize>(split: &BlockSplit<N>) -> (Vec<u32>, Vec<u8>, Vec<Histogram<N>>) {
    let mut remap: Vec<Option<u8>> = vec![None; split.histograms.len()];
    let mut next = 0u8;
    let mut types = Vec::with_capacity(split.block_types.len());
    for &ty in &split.block_types {
        let slot = &mut remap[ty as usize];
        let new_ty = *slot.get_or_insert_with(|| {
            let assigned = next;
            next += 1;
            assigned
        });
        types.push(new_ty);
    }

    let mut histograms = vec![Histogram::new(); next as usize];
    for (old_idx, slot) in remap.into_iter().enumerate() {
        if let Some(new_idx) = slot {
            histograms[new_idx as usize] = split.histograms[old_idx].clone();
        }
    }

    (split.block_lengths.clone(), types, histograms)
}

/// Code-length vector for a stream's data alphabet. A histogram with no
/// occurrences at all (e.g. a meta-block with zero literal bytes because
/// every command is a pure copy) still needs *some* valid one-symbol code
/// so [`HuffmanTree::from_code_lengths`] doesn't reject an all-zero
/// vector; that code is simply never exercised since the symbol it names
/// never appears on the wire.
fn data_code_lengths<const N: usize>(histogram: &Histogram<N>) -> Vec<u8> {
    if histogram.total() == 0 {
        let mut lengths = vec![0u8; N];
        lengths[0] = 1;
        lengths
    } else {
        build_length_limited_lengths(histogram.counts(), 15)
    }
}

fn distance_symbol(slot: DistanceSlot) -> (usize, u32, u32) {
    match slot {
        DistanceSlot::Ring { short_code } => (short_code as usize, 0, 0),
        DistanceSlot::New { distance } => {
            let (code, numextra, extra) = tables::distance_code(distance);
            (16 + code as usize, numextra, extra)
        }
    }
}

/// Encoder-side cursor over one stream's block split, writing inline
/// block-switch/block-count symbols exactly when a new block begins.
struct BlockStreamWriter {
    lengths: Vec<u32>,
    types: Vec<u8>,
    num_types: u8,
    idx: usize,
    remaining: u32,
    state: BlockTypeState,
    switch_codes: Vec<(u32, u8)>,
    count_codes: Vec<(u32, u8)>,
}

impl BlockStreamWriter {
    /// Write this stream's block-type header (`num_types`, and — if more
    /// than one type is in play — the switch-alphabet and block-count
    /// prefix codes plus block 0's length) followed by the per-type data
    /// alphabet prefix codes, returning a cursor ready to walk the body
    /// and the canonical codes needed to write each data symbol.
    fn write_header<const N: usize, W: Write>(
        writer: &mut BitWriter<W>,
        split: &BlockSplit<N>,
    ) -> Result<(Self, Vec<Vec<(u32, u8)>>)> {
        let (lengths, types, histograms) = canonicalize_block_split(split);
        let num_types = histograms.len().max(1) as u8;
        writer.write_bits(num_types as u32, 8)?;

        let mut switch_codes = Vec::new();
        let mut count_codes = Vec::new();
        let state = BlockTypeState::new(num_types);

        if num_types > 1 {
            let mut sim_state = state;
            let switch_alphabet = num_types as usize + 2;
            let mut switch_freq = vec![0u32; switch_alphabet];
            let mut count_freq = vec![0u32; tables::BLOCK_COUNT_ALPHABET_SIZE];

            for (i, (&len, &ty)) in lengths.iter().zip(&types).enumerate() {
                if i > 0 {
                    let sym = sim_state.encode_switch(ty);
                    switch_freq[sym as usize] += 1;
                }
                let (code, _bits, _val) = tables::block_length_code(len);
                count_freq[code as usize] += 1;
            }

            let switch_lengths = build_length_limited_lengths(&switch_freq, 15);
            write_prefix_code(writer, &switch_lengths, alphabet_bits(switch_alphabet))?;
            switch_codes = build_canonical_codes(&switch_lengths);

            let count_lengths = build_length_limited_lengths(&count_freq, 15);
            write_prefix_code(writer, &count_lengths, alphabet_bits(tables::BLOCK_COUNT_ALPHABET_SIZE))?;
            count_codes = build_canonical_codes(&count_lengths);

            let (code_idx, bits, val) = tables::block_length_code(lengths[0]);
            let (code, len) = count_codes[code_idx as usize];
            write_symbol(writer, code, len)?;
            if bits > 0 {
                writer.write_bits(val, bits as u8)?;
            }
        }

        let data_codes: Vec<Vec<(u32, u8)>> = histograms
            .iter()
            .map(|h| build_canonical_codes(&data_code_lengths(h)))
            .collect();

        for h in &histograms {
            let lengths = data_code_lengths(h);
            write_prefix_code(writer, &lengths, alphabet_bits(N))?;
        }

        let remaining = lengths.first().copied().unwrap_or(0);
        Ok((
            Self {
                lengths,
                types,
                num_types,
                idx: 0,
                remaining,
                state,
                switch_codes,
                count_codes,
            },
            data_codes,
        ))
    }

    /// Emit a block-switch/block-count pair if the current block just ran
    /// out, then return the type the next symbol should be coded under.
    /// Checking before consuming (rather than after) matters here: there
    /// is no upfront total block count to stop at, so the check has to
    /// happen before every symbol, including the very last one in the
    /// stream.
    fn begin_symbol<W: Write>(&mut self, writer: &mut BitWriter<W>) -> Result<usize> {
        if self.remaining == 0 && self.idx + 1 < self.lengths.len() {
            self.idx += 1;
            let ty = self.types[self.idx];
            if self.num_types > 1 {
                let sym = self.state.encode_switch(ty);
                let (code, len) = self.switch_codes[sym as usize];
                write_symbol(writer, code, len)?;

                let (code_idx, bits, val) = tables::block_length_code(self.lengths[self.idx]);
                let (code, len) = self.count_codes[code_idx as usize];
                write_symbol(writer, code, len)?;
                if bits > 0 {
                    writer.write_bits(val, bits as u8)?;
                }
            }
            self.remaining = self.lengths[self.idx];
        }
        if self.remaining > 0 {
            self.remaining -= 1;
        }
        Ok(self.types[self.idx] as usize)
    }
}

/// Decoder-side counterpart of [`BlockStreamWriter`].
struct BlockStreamReader {
    num_types: u8,
    remaining: u32,
    current_type: u8,
    state: BlockTypeState,
    switch_tree: Option<HuffmanTree>,
    count_tree: Option<HuffmanTree>,
}

impl BlockStreamReader {
    fn read_header<R: Read>(reader: &mut BitReader<R>, alphabet_size: usize) -> Result<(Self, Vec<HuffmanTree>)> {
        let num_types = (reader.read_bits(8)? as u8).max(1);
        let mut switch_tree = None;
        let mut count_tree = None;
        let mut remaining = 0u32;

        if num_types > 1 {
            let switch_alphabet = num_types as usize + 2;
            let switch_lengths = read_prefix_code(reader, switch_alphabet, alphabet_bits(switch_alphabet))?;
            let switch_huffman = HuffmanTree::from_code_lengths(&switch_lengths)?;

            let count_lengths = read_prefix_code(
                reader,
                tables::BLOCK_COUNT_ALPHABET_SIZE,
                alphabet_bits(tables::BLOCK_COUNT_ALPHABET_SIZE),
            )?;
            let count_huffman = HuffmanTree::from_code_lengths(&count_lengths)?;

            let code = count_huffman.decode(reader)? as u8;
            let bits = *tables::BLOCK_LENGTH_EXTRA_BITS
                .get(code as usize)
                .ok_or_else(|| BrotliError::corrupted(reader.bit_position(), "block count code out of range"))?;
            let extra = reader.read_bits(bits as u8)?;
            remaining = tables::block_length_from_code(code, extra);

            switch_tree = Some(switch_huffman);
            count_tree = Some(count_huffman);
        }

        let mut data_trees = Vec::with_capacity(num_types as usize);
        for _ in 0..num_types {
            let lengths = read_prefix_code(reader, alphabet_size, alphabet_bits(alphabet_size))?;
            data_trees.push(HuffmanTree::from_code_lengths(&lengths)?);
        }

        Ok((
            Self {
                num_types,
                remaining,
                current_type: 0,
                state: BlockTypeState::new(num_types),
                switch_tree,
                count_tree,
            },
            data_trees,
        ))
    }

    fn begin_symbol<R: Read>(&mut self, reader: &mut BitReader<R>) -> Result<usize> {
        if self.remaining == 0 && self.num_types > 1 {
            let switch_sym = self.switch_tree.as_ref().unwrap().decode(reader)? as u8;
            self.current_type = self.state.decode_switch(switch_sym);

            let code = self.count_tree.as_ref().unwrap().decode(reader)? as u8;
            let bits = *tables::BLOCK_LENGTH_EXTRA_BITS
                .get(code as usize)
                .ok_or_else(|| BrotliError::corrupted(reader.bit_position(), "block count code out of range"))?;
            let extra = reader.read_bits(bits as u8)?;
            self.remaining = tables::block_length_from_code(code, extra);
        }
        if self.remaining > 0 {
            self.remaining -= 1;
        }
        Ok(self.current_type as usize)
    }
}

/// Write a meta-block's length field: a 2-bit nibble-count selector
/// (4, 5, or 6 nibbles) followed by that many nibbles of `mlen - 1`,
/// mirroring the reference encoder's `StoreMetaBlockHeader`/`EncodeMlen`
/// nibble packing (values that don't fit even six nibbles fall back to a
/// raw 32-bit escape, a deviation from the format's actual large-block
/// handling but internally consistent with [`read_meta_block_length`]).
fn write_meta_block_length<W: Write>(writer: &mut BitWriter<W>, mlen: u32) -> Result<()> {
    let value = mlen.saturating_sub(1);
    if value < (1 << 16) {
        writer.write_bits(0, 2)?;
        writer.write_bits(value, 16)?;
    } else if value < (1 << 20) {
        writer.write_bits(1, 2)?;
        writer.write_bits(value, 20)?;
    } else if value < (1 << 24) {
        writer.write_bits(2, 2)?;
        writer.write_bits(value, 24)?;
    } else {
        writer.write_bits(3, 2)?;
        writer.write_bits(mlen, 32)?;
    }
    Ok(())
}

/// Inverse of [`write_meta_block_length`].
fn read_meta_block_length<R: Read>(reader: &mut BitReader<R>) -> Result<u32> {
    let code = reader.read_bits(2)?;
    Ok(match code {
        0 => reader.read_bits(16)? + 1,
        1 => reader.read_bits(20)? + 1,
        2 => reader.read_bits(24)? + 1,
        _ => reader.read_bits(32)?,
    })
}

/// Write a meta-block that stores `data` verbatim, byte-aligned, with no
/// prefix codes at all — the fallback path for chunks whose entropy
/// estimate shows modeling them would cost more than just copying them,
/// mirroring the reference encoder's `ShouldCompress` escape hatch.
pub fn write_stored_meta_block<W: Write>(
    writer: &mut BitWriter<W>,
    data: &[u8],
    is_last: bool,
) -> Result<()> {
    writer.write_bit(is_last)?;
    if is_last && data.is_empty() {
        writer.write_bit(true)?;
        return Ok(());
    }
    if is_last {
        writer.write_bit(false)?;
    }
    writer.write_bit(true)?; // is_stored
    write_meta_block_length(writer, data.len() as u32)?;
    writer.align_to_byte()?;
    writer.write_bytes(data)?;
    Ok(())
}

/// Write one meta-block carrying `commands` (whose insert runs are drawn
/// from `literals`, concatenated in command order) to `writer`. `ring`
/// threads the last-4-distances state across meta-blocks in a stream.
pub fn write_meta_block<W: Write>(
    writer: &mut BitWriter<W>,
    commands: &[Command],
    literals: &[u8],
    ring: &mut DistanceRing,
    is_last: bool,
) -> Result<()> {
    let total_len: u64 = commands
        .iter()
        .map(|c| c.insert_len as u64 + c.copy_len as u64)
        .sum();

    writer.write_bit(is_last)?;
    if is_last && total_len == 0 {
        writer.write_bit(true)?;
        return Ok(());
    }
    if is_last {
        writer.write_bit(false)?;
    }
    writer.write_bit(false)?; // is_stored
    write_meta_block_length(writer, total_len as u32)?;
    log::trace!(
        "meta-block: {} commands, {total_len} total symbols, is_last={is_last}",
        commands.len()
    );

    // Classify each command's distance and pack its command symbol up
    // front, in one pass, so the block splitter sees exactly the symbol
    // stream the body writer below will walk (and so the ring state
    // during this pass matches what decoding will see).
    let mut sim_ring = *ring;
    let mut encoded_commands: Vec<EncodedCommand> = Vec::with_capacity(commands.len());
    let mut actually_implicit: Vec<bool> = Vec::with_capacity(commands.len());
    let mut distance_info: Vec<Option<(usize, u32, u32)>> = Vec::with_capacity(commands.len());

    for c in commands {
        let want_implicit =
            c.has_copy() && matches!(sim_ring.classify(c.distance), DistanceSlot::Ring { short_code: 0 });
        let encoded = crate::command::encode_command(c, want_implicit);
        let (_, _, implicit) = tables::split_length_codes(encoded.command_symbol);
        actually_implicit.push(implicit);

        if c.has_copy() {
            if !implicit {
                let slot = sim_ring.classify(c.distance);
                distance_info.push(Some(distance_symbol(slot)));
            } else {
                distance_info.push(None);
            }
            sim_ring.push(c.distance);
        } else {
            distance_info.push(None);
        }

        encoded_commands.push(encoded);
    }

    let literal_symbols: Vec<usize> = literals.iter().map(|&b| b as usize).collect();
    let command_symbols: Vec<usize> = encoded_commands.iter().map(|e| e.command_symbol as usize).collect();
    let distance_syms: Vec<usize> = distance_info.iter().filter_map(|d| d.map(|(s, _, _)| s)).collect();

    let literal_split: BlockSplit<LITERAL_ALPHABET> = split_symbols(&literal_symbols, MAX_BLOCK_TYPES);
    let command_split: BlockSplit<COMMAND_ALPHABET> = split_symbols(&command_symbols, MAX_BLOCK_TYPES);
    let distance_split: BlockSplit<DISTANCE_ALPHABET> = split_symbols(&distance_syms, MAX_BLOCK_TYPES);

    let (mut lit_writer, literal_codes) = BlockStreamWriter::write_header(writer, &literal_split)?;
    let (mut cmd_writer, command_codes) = BlockStreamWriter::write_header(writer, &command_split)?;
    let (mut dist_writer, distance_codes) = BlockStreamWriter::write_header(writer, &distance_split)?;

    let mut literal_pos = 0usize;
    for (i, command) in commands.iter().enumerate() {
        for _ in 0..command.insert_len {
            let ty = lit_writer.begin_symbol(writer)?;
            let byte = literals[literal_pos];
            literal_pos += 1;
            let (code, len) = literal_codes[ty][byte as usize];
            write_symbol(writer, code, len)?;
        }

        let encoded = &encoded_commands[i];
        let ty = cmd_writer.begin_symbol(writer)?;
        let (code, len) = command_codes[ty][encoded.command_symbol as usize];
        write_symbol(writer, code, len)?;
        if encoded.insert_extra_bits > 0 {
            writer.write_bits(encoded.insert_extra_value, encoded.insert_extra_bits as u8)?;
        }

        // The packed command symbol always carries a (placeholder, for
        // insert-only commands) copy code, but whether that copy actually
        // happens is carried by this explicit bit rather than inferred
        // from the code value, so a trailing insert-only command can't be
        // mistaken for a real minimum-length copy.
        writer.write_bit(command.has_copy())?;
        if command.has_copy() {
            if encoded.copy_extra_bits > 0 {
                writer.write_bits(encoded.copy_extra_value, encoded.copy_extra_bits as u8)?;
            }

            if !actually_implicit[i] {
                let (sym, numextra, extra) = distance_info[i].unwrap();
                let ty = dist_writer.begin_symbol(writer)?;
                let (code, len) = distance_codes[ty][sym];
                write_symbol(writer, code, len)?;
                if numextra > 0 {
                    writer.write_bits(extra, numextra as u8)?;
                }
            }
            ring.push(command.distance);
        }
    }

    Ok(())
}

/// Read one meta-block from `reader`, threading the last-4-distances
/// state in `ring` across calls exactly as [`write_meta_block`] does.
pub fn read_meta_block<R: Read>(
    reader: &mut BitReader<R>,
    ring: &mut DistanceRing,
) -> Result<DecodedMetaBlock> {
    let is_last = reader.read_bit()?;
    if is_last {
        let is_empty = reader.read_bit()?;
        if is_empty {
            return Ok(DecodedMetaBlock {
                commands: Vec::new(),
                literals: Vec::new(),
                is_last: true,
            });
        }
    }

    let is_stored = reader.read_bit()?;
    if is_stored {
        let len = read_meta_block_length(reader)? as usize;
        reader.align_to_byte()?;
        let mut data = vec![0u8; len];
        reader.read_bytes(&mut data)?;
        log::debug!("meta-block is stored, {len} raw bytes, is_last={is_last}");
        let commands = if len == 0 {
            Vec::new()
        } else {
            vec![Command::insert_only(len as u32)]
        };
        return Ok(DecodedMetaBlock {
            commands,
            literals: data,
            is_last,
        });
    }

    let total_len = read_meta_block_length(reader)? as u64;
    log::trace!("meta-block: {total_len} total symbols, is_last={is_last}");

    let (mut lit_reader, lit_trees) = BlockStreamReader::read_header(reader, LITERAL_ALPHABET)?;
    let (mut cmd_reader, cmd_trees) = BlockStreamReader::read_header(reader, COMMAND_ALPHABET)?;
    let (mut dist_reader, dist_trees) = BlockStreamReader::read_header(reader, DISTANCE_ALPHABET)?;

    let mut commands = Vec::new();
    let mut literals = Vec::new();
    let mut produced = 0u64;

    while produced < total_len {
        let cmd_ty = cmd_reader.begin_symbol(reader)?;
        let tree = cmd_trees
            .get(cmd_ty)
            .ok_or_else(|| BrotliError::corrupted(reader.bit_position(), "command block type out of range"))?;
        let symbol = tree.decode(reader)?;

        let (inscode, copycode, implicit) = tables::split_length_codes(symbol);

        let insert_extra_bits = tables::INSERT_LENGTH_EXTRA_BITS[inscode as usize];
        let insert_extra = reader.read_bits(insert_extra_bits as u8)?;
        let insert_length = tables::insert_length_from_code(inscode, insert_extra);

        let has_copy = reader.read_bit()?;
        let copy_length = if has_copy {
            let copy_extra_bits = tables::COPY_LENGTH_EXTRA_BITS[copycode as usize];
            let copy_extra = reader.read_bits(copy_extra_bits as u8)?;
            tables::copy_length_from_code(copycode, copy_extra)
        } else {
            0
        };

        for _ in 0..insert_length {
            let ty = lit_reader.begin_symbol(reader)?;
            let tree = lit_trees.get(ty).ok_or_else(|| {
                BrotliError::corrupted(reader.bit_position(), "literal block type out of range")
            })?;
            let byte = tree.decode(reader)? as u8;
            literals.push(byte);
        }
        produced += insert_length as u64;

        let mut distance = 0u32;
        if copy_length > 0 {
            if implicit {
                distance = ring.resolve_short_code(0);
            } else {
                let dist_ty = dist_reader.begin_symbol(reader)?;
                let tree = dist_trees.get(dist_ty).ok_or_else(|| {
                    BrotliError::corrupted(reader.bit_position(), "distance block type out of range")
                })?;
                let symbol = tree.decode(reader)? as usize;
                distance = if symbol < 16 {
                    ring.resolve_short_code(symbol as u8)
                } else {
                    let code = (symbol - 16) as u16;
                    let numextra = tables::distance_code_numextra(code);
                    let extra = reader.read_bits(numextra as u8)?;
                    tables::distance_from_code(code, numextra, extra)
                };
            }
            ring.push(distance);
            produced += copy_length as u64;
        }

        commands.push(Command {
            insert_len: insert_length,
            copy_len: copy_length,
            distance,
        });
    }

    Ok(DecodedMetaBlock {
        commands,
        literals,
        is_last,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrips_literal_only_meta_block() {
        let literals = b"hello world".to_vec();
        let commands = vec![Command::insert_only(literals.len() as u32)];

        let mut out = Vec::new();
        let mut write_ring = DistanceRing::new();
        {
            let mut writer = BitWriter::new(&mut out);
            write_meta_block(&mut writer, &commands, &literals, &mut write_ring, true).unwrap();
            writer.flush().unwrap();
        }

        let mut read_ring = DistanceRing::new();
        let mut reader = BitReader::new(Cursor::new(out));
        let decoded = read_meta_block(&mut reader, &mut read_ring).unwrap();
        assert_eq!(decoded.literals, literals);
        assert!(decoded.is_last);
    }

    #[test]
    fn roundtrips_with_a_back_reference() {
        let literals = b"abcdabcd".to_vec();
        let commands = vec![Command::insert_only(4), Command::new(0, 4, 4)];

        let mut out = Vec::new();
        let mut write_ring = DistanceRing::new();
        {
            let mut writer = BitWriter::new(&mut out);
            write_meta_block(&mut writer, &commands, &literals, &mut write_ring, true).unwrap();
            writer.flush().unwrap();
        }

        let mut read_ring = DistanceRing::new();
        let mut reader = BitReader::new(Cursor::new(out));
        let decoded = read_meta_block(&mut reader, &mut read_ring).unwrap();
        assert_eq!(decoded.literals, b"abcd".to_vec());
        assert_eq!(decoded.commands.len(), 2);
        assert_eq!(decoded.commands[1].copy_len, 4);
        assert_eq!(decoded.commands[1].distance, 4);
    }

    #[test]
    fn repeated_short_distance_uses_implicit_reuse() {
        // Every copy reuses the most-recently-used distance (4), with
        // small enough lengths to land in CombineLengthCodes's implicit
        // last-distance-reuse range, so no distance symbol should need to
        // be read back for any of the three back-references.
        let literals = b"abcd".to_vec();
        let commands = vec![
            Command::insert_only(4),
            Command::new(0, 4, 4),
            Command::new(0, 4, 4),
            Command::new(0, 4, 4),
        ];

        let mut out = Vec::new();
        let mut write_ring = DistanceRing::new();
        {
            let mut writer = BitWriter::new(&mut out);
            write_meta_block(&mut writer, &commands, &literals, &mut write_ring, true).unwrap();
            writer.flush().unwrap();
        }

        let mut read_ring = DistanceRing::new();
        let mut reader = BitReader::new(Cursor::new(out));
        let decoded = read_meta_block(&mut reader, &mut read_ring).unwrap();
        assert_eq!(decoded.commands.len(), 4);
        for command in &decoded.commands[1..] {
            assert_eq!(command.distance, 4);
            assert_eq!(command.copy_len, 4);
        }
    }

    #[test]
    fn empty_last_meta_block_roundtrips() {
        let mut out = Vec::new();
        let mut write_ring = DistanceRing::new();
        {
            let mut writer = BitWriter::new(&mut out);
            write_meta_block(&mut writer, &[], &[], &mut write_ring, true).unwrap();
            writer.flush().unwrap();
        }

        let mut read_ring = DistanceRing::new();
        let mut reader = BitReader::new(Cursor::new(out));
        let decoded = read_meta_block(&mut reader, &mut read_ring).unwrap();
        assert!(decoded.is_last);
        assert!(decoded.commands.is_empty());
        assert!(decoded.literals.is_empty());
    }

    #[test]
    fn many_block_types_exercise_inline_switching() {
        // Enough distinct literal regions that the splitter is forced to
        // use several block types and therefore several inline switches,
        // not just the degenerate single-type path.
        let mut literals = Vec::new();
        for i in 0..8u8 {
            literals.extend(vec![b'a' + i; 600]);
        }
        let commands = vec![Command::insert_only(literals.len() as u32)];

        let mut out = Vec::new();
        let mut write_ring = DistanceRing::new();
        {
            let mut writer = BitWriter::new(&mut out);
            write_meta_block(&mut writer, &commands, &literals, &mut write_ring, true).unwrap();
            writer.flush().unwrap();
        }

        let mut read_ring = DistanceRing::new();
        let mut reader = BitReader::new(Cursor::new(out));
        let decoded = read_meta_block(&mut reader, &mut read_ring).unwrap();
        assert_eq!(decoded.literals, literals);
    }

    #[test]
    fn meta_block_length_nibble_roundtrip() {
        for &mlen in &[1u32, 5, 65535, 65536, 1_048_575, 1_048_576, 20_000_000] {
            let mut out = Vec::new();
            {
                let mut writer = BitWriter::new(&mut out);
                write_meta_block_length(&mut writer, mlen).unwrap();
                writer.flush().unwrap();
            }
            let mut reader = BitReader::new(Cursor::new(out));
            assert_eq!(read_meta_block_length(&mut reader).unwrap(), mlen);
        }
    }
}
