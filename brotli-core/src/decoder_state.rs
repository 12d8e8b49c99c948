//! Resumable decoder: the same meta-block loop as [`crate::decoder`], but
//! able to suspend when fed input runs out mid-parse or when the caller's
//! output buffer fills up before a meta-block's bytes are fully delivered,
//! and to resume exactly where it left off on the next call.
//!
//! Mirrors the reference decoder's `BrotliDecoderDecompressStream` contract
//! (`Success` / `NeedsMoreInput` / `NeedsMoreOutput`) one rung coarser than
//! its bit-by-bit suspension points: [`StreamingDecoder`] buffers fed bytes
//! and attempts one meta-block parse at a time against a throwaway
//! [`BitReader`] positioned at the last committed bit offset. A parse that
//! fails because buffered input ran out ([`BrotliError::NeedsMoreInput`])
//! touches no persistent state — the distance ring and output window are
//! only updated once a meta-block parses in full — so retrying after more
//! bytes arrive simply re-reads the same meta-block from its start. No
//! sub-state inside a meta-block (a partially built Huffman table, a
//! half-read context map, an in-progress command) survives a suspension;
//! see `DESIGN.md` for why this granularity was chosen over a literal port
//! of the named sub-states.

use crate::bitstream::{read_window_bits, BitReader};
use crate::command::DistanceRing;
use crate::decoder::materialize;
use crate::dictionary::StaticDictionary;
use crate::error::Result;
use crate::metablock::read_meta_block;
use crate::ringbuffer::{sizes, OutputWindow};
use std::io::Cursor;

/// Outcome of one [`StreamingDecoder::decompress_stream`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    /// The stream's final meta-block has been committed and every
    /// decoded byte has been delivered through `output`.
    Success,
    /// Buffered input was exhausted before a meta-block (or the window
    /// header) could be fully parsed; call again after feeding more bytes.
    NeedsMoreInput,
    /// Decoded bytes are waiting but `output` filled up before all of them
    /// could be copied out; call again with room for more output.
    NeedsMoreOutput,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    /// Nothing committed yet; still waiting to parse the window header.
    WindowHeader,
    /// Parsing meta-blocks; `bit_pos` is the bit offset of the next
    /// as-yet-unparsed meta-block, always a point where no sub-state is
    /// outstanding.
    MetaBlocks { bit_pos: u64 },
    /// The final meta-block has been committed.
    Done,
}

/// A resumable Brotli decoder. Feed it compressed bytes and drain decoded
/// bytes as they become available, across any number of calls, instead of
/// handing [`crate::decoder::decompress`] the whole stream up front.
pub struct StreamingDecoder {
    phase: Phase,
    input: Vec<u8>,
    window: Option<OutputWindow>,
    ring: DistanceRing,
    dictionary: StaticDictionary,
    max_backward: usize,
    delivered: usize,
}

impl StreamingDecoder {
    /// Create a decoder with no input fed to it yet.
    pub fn new() -> Self {
        Self {
            phase: Phase::WindowHeader,
            input: Vec::new(),
            window: None,
            ring: DistanceRing::new(),
            dictionary: StaticDictionary::synthetic(),
            max_backward: 0,
            delivered: 0,
        }
    }

    /// True once the final meta-block has been committed and every
    /// decoded byte has been handed back through `decompress_stream`.
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Done) && self.delivered == self.committed_len()
    }

    fn committed_len(&self) -> usize {
        self.window.as_ref().map_or(0, OutputWindow::output_len)
    }

    /// Feed `input` (may be empty, to just drain more output) and copy as
    /// many decoded bytes as fit into `output`. Returns the number of bytes
    /// written to `output` and the resulting status.
    pub fn decompress_stream(&mut self, input: &[u8], output: &mut [u8]) -> Result<(usize, DecodeStatus)> {
        self.input.extend_from_slice(input);
        let mut filled = 0;

        loop {
            filled += self.drain_into(&mut output[filled..]);
            if filled == output.len() && self.delivered < self.committed_len() {
                return Ok((filled, DecodeStatus::NeedsMoreOutput));
            }
            if matches!(self.phase, Phase::Done) {
                return Ok((filled, DecodeStatus::Success));
            }

            match self.advance() {
                Ok(()) => continue,
                Err(err) if err.is_needs_more_input() => return Ok((filled, DecodeStatus::NeedsMoreInput)),
                Err(err) => return Err(err),
            }
        }
    }

    /// Copy already-committed, undelivered output bytes into `output`.
    /// Returns how many bytes were copied.
    fn drain_into(&mut self, output: &mut [u8]) -> usize {
        let Some(window) = &self.window else { return 0 };
        let available = &window.output()[self.delivered..];
        let n = available.len().min(output.len());
        output[..n].copy_from_slice(&available[..n]);
        self.delivered += n;
        n
    }

    /// Build a throwaway [`BitReader`] positioned at bit offset `bit_pos`
    /// within `self.input`, re-consuming the sub-byte bits already behind
    /// that offset (cheap: at most 7 bits) rather than requiring byte
    /// alignment between meta-blocks.
    fn bitreader_at(&self, bit_pos: u64) -> Result<BitReader<Cursor<&[u8]>>> {
        let byte_pos = (bit_pos / 8) as usize;
        let skip = (bit_pos % 8) as u8;
        let mut reader = BitReader::new(Cursor::new(&self.input[byte_pos.min(self.input.len())..]));
        if skip > 0 {
            reader.read_bits(skip)?;
        }
        Ok(reader)
    }

    /// Attempt to make one unit of progress (the window header, or one
    /// meta-block). On success, commits the new state. On a
    /// `NeedsMoreInput` or hard format error, no state is mutated; the
    /// error propagates to the caller.
    fn advance(&mut self) -> Result<()> {
        match self.phase {
            Phase::WindowHeader => {
                let mut reader = self.bitreader_at(0)?;
                let lgwin = read_window_bits(&mut reader)?;
                let bit_pos = reader.bits_read();
                self.window = Some(OutputWindow::new(lgwin));
                self.max_backward = sizes::max_backward_distance(lgwin);
                self.phase = Phase::MetaBlocks { bit_pos };
            }
            Phase::MetaBlocks { bit_pos } => {
                let mut reader = self.bitreader_at(bit_pos)?;
                let mut ring = self.ring;
                let meta_block = read_meta_block(&mut reader, &mut ring)?;
                let new_bit_pos = (bit_pos / 8) * 8 + reader.bits_read();

                let window = self.window.as_mut().expect("window header already parsed");
                materialize(window, &meta_block, self.max_backward, &self.dictionary)?;
                self.ring = ring;
                self.phase = if meta_block.is_last {
                    Phase::Done
                } else {
                    Phase::MetaBlocks { bit_pos: new_bit_pos }
                };
            }
            Phase::Done => {}
        }
        Ok(())
    }
}

impl Default for StreamingDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{compress, EncoderParams};

    #[test]
    fn decodes_when_fed_the_whole_stream_at_once() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let compressed = compress(data, &EncoderParams::new()).unwrap();

        let mut decoder = StreamingDecoder::new();
        let mut out = vec![0u8; data.len()];
        let (n, status) = decoder.decompress_stream(&compressed, &mut out).unwrap();
        assert_eq!(status, DecodeStatus::Success);
        assert_eq!(&out[..n], data);
        assert!(decoder.is_finished());
    }

    #[test]
    fn resumes_across_byte_by_byte_input() {
        let mut data = Vec::new();
        for i in 0..500u32 {
            data.extend_from_slice(format!("line {i}\n").as_bytes());
        }
        let params = EncoderParams::new();
        let compressed = compress(&data, &params).unwrap();

        let mut decoder = StreamingDecoder::new();
        let mut result = Vec::new();
        let mut scratch = vec![0u8; 64];
        for byte in &compressed {
            loop {
                let (n, status) = decoder.decompress_stream(&[*byte], &mut scratch).unwrap();
                result.extend_from_slice(&scratch[..n]);
                match status {
                    DecodeStatus::NeedsMoreOutput => continue,
                    _ => break,
                }
            }
        }
        // Keep draining after the last byte in case output was still
        // trickling out through a full scratch buffer.
        loop {
            let (n, status) = decoder.decompress_stream(&[], &mut scratch).unwrap();
            result.extend_from_slice(&scratch[..n]);
            if status != DecodeStatus::NeedsMoreOutput {
                break;
            }
        }

        assert_eq!(result, data);
        assert!(decoder.is_finished());
    }

    #[test]
    fn reports_needs_more_output_when_the_caller_buffer_is_small() {
        let data = vec![b'a'; 10_000];
        let compressed = compress(&data, &EncoderParams::new()).unwrap();

        let mut decoder = StreamingDecoder::new();
        let mut out = vec![0u8; 16];
        let (n, status) = decoder.decompress_stream(&compressed, &mut out).unwrap();
        assert_eq!(status, DecodeStatus::NeedsMoreOutput);
        assert_eq!(n, 16);

        let mut result = out[..n].to_vec();
        loop {
            let (n, status) = decoder.decompress_stream(&[], &mut out).unwrap();
            result.extend_from_slice(&out[..n]);
            if status != DecodeStatus::NeedsMoreOutput {
                assert_eq!(status, DecodeStatus::Success);
                break;
            }
        }
        assert_eq!(result, data);
    }

    #[test]
    fn empty_input_stream_finishes_immediately() {
        let compressed = compress(b"", &EncoderParams::new()).unwrap();
        let mut decoder = StreamingDecoder::new();
        let mut out = Vec::new();
        let (n, status) = decoder.decompress_stream(&compressed, &mut out).unwrap();
        assert_eq!(n, 0);
        assert_eq!(status, DecodeStatus::Success);
        assert!(decoder.is_finished());
    }
}
