//! Streaming encoder.
//!
//! Drives backward-reference generation and meta-block assembly over an
//! input stream, chunking it into meta-blocks of bounded size and
//! emitting a final empty meta-block to mark the end of the stream. This
//! mirrors the reference encoder's `BrotliEncoderCompressStream` state
//! machine, simplified to a buffer-then-flush model appropriate for a
//! library that is handed whole byte slices rather than driven a few
//! bytes at a time by a caller-owned event loop.

use crate::backward_ref::{create_backward_references, create_backward_references_with_dictionary, MatchParams};
use crate::bitstream::{write_window_bits, BitWriter};
use crate::command::{Command, DistanceRing};
use crate::dictionary::StaticDictionary;
use crate::error::Result;
use crate::histogram::Histogram;
use crate::metablock::{write_meta_block, write_stored_meta_block};
use crate::ringbuffer::sizes;
use crate::tables::LITERAL_ALPHABET_SIZE;
use crate::zopfli::create_backward_references_zopfli;
use std::io::Write;

/// Smallest permitted `quality` value (fastest, lowest ratio).
pub const MIN_QUALITY: u8 = 0;
/// Largest permitted `quality` value (the zopfli-style shortest-path tier).
pub const MAX_QUALITY: u8 = 11;
/// Default `quality`, the reference encoder's own default.
pub const DEFAULT_QUALITY: u8 = 11;

/// Content hint, mirroring `BROTLI_MODE_*`. The matcher and block splitter
/// do not vary by mode in this crate; `mode` is carried so a caller's
/// intent survives round-tripping `EncoderParams` and so the static
/// dictionary probe (text-heavy content benefits most from dictionary
/// hits) can be gated on it in the future.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// No assumption about the input's structure.
    #[default]
    Generic,
    /// UTF-8 text; favors the static dictionary.
    Text,
    /// WOFF2 font data.
    Font,
}

/// Parameters controlling one encoding run, mirroring the reference
/// encoder's `BrotliEncoderParams`.
#[derive(Debug, Clone, Copy)]
pub struct EncoderParams {
    /// Sliding window size, `10..=24`.
    pub lgwin: u32,
    /// Compression effort, `0..=11`. `0..=1` take a minimal one-pass
    /// matcher; `2..=9` use the lazy-matching pipeline with the lazy
    /// margin scaled by quality; `10..=11` use the shortest-path search in
    /// [`crate::zopfli`].
    pub quality: u8,
    /// Content hint; see [`Mode`].
    pub mode: Mode,
    /// Target block size (in symbols) for the block splitter's seed
    /// stride, `0` meaning "let the block splitter pick". Mirrors
    /// `BrotliEncoderParams::lgblock`; this crate's block splitter does
    /// not yet vary its seeding stride by this field (see `DESIGN.md`),
    /// but the knob round-trips so callers that set it aren't silently
    /// ignored by a parameter that quietly does nothing structurally
    /// different.
    pub lgblock: u32,
    /// Maximum number of input bytes per meta-block before a boundary is
    /// forced, bounding per-meta-block memory and clustering cost.
    pub meta_block_size: usize,
}

impl EncoderParams {
    /// Default parameters: `DEFAULT_WINDOW_BITS`, `DEFAULT_QUALITY`,
    /// `Mode::Generic`.
    pub fn new() -> Self {
        Self {
            lgwin: sizes::DEFAULT_WINDOW_BITS,
            quality: DEFAULT_QUALITY,
            mode: Mode::Generic,
            lgblock: 0,
            meta_block_size: 1 << 16,
        }
    }

    /// Set the window size.
    ///
    /// # Panics
    ///
    /// Panics if `lgwin` is outside `sizes::MIN_WINDOW_BITS..=sizes::MAX_WINDOW_BITS`.
    pub fn with_lgwin(mut self, lgwin: u32) -> Self {
        assert!(
            (sizes::MIN_WINDOW_BITS..=sizes::MAX_WINDOW_BITS).contains(&lgwin),
            "lgwin {lgwin} out of range {}..={}",
            sizes::MIN_WINDOW_BITS,
            sizes::MAX_WINDOW_BITS
        );
        self.lgwin = lgwin;
        self
    }

    /// Set the compression quality.
    ///
    /// # Panics
    ///
    /// Panics if `quality` is outside `MIN_QUALITY..=MAX_QUALITY`.
    pub fn with_quality(mut self, quality: u8) -> Self {
        assert!(
            (MIN_QUALITY..=MAX_QUALITY).contains(&quality),
            "quality {quality} out of range {MIN_QUALITY}..={MAX_QUALITY}"
        );
        self.quality = quality;
        self
    }

    /// Set the content-type hint.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the target block size hint.
    pub fn with_lgblock(mut self, lgblock: u32) -> Self {
        self.lgblock = lgblock;
        self
    }
}

impl Default for EncoderParams {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot compression of `input` into a freshly allocated buffer.
pub fn compress(input: &[u8], params: &EncoderParams) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    compress_into(input, params, &mut out)?;
    Ok(out)
}

/// Compress `input`, writing the bitstream to `writer`.
pub fn compress_into<W: Write>(input: &[u8], params: &EncoderParams, writer: W) -> Result<()> {
    let mut bit_writer = BitWriter::new(writer);

    if input.is_empty() {
        // No window is ever actually addressed, so the fast-path window
        // value keeps the header (and the whole stream) to a single byte
        // regardless of what the caller asked for.
        write_window_bits(&mut bit_writer, sizes::WINDOW_BITS_FAST_PATH)?;
        let mut ring = DistanceRing::new();
        write_meta_block(&mut bit_writer, &[], &[], &mut ring, true)?;
        bit_writer.flush()?;
        return Ok(());
    }

    write_window_bits(&mut bit_writer, params.lgwin)?;

    let max_distance = sizes::max_backward_distance(params.lgwin);
    let match_params = MatchParams {
        max_distance,
        lazy_match_margin: lazy_match_margin(params.quality),
    };
    let dictionary = (params.quality >= 2).then(StaticDictionary::synthetic);

    let mut ring = DistanceRing::new();
    let chunks: Vec<&[u8]> = input.chunks(params.meta_block_size.max(1)).collect();
    let mut base_pos = 0usize;

    for (i, chunk) in chunks.iter().enumerate() {
        let is_last = i + 1 == chunks.len();
        let commands = generate_commands(chunk, params.quality, &match_params, dictionary.as_ref(), base_pos);

        if should_store(chunk, &commands) {
            log::debug!(
                "meta-block {i}/{}: falling back to stored ({} bytes, no exploitable matches)",
                chunks.len(),
                chunk.len()
            );
            write_stored_meta_block(&mut bit_writer, chunk, is_last)?;
            base_pos += chunk.len();
            continue;
        }

        let literals = extract_literals(chunk, &commands);
        log::trace!("meta-block {i}/{}: {} bytes, {} commands", chunks.len(), chunk.len(), commands.len());
        write_meta_block(&mut bit_writer, &commands, &literals, &mut ring, is_last)?;
        base_pos += chunk.len();
    }

    bit_writer.flush()?;
    Ok(())
}

/// Dispatch to the matcher tier `quality` selects: `0..=1` a bare
/// one-pass scan with no lazy lookahead, `2..=9` the lazy-matching
/// pipeline (optionally dictionary-aware), `10..=11` the shortest-path
/// search.
fn generate_commands(
    chunk: &[u8],
    quality: u8,
    match_params: &MatchParams,
    dictionary: Option<&StaticDictionary>,
    base_pos: usize,
) -> Vec<Command> {
    if quality <= 1 {
        create_backward_references(chunk, match_params)
    } else if quality <= 9 {
        match dictionary {
            Some(dict) => create_backward_references_with_dictionary(chunk, match_params, dict, base_pos),
            None => create_backward_references(chunk, match_params),
        }
    } else {
        create_backward_references_zopfli(chunk, match_params)
    }
}

fn lazy_match_margin(quality: u8) -> i64 {
    match quality {
        0..=1 => 0,
        q => (q as i64 - 1) * 2,
    }
}

/// Crude counterpart of the reference encoder's `ShouldCompress`: if the
/// matcher found essentially nothing to copy and the chunk's zeroth-order
/// entropy is already close to 8 bits/byte, modeling it would cost more
/// than the meta-block header overhead saves, so fall back to storing the
/// chunk raw.
fn should_store(chunk: &[u8], commands: &[Command]) -> bool {
    if chunk.len() < 16 {
        return false;
    }
    let found_a_match = commands.iter().any(Command::has_copy);
    if found_a_match {
        return false;
    }
    let mut histogram: Histogram<LITERAL_ALPHABET_SIZE> = Histogram::new();
    for &byte in chunk {
        histogram.add_count(byte as usize, 1);
    }
    let estimated_bits = histogram.bit_cost();
    estimated_bits > chunk.len() as f64 * 8.0
}

/// Pull out the literal bytes a command sequence's insert runs reference,
/// in order, from the chunk they were generated against.
fn extract_literals(chunk: &[u8], commands: &[crate::command::Command]) -> Vec<u8> {
    let mut literals = Vec::new();
    let mut pos = 0usize;
    for command in commands {
        let end = pos + command.insert_len as usize;
        literals.extend_from_slice(&chunk[pos..end]);
        pos = end + command.copy_len as usize;
    }
    literals
}
