//! Streaming decoder.
//!
//! Reads the window-size header, then repeatedly reads meta-blocks and
//! materializes their commands against a sliding-window [`OutputWindow`]
//! until a meta-block marked `is_last` is consumed. Mirrors the reference
//! decoder's `BrotliDecoderDecompressStream` state machine, collapsed
//! (like [`crate::encoder`]) to a whole-buffer-in, whole-buffer-out shape.
//! For callers that can't hand over the whole compressed stream up front,
//! [`crate::decoder_state::StreamingDecoder`] wraps the same meta-block
//! loop in a resumable, suspend-and-resume API.

use crate::bitstream::{read_window_bits, BitReader};
use crate::command::DistanceRing;
use crate::dictionary::StaticDictionary;
use crate::error::{BrotliError, Result};
use crate::metablock::read_meta_block;
use crate::ringbuffer::{sizes, OutputWindow};
use std::io::Read;

/// Decompress an entire Brotli-ish stream produced by
/// [`crate::encoder::compress`] into a freshly allocated buffer.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>> {
    let mut reader = BitReader::new(input);
    let lgwin = read_window_bits(&mut reader)?;

    let mut window = OutputWindow::new(lgwin);
    let mut ring = DistanceRing::new();
    let dictionary = StaticDictionary::synthetic();
    let max_backward = sizes::max_backward_distance(lgwin);

    loop {
        let meta_block = read_meta_block(&mut reader, &mut ring)?;
        materialize(&mut window, &meta_block, max_backward, &dictionary)?;
        if meta_block.is_last {
            break;
        }
    }

    Ok(window.into_output())
}

/// Decompress from any [`Read`] source, for callers that don't already
/// have the whole stream in memory.
pub fn decompress_reader<R: Read>(mut source: R) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    source.read_to_end(&mut buf)?;
    decompress(&buf)
}

/// Apply one decoded meta-block's commands against `window`. A copy whose
/// distance exceeds what the window can currently address is a
/// static-dictionary reference rather than a window copy, per
/// `ResolveDistance`/`CopyUncompressedBlockToOutput` in the reference
/// decoder: the distance beyond `max_distance_here` encodes
/// `(transform_idx, word_idx)` instead of bytes already in the window.
pub(crate) fn materialize(
    window: &mut OutputWindow,
    meta_block: &crate::metablock::DecodedMetaBlock,
    max_backward: usize,
    dictionary: &StaticDictionary,
) -> Result<()> {
    let mut literal_pos = 0usize;
    for command in &meta_block.commands {
        let end = literal_pos + command.insert_len as usize;
        if end > meta_block.literals.len() {
            return Err(BrotliError::corrupted(0, "command insert length exceeds literal stream"));
        }
        window.push_literals(&meta_block.literals[literal_pos..end]);
        literal_pos = end;

        if command.copy_len == 0 {
            continue;
        }

        let max_distance_here = window.window().len().min(max_backward);
        if (command.distance as usize) > max_distance_here {
            let size_bits = dictionary.size_bits(command.copy_len as usize);
            let (transform_idx, word_idx) =
                crate::dictionary::split_reference_distance(command.distance, max_distance_here, size_bits);
            let word = dictionary.lookup_transformed(command.copy_len as usize, word_idx, transform_idx)?;
            window.push_literals(&word);
        } else {
            window.copy_match(command.distance as usize, command.copy_len as usize)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{compress, EncoderParams};

    #[test]
    fn roundtrips_empty_input() {
        let compressed = compress(b"", &EncoderParams::new()).unwrap();
        let decompressed = decompress(&compressed).unwrap();
        assert_eq!(decompressed, b"");
    }

    #[test]
    fn roundtrips_plain_text() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let compressed = compress(data, &EncoderParams::new()).unwrap();
        let decompressed = decompress(&compressed).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn roundtrips_highly_repetitive_input() {
        let data = vec![b'a'; 10_000];
        let compressed = compress(&data, &EncoderParams::new()).unwrap();
        let decompressed = decompress(&compressed).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn roundtrips_across_multiple_meta_blocks() {
        let mut params = EncoderParams::new();
        params.meta_block_size = 1024;
        let mut data = Vec::new();
        for i in 0..5000u32 {
            data.extend_from_slice(format!("line {i}\n").as_bytes());
        }
        let compressed = compress(&data, &params).unwrap();
        let decompressed = decompress(&compressed).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn rejects_corrupt_window_bits() {
        let mut bytes = vec![0u8; 8];
        // bit 0 set selects the explicit 5-bit path; all five value bits
        // set too gives lgwin = 31, out of range.
        bytes[0] = 0b0011_1111;
        assert!(decompress(&bytes).is_err());
    }

    #[test]
    fn reads_a_hand_written_stored_meta_block() {
        use crate::bitstream::{write_window_bits, BitWriter};
        use crate::metablock::write_stored_meta_block;

        let payload = b"raw bytes stored verbatim";
        let mut out = Vec::new();
        {
            let mut writer = BitWriter::new(&mut out);
            write_window_bits(&mut writer, crate::ringbuffer::sizes::DEFAULT_WINDOW_BITS).unwrap();
            write_stored_meta_block(&mut writer, payload, true).unwrap();
            writer.flush().unwrap();
        }
        assert_eq!(decompress(&out).unwrap(), payload);
    }

    #[test]
    fn resolves_a_static_dictionary_reference() {
        use crate::command::Command;

        let word = b"that";
        let mut window = OutputWindow::new(sizes::MIN_WINDOW_BITS);
        let dictionary = StaticDictionary::synthetic();
        let max_backward = sizes::max_backward_distance(sizes::MIN_WINDOW_BITS);

        let meta_block = crate::metablock::DecodedMetaBlock {
            commands: vec![Command::new(0, word.len() as u32, (max_backward + 1) as u32)],
            literals: Vec::new(),
            is_last: true,
        };
        materialize(&mut window, &meta_block, max_backward, &dictionary).unwrap();
        assert_eq!(window.output(), word);
    }
}
