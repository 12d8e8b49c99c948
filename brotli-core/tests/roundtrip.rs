//! End-to-end round-trip scenarios, exercised as black-box calls against the
//! public `encoder`/`decoder`/`similarity` API rather than any internal
//! module. Mirrors the concrete scenarios used to validate the reference
//! encoder/decoder pair, adapted to this crate's self-consistent bitstream
//! (not byte-exact with the reference format, only internally round-trip
//! exact — see `DESIGN.md`).

use brotli_core::backward_ref::{create_backward_references, MatchParams};
use brotli_core::decoder::decompress;
use brotli_core::encoder::{compress, EncoderParams, Quality};
use brotli_core::ringbuffer::sizes;
use brotli_core::similarity::compress_with_removed_range;

fn roundtrip(data: &[u8], params: &EncoderParams) -> Vec<u8> {
    let compressed = compress(data, params).expect("compress");
    decompress(&compressed).expect("decompress")
}

#[test]
fn empty_input_roundtrips() {
    let params = EncoderParams::new();
    assert_eq!(roundtrip(b"", &params), b"");
}

#[test]
fn single_byte_roundtrips_at_fast_quality() {
    let params = EncoderParams::new().with_quality(Quality::Fast);
    assert_eq!(roundtrip(&[0u8], &params), vec![0u8]);
}

#[test]
fn repeated_pattern_roundtrips_bit_exactly_at_best_quality() {
    let mut data = b"abc".repeat(341);
    data.push(b'a');
    let params = EncoderParams::new().with_quality(Quality::Best);
    assert_eq!(roundtrip(&data, &params), data);
}

#[test]
fn uncompressible_random_bytes_roundtrip() {
    // A fixed xorshift sequence stands in for "random" input without
    // depending on an RNG crate or a disallowed time/Random source.
    let mut state: u32 = 0x9e3779b9;
    let mut data = Vec::with_capacity(4096);
    for _ in 0..4096 {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        data.push((state & 0xff) as u8);
    }
    let params = EncoderParams::new().with_quality(Quality::Best);
    assert_eq!(roundtrip(&data, &params), data);
}

const PARAGRAPH: &str = "\
Brotli is a general-purpose data compressor that combines a modern variant \
of the LZ77 algorithm with Huffman coding and a static, context-sensitive \
dictionary of common words and phrases. It was designed to squeeze a few \
extra percent out of web content such as HTML, CSS, and JavaScript compared \
to earlier general-purpose compressors, while still decoding fast enough for \
the browser. The format organizes a stream into a sequence of meta-blocks, \
each free to choose its own set of prefix codes and to split its literal, \
command, and distance symbols into independently modeled blocks when doing \
so pays for the extra header bytes.\n";

#[test]
fn ten_concatenated_paragraphs_compress_well_and_roundtrip() {
    let mut data = String::new();
    for _ in 0..10 {
        data.push_str(PARAGRAPH);
    }
    let data = data.into_bytes();
    let params = EncoderParams::new().with_quality(Quality::Default);
    let compressed = compress(&data, &params).unwrap();
    assert!(
        (compressed.len() as f64) < 0.35 * (data.len() as f64),
        "compressed {} bytes from {} bytes, expected < 35%",
        compressed.len(),
        data.len()
    );
    assert_eq!(decompress(&compressed).unwrap(), data);
}

#[test]
fn deleting_a_byte_range_reuses_recovered_references_and_still_roundtrips() {
    let mut data = String::new();
    for _ in 0..10 {
        data.push_str(PARAGRAPH);
    }
    let original = data.into_bytes();
    let (start, end) = (100usize, 500usize.min(original.len()));
    let expected: Vec<u8> = original[..start].iter().chain(&original[end..]).copied().collect();

    let window_cap = sizes::max_backward_distance(sizes::DEFAULT_WINDOW_BITS);
    let commands = create_backward_references(&original, &MatchParams::new(window_cap));
    let params = EncoderParams::new();

    let compressed = compress_with_removed_range(&original, &commands, start, end, &params).unwrap();
    let decompressed = decompress(&compressed).unwrap();
    assert_eq!(decompressed, expected);
}

#[test]
fn streaming_by_chunk_boundary_matches_whole_buffer_compression() {
    let mut data = Vec::new();
    for i in 0..2000u32 {
        data.extend_from_slice(format!("item-{i},").as_bytes());
    }

    let mut params = EncoderParams::new();
    params.meta_block_size = 777; // force many small meta-blocks
    let chunked = roundtrip(&data, &params);

    params.meta_block_size = 1 << 20; // force a single meta-block
    let whole = roundtrip(&data, &params);

    assert_eq!(chunked, data);
    assert_eq!(whole, data);
}

#[test]
fn every_quality_and_window_combination_roundtrips() {
    let data = b"the quick brown fox jumps over the lazy dog, again and again";
    for quality in [Quality::Fast, Quality::Default, Quality::Best] {
        for lgwin in [10u32, 16, 22, 24] {
            let params = EncoderParams::new().with_quality(quality).with_lgwin(lgwin);
            assert_eq!(roundtrip(data, &params), data, "quality={quality:?} lgwin={lgwin}");
        }
    }
}
