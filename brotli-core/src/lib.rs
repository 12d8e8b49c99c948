//! # brotli-core
//!
//! A from-scratch Brotli-family compressor and decompressor.
//!
//! This crate provides the building blocks of a general-purpose
//! compressor built on the same ideas as Brotli: a static dictionary of
//! common words and phrases, canonical prefix (Huffman) codes for every
//! alphabet in the stream, a sliding-window LZ77-style back-reference
//! matcher, and a block-splitting/histogram-clustering pass that lets
//! different regions of a stream share different entropy codes.
//!
//! - [`bitstream`]: Bit-level I/O for the LSB-first prefix-code bitstream
//! - [`prefix`]: Canonical Huffman codes, simple and complex encodings
//! - [`histogram`]: Symbol histograms, population cost, code-length repair
//! - [`dictionary`]: Static word dictionary and word transforms
//! - [`tables`]: Insert/copy/distance length-code tables
//! - [`command`]: Insert-and-copy commands and the last-distances ring
//! - [`hasher`]: Hash-chain match finder
//! - [`literal_cost`]: Per-byte literal cost estimation
//! - [`backward_ref`]: Backward-reference (LZ77) generation
//! - [`block_splitter`]: Stream segmentation and histogram clustering
//! - [`metablock`]: Meta-block assembly and parsing
//! - [`ringbuffer`]: Sliding window buffer for back-reference copies
//! - [`encoder`]: Streaming encoder
//! - [`decoder`]: Streaming decoder (whole-buffer convenience API)
//! - [`decoder_state`]: Resumable decoder, suspending on `NeedsMoreInput`/`NeedsMoreOutput`
//! - [`similarity`]: Byte-range deletion rewriting of recovered references
//! - [`zopfli`]: Shortest-path match selection for the top quality tier
//! - [`error`]: Error types
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L3: Streaming encoder / decoder                          │
//! │     encoder, decoder, decoder_state, similarity          │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Meta-block assembly                                  │
//! │     metablock, block_splitter, histogram                │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Symbol model                                         │
//! │     command, hasher, backward_ref, dictionary, tables    │
//! ├─────────────────────────────────────────────────────────┤
//! │ L0: Bitstream primitives                                 │
//! │     bitstream, prefix, ringbuffer                        │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use brotli_core::encoder::{compress, EncoderParams};
//! use brotli_core::decoder::decompress;
//!
//! let data = b"the quick brown fox jumps over the lazy dog";
//! let compressed = compress(data, &EncoderParams::new()).unwrap();
//! let decompressed = decompress(&compressed).unwrap();
//! assert_eq!(decompressed, data);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod backward_ref;
pub mod bitstream;
pub mod block_splitter;
pub mod command;
pub mod decoder;
pub mod decoder_state;
pub mod dictionary;
pub mod encoder;
pub mod error;
pub mod hasher;
pub mod histogram;
pub mod literal_cost;
pub mod metablock;
pub mod prefix;
pub mod ringbuffer;
pub mod similarity;
pub mod tables;
pub mod zopfli;

// Re-exports for convenience
pub use bitstream::{BitReader, BitWriter};
pub use decoder::decompress;
pub use decoder_state::{DecodeStatus, StreamingDecoder};
pub use encoder::{compress, EncoderParams, Mode};
pub use error::{BrotliError, Result};
pub use ringbuffer::{OutputWindow, RingBuffer};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bitstream::{BitReader, BitWriter};
    pub use crate::decoder::decompress;
    pub use crate::decoder_state::{DecodeStatus, StreamingDecoder};
    pub use crate::encoder::{compress, EncoderParams, Mode};
    pub use crate::error::{BrotliError, Result};
    pub use crate::ringbuffer::{OutputWindow, RingBuffer};
}
