//! Sliding window (ring buffer) used by the decoder's back-reference copies
//! and by the encoder's hash-chain match search.
//!
//! # Window sizes
//!
//! Brotli negotiates a window size as `lgwin` bits, `10..=24`, giving a
//! window of `(1 << lgwin) - 16` bytes (RFC 7932 the final 16 bytes of the
//! nominal window are reserved). We store the full power-of-two capacity and
//! let callers apply the `-16` adjustment when validating a distance against
//! the negotiated window, matching the reference decoder's `WindowSize`.

use crate::error::{BrotliError, Result};

/// Window-size bounds and helpers from RFC 7932 §9.1.
pub mod sizes {
    /// Smallest permitted `lgwin`.
    pub const MIN_WINDOW_BITS: u32 = 10;
    /// Largest permitted `lgwin` in the standard (non large-window) format.
    pub const MAX_WINDOW_BITS: u32 = 24;
    /// Default `lgwin` used by the CLI and by `EncoderParams::default`.
    pub const DEFAULT_WINDOW_BITS: u32 = 22;
    /// `lgwin` value the window-bits header can express in a single bit,
    /// mirroring the reference format's 1-bit fast path for the common
    /// default window.
    pub const WINDOW_BITS_FAST_PATH: u32 = 16;
    /// Bytes reserved at the top of the nominal window by the format.
    pub const WINDOW_GAP: usize = 16;

    /// The maximum distance a backward reference may express for a given
    /// `lgwin`, per RFC 7932 §4: `(1 << lgwin) - WINDOW_GAP`.
    pub fn max_backward_distance(lgwin: u32) -> usize {
        (1usize << lgwin) - WINDOW_GAP
    }
}

/// Bytes mirrored past the logical end of the buffer so that a copy
/// spanning the wrap boundary can be served as one contiguous slice instead
/// of a byte-at-a-time loop. Sized to the longest copy length the format
/// commonly emits in one command; longer copies fall back to the
/// wrap-aware loop in [`RingBuffer::copy_from_history`].
const MIRROR_MARGIN: usize = 64;

/// The sliding window of decompressed history.
///
/// Capacity is always a power of two (`1 << lgwin`). Internally the buffer
/// carries `MIRROR_MARGIN` extra mirrored bytes past `capacity` so the
/// common case — a copy that does not wrap — never needs a modulo per
/// byte.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    data: Vec<u8>,
    capacity: usize,
    mask: usize,
    /// Logical write cursor, taken mod `capacity` for indexing.
    position: usize,
    /// Total bytes ever written, saturating is never needed since streams
    /// are bounded well under `u64::MAX`.
    total_written: u64,
}

impl RingBuffer {
    /// Create a ring buffer sized for the given `lgwin`.
    ///
    /// # Panics
    ///
    /// Panics if `lgwin` is outside `sizes::MIN_WINDOW_BITS..=sizes::MAX_WINDOW_BITS`.
    pub fn new(lgwin: u32) -> Self {
        assert!(
            (sizes::MIN_WINDOW_BITS..=sizes::MAX_WINDOW_BITS).contains(&lgwin),
            "lgwin {} out of range {}..={}",
            lgwin,
            sizes::MIN_WINDOW_BITS,
            sizes::MAX_WINDOW_BITS
        );
        let capacity = 1usize << lgwin;
        log::debug!("allocating ring buffer: lgwin={lgwin} capacity={capacity}");
        Self {
            data: vec![0; capacity + MIRROR_MARGIN],
            capacity,
            mask: capacity - 1,
            position: 0,
            total_written: 0,
        }
    }

    /// Capacity of the window in bytes (`1 << lgwin`).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of bytes currently available for back-reference (saturates at
    /// `capacity`).
    pub fn len(&self) -> usize {
        self.total_written.min(self.capacity as u64) as usize
    }

    /// Whether no bytes have been written yet.
    pub fn is_empty(&self) -> bool {
        self.total_written == 0
    }

    /// Current write cursor within the logical window.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Reset to an empty window, zeroing the backing storage.
    pub fn clear(&mut self) {
        self.position = 0;
        self.total_written = 0;
        self.data.fill(0);
    }

    fn push_raw(&mut self, byte: u8) {
        self.data[self.position] = byte;
        if self.position < MIRROR_MARGIN {
            self.data[self.capacity + self.position] = byte;
        }
        self.position = (self.position + 1) & self.mask;
        self.total_written += 1;
    }

    /// Write a single decoded literal byte into the window.
    pub fn write_byte(&mut self, byte: u8) {
        self.push_raw(byte);
    }

    /// Write a run of literal bytes into the window.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.push_raw(b);
        }
    }

    /// Read the byte `distance` positions behind the write cursor.
    /// `distance == 1` is the most recently written byte.
    pub fn read_at_distance(&self, distance: usize) -> Result<u8> {
        if distance == 0 || distance > self.len() {
            return Err(BrotliError::corrupted(
                0,
                format!("distance {} exceeds available history {}", distance, self.len()),
            ));
        }
        let index = self.position.wrapping_sub(distance) & self.mask;
        Ok(self.data[index])
    }

    /// Execute a backward-reference copy: append `length` bytes taken from
    /// `distance` bytes behind the cursor, advancing the cursor as it goes
    /// (so `length > distance` produces the familiar repeating pattern).
    /// The copied bytes are also appended to `output` if given.
    pub fn copy_from_history(
        &mut self,
        distance: usize,
        length: usize,
        mut output: Option<&mut Vec<u8>>,
    ) -> Result<()> {
        if distance == 0 || distance > self.len() {
            return Err(BrotliError::corrupted(
                0,
                format!("distance {} exceeds available history {}", distance, self.len()),
            ));
        }

        if let Some(out) = output.as_deref_mut() {
            out.reserve(length);
        }

        // Fast path: no wrap in source or destination and the run is short
        // enough that the mirrored margin covers it.
        let src_start = self.position.wrapping_sub(distance) & self.mask;
        if distance >= length && length <= MIRROR_MARGIN && src_start + length <= self.data.len() {
            for i in 0..length {
                let byte = self.data[src_start + i];
                self.push_raw(byte);
                if let Some(out) = output.as_deref_mut() {
                    out.push(byte);
                }
            }
            return Ok(());
        }

        let mut src_pos = src_start;
        for _ in 0..length {
            let byte = self.data[src_pos];
            self.push_raw(byte);
            if let Some(out) = output.as_deref_mut() {
                out.push(byte);
            }
            src_pos = (src_pos + 1) & self.mask;
        }

        Ok(())
    }

}

/// A [`RingBuffer`] paired with the fully accumulated decompressed output.
///
/// The ring buffer alone only remembers the last `capacity` bytes, which is
/// enough to satisfy back-references but not to reconstruct the whole
/// stream once it exceeds the window. `OutputWindow` keeps both: the
/// bounded window for distance validation and copying, and an unbounded
/// `Vec<u8>` for the final result.
#[derive(Debug)]
pub struct OutputWindow {
    window: RingBuffer,
    output: Vec<u8>,
}

impl OutputWindow {
    /// Create a new output window for the given `lgwin`.
    pub fn new(lgwin: u32) -> Self {
        Self {
            window: RingBuffer::new(lgwin),
            output: Vec::new(),
        }
    }

    /// Create with an output capacity hint (the decoder knows `MLEN` ahead
    /// of decoding a meta-block's literals).
    pub fn with_capacity(lgwin: u32, output_capacity: usize) -> Self {
        Self {
            window: RingBuffer::new(lgwin),
            output: Vec::with_capacity(output_capacity),
        }
    }

    /// Append one decoded literal.
    pub fn push_literal(&mut self, byte: u8) {
        self.window.write_byte(byte);
        self.output.push(byte);
    }

    /// Append a run of decoded literals.
    pub fn push_literals(&mut self, bytes: &[u8]) {
        self.window.write_bytes(bytes);
        self.output.extend_from_slice(bytes);
    }

    /// Execute a backward-reference copy, appending the copied bytes to the
    /// output.
    pub fn copy_match(&mut self, distance: usize, length: usize) -> Result<()> {
        self.window.copy_from_history(distance, length, Some(&mut self.output))
    }

    /// Total number of bytes decoded so far.
    pub fn output_len(&self) -> usize {
        self.output.len()
    }

    /// The decompressed output so far.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Consume and return the full decompressed output.
    pub fn into_output(self) -> Vec<u8> {
        self.output
    }

    /// Reset both the window and the accumulated output.
    pub fn clear(&mut self) {
        self.window.clear();
        self.output.clear();
    }

    /// Borrow the underlying sliding window.
    pub fn window(&self) -> &RingBuffer {
        &self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_write_and_distance() {
        let mut ring = RingBuffer::new(sizes::MIN_WINDOW_BITS);
        ring.write_bytes(b"Hello");

        assert_eq!(ring.len(), 5);
        assert_eq!(ring.read_at_distance(1).unwrap(), b'o');
        assert_eq!(ring.read_at_distance(2).unwrap(), b'l');
        assert_eq!(ring.read_at_distance(5).unwrap(), b'H');
    }

    #[test]
    fn wraps_at_capacity() {
        let mut ring = RingBuffer::new(sizes::MIN_WINDOW_BITS);
        let capacity = ring.capacity();
        let filler = vec![b'A'; capacity];
        ring.write_bytes(&filler);
        ring.write_bytes(b"XYZ");

        assert_eq!(ring.len(), capacity);
        assert_eq!(ring.read_at_distance(1).unwrap(), b'Z');
        assert_eq!(ring.read_at_distance(3).unwrap(), b'X');
    }

    #[test]
    fn copy_overlap_repeats_pattern() {
        let mut ring = RingBuffer::new(sizes::MIN_WINDOW_BITS);
        let mut output = Vec::new();
        ring.write_bytes(b"AB");

        ring.copy_from_history(2, 6, Some(&mut output)).unwrap();
        assert_eq!(output, b"ABABAB");
    }

    #[test]
    fn single_byte_repeat() {
        let mut ring = RingBuffer::new(sizes::MIN_WINDOW_BITS);
        let mut output = Vec::new();
        ring.write_byte(b'X');

        ring.copy_from_history(1, 5, Some(&mut output)).unwrap();
        assert_eq!(output, b"XXXXX");
    }

    #[test]
    fn invalid_distance_rejected() {
        let ring = RingBuffer::new(sizes::MIN_WINDOW_BITS);
        assert!(ring.read_at_distance(0).is_err());
        assert!(ring.read_at_distance(1).is_err());
    }

    #[test]
    fn output_window_accumulates_beyond_capacity() {
        let mut win = OutputWindow::new(sizes::MIN_WINDOW_BITS);
        let capacity = win.window().capacity();

        win.push_literals(&vec![b'A'; capacity]);
        win.push_literals(b"tail");

        assert_eq!(win.output_len(), capacity + 4);
        assert!(win.output().ends_with(b"tail"));
    }

    #[test]
    fn max_backward_distance_matches_window_gap() {
        assert_eq!(sizes::max_backward_distance(10), 1024 - 16);
        assert_eq!(sizes::max_backward_distance(24), (1 << 24) - 16);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn rejects_window_bits_out_of_range() {
        let _ = RingBuffer::new(9);
    }
}
