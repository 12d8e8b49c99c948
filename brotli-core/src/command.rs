//! Insert-and-copy commands: the unit the backward-reference matcher
//! produces and the meta-block builder serializes.
//!
//! Mirrors `Command` from the reference encoder's `command.h`: a literal
//! run (`insert_len` bytes copied verbatim from the input) immediately
//! followed by a back-reference copy (`copy_len` bytes from `distance`
//! bytes back in the output history). The very last command in a stream
//! may have a zero copy length, meaning "insert only, no trailing match".

use crate::tables;

/// One insert-and-copy command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    /// Number of literal bytes preceding the copy.
    pub insert_len: u32,
    /// Number of bytes copied from the sliding window. Zero for a
    /// trailing insert-only command.
    pub copy_len: u32,
    /// Backward distance in bytes, valid only when `copy_len > 0`.
    pub distance: u32,
}

impl Command {
    /// An insert-only command (no trailing copy).
    pub fn insert_only(insert_len: u32) -> Self {
        Self {
            insert_len,
            copy_len: 0,
            distance: 0,
        }
    }

    /// A full insert-and-copy command.
    pub fn new(insert_len: u32, copy_len: u32, distance: u32) -> Self {
        Self {
            insert_len,
            copy_len,
            distance,
        }
    }

    /// Whether this command carries a trailing copy.
    pub fn has_copy(&self) -> bool {
        self.copy_len > 0
    }

    /// The distance context bucket used to select which distance-code
    /// histogram a command's copy distance is drawn from, following
    /// `Command::DistanceContext` in the reference encoder: short
    /// distances get finer-grained contexts than long ones.
    pub fn distance_context(&self) -> u8 {
        if !self.has_copy() {
            return 0;
        }
        if self.distance <= 4 {
            return (self.distance - 1) as u8;
        }
        if self.copy_len >= 12 {
            return 0;
        }
        let nbits = 31 - self.distance.leading_zeros();
        (2 * nbits).min(37) as u8 + if self.copy_len >= 4 { 0 } else { 1 }
    }
}

/// A command whose distance has already been classified against the
/// last-4-distances ring, ready for serialization. This is the shape the
/// meta-block builder actually writes: either a short ring-backed code
/// (`ring_slot` in `0..4`, possibly with a +/-1 offset folded in) or a
/// fresh distance that gets pushed onto the ring after use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceSlot {
    /// Reuse of the distance already at ring index `0..4` (MRU order),
    /// with the small encoded offset folded into `short_code` per RFC
    /// 7932's 16 short-code table.
    Ring { short_code: u8 },
    /// A distance not representable by the ring, carried explicitly.
    New { distance: u32 },
}

/// The four most-recently-used distances, MRU first, mirroring the
/// decoder/encoder's shared ring buffer of repeat distances. Seeded with
/// `[16, 15, 11, 4]`, the format's fixed initial values.
#[derive(Debug, Clone, Copy)]
pub struct DistanceRing {
    ring: [u32; 4],
}

impl DistanceRing {
    /// A freshly initialized ring.
    pub fn new() -> Self {
        Self {
            ring: [16, 15, 11, 4],
        }
    }

    /// The current MRU-ordered contents.
    pub fn values(&self) -> [u32; 4] {
        self.ring
    }

    /// Classify `distance` against the ring, returning the slot the
    /// command should encode and, if new, leaving the ring unmodified
    /// (callers push explicitly via [`DistanceRing::push`] once the
    /// command is committed).
    pub fn classify(&self, distance: u32) -> DistanceSlot {
        for (i, &r) in self.ring.iter().enumerate() {
            if r == distance {
                return DistanceSlot::Ring {
                    short_code: i as u8,
                };
            }
        }
        if self.ring[0] > 1 && distance == self.ring[0] - 1 {
            return DistanceSlot::Ring { short_code: 4 };
        }
        if distance == self.ring[0] + 1 {
            return DistanceSlot::Ring { short_code: 5 };
        }
        if self.ring[1] > 1 && distance == self.ring[1] - 1 {
            return DistanceSlot::Ring { short_code: 6 };
        }
        if distance == self.ring[1] + 1 {
            return DistanceSlot::Ring { short_code: 7 };
        }
        DistanceSlot::New { distance }
    }

    /// Resolve a short ring code back to a concrete distance, per the
    /// fixed table in RFC 7932 §4.
    pub fn resolve_short_code(&self, short_code: u8) -> u32 {
        match short_code {
            0..=3 => self.ring[short_code as usize],
            4 => self.ring[0].saturating_sub(1).max(1),
            5 => self.ring[0] + 1,
            6 => self.ring[1].saturating_sub(1).max(1),
            7 => self.ring[1] + 1,
            _ => self.ring[0],
        }
    }

    /// Push a newly used distance onto the front of the ring if it isn't
    /// already one of the top two entries (matching the reference
    /// encoder's `distance_code > 0 && distance_code <= 2 * NDIRECT`
    /// dance, simplified: any distance not already ring[0] moves to the
    /// front).
    pub fn push(&mut self, distance: u32) {
        if self.ring[0] == distance {
            return;
        }
        self.ring = [distance, self.ring[0], self.ring[1], self.ring[2]];
    }
}

impl Default for DistanceRing {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a command's insert/copy lengths into the packed command-alphabet
/// symbol plus the raw extra-bits values the caller still needs to write,
/// following `GetInsertLengthCode`/`GetCopyLengthCode`/`CombineLengthCodes`.
pub struct EncodedCommand {
    pub command_symbol: u16,
    pub insert_extra_bits: u32,
    pub insert_extra_value: u32,
    pub copy_extra_bits: u32,
    pub copy_extra_value: u32,
}

/// Build the packed command symbol and extra-bits payload for `command`.
/// `implicit_distance_reuse` should be set when the command's distance is
/// ring slot 0 (the most recently used distance) — `combine_length_codes`
/// folds that into the symbol itself when the lengths are small enough,
/// letting the meta-block writer skip emitting a distance symbol at all.
pub fn encode_command(command: &Command, implicit_distance_reuse: bool) -> EncodedCommand {
    let (inscode, ins_bits, ins_value) = tables::insert_length_code(command.insert_len);
    // copy_length_code's table starts at length 2; a trailing insert-only
    // command still needs a placeholder copy code, conventionally the
    // minimum length.
    let copy_len = if command.has_copy() { command.copy_len } else { 2 };
    let (copycode, copy_bits, copy_value) = tables::copy_length_code(copy_len);
    let symbol = tables::combine_length_codes(inscode, copycode, implicit_distance_reuse);
    EncodedCommand {
        command_symbol: symbol,
        insert_extra_bits: ins_bits,
        insert_extra_value: ins_value,
        copy_extra_bits: copy_bits,
        copy_extra_value: copy_value,
    }
}

/// Recover `(insert_len, copy_len, implicit_distance_reuse)` from a decoded
/// command symbol and its extra bits, the decoder-side inverse of
/// [`encode_command`]. When the third element is `true`, no distance
/// symbol follows in the stream — the copy reuses the most recent
/// distance.
pub fn decode_command_lengths(
    symbol: u16,
    insert_extra_value: u32,
    copy_extra_value: u32,
) -> (u32, u32, bool) {
    let (inscode, copycode, implicit_distance_reuse) = tables::split_length_codes(symbol);
    let insert_len = tables::insert_length_from_code(inscode, insert_extra_value);
    let copy_len = tables::copy_length_from_code(copycode, copy_extra_value);
    (insert_len, copy_len, implicit_distance_reuse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_classifies_known_distances() {
        let ring = DistanceRing::new();
        assert_eq!(ring.classify(16), DistanceSlot::Ring { short_code: 0 });
        assert_eq!(ring.classify(4), DistanceSlot::Ring { short_code: 3 });
        assert_eq!(ring.classify(999), DistanceSlot::New { distance: 999 });
    }

    #[test]
    fn ring_push_moves_new_distance_to_front() {
        let mut ring = DistanceRing::new();
        ring.push(1000);
        assert_eq!(ring.values()[0], 1000);
        assert_eq!(ring.values()[1], 16);
    }

    #[test]
    fn ring_push_is_noop_for_current_mru() {
        let mut ring = DistanceRing::new();
        ring.push(16);
        assert_eq!(ring.values(), [16, 15, 11, 4]);
    }

    #[test]
    fn short_code_offsets_resolve_correctly() {
        let ring = DistanceRing::new();
        // ring[0] - 1 == 15, which also equals ring[1]; classify() should
        // prefer the direct ring match over the offset short code.
        assert_eq!(ring.classify(15), DistanceSlot::Ring { short_code: 1 });
        assert_eq!(ring.resolve_short_code(5), 17);
    }

    #[test]
    fn encode_decode_command_roundtrips() {
        let cmd = Command::new(42, 130, 5000);
        let encoded = encode_command(&cmd, false);
        let (insert_len, copy_len, implicit) = decode_command_lengths(
            encoded.command_symbol,
            encoded.insert_extra_value,
            encoded.copy_extra_value,
        );
        assert_eq!(insert_len, cmd.insert_len);
        assert_eq!(copy_len, cmd.copy_len);
        assert!(!implicit);
    }

    #[test]
    fn small_reused_distance_command_packs_implicitly() {
        let cmd = Command::new(1, 4, 16);
        let encoded = encode_command(&cmd, true);
        let (insert_len, copy_len, implicit) = decode_command_lengths(
            encoded.command_symbol,
            encoded.insert_extra_value,
            encoded.copy_extra_value,
        );
        assert_eq!((insert_len, copy_len), (cmd.insert_len, cmd.copy_len));
        assert!(implicit);
    }

    #[test]
    fn insert_only_command_has_no_copy() {
        let cmd = Command::insert_only(10);
        assert!(!cmd.has_copy());
        assert_eq!(cmd.distance_context(), 0);
    }

    #[test]
    fn distance_context_is_small_for_short_distances() {
        let cmd = Command::new(0, 8, 2);
        assert_eq!(cmd.distance_context(), 1);
    }
}
