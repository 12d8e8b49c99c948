//! Literal cost model.
//!
//! Before the backward-reference matcher decides whether a match is worth
//! taking over emitting literals, it needs a cheap per-byte cost estimate
//! that does not require a full histogram pass. This is a simplified port
//! of the reference encoder's `EstimateBitCostsForLiterals`: bucket bytes
//! into a small number of classes (ASCII letters, digits, whitespace,
//! everything else) and look up a fixed per-class bit cost seeded from
//! typical English-text entropy, rather than building an adaptive model.

/// Approximate bits needed to encode one literal byte, used as a
/// fallback by the matcher before any real literal histogram exists.
pub fn estimate_literal_bit_cost(byte: u8) -> f32 {
    match byte {
        b'a'..=b'z' => 4.0,
        b'A'..=b'Z' => 5.0,
        b'0'..=b'9' => 4.5,
        b' ' => 3.0,
        b'\n' | b'\r' | b'\t' => 3.5,
        0x00..=0x1f => 6.5,
        _ => 6.0,
    }
}

/// Sum of [`estimate_literal_bit_cost`] over a byte range, used when the
/// matcher compares "emit these as literals" against "emit a match".
pub fn estimate_literal_run_cost(bytes: &[u8]) -> f32 {
    bytes.iter().map(|&b| estimate_literal_bit_cost(b)).sum()
}

/// A running per-byte cost table built from an actual literal histogram,
/// used once the block splitter has real counts instead of the fixed
/// fallback table above.
pub struct LiteralCostModel {
    bits: [f32; 256],
}

impl LiteralCostModel {
    /// Build a cost model from literal symbol counts, falling back to the
    /// fixed per-class estimate for unused bytes.
    pub fn from_counts(counts: &[u32; 256]) -> Self {
        let total: u64 = counts.iter().map(|&c| c as u64).sum();
        let mut bits = [0.0f32; 256];
        if total == 0 {
            for b in 0..256 {
                bits[b] = estimate_literal_bit_cost(b as u8);
            }
            return Self { bits };
        }
        let total = total as f32;
        for b in 0..256 {
            bits[b] = if counts[b] > 0 {
                -((counts[b] as f32) / total).log2()
            } else {
                estimate_literal_bit_cost(b as u8)
            };
        }
        Self { bits }
    }

    /// Cost in bits of a single literal byte under this model.
    pub fn cost(&self, byte: u8) -> f32 {
        self.bits[byte as usize]
    }

    /// Cost in bits of a run of literal bytes under this model.
    pub fn run_cost(&self, bytes: &[u8]) -> f32 {
        bytes.iter().map(|&b| self.cost(b)).sum()
    }
}
