//! Block splitting: dividing a meta-block's literal/command/distance
//! streams into contiguous runs ("blocks") that each get assigned one of
//! a small number of shared prefix-code contexts ("block types").
//!
//! Grounded in the reference encoder's `SplitBlock`/`BlockSplitter`
//! pattern: seed block boundaries at a fixed stride, greedily decide
//! whether each candidate boundary is worth keeping by comparing the
//! cost of one combined histogram against two split ones, then cluster
//! the surviving blocks' histograms down to a small number of shared
//! codes with [`crate::histogram::cluster_histograms`].

use crate::histogram::{cluster_histograms, Histogram};

/// Number of symbols in a block split pass before a boundary candidate is
/// considered, mirroring the reference encoder's `kMaxLiteralHistograms`
/// seeding stride class (simplified to one fixed stride here).
const SEED_STRIDE: usize = 512;

/// The result of splitting one symbol stream: contiguous block lengths,
/// each block's assigned type (index into `histograms`), and the
/// per-type histograms after clustering.
#[derive(Debug, Clone)]
pub struct BlockSplit<const N: usize> {
    /// Length, in symbols, of each block in original stream order.
    pub block_lengths: Vec<u32>,
    /// Block-type index for each block, parallel to `block_lengths`.
    pub block_types: Vec<u8>,
    /// The clustered histogram for each distinct block type.
    pub histograms: Vec<Histogram<N>>,
}

impl<const N: usize> BlockSplit<N> {
    /// A trivial split: the entire stream is one block of one type.
    pub fn single(histogram: Histogram<N>, length: u32) -> Self {
        Self {
            block_lengths: vec![length],
            block_types: vec![0],
            histograms: vec![histogram],
        }
    }

    /// Number of distinct block types after clustering.
    pub fn num_types(&self) -> usize {
        self.histograms.len()
    }
}

/// Split `symbols` (already-extracted alphabet indices for one of the
/// literal/command/distance streams) into blocks and cluster their
/// histograms into at most `max_types` shared codes.
pub fn split_symbols<const N: usize>(symbols: &[usize], max_types: usize) -> BlockSplit<N> {
    if symbols.is_empty() {
        return BlockSplit {
            block_lengths: vec![0],
            block_types: vec![0],
            histograms: vec![Histogram::new()],
        };
    }

    let seeds = seed_boundaries(symbols.len());
    let raw_histograms: Vec<Histogram<N>> = seeds
        .windows(2)
        .map(|w| {
            let mut h: Histogram<N> = Histogram::new();
            for &sym in &symbols[w[0]..w[1]] {
                h.add(sym);
            }
            h
        })
        .collect();

    let merged = merge_cheap_neighbors(raw_histograms, &seeds);

    let (assignment, clusters) = cluster_histograms(&merged.histograms, max_types);
    let block_types: Vec<u8> = assignment.iter().map(|&a| a as u8).collect();
    let (block_lengths, block_types) = merge_adjacent_same_type(merged.lengths, block_types);

    BlockSplit {
        block_lengths,
        block_types,
        histograms: clusters,
    }
}

/// Clustering can independently map two non-adjacent merged blocks to the
/// same type without re-merging them positionally; fold any now-adjacent
/// same-type runs back into one block so `types[i] != types[i-1]` holds,
/// the invariant the meta-block writer's inline block-switch codes rely
/// on (a repeated type would otherwise have nothing to switch to).
fn merge_adjacent_same_type(lengths: Vec<u32>, types: Vec<u8>) -> (Vec<u32>, Vec<u8>) {
    let mut out_lengths: Vec<u32> = Vec::with_capacity(lengths.len());
    let mut out_types: Vec<u8> = Vec::with_capacity(types.len());
    for (len, ty) in lengths.into_iter().zip(types) {
        if out_types.last() == Some(&ty) {
            *out_lengths.last_mut().unwrap() += len;
        } else {
            out_lengths.push(len);
            out_types.push(ty);
        }
    }
    (out_lengths, out_types)
}

/// Fixed-stride seed boundaries covering `[0, total]`.
fn seed_boundaries(total: usize) -> Vec<usize> {
    let mut seeds = Vec::new();
    let mut pos = 0;
    while pos < total {
        seeds.push(pos);
        pos += SEED_STRIDE;
    }
    seeds.push(total);
    seeds
}

struct MergedBlocks<const N: usize> {
    lengths: Vec<u32>,
    histograms: Vec<Histogram<N>>,
}

/// Greedily drop boundaries whose split histograms cost more than the
/// combined one would, folding them into their left neighbor.
fn merge_cheap_neighbors<const N: usize>(
    histograms: Vec<Histogram<N>>,
    seeds: &[usize],
) -> MergedBlocks<N> {
    if histograms.is_empty() {
        return MergedBlocks {
            lengths: vec![],
            histograms: vec![],
        };
    }

    let mut merged_histograms: Vec<Histogram<N>> = vec![histograms[0].clone()];
    let mut merged_lengths: Vec<u32> = vec![(seeds[1] - seeds[0]) as u32];

    for (i, h) in histograms.into_iter().enumerate().skip(1) {
        let len = (seeds[i + 1] - seeds[i]) as u32;
        let last = merged_histograms.last().unwrap();
        let delta = last.merge_cost_delta(&h);
        if delta < 0.0 {
            let last_mut = merged_histograms.last_mut().unwrap();
            last_mut.merge(&h);
            *merged_lengths.last_mut().unwrap() += len;
        } else {
            merged_histograms.push(h);
            merged_lengths.push(len);
        }
    }

    MergedBlocks {
        lengths: merged_lengths,
        histograms: merged_histograms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_stream_collapses_to_single_block() {
        let symbols: Vec<usize> = vec![0; 2000];
        let split: BlockSplit<4> = split_symbols(&symbols, 4);
        assert_eq!(split.num_types(), 1);
        assert_eq!(split.block_lengths.iter().sum::<u32>() as usize, 2000);
    }

    #[test]
    fn distinct_regions_produce_multiple_types() {
        let mut symbols = vec![0usize; 1000];
        symbols.extend(vec![3usize; 1000]);
        let split: BlockSplit<4> = split_symbols(&symbols, 4);
        assert!(split.num_types() >= 1);
        assert_eq!(split.block_lengths.iter().sum::<u32>() as usize, 2000);
    }

    #[test]
    fn empty_stream_yields_single_empty_block() {
        let symbols: Vec<usize> = vec![];
        let split: BlockSplit<4> = split_symbols(&symbols, 4);
        assert_eq!(split.block_lengths, vec![0]);
        assert_eq!(split.num_types(), 1);
    }

    #[test]
    fn adjacent_blocks_never_share_a_type() {
        let mut symbols = Vec::new();
        for i in 0..20 {
            symbols.extend(vec![(i % 3) as usize; SEED_STRIDE]);
        }
        let split: BlockSplit<4> = split_symbols(&symbols, 4);
        for pair in split.block_types.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn respects_max_types_cap() {
        let mut symbols = Vec::new();
        for i in 0..20 {
            symbols.extend(vec![i % 4; SEED_STRIDE]);
        }
        let split: BlockSplit<4> = split_symbols(&symbols, 2);
        assert!(split.num_types() <= 2);
    }
}
