//! Shortest-path match selection for the top quality tier.
//!
//! Grounded in the reference encoder's `enc/backward_references_hq.cc`
//! (`ZopfliComputeShortestPath`): build a forward cost array over byte
//! positions where each edge is either "emit one literal" or "take a
//! match", then backtrack the cheapest path from the end to the start.
//! This module simplifies the real algorithm in one respect:
//! [`crate::hasher::Hasher`] only ever reports the single longest match at
//! a position, not every match length reachable there, so the edge set at
//! each position is the longest match plus a couple of shorter cuts of it
//! rather than the reference's full all-lengths graph. That's still a
//! genuine shortest-path search over a non-trivial edge set, just a
//! narrower one.

use crate::backward_ref::MatchParams;
use crate::command::{Command, DistanceRing};
use crate::hasher::{backward_reference_score, Hasher, MIN_MATCH_LENGTH};

/// Flat per-byte cost used for literal edges. A real literal-cost model
/// (`crate::literal_cost`) could replace this, but the shortest-path
/// search's main value here is in choosing between match lengths, not in
/// modeling literal entropy precisely.
const LITERAL_BIT_COST: f64 = 8.0;

fn match_bit_cost(length: u32, distance: u32) -> f64 {
    let length_bits = 8.0;
    let distance_bits = (32 - distance.max(1).leading_zeros()) as f64;
    length_bits + distance_bits
}

/// Generate the command sequence covering `data` by a bounded shortest-path
/// search instead of the greedy/lazy scan [`crate::backward_ref::create_backward_references`]
/// uses.
pub fn create_backward_references_zopfli(data: &[u8], params: &MatchParams) -> Vec<Command> {
    let n = data.len();
    if n == 0 {
        return vec![Command::insert_only(0)];
    }

    let mut hasher = Hasher::new(17);
    let mut match_len = vec![0u32; n];
    let mut match_dist = vec![0u32; n];
    for pos in 0..n {
        if pos + MIN_MATCH_LENGTH <= n {
            if let Some(m) = hasher.find_longest_match(data, pos, params.max_distance) {
                match_len[pos] = m.length;
                match_dist[pos] = m.distance;
            }
        }
        hasher.store(data, pos);
    }

    let mut cost = vec![f64::INFINITY; n + 1];
    let mut via_len = vec![0u32; n + 1];
    let mut via_dist = vec![0u32; n + 1];
    let mut from = vec![0usize; n + 1];
    cost[0] = 0.0;

    for i in 0..n {
        if cost[i].is_infinite() {
            continue;
        }

        let literal_cost = cost[i] + LITERAL_BIT_COST;
        if literal_cost < cost[i + 1] {
            cost[i + 1] = literal_cost;
            from[i + 1] = i;
            via_len[i + 1] = 0;
        }

        let longest = match_len[i];
        if longest >= MIN_MATCH_LENGTH as u32 {
            let dist = match_dist[i];
            let half = (longest / 2).max(MIN_MATCH_LENGTH as u32);
            for &len in &[longest, half, MIN_MATCH_LENGTH as u32] {
                if len < MIN_MATCH_LENGTH as u32 || len > longest {
                    continue;
                }
                let j = i + len as usize;
                if j > n {
                    continue;
                }
                let candidate_cost = cost[i] + match_bit_cost(len, dist);
                if candidate_cost < cost[j] {
                    cost[j] = candidate_cost;
                    from[j] = i;
                    via_len[j] = len;
                    via_dist[j] = dist;
                }
            }
        }
    }

    let mut edges = Vec::new();
    let mut pos = n;
    while pos > 0 {
        let prev = from[pos];
        edges.push((prev, pos, via_len[pos], via_dist[pos]));
        pos = prev;
    }
    edges.reverse();

    let mut commands = Vec::new();
    let mut ring = DistanceRing::new();
    let mut literal_run = 0u32;
    for (start, end, len, dist) in edges {
        if len == 0 {
            literal_run += (end - start) as u32;
        } else {
            commands.push(Command::new(literal_run, len, dist));
            ring.push(dist);
            let _ = backward_reference_score(len, dist, &ring);
            literal_run = 0;
        }
    }
    if literal_run > 0 || commands.is_empty() {
        commands.push(Command::insert_only(literal_run));
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ringbuffer::sizes;

    fn params() -> MatchParams {
        MatchParams::new(sizes::max_backward_distance(sizes::DEFAULT_WINDOW_BITS))
    }

    #[test]
    fn covers_entire_input() {
        let data = b"the quick brown fox the quick brown fox jumps over";
        let commands = create_backward_references_zopfli(data, &params());
        let mut covered = 0u64;
        for c in &commands {
            covered += c.insert_len as u64 + c.copy_len as u64;
        }
        assert_eq!(covered, data.len() as u64);
    }

    #[test]
    fn finds_a_match_in_repetitive_input() {
        let data = b"abcdabcdabcdabcdabcd";
        let commands = create_backward_references_zopfli(data, &params());
        assert!(commands.iter().any(Command::has_copy));
    }

    #[test]
    fn empty_input_yields_single_zero_length_command() {
        let commands = create_backward_references_zopfli(b"", &params());
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].insert_len, 0);
    }

    #[test]
    fn pure_literal_input_yields_one_insert_only_command() {
        let data = b"abcdefgh";
        let commands = create_backward_references_zopfli(data, &params());
        assert_eq!(commands.len(), 1);
        assert!(!commands[0].has_copy());
    }
}
