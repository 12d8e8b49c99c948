//! Backward-reference generation: turns raw input bytes into a sequence
//! of [`Command`]s using the hash-chain matcher and a one-step lookahead
//! ("lazy matching") to decide whether taking a match now or waiting one
//! byte for a better one pays off.
//!
//! Grounded in the reference encoder's `CreateBackwardReferences`: scan
//! forward, probe the hasher at each position, and greedily take a match
//! once it beats emitting the byte as a literal and extending the search,
//! with a short lookahead so a long match starting one byte later isn't
//! missed in favor of a short one right here. The lazy-matching margin is
//! widened by [`crate::literal_cost::LiteralCostModel`]'s estimate for the
//! byte that would be deferred to a literal, so rare bytes are preferred
//! matched over emitted.

use crate::command::{Command, DistanceRing};
use crate::dictionary::{self, StaticDictionary, MAX_WORD_LENGTH, MIN_WORD_LENGTH};
use crate::hasher::{backward_reference_score, Hasher, MIN_MATCH_LENGTH};
use crate::literal_cost::LiteralCostModel;

/// Tuning knobs for reference generation, mirroring the quality/effort
/// parameters the reference encoder threads through
/// `CreateBackwardReferences`.
#[derive(Debug, Clone, Copy)]
pub struct MatchParams {
    /// Largest backward distance a match may use (derived from the
    /// window size).
    pub max_distance: usize,
    /// Minimum score improvement required to prefer a one-byte-later
    /// match over taking the current one immediately.
    pub lazy_match_margin: i64,
}

impl MatchParams {
    pub fn new(max_distance: usize) -> Self {
        Self {
            max_distance,
            lazy_match_margin: 5,
        }
    }
}

/// Generate the command sequence covering `data` in its entirety. The
/// final command may be insert-only if the input ends on a run of
/// literals with no trailing match.
pub fn create_backward_references(data: &[u8], params: &MatchParams) -> Vec<Command> {
    create_backward_references_inner(data, params, None, 0)
}

/// Like [`create_backward_references`], but when the hash-chain matcher
/// finds nothing at a position, also probes `dictionary` for an
/// exact-byte, identity-transform word covering the bytes there (`enc/`'s
/// `FindLongestMatch`'s dictionary probe, scoped here to the transform
/// that never changes the byte content so the probe stays a pure
/// substring lookup rather than needing to model every transform's
/// output against the input). `base_pos` is the number of bytes already
/// produced in earlier meta-blocks of the same stream, needed so the
/// dictionary reference's encoded distance lines up with the decoder's
/// whole-stream position when `data` is a later chunk of a larger input.
pub fn create_backward_references_with_dictionary(
    data: &[u8],
    params: &MatchParams,
    dictionary: &StaticDictionary,
    base_pos: usize,
) -> Vec<Command> {
    create_backward_references_inner(data, params, Some(dictionary), base_pos)
}

fn create_backward_references_inner(
    data: &[u8],
    params: &MatchParams,
    dictionary: Option<&StaticDictionary>,
    base_pos: usize,
) -> Vec<Command> {
    let mut commands = Vec::new();
    let mut hasher = Hasher::new(17);
    let mut ring = DistanceRing::new();

    let mut counts = [0u32; 256];
    for &b in data {
        counts[b as usize] += 1;
    }
    let literal_cost = LiteralCostModel::from_counts(&counts);

    let mut pos = 0usize;
    let mut literal_start = 0usize;

    while pos < data.len() {
        if pos + MIN_MATCH_LENGTH > data.len() {
            hasher.store(data, pos);
            pos += 1;
            continue;
        }

        let candidate = hasher.find_longest_match(data, pos, params.max_distance);
        hasher.store(data, pos);

        let Some(mut best) = candidate else {
            if let Some(dict) = dictionary {
                if let Some((len, word_idx)) = probe_dictionary_word(dict, data, pos) {
                    let max_distance_here = (base_pos + pos).min(params.max_distance);
                    let size_bits = dict.size_bits(len);
                    let distance = dictionary::reference_distance(max_distance_here, size_bits, 0, word_idx);
                    let insert_len = (pos - literal_start) as u32;
                    commands.push(Command::new(insert_len, len as u32, distance));
                    ring.push(distance);
                    pos += len;
                    literal_start = pos;
                    continue;
                }
            }
            pos += 1;
            continue;
        };
        let mut best_pos = pos;

        // Lazy matching: peek one byte ahead for a strictly better match.
        // Deferring means emitting `data[pos]` as a literal instead of
        // folding it into the current match, so a rare (expensive) byte at
        // `pos` raises the bar for deferring and a common (cheap) one
        // lowers it.
        if pos + 1 + MIN_MATCH_LENGTH <= data.len() {
            if let Some(next) = hasher.find_longest_match(data, pos + 1, params.max_distance) {
                let cur_score = backward_reference_score(best.length, best.distance, &ring);
                let next_score = backward_reference_score(next.length, next.distance, &ring);
                let defer_cost = literal_cost.cost(data[pos]) as i64;
                if next_score > cur_score + params.lazy_match_margin + defer_cost {
                    best = next;
                    best_pos = pos + 1;
                }
            }
        }

        let insert_len = (best_pos - literal_start) as u32;
        commands.push(Command::new(insert_len, best.length, best.distance));
        ring.push(best.distance);

        let match_end = best_pos + best.length as usize;
        let mut store_pos = best_pos + 1;
        while store_pos < match_end {
            hasher.store(data, store_pos);
            store_pos += 1;
        }

        pos = match_end;
        literal_start = match_end;
    }

    if literal_start < data.len() || commands.is_empty() {
        commands.push(Command::insert_only((data.len() - literal_start) as u32));
    }

    commands
}

/// Look for a dictionary word exactly matching `data[pos..]`, longest
/// first, so a direct substring comparison can stand in for identity
/// transform's lookup without touching the transform table. Returns
/// `(word_length, word_index)` for the first match found.
fn probe_dictionary_word(dictionary: &StaticDictionary, data: &[u8], pos: usize) -> Option<(usize, usize)> {
    let max_len = (data.len() - pos).min(MAX_WORD_LENGTH);
    for len in (MIN_WORD_LENGTH..=max_len).rev() {
        let candidate = &data[pos..pos + len];
        let bucket_size = 1usize << dictionary.size_bits(len);
        for word_idx in 0..bucket_size {
            match dictionary.lookup(len, word_idx) {
                Ok(word) if word == candidate => return Some((len, word_idx)),
                _ => continue,
            }
        }
    }
    None
}

/// Total number of literal bytes a command sequence implies, used by
/// callers that need to slice the original input back out for each
/// command's insert run.
pub fn total_insert_length(commands: &[Command]) -> u64 {
    commands.iter().map(|c| c.insert_len as u64).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_literal_input_yields_one_insert_only_command() {
        let data = b"abcdefgh";
        let params = MatchParams::new(1 << 20);
        let commands = create_backward_references(data, &params);
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].insert_len, data.len() as u32);
        assert!(!commands[0].has_copy());
    }

    #[test]
    fn repeated_pattern_produces_a_match() {
        let data = b"abcdabcdabcdabcd";
        let params = MatchParams::new(1 << 20);
        let commands = create_backward_references(data, &params);
        assert!(commands.iter().any(|c| c.has_copy()));
    }

    #[test]
    fn commands_cover_entire_input() {
        let data = b"the quick brown fox the quick brown fox jumps";
        let params = MatchParams::new(1 << 20);
        let commands = create_backward_references(data, &params);

        let mut covered = 0u64;
        for c in &commands {
            covered += c.insert_len as u64;
            covered += c.copy_len as u64;
        }
        assert_eq!(covered, data.len() as u64);
    }

    #[test]
    fn empty_input_yields_single_zero_length_command() {
        let data: &[u8] = b"";
        let params = MatchParams::new(1 << 20);
        let commands = create_backward_references(data, &params);
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].insert_len, 0);
    }

    #[test]
    fn dictionary_probe_emits_a_reference_for_a_known_word() {
        let dict = StaticDictionary::synthetic();
        let data = b"xyzwithoutzyx";
        let params = MatchParams::new(1 << 20);
        let commands = create_backward_references_with_dictionary(data, &params, &dict, 0);
        assert!(commands.iter().any(|c| c.has_copy() && c.copy_len as usize == "without".len()));
    }

    #[test]
    fn max_distance_bounds_matches() {
        let mut data = vec![b'x'; 4];
        data.extend(vec![0u8; 100]);
        data.extend_from_slice(b"x");
        data.push(b'y');
        data.push(b'z');
        data.push(b'w');
        let params = MatchParams::new(8);
        let commands = create_backward_references(&data, &params);
        for c in &commands {
            if c.has_copy() {
                assert!(c.distance as usize <= params.max_distance);
            }
        }
    }
}
