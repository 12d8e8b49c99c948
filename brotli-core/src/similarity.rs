//! Similarity re-use: re-encoding a payload after a small byte range has
//! been deleted from it, without re-running the matcher over the parts
//! that survive unchanged.
//!
//! Grounded in the reference encoder's `RemoveBackwardReferencesPart`
//! (`enc/backward_references.cc`): given a payload's already-recovered
//! backward references and the `[start, end)` range about to be deleted,
//! rewrite each reference in place instead of re-discovering matches from
//! scratch. A reference entirely outside the deleted range survives
//! unchanged or shifted; one that straddles the boundary is truncated or
//! dropped; one whose source material fell inside the deleted range is
//! dropped and its destination bytes fall back to being transmitted as
//! literals. The rewritten references are then handed straight to
//! [`crate::metablock::write_meta_block`], bypassing
//! [`crate::backward_ref::create_backward_references`] and its hash-chain
//! scan entirely for the part of the payload that didn't change.

use crate::bitstream::{write_window_bits, BitWriter};
use crate::command::{Command, DistanceRing};
use crate::encoder::EncoderParams;
use crate::error::Result;
use crate::metablock::write_meta_block;
use crate::ringbuffer::sizes;
use std::io::Write;

/// One recovered backward reference: a copy of `copy_len` bytes ending up
/// at `position` in the decoded stream, sourced `distance` bytes earlier.
/// `max_distance` is the window's reach at `position` (`min(position,
/// window_cap)`), the same threshold [`crate::decoder`] uses to tell a
/// static-dictionary reference apart from a window copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackwardReference {
    pub position: u64,
    pub copy_len: u32,
    pub distance: u32,
    pub max_distance: u64,
}

impl BackwardReference {
    fn is_dictionary_reference(&self) -> bool {
        self.distance as u64 > self.max_distance
    }
}

/// Recover the backward-reference list a command sequence carries, in the
/// position form [`remove_backward_references_part`] operates on.
pub fn recover_references(commands: &[Command], window_cap: u64) -> Vec<BackwardReference> {
    let mut refs = Vec::new();
    let mut cursor = 0u64;
    for command in commands {
        cursor += command.insert_len as u64;
        if command.has_copy() {
            refs.push(BackwardReference {
                position: cursor,
                copy_len: command.copy_len,
                distance: command.distance,
                max_distance: cursor.min(window_cap),
            });
            cursor += command.copy_len as u64;
        }
    }
    refs
}

/// `output = input[0..start] ++ input[end..]`, the trivial data half of
/// the rewrite.
pub fn remove_data_part(input: &[u8], start: usize, end: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() - (end - start));
    out.extend_from_slice(&input[..start]);
    out.extend_from_slice(&input[end..]);
    out
}

/// Rewrite `references` for a deletion of `[start, end)`, dropping any
/// reference whose destination or source material the deletion destroys
/// and remapping the survivors into the post-deletion coordinate space.
///
/// Each input reference falls into one of seven cases: a static-dictionary
/// reference (`distance > max_distance`, three sub-cases by where its
/// destination sits relative to the deleted range) and six overlap cases
/// for an ordinary window reference, covering every combination of
/// destination/source position relative to `start`/`end`. The minimum
/// surviving copy length (3 bytes for a truncated reference, 6 for one
/// whose source straddled the boundary) is a tuning threshold, not a wire
/// format constant — see `DESIGN.md`.
pub fn remove_backward_references_part(
    references: &[BackwardReference],
    start: u64,
    end: u64,
    window_cap: u64,
) -> Vec<BackwardReference> {
    let shift = end - start;
    let mut out = Vec::with_capacity(references.len());

    for r in references {
        if r.is_dictionary_reference() {
            if r.position < start {
                out.push(*r);
            } else if r.position >= end {
                let new_position = r.position - shift;
                let new_max_distance = new_position.min(window_cap);
                let address = r.distance as u64 - r.max_distance - 1;
                let new_distance = (new_max_distance + 1 + address) as u32;
                out.push(BackwardReference {
                    position: new_position,
                    copy_len: r.copy_len,
                    distance: new_distance,
                    max_distance: new_max_distance,
                });
            }
            // start <= position < end: destination itself is deleted, drop.
            continue;
        }

        let dest_end = r.position + r.copy_len as u64;
        let src = r.position - r.distance as u64;
        let src_end = src + r.copy_len as u64;

        if dest_end <= start {
            // Case 1: entirely before start.
            out.push(*r);
        } else if r.position < start {
            // Case 2: straddles start; only the prefix before start survives.
            let new_copy_len = (start - r.position) as u32;
            if new_copy_len >= 3 {
                out.push(BackwardReference {
                    copy_len: new_copy_len,
                    ..*r
                });
            }
        } else if r.position >= end {
            if src >= end {
                // Case 3: destination and source both shift down uniformly.
                let new_position = r.position - shift;
                out.push(BackwardReference {
                    position: new_position,
                    max_distance: new_position.min(window_cap),
                    ..*r
                });
            } else if src >= start {
                // Case 4: source starts inside the deleted range; only a
                // source tail past `end` (if long enough) survives.
                let tail_len = src_end.saturating_sub(end);
                if tail_len >= 6 {
                    let tail_len = tail_len as u32;
                    let new_position = r.position + (r.copy_len - tail_len) as u64 - shift;
                    let new_distance = (new_position - start) as u32;
                    out.push(BackwardReference {
                        position: new_position,
                        copy_len: tail_len,
                        distance: new_distance,
                        max_distance: new_position.min(window_cap),
                    });
                }
            } else if src_end <= start {
                // Case 5a: source entirely before start; only destination
                // shifts, so the distance shrinks by `shift`.
                let new_position = r.position - shift;
                out.push(BackwardReference {
                    position: new_position,
                    distance: r.distance - shift as u32,
                    max_distance: new_position.min(window_cap),
                    ..*r
                });
            } else {
                // Case 5b: source straddles start; only its prefix survives.
                let new_copy_len = (start - src) as u32;
                if new_copy_len >= 3 {
                    let new_position = r.position - shift;
                    let new_distance = (new_position - src) as u32;
                    out.push(BackwardReference {
                        position: new_position,
                        copy_len: new_copy_len,
                        distance: new_distance,
                        max_distance: new_position.min(window_cap),
                    });
                }
            }
        }
        // Case 6 (start <= position < end): destination is deleted, drop.
    }

    out
}

/// Rebuild a command/literal stream from `output` and a rewritten
/// reference list: the gap before each surviving reference (and any
/// trailing gap after the last one) becomes a literal run sliced straight
/// from `output`, which is always correct since `output` already holds the
/// post-deletion bytes regardless of which references survived.
pub fn rebuild_commands(output: &[u8], references: &[BackwardReference]) -> (Vec<Command>, Vec<u8>) {
    let mut commands = Vec::with_capacity(references.len() + 1);
    let mut literals = Vec::new();
    let mut cursor = 0u64;

    for r in references {
        let insert_len = (r.position - cursor) as u32;
        literals.extend_from_slice(&output[cursor as usize..r.position as usize]);
        commands.push(Command::new(insert_len, r.copy_len, r.distance));
        cursor = r.position + r.copy_len as u64;
    }

    if cursor < output.len() as u64 || commands.is_empty() {
        literals.extend_from_slice(&output[cursor as usize..]);
        commands.push(Command::insert_only((output.len() as u64 - cursor) as u32));
    }

    (commands, literals)
}

/// Full rewrite: delete `[start, end)` from `input`, whose backward
/// references (as already recovered from a prior encode of `input`) are
/// `commands`, and return the resulting `(output, commands, literals)`
/// ready for [`write_meta_block`].
pub fn remove_range(
    input: &[u8],
    commands: &[Command],
    start: usize,
    end: usize,
    window_cap: usize,
) -> (Vec<u8>, Vec<Command>, Vec<u8>) {
    let output = remove_data_part(input, start, end);
    let references = recover_references(commands, window_cap as u64);
    let rewritten = remove_backward_references_part(&references, start as u64, end as u64, window_cap as u64);
    let (new_commands, literals) = rebuild_commands(&output, &rewritten);
    (output, new_commands, literals)
}

/// Compress `input` with `[start, end)` deleted, re-using `commands` (the
/// backward references already recovered from a prior encode of `input`)
/// instead of re-scanning the surviving bytes for matches. Returns the
/// compressed bytes for `input[0..start] ++ input[end..]`.
pub fn compress_with_removed_range(
    input: &[u8],
    commands: &[Command],
    start: usize,
    end: usize,
    params: &EncoderParams,
) -> Result<Vec<u8>> {
    let window_cap = sizes::max_backward_distance(params.lgwin);
    let (_output, new_commands, literals) = remove_range(input, commands, start, end, window_cap);

    let mut out = Vec::new();
    {
        let mut writer = BitWriter::new(&mut out);
        write_window_bits(&mut writer, params.lgwin)?;
        let mut ring = DistanceRing::new();
        write_meta_block(&mut writer, &new_commands, &literals, &mut ring, true)?;
        writer.flush()?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backward_ref::{create_backward_references, MatchParams};
    use crate::decoder::decompress;
    use crate::encoder::EncoderParams;

    fn match_params() -> MatchParams {
        MatchParams::new(sizes::max_backward_distance(sizes::DEFAULT_WINDOW_BITS))
    }

    fn window_cap() -> u64 {
        sizes::max_backward_distance(sizes::DEFAULT_WINDOW_BITS) as u64
    }

    #[test]
    fn removed_range_round_trips_through_compression() {
        let input = b"the quick brown fox jumps over the lazy dog. the quick brown fox jumps again.".to_vec();
        let commands = create_backward_references(&input, &match_params());
        let params = EncoderParams::new();

        let expected = remove_data_part(&input, 10, 20);
        let compressed = compress_with_removed_range(&input, &commands, 10, 20, &params).unwrap();
        let decompressed = decompress(&compressed).unwrap();
        assert_eq!(decompressed, expected);
    }

    #[test]
    fn reference_entirely_before_start_is_unchanged() {
        let refs = vec![BackwardReference {
            position: 10,
            copy_len: 4,
            distance: 5,
            max_distance: 10,
        }];
        let rewritten = remove_backward_references_part(&refs, 100, 500, window_cap());
        assert_eq!(rewritten, refs);
    }

    #[test]
    fn reference_entirely_inside_deleted_range_is_dropped() {
        let refs = vec![BackwardReference {
            position: 200,
            copy_len: 4,
            distance: 5,
            max_distance: 200,
        }];
        assert!(remove_backward_references_part(&refs, 100, 500, window_cap()).is_empty());
    }

    #[test]
    fn reference_after_end_shifts_down_by_the_deleted_width() {
        let refs = vec![BackwardReference {
            position: 600,
            copy_len: 8,
            distance: 50,
            max_distance: 600,
        }];
        let rewritten = remove_backward_references_part(&refs, 100, 500, window_cap());
        assert_eq!(rewritten.len(), 1);
        assert_eq!(rewritten[0].position, 200);
        assert_eq!(rewritten[0].distance, 50);
    }

    #[test]
    fn reference_straddling_start_is_truncated() {
        let refs = vec![BackwardReference {
            position: 95,
            copy_len: 20,
            distance: 50,
            max_distance: 95,
        }];
        let rewritten = remove_backward_references_part(&refs, 100, 500, window_cap());
        assert_eq!(rewritten.len(), 1);
        assert_eq!(rewritten[0].copy_len, 5);
        assert_eq!(rewritten[0].position, 95);
    }

    #[test]
    fn short_truncation_below_the_threshold_is_dropped() {
        let refs = vec![BackwardReference {
            position: 99,
            copy_len: 20,
            distance: 50,
            max_distance: 99,
        }];
        assert!(remove_backward_references_part(&refs, 100, 500, window_cap()).is_empty());
    }

    #[test]
    fn dictionary_reference_after_end_recomputes_its_max_distance() {
        let refs = vec![BackwardReference {
            position: 600,
            copy_len: 4,
            distance: 650,
            max_distance: 600,
        }];
        let rewritten = remove_backward_references_part(&refs, 100, 500, window_cap());
        assert_eq!(rewritten.len(), 1);
        let r = rewritten[0];
        assert_eq!(r.position, 200);
        assert_eq!(r.max_distance, 200);
        // the dictionary address (distance - max_distance - 1) is preserved
        assert_eq!(r.distance as u64 - r.max_distance - 1, 650u64 - 600 - 1);
    }

    #[test]
    fn dictionary_reference_inside_deleted_range_is_dropped() {
        let refs = vec![BackwardReference {
            position: 300,
            copy_len: 4,
            distance: 400,
            max_distance: 300,
        }];
        assert!(remove_backward_references_part(&refs, 100, 500, window_cap()).is_empty());
    }

    #[test]
    fn ninety_seven_percent_of_references_survive_a_small_deletion() {
        let mut text = String::new();
        for i in 0..200 {
            text.push_str(&format!(
                "sentence number {i} repeats the common words the and of to a in that this with from. "
            ));
        }
        let input = text.into_bytes();
        let commands = create_backward_references(&input, &match_params());
        let window_cap = sizes::max_backward_distance(sizes::DEFAULT_WINDOW_BITS) as u64;
        let references = recover_references(&commands, window_cap);
        assert!(references.len() > 100, "expected a representative number of references to recover");

        let rewritten = remove_backward_references_part(&references, 100, 500, window_cap);
        let survival = rewritten.len() as f64 / references.len() as f64;
        assert!(
            survival > 0.97,
            "expected >97% of {} references to survive, got {} ({survival:.4})",
            references.len(),
            rewritten.len()
        );
    }
}
