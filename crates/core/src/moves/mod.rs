//! Move detection
//!
//! Pairs deletions with insertions that carry the same content somewhere
//! else in the document. Runs after the line-level diff and only annotates
//! the result; rows and blocks are unaffected.
//!
//! Phase 1 matches whole delete runs against whole insert runs. Phase 2
//! works on the lines nobody claimed: it seeds on near-identical single
//! lines, grows each seed over neighbouring lines, and commits the longest
//! candidates first.

pub mod ranges;
pub mod similarity;

pub use ranges::{MoveRangeList, NonOverlappingRangeTree};
pub use similarity::{average_similarity, similarity};

use crate::clock::Deadline;
use crate::config::MoveOptions;
use crate::diff::{EnhancedEdit, Moves, Operation};
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::{debug, warn};

/// A delete or insert run with its line range on its own side
#[derive(Debug, Clone)]
struct Block<'a> {
    /// Position in the edit script
    index: usize,
    lines: Range<usize>,
    text: &'a str,
}

/// An unclaimed line of a delete or insert run
#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    /// Position of its run in the edit script
    index: usize,
    text: &'a str,
}

/// A phase 2 match before it is committed
#[derive(Debug, Clone)]
struct Candidate {
    deletion: Range<usize>,
    insertion: Range<usize>,
    score: f64,
}

/// Finds relocated blocks in a line-level edit script
#[derive(Debug, Clone)]
pub struct MoveDetector<'c> {
    options: MoveOptions,
    deadline: Deadline<'c>,
}

impl<'c> MoveDetector<'c> {
    /// Detector whose phases share `deadline`
    pub fn new(options: MoveOptions, deadline: Deadline<'c>) -> Self {
        Self { options, deadline }
    }

    /// Detect moves in `edits`
    ///
    /// Returns whatever was found when the deadline expires.
    pub fn detect(&self, edits: &[EnhancedEdit]) -> Moves {
        let deletions = blocks(edits, Operation::Delete);
        let insertions = blocks(edits, Operation::Insert);

        let mut moves = Moves::default();
        let mut claimed_deletions = NonOverlappingRangeTree::new();
        let mut claimed_insertions = NonOverlappingRangeTree::new();

        let finished = self.match_blocks(
            &deletions,
            &insertions,
            &mut moves,
            &mut claimed_deletions,
            &mut claimed_insertions,
        ) && self.match_lines(
            &deletions,
            &insertions,
            &mut moves,
            &mut claimed_deletions,
            &mut claimed_insertions,
        );

        if !finished {
            warn!(
                moves = moves.len(),
                "move detection ran out of time, returning partial result"
            );
        }
        debug!(moves = moves.len(), "move detection finished");
        moves
    }

    /// Phase 1: whole runs. Returns false when the deadline expired.
    fn match_blocks(
        &self,
        deletions: &[Block<'_>],
        insertions: &[Block<'_>],
        moves: &mut Moves,
        claimed_deletions: &mut NonOverlappingRangeTree,
        claimed_insertions: &mut NonOverlappingRangeTree,
    ) -> bool {
        let min_lines = self.options.min_block_lines;

        for deletion in deletions.iter().filter(|b| b.lines.len() >= min_lines) {
            if self.deadline.expired() {
                return false;
            }

            // (score, distance, insertion)
            let mut best: Option<(f64, usize, &Block<'_>)> = None;
            for insertion in insertions.iter().filter(|b| b.lines.len() >= min_lines) {
                if insertion.index == deletion.index + 1
                    || claimed_insertions.overlaps(&insertion.lines)
                {
                    continue;
                }
                let distance = insertion.lines.start.abs_diff(deletion.lines.start);
                if distance > self.options.max_line_distance {
                    continue;
                }
                let score = similarity(deletion.text, insertion.text);
                if score < self.options.block_similarity {
                    continue;
                }
                let better = best.map_or(true, |(best_score, best_distance, _)| {
                    score > best_score || (score == best_score && distance < best_distance)
                });
                if better {
                    best = Some((score, distance, insertion));
                }
            }

            if let Some((score, _, insertion)) = best {
                if claimed_deletions.try_insert(deletion.lines.clone())
                    && claimed_insertions.try_insert(insertion.lines.clone())
                {
                    moves.record(deletion.lines.clone(), insertion.lines.clone(), score);
                }
            }
        }
        true
    }

    /// Phase 2: single lines, extended over their neighbours. Returns false
    /// when the deadline expired.
    fn match_lines(
        &self,
        deletions: &[Block<'_>],
        insertions: &[Block<'_>],
        moves: &mut Moves,
        claimed_deletions: &mut NonOverlappingRangeTree,
        claimed_insertions: &mut NonOverlappingRangeTree,
    ) -> bool {
        let deleted = unclaimed_lines(deletions, claimed_deletions);
        let inserted = unclaimed_lines(insertions, claimed_insertions);
        let long_enough =
            |line: &Line<'_>| line.text.trim().chars().count() >= self.options.min_line_length;

        let mut candidates: MoveRangeList<Candidate> = MoveRangeList::new();
        let mut finished = true;

        for (&del_line, del) in deleted.iter().filter(|&(_, line)| long_enough(line)) {
            if self.deadline.expired() {
                finished = false;
                break;
            }
            if candidates.is_wrapped(&(del_line..del_line + 1)) {
                continue;
            }

            // (score, distance, line number)
            let mut best: Option<(f64, usize, usize)> = None;
            for (&ins_line, ins) in inserted.iter().filter(|&(_, line)| long_enough(line)) {
                if ins.index == del.index + 1 {
                    continue;
                }
                let distance = ins_line.abs_diff(del_line);
                if distance > self.options.max_line_distance {
                    continue;
                }
                let score = similarity(del.text, ins.text);
                if score < self.options.line_similarity {
                    continue;
                }
                let better = best.map_or(true, |(best_score, best_distance, _)| {
                    score > best_score || (score == best_score && distance < best_distance)
                });
                if better {
                    best = Some((score, distance, ins_line));
                }
            }

            if let Some((_, _, ins_line)) = best {
                let candidate = self.extend(&deleted, &inserted, del_line, ins_line);
                candidates.insert(candidate.deletion.clone(), candidate);
            }
        }

        let mut ordered: Vec<Candidate> = candidates.into_values().collect();
        ordered.sort_by(|a, b| {
            b.deletion
                .len()
                .cmp(&a.deletion.len())
                .then(a.deletion.start.cmp(&b.deletion.start))
        });
        for candidate in ordered {
            if claimed_deletions.overlaps(&candidate.deletion)
                || claimed_insertions.overlaps(&candidate.insertion)
            {
                continue;
            }
            claimed_deletions.try_insert(candidate.deletion.clone());
            claimed_insertions.try_insert(candidate.insertion.clone());
            moves.record(candidate.deletion, candidate.insertion, candidate.score);
        }
        finished
    }

    /// Grow a seed pair backwards and forwards over neighbouring line pairs
    /// that are similar enough
    fn extend(
        &self,
        deleted: &BTreeMap<usize, Line<'_>>,
        inserted: &BTreeMap<usize, Line<'_>>,
        del_line: usize,
        ins_line: usize,
    ) -> Candidate {
        let threshold = if self.options.partial_matching {
            self.options.partial_similarity
        } else {
            self.options.line_similarity
        };
        let pair_matches = |d: usize, i: usize| match (deleted.get(&d), inserted.get(&i)) {
            (Some(del), Some(ins)) => {
                ins.index != del.index + 1 && similarity(del.text, ins.text) >= threshold
            }
            _ => false,
        };

        let mut back = 0;
        while del_line > back
            && ins_line > back
            && pair_matches(del_line - back - 1, ins_line - back - 1)
        {
            back += 1;
        }
        let mut forward = 1;
        while pair_matches(del_line + forward, ins_line + forward) {
            forward += 1;
        }

        let deletion = del_line - back..del_line + forward;
        let insertion = ins_line - back..ins_line + forward;
        let score = average_similarity(deletion.clone().zip(insertion.clone()).filter_map(
            |(d, i)| Some((deleted.get(&d)?.text, inserted.get(&i)?.text)),
        ));
        Candidate {
            deletion,
            insertion,
            score,
        }
    }
}

fn blocks(edits: &[EnhancedEdit], op: Operation) -> Vec<Block<'_>> {
    edits
        .iter()
        .enumerate()
        .filter(|(_, edit)| edit.op == op && edit.line_count() > 0)
        .map(|(index, edit)| Block {
            index,
            lines: edit.line_start as usize..edit.line_end_exclusive as usize,
            text: &edit.text,
        })
        .collect()
}

/// Every line of `blocks` outside the claimed ranges, by line number
fn unclaimed_lines<'a>(
    blocks: &[Block<'a>],
    claimed: &NonOverlappingRangeTree,
) -> BTreeMap<usize, Line<'a>> {
    blocks
        .iter()
        .flat_map(|block| {
            block
                .lines
                .clone()
                .zip(block.text.split_inclusive('\n'))
                .map(move |(number, text)| {
                    (
                        number,
                        Line {
                            index: block.index,
                            text,
                        },
                    )
                })
        })
        .filter(|(number, _)| !claimed.contains(*number))
        .collect()
}
