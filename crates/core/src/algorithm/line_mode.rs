//! Line-mode speedup for long token streams
//!
//! Diff whole lines first, then re-diff only the spans where deleted and
//! inserted lines sit next to each other. Much faster on large inputs, at the
//! cost of a slightly less minimal script.

use crate::algorithm::bisect::main_diff;
use crate::algorithm::{push_tokens, Run, Script, Token};
use crate::cleanup;
use crate::clock::Deadline;
use crate::diff::Operation;
use rustc_hash::FxHashMap;

/// Lines of both inputs, each distinct line mapped to one id
struct LineIndex<'t, T> {
    lines: Vec<&'t [T]>,
    ids: FxHashMap<&'t [T], u32>,
}

impl<'t, T: Token> LineIndex<'t, T> {
    fn new() -> Self {
        Self {
            lines: Vec::new(),
            ids: FxHashMap::default(),
        }
    }

    fn encode(&mut self, tokens: &'t [T]) -> Vec<u32> {
        tokens
            .split_inclusive(Token::is_line_break)
            .map(|line| {
                if let Some(&id) = self.ids.get(line) {
                    return id;
                }
                let id = self.lines.len() as u32;
                self.lines.push(line);
                self.ids.insert(line, id);
                id
            })
            .collect()
    }

    fn decode(&self, script: Script<u32>) -> Script<T> {
        script
            .into_iter()
            .map(|run| {
                let tokens = run
                    .tokens
                    .iter()
                    .filter_map(|&id| self.lines.get(id as usize))
                    .flat_map(|line| line.iter().cloned())
                    .collect();
                Run::new(run.op, tokens)
            })
            .collect()
    }
}

/// Line-first diff of `a` and `b`
pub fn diff<T: Token>(a: &[T], b: &[T], deadline: &Deadline<'_>) -> Script<T> {
    let mut index = LineIndex::new();
    let a_lines = index.encode(a);
    let b_lines = index.encode(b);

    let coarse = main_diff(&a_lines, &b_lines, deadline, false);
    let coarse = cleanup::semantic(index.decode(coarse), None);

    let mut script = Vec::new();
    let mut deleted: Vec<T> = Vec::new();
    let mut inserted: Vec<T> = Vec::new();
    for run in coarse {
        match run.op {
            Operation::Delete => deleted.extend(run.tokens),
            Operation::Insert => inserted.extend(run.tokens),
            Operation::Equal => {
                flush(&mut script, &mut deleted, &mut inserted, deadline);
                push_tokens(&mut script, Operation::Equal, run.tokens);
            }
        }
    }
    flush(&mut script, &mut deleted, &mut inserted, deadline);
    script
}

/// Emit a pending edit cluster, re-diffing it token by token when it holds
/// both deletions and insertions
fn flush<T: Token>(
    script: &mut Script<T>,
    deleted: &mut Vec<T>,
    inserted: &mut Vec<T>,
    deadline: &Deadline<'_>,
) {
    let deleted = std::mem::take(deleted);
    let inserted = std::mem::take(inserted);
    if !deleted.is_empty() && !inserted.is_empty() {
        for run in main_diff(&deleted, &inserted, deadline, false) {
            push_tokens(script, run.op, run.tokens);
        }
    } else {
        push_tokens(script, Operation::Delete, deleted);
        push_tokens(script, Operation::Insert, inserted);
    }
}
