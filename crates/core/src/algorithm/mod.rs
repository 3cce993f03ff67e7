//! Sequence diff algorithms
//!
//! Both engines work on slices of an opaque [`Token`] type: line and word ids
//! produced by the tokenizers, or plain `char`s for character level diffs.
pub mod bisect;
pub mod dynamic;
pub mod line_mode;

pub use bisect::BisectionEngine;
pub use dynamic::DynamicProgrammingEngine;

use crate::clock::Deadline;
use crate::diff::Operation;
use std::fmt::Debug;
use std::hash::Hash;

/// A unit the engines can compare
pub trait Token: Clone + Eq + Hash + Debug {
    /// Whether this token ends a line; enables the line-mode speedup
    fn is_line_break(&self) -> bool {
        false
    }
}

impl Token for char {
    fn is_line_break(&self) -> bool {
        *self == '\n'
    }
}

impl Token for u32 {}

/// A contiguous run of tokens with one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run<T> {
    pub op: Operation,
    pub tokens: Vec<T>,
}

impl<T> Run<T> {
    pub fn new(op: Operation, tokens: Vec<T>) -> Self {
        Self { op, tokens }
    }

    pub fn equal(tokens: Vec<T>) -> Self {
        Self::new(Operation::Equal, tokens)
    }

    pub fn delete(tokens: Vec<T>) -> Self {
        Self::new(Operation::Delete, tokens)
    }

    pub fn insert(tokens: Vec<T>) -> Self {
        Self::new(Operation::Insert, tokens)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// An ordered edit script over tokens
pub type Script<T> = Vec<Run<T>>;

/// Trait for sequence diff algorithms
pub trait DiffAlgorithm {
    /// Compute an edit script turning `original` into `modified`
    fn compute<T: Token>(
        &self,
        original: &[T],
        modified: &[T],
        deadline: &Deadline<'_>,
    ) -> Script<T>;
}

/// Which engine a diff should run on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    /// Exact weighted LCS, quadratic in time and space
    DynamicProgramming,
    /// Myers bisection with a deadline
    Bisection {
        /// Try the line-mode speedup on long character streams
        line_mode: bool,
    },
}

impl Engine {
    /// The DP engine while `total_tokens` fits under `ceiling`, bisection beyond
    pub fn select(total_tokens: usize, ceiling: usize, line_mode: bool) -> Self {
        if total_tokens <= ceiling {
            Self::DynamicProgramming
        } else {
            Self::Bisection { line_mode }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DynamicProgramming => "dynamic-programming",
            Self::Bisection { .. } => "bisection",
        }
    }
}

impl DiffAlgorithm for Engine {
    fn compute<T: Token>(
        &self,
        original: &[T],
        modified: &[T],
        deadline: &Deadline<'_>,
    ) -> Script<T> {
        match *self {
            Self::DynamicProgramming => {
                DynamicProgrammingEngine::new().compute(original, modified, deadline)
            }
            Self::Bisection { line_mode } => BisectionEngine::new()
                .with_line_mode(line_mode)
                .compute(original, modified, deadline),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Length of the common prefix of two sequences
pub fn common_prefix<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Length of the common suffix of two sequences
pub fn common_suffix<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

/// First position at or after `from` where `needle` occurs in `haystack`
pub fn find_subslice<T: PartialEq>(haystack: &[T], needle: &[T], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return (from <= haystack.len()).then_some(from);
    }
    if from >= haystack.len() || haystack.len() - from < needle.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

/// Length of the longest suffix of `a` that is also a prefix of `b`
pub fn common_overlap<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    let len = a.len().min(b.len());
    if len == 0 {
        return 0;
    }
    let a = &a[a.len() - len..];
    let b = &b[..len];
    if a == b {
        return len;
    }

    // Grow a candidate suffix; each time its pattern is found in `b`, jump
    // ahead by the offset at which it was found.
    let mut best = 0;
    let mut length = 1;
    loop {
        let pattern = &a[len - length..];
        let Some(found) = find_subslice(b, pattern, 0) else {
            return best;
        };
        length += found;
        if found == 0 || a[len - length..] == b[..length] {
            best = length;
            length += 1;
        }
        if length > len {
            return best;
        }
    }
}

/// Total number of inserted and deleted tokens in a script
pub fn edit_len<T>(script: &[Run<T>]) -> usize {
    script
        .iter()
        .filter(|run| run.op != Operation::Equal)
        .map(Run::len)
        .sum()
}

/// The original side of a script
pub fn source_tokens<T: Clone>(script: &[Run<T>]) -> Vec<T> {
    script
        .iter()
        .filter(|run| run.op != Operation::Insert)
        .flat_map(|run| run.tokens.iter().cloned())
        .collect()
}

/// The modified side of a script
pub fn target_tokens<T: Clone>(script: &[Run<T>]) -> Vec<T> {
    script
        .iter()
        .filter(|run| run.op != Operation::Delete)
        .flat_map(|run| run.tokens.iter().cloned())
        .collect()
}

/// Append tokens to a script, extending the last run when the operation matches
pub(crate) fn push_tokens<T>(script: &mut Script<T>, op: Operation, tokens: impl IntoIterator<Item = T>) {
    let mut tokens = tokens.into_iter().peekable();
    if tokens.peek().is_none() {
        return;
    }
    match script.last_mut() {
        Some(last) if last.op == op => last.tokens.extend(tokens),
        _ => script.push(Run::new(op, tokens.collect())),
    }
}
