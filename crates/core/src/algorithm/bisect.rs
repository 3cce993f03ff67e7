//! Myers bisection diff
//!
//! Divide and conquer over the edit graph: strip the common affixes, try a
//! handful of cheap shortcuts, otherwise find a middle snake and recurse on
//! both halves. Among the overlap points of the first d-layer where the two
//! frontiers meet, the split is taken at the one whose forward and reverse
//! snakes are longest, so long equal runs are not cut in two.

use crate::algorithm::{
    common_prefix, common_suffix, find_subslice, line_mode, push_tokens, DiffAlgorithm, Run,
    Script, Token,
};
use crate::cleanup;
use crate::clock::Deadline;
use crate::diff::Operation;
use tracing::warn;

/// Minimum length of both sides before the line-mode speedup is tried
const LINE_MODE_MIN_LEN: usize = 100;

/// Heuristic O(ND) diff with a cooperative deadline
///
/// When the deadline passes mid-bisection the remaining span degrades to a
/// plain delete/insert pair. A bounded deadline also enables the half-match
/// shortcut, which trades minimality for speed.
#[derive(Debug, Clone, Copy, Default)]
pub struct BisectionEngine {
    line_mode: bool,
}

impl BisectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diff long newline-bearing inputs line by line first
    pub fn with_line_mode(mut self, line_mode: bool) -> Self {
        self.line_mode = line_mode;
        self
    }
}

impl DiffAlgorithm for BisectionEngine {
    fn compute<T: Token>(
        &self,
        original: &[T],
        modified: &[T],
        deadline: &Deadline<'_>,
    ) -> Script<T> {
        main_diff(original, modified, deadline, self.line_mode)
    }
}

/// Diff two sequences: affix stripping, shortcuts, bisection, then merge
pub(crate) fn main_diff<T: Token>(
    a: &[T],
    b: &[T],
    deadline: &Deadline<'_>,
    line_mode: bool,
) -> Script<T> {
    if a == b {
        return if a.is_empty() {
            Vec::new()
        } else {
            vec![Run::equal(a.to_vec())]
        };
    }

    let prefix = common_prefix(a, b);
    let (a_rest, b_rest) = (&a[prefix..], &b[prefix..]);
    let suffix = common_suffix(a_rest, b_rest);
    let middle_a = &a_rest[..a_rest.len() - suffix];
    let middle_b = &b_rest[..b_rest.len() - suffix];

    let mut script = Vec::new();
    push_tokens(&mut script, Operation::Equal, a[..prefix].iter().cloned());
    for run in compute(middle_a, middle_b, deadline, line_mode) {
        push_tokens(&mut script, run.op, run.tokens);
    }
    push_tokens(
        &mut script,
        Operation::Equal,
        a_rest[a_rest.len() - suffix..].iter().cloned(),
    );

    cleanup::merge(script)
}

/// Diff two sequences that share no common prefix or suffix
fn compute<T: Token>(a: &[T], b: &[T], deadline: &Deadline<'_>, line_mode: bool) -> Script<T> {
    if a.is_empty() {
        return vec![Run::insert(b.to_vec())];
    }
    if b.is_empty() {
        return vec![Run::delete(a.to_vec())];
    }

    let a_longer = a.len() > b.len();
    let (long, short) = if a_longer { (a, b) } else { (b, a) };

    if let Some(at) = find_subslice(long, short, 0) {
        let op = if a_longer {
            Operation::Delete
        } else {
            Operation::Insert
        };
        let mut script = Vec::new();
        push_tokens(&mut script, op, long[..at].iter().cloned());
        push_tokens(&mut script, Operation::Equal, short.iter().cloned());
        push_tokens(&mut script, op, long[at + short.len()..].iter().cloned());
        return script;
    }

    if short.len() == 1 {
        return vec![Run::delete(a.to_vec()), Run::insert(b.to_vec())];
    }

    // Only worth the non-minimal result when there is a time limit.
    if deadline.is_bounded() {
        if let Some(hm) = half_match(a, b) {
            let mut script = main_diff(&a[..hm.a_at], &b[..hm.b_at], deadline, line_mode);
            push_tokens(
                &mut script,
                Operation::Equal,
                a[hm.a_at..hm.a_at + hm.len].iter().cloned(),
            );
            let tail = main_diff(
                &a[hm.a_at + hm.len..],
                &b[hm.b_at + hm.len..],
                deadline,
                line_mode,
            );
            for run in tail {
                push_tokens(&mut script, run.op, run.tokens);
            }
            return script;
        }
    }

    if line_mode
        && a.len() > LINE_MODE_MIN_LEN
        && b.len() > LINE_MODE_MIN_LEN
        && (a.iter().any(Token::is_line_break) || b.iter().any(Token::is_line_break))
    {
        return line_mode::diff(a, b, deadline);
    }

    bisect(a, b, deadline)
}

/// A common span at least half as long as the longer input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HalfMatch {
    /// Start of the common span in the original
    pub a_at: usize,
    /// Start of the common span in the modified sequence
    pub b_at: usize,
    pub len: usize,
}

/// Look for a common span of at least half the longer input, seeded at the
/// second and third quarters of the longer side
pub(crate) fn half_match<T: Token>(a: &[T], b: &[T]) -> Option<HalfMatch> {
    let a_longer = a.len() > b.len();
    let (long, short) = if a_longer { (a, b) } else { (b, a) };
    if long.len() < 4 || short.len() * 2 < long.len() {
        return None;
    }

    let first = half_match_at(long, short, long.len().div_ceil(4));
    let second = half_match_at(long, short, long.len().div_ceil(2));
    let (long_at, short_at, len) = match (first, second) {
        (None, None) => return None,
        (Some(hm), None) | (None, Some(hm)) => hm,
        (Some(one), Some(two)) => {
            if one.2 > two.2 {
                one
            } else {
                two
            }
        }
    };

    Some(if a_longer {
        HalfMatch {
            a_at: long_at,
            b_at: short_at,
            len,
        }
    } else {
        HalfMatch {
            a_at: short_at,
            b_at: long_at,
            len,
        }
    })
}

/// Best common span around a quarter-length seed of `long` starting at `i`
///
/// Returns `(start in long, start in short, length)`.
fn half_match_at<T: Token>(long: &[T], short: &[T], i: usize) -> Option<(usize, usize, usize)> {
    let seed = &long[i..i + long.len() / 4];
    let mut best: Option<(usize, usize, usize)> = None;

    let mut from = 0;
    while let Some(j) = find_subslice(short, seed, from) {
        let prefix = common_prefix(&long[i..], &short[j..]);
        let suffix = common_suffix(&long[..i], &short[..j]);
        if best.map_or(0, |(_, _, len)| len) < prefix + suffix {
            best = Some((i - suffix, j - suffix, prefix + suffix));
        }
        from = j + 1;
    }

    best.filter(|&(_, _, len)| len * 2 >= long.len())
}

/// An overlap between the forward and reverse frontiers
#[derive(Debug, Clone, Copy)]
struct Overlap {
    /// Combined length of the two snakes meeting here
    run: isize,
    x: usize,
    y: usize,
}

/// First overlap with the longest combined snake
fn best_overlap(overlaps: &[Overlap]) -> Option<Overlap> {
    let mut best: Option<Overlap> = None;
    for &overlap in overlaps {
        if best.map_or(true, |b| overlap.run > b.run) {
            best = Some(overlap);
        }
    }
    best
}

/// Find the middle snake and split the problem there
fn bisect<T: Token>(a: &[T], b: &[T], deadline: &Deadline<'_>) -> Script<T> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let max_d = (n + m + 1) / 2;
    let v_offset = max_d;
    let v_len = (2 * max_d + 2) as usize;

    // Furthest x reached per diagonal, and the length of the snake that got there.
    let mut v1 = vec![-1isize; v_len];
    let mut v2 = vec![-1isize; v_len];
    let mut r1 = vec![0isize; v_len];
    let mut r2 = vec![0isize; v_len];
    v1[(v_offset + 1) as usize] = 0;
    v2[(v_offset + 1) as usize] = 0;

    let delta = n - m;
    // With an odd delta the frontiers can only meet on a forward step.
    let front = delta % 2 != 0;
    let (mut k1_start, mut k1_end, mut k2_start, mut k2_end) = (0isize, 0isize, 0isize, 0isize);
    let mut overlaps: Vec<Overlap> = Vec::new();

    for d in 0..max_d {
        if deadline.expired() {
            warn!(
                original = a.len(),
                modified = b.len(),
                d,
                "bisection deadline expired, falling back to full replacement"
            );
            break;
        }

        let mut k1 = -d + k1_start;
        while k1 <= d - k1_end {
            let k1_offset = (v_offset + k1) as usize;
            let mut x1 = if k1 == -d || (k1 != d && v1[k1_offset - 1] < v1[k1_offset + 1]) {
                v1[k1_offset + 1]
            } else {
                v1[k1_offset - 1] + 1
            };
            let mut y1 = x1 - k1;
            let snake_start = x1;
            while x1 < n && y1 < m && a[x1 as usize] == b[y1 as usize] {
                x1 += 1;
                y1 += 1;
            }
            v1[k1_offset] = x1;
            r1[k1_offset] = x1 - snake_start;

            if x1 > n {
                k1_end += 2;
            } else if y1 > m {
                k1_start += 2;
            } else if front {
                let k2_offset = v_offset + delta - k1;
                if k2_offset >= 0 && (k2_offset as usize) < v_len {
                    let k2_offset = k2_offset as usize;
                    if v2[k2_offset] != -1 && x1 >= n - v2[k2_offset] {
                        overlaps.push(Overlap {
                            run: r1[k1_offset] + r2[k2_offset],
                            x: x1 as usize,
                            y: y1 as usize,
                        });
                    }
                }
            }
            k1 += 2;
        }
        if let Some(split) = best_overlap(&overlaps) {
            return bisect_split(a, b, split.x, split.y, deadline);
        }

        let mut k2 = -d + k2_start;
        while k2 <= d - k2_end {
            let k2_offset = (v_offset + k2) as usize;
            let mut x2 = if k2 == -d || (k2 != d && v2[k2_offset - 1] < v2[k2_offset + 1]) {
                v2[k2_offset + 1]
            } else {
                v2[k2_offset - 1] + 1
            };
            let mut y2 = x2 - k2;
            let snake_start = x2;
            while x2 < n && y2 < m && a[(n - x2 - 1) as usize] == b[(m - y2 - 1) as usize] {
                x2 += 1;
                y2 += 1;
            }
            v2[k2_offset] = x2;
            r2[k2_offset] = x2 - snake_start;

            if x2 > n {
                k2_end += 2;
            } else if y2 > m {
                k2_start += 2;
            } else if !front {
                let k1_offset = v_offset + delta - k2;
                if k1_offset >= 0 && (k1_offset as usize) < v_len {
                    let k1_offset = k1_offset as usize;
                    let x1 = v1[k1_offset];
                    if x1 != -1 {
                        let y1 = v_offset + x1 - k1_offset as isize;
                        if x1 >= n - x2 {
                            overlaps.push(Overlap {
                                run: r1[k1_offset] + r2[k2_offset],
                                x: x1 as usize,
                                y: y1 as usize,
                            });
                        }
                    }
                }
            }
            k2 += 2;
        }
        if let Some(split) = best_overlap(&overlaps) {
            return bisect_split(a, b, split.x, split.y, deadline);
        }
    }

    vec![Run::delete(a.to_vec()), Run::insert(b.to_vec())]
}

/// Diff the two halves around `(x, y)` independently and join them
fn bisect_split<T: Token>(
    a: &[T],
    b: &[T],
    x: usize,
    y: usize,
    deadline: &Deadline<'_>,
) -> Script<T> {
    let mut script = main_diff(&a[..x], &b[..y], deadline, false);
    for run in main_diff(&a[x..], &b[y..], deadline, false) {
        push_tokens(&mut script, run.op, run.tokens);
    }
    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::tests::{chars, render};
    use crate::algorithm::{edit_len, source_tokens, target_tokens};
    use crate::clock::{ManualClock, SystemClock};
    use crate::diff::Operation::{Delete, Equal, Insert};
    use std::time::Duration;
    use tracing_test::traced_test;

    fn diff(a: &str, b: &str, deadline: &Deadline<'_>) -> Vec<(Operation, String)> {
        render(&BisectionEngine::new().compute(&chars(a), &chars(b), deadline))
    }

    fn owned(ops: &[(Operation, &str)]) -> Vec<(Operation, String)> {
        ops.iter().map(|(op, s)| (*op, s.to_string())).collect()
    }

    #[test]
    fn test_trivial_cases() {
        let none = Deadline::unbounded();
        assert!(diff("", "", &none).is_empty());
        assert_eq!(diff("abc", "abc", &none), owned(&[(Equal, "abc")]));
        assert_eq!(
            diff("abc", "ab123c", &none),
            owned(&[(Equal, "ab"), (Insert, "123"), (Equal, "c")])
        );
        assert_eq!(
            diff("a123bc", "abc", &none),
            owned(&[(Equal, "a"), (Delete, "123"), (Equal, "bc")])
        );
        assert_eq!(diff("a", "b", &none), owned(&[(Delete, "a"), (Insert, "b")]));
    }

    #[test]
    fn test_kitten_sitting() {
        let a = chars("kitten");
        let b = chars("sitting");
        let script = BisectionEngine::new().compute(&a, &b, &Deadline::unbounded());
        assert_eq!(source_tokens(&script), a);
        assert_eq!(target_tokens(&script), b);
        assert_eq!(edit_len(&script), 5);
    }

    #[test]
    fn test_bisection_finds_minimal_script() {
        let a = chars("The quick brown fox jumps over the lazy dog");
        let b = chars("The quick red fox leaps over the dog");
        let script = BisectionEngine::new().compute(&a, &b, &Deadline::unbounded());
        assert_eq!(source_tokens(&script), a);
        assert_eq!(target_tokens(&script), b);

        let dp = crate::algorithm::DynamicProgrammingEngine::new().compute(
            &a,
            &b,
            &Deadline::unbounded(),
        );
        assert_eq!(edit_len(&script), edit_len(&dp));
    }

    #[test]
    fn test_half_match() {
        let hm = half_match(&chars("1234567890"), &chars("a345678z"));
        assert_eq!(
            hm,
            Some(HalfMatch {
                a_at: 2,
                b_at: 1,
                len: 6
            })
        );

        let hm = half_match(&chars("qHilloHelloHew"), &chars("xHelloHeHulloy"));
        assert_eq!(
            hm,
            Some(HalfMatch {
                a_at: 6,
                b_at: 1,
                len: 7
            })
        );

        assert_eq!(half_match(&chars("1234567890"), &chars("abcdef")), None);
        assert_eq!(half_match(&chars("12345"), &chars("23")), None);
    }

    #[test]
    fn test_half_match_only_with_deadline() {
        let clock = SystemClock;
        let bounded = Deadline::after(&clock, Some(Duration::from_secs(60)));
        assert_eq!(
            diff("1234567890", "a345678z", &bounded),
            owned(&[
                (Delete, "12"),
                (Insert, "a"),
                (Equal, "345678"),
                (Delete, "90"),
                (Insert, "z"),
            ])
        );
    }

    #[test]
    fn test_expired_deadline_degrades_to_replacement() {
        let clock = ManualClock::new().with_auto_advance(Duration::from_secs(2));
        let deadline = Deadline::after(&clock, Some(Duration::from_secs(1)));
        assert_eq!(
            diff("abcdefghij", "jihgfedcba", &deadline),
            owned(&[(Delete, "abcdefghij"), (Insert, "jihgfedcba")])
        );
    }

    #[test]
    #[traced_test]
    fn test_expired_deadline_is_logged() {
        let clock = ManualClock::new().with_auto_advance(Duration::from_secs(2));
        let deadline = Deadline::after(&clock, Some(Duration::from_secs(1)));
        let _ = diff("abcdefghij", "jihgfedcba", &deadline);
        assert!(logs_contain("bisection deadline expired"));
    }

    #[test]
    fn test_split_prefers_long_runs() {
        // A shared block surrounded by changes stays in one equal run.
        let a = chars("xxSHAREDBLOCKyy");
        let b = chars("zSHAREDBLOCKw");
        let script = BisectionEngine::new().compute(&a, &b, &Deadline::unbounded());
        let equal: Vec<String> = render(&script)
            .into_iter()
            .filter(|(op, _)| *op == Equal)
            .map(|(_, text)| text)
            .collect();
        assert_eq!(equal, vec!["SHAREDBLOCK".to_string()]);
    }
}
