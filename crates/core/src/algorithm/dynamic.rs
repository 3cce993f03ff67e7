use crate::algorithm::{push_tokens, DiffAlgorithm, Script, Token};
use crate::clock::Deadline;
use crate::diff::Operation;

/// Per-pair weight of a match between `original[i]` and `modified[j]`
pub type MatchWeight = dyn Fn(usize, usize) -> u32 + Send + Sync;

const DIAGONAL: u8 = 0;
const UP: u8 = 1;
const LEFT: u8 = 2;

/// Exact weighted LCS over a full score table
///
/// Each match scores its weight plus a bonus equal to the length of the
/// diagonal run it extends, so among scripts with the same LCS weight the
/// one with the longest contiguous equal spans wins. The bonus is scaled
/// below one unit of weight: it only ever breaks ties.
///
/// Quadratic in time and space; callers pick it only below a size ceiling.
#[derive(Default)]
pub struct DynamicProgrammingEngine {
    weight: Option<Box<MatchWeight>>,
}

impl DynamicProgrammingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom match weight instead of 1 per matched token
    pub fn with_weight(mut self, weight: Box<MatchWeight>) -> Self {
        self.weight = Some(weight);
        self
    }

    fn weight_of(&self, i: usize, j: usize) -> u64 {
        self.weight.as_ref().map_or(1, |w| u64::from(w(i, j)))
    }
}

impl DiffAlgorithm for DynamicProgrammingEngine {
    fn compute<T: Token>(
        &self,
        original: &[T],
        modified: &[T],
        _deadline: &Deadline<'_>,
    ) -> Script<T> {
        let n = original.len();
        let m = modified.len();

        let mut script = Vec::new();
        if n == 0 || m == 0 {
            push_tokens(&mut script, Operation::Delete, original.iter().cloned());
            push_tokens(&mut script, Operation::Insert, modified.iter().cloned());
            return script;
        }

        // The run bonuses along any path sum to at most k(k-1)/2. Scores
        // saturate, so extreme weights degrade tie-breaking but never wrap.
        let k = n.min(m) as u64;
        let scale = (k.saturating_mul(k.saturating_sub(1)) / 2).saturating_add(1);

        let mut prev_score = vec![0u64; m + 1];
        let mut cur_score = vec![0u64; m + 1];
        let mut prev_run = vec![0u64; m + 1];
        let mut cur_run = vec![0u64; m + 1];
        let mut direction = vec![LEFT; n * m];

        for i in 1..=n {
            cur_score[0] = 0;
            cur_run[0] = 0;
            for j in 1..=m {
                let up = prev_score[j];
                let left = cur_score[j - 1];
                let (mut best, mut dir) = if left >= up { (left, LEFT) } else { (up, UP) };
                let mut run = 0;

                if original[i - 1] == modified[j - 1] {
                    let diagonal = prev_score[j - 1]
                        .saturating_add(self.weight_of(i - 1, j - 1).saturating_mul(scale))
                        .saturating_add(prev_run[j - 1]);
                    if diagonal >= best {
                        best = diagonal;
                        dir = DIAGONAL;
                        run = prev_run[j - 1] + 1;
                    }
                }

                cur_score[j] = best;
                cur_run[j] = run;
                direction[(i - 1) * m + (j - 1)] = dir;
            }
            std::mem::swap(&mut prev_score, &mut cur_score);
            std::mem::swap(&mut prev_run, &mut cur_run);
        }

        // Walk back from the bottom-right cell.
        let mut reversed: Vec<(Operation, &T)> = Vec::with_capacity(n + m);
        let (mut i, mut j) = (n, m);
        while i > 0 && j > 0 {
            match direction[(i - 1) * m + (j - 1)] {
                DIAGONAL => {
                    reversed.push((Operation::Equal, &original[i - 1]));
                    i -= 1;
                    j -= 1;
                }
                UP => {
                    reversed.push((Operation::Delete, &original[i - 1]));
                    i -= 1;
                }
                _ => {
                    reversed.push((Operation::Insert, &modified[j - 1]));
                    j -= 1;
                }
            }
        }
        while i > 0 {
            reversed.push((Operation::Delete, &original[i - 1]));
            i -= 1;
        }
        while j > 0 {
            reversed.push((Operation::Insert, &modified[j - 1]));
            j -= 1;
        }

        for (op, token) in reversed.into_iter().rev() {
            push_tokens(&mut script, op, std::iter::once(token.clone()));
        }
        script
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::tests::{chars, render};
    use crate::algorithm::{edit_len, source_tokens, target_tokens};
    use crate::diff::Operation::{Delete, Equal, Insert};

    fn dp(a: &str, b: &str) -> Vec<(Operation, String)> {
        let script = DynamicProgrammingEngine::new().compute(
            &chars(a),
            &chars(b),
            &Deadline::unbounded(),
        );
        render(&script)
    }

    #[test]
    fn test_kitten_sitting() {
        assert_eq!(
            dp("kitten", "sitting"),
            vec![
                (Delete, "k".to_string()),
                (Insert, "s".to_string()),
                (Equal, "itt".to_string()),
                (Delete, "e".to_string()),
                (Insert, "i".to_string()),
                (Equal, "n".to_string()),
                (Insert, "g".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_sides() {
        assert_eq!(dp("", "abc"), vec![(Insert, "abc".to_string())]);
        assert_eq!(dp("abc", ""), vec![(Delete, "abc".to_string())]);
        assert!(dp("", "").is_empty());
    }

    #[test]
    fn test_prefers_contiguous_runs() {
        // "ABC" can match the scattered A, B, C near the front or the
        // contiguous ABC at the end; both have LCS 3.
        let a = [1u32, 2, 3];
        let b = [1u32, 9, 2, 3, 8, 1, 2, 3];
        let script = DynamicProgrammingEngine::new().compute(&a, &b, &Deadline::unbounded());
        assert_eq!(
            script,
            vec![
                crate::algorithm::Run::insert(vec![1, 9, 2, 3, 8]),
                crate::algorithm::Run::equal(vec![1, 2, 3]),
            ]
        );
    }

    #[test]
    fn test_weighted_matches() {
        // Token 7 is worth more than two matches of token 1.
        let a = [1u32, 1, 7];
        let b = [7u32, 1, 1];
        let engine = DynamicProgrammingEngine::new().with_weight(Box::new(|i, _| {
            if i == 2 {
                5
            } else {
                1
            }
        }));
        let script = engine.compute(&a, &b, &Deadline::unbounded());
        assert_eq!(source_tokens(&script), a.to_vec());
        assert_eq!(target_tokens(&script), b.to_vec());
        let kept: Vec<u32> = script
            .iter()
            .filter(|run| run.op == Equal)
            .flat_map(|run| run.tokens.clone())
            .collect();
        assert_eq!(kept, vec![7]);
        assert_eq!(edit_len(&script), 4);
    }

    #[test]
    fn test_maximum_weights() {
        let a: Vec<u32> = (0..64).collect();
        let engine = DynamicProgrammingEngine::new().with_weight(Box::new(|_, _| u32::MAX));
        let script = engine.compute(&a, &a, &Deadline::unbounded());
        assert_eq!(script, vec![crate::algorithm::Run::equal(a.clone())]);

        let b: Vec<u32> = (0..64).filter(|id| id % 3 != 0).collect();
        let script = engine.compute(&a, &b, &Deadline::unbounded());
        assert_eq!(source_tokens(&script), a);
        assert_eq!(target_tokens(&script), b);
    }
}
