//! Edit script cleanup passes
//!
//! Raw engine output is correct but often hard to read: edits split in odd
//! places, tiny equalities stranded between large changes, changes that
//! start mid-word. Each pass here takes a script by value and returns a new
//! one with the same source and target sequences.

use crate::algorithm::{common_overlap, common_prefix, common_suffix, push_tokens, Run, Script, Token};
use crate::diff::{Edit, Operation};
use unicode_segmentation::UnicodeSegmentation;

/// Boundary sits at the very start or end of the text
pub const BOUNDARY_EDGE: u8 = 6;
/// Boundary follows or precedes an empty line
pub const BOUNDARY_BLANK_LINE: u8 = 5;
pub const BOUNDARY_LINE_BREAK: u8 = 4;
pub const BOUNDARY_END_OF_SENTENCE: u8 = 3;
pub const BOUNDARY_WHITESPACE: u8 = 2;
pub const BOUNDARY_NON_ALPHANUMERIC: u8 = 1;

/// Merge adjacent runs of the same operation and factor shared prefixes and
/// suffixes of each delete/insert cluster into the neighbouring equalities
///
/// A second sweep slides single edits sideways when doing so lets them
/// swallow a neighbouring equality, and repeats until nothing moves.
pub fn merge<T: Token>(script: Script<T>) -> Script<T> {
    let mut out: Script<T> = Vec::with_capacity(script.len());
    let mut deleted: Vec<T> = Vec::new();
    let mut inserted: Vec<T> = Vec::new();

    for run in script.into_iter().filter(|run| !run.is_empty()) {
        match run.op {
            Operation::Delete => deleted.extend(run.tokens),
            Operation::Insert => inserted.extend(run.tokens),
            Operation::Equal => {
                let mut equal = run.tokens;
                flush_cluster(&mut out, &mut deleted, &mut inserted, Some(&mut equal));
                push_tokens(&mut out, Operation::Equal, equal);
            }
        }
    }
    flush_cluster(&mut out, &mut deleted, &mut inserted, None);

    if shift_single_edits(&mut out) {
        merge(out)
    } else {
        out
    }
}

/// Emit one delete/insert cluster, moving its common prefix to the previous
/// equality and its common suffix to `next_equal`
fn flush_cluster<T: Token>(
    out: &mut Script<T>,
    deleted: &mut Vec<T>,
    inserted: &mut Vec<T>,
    next_equal: Option<&mut Vec<T>>,
) {
    let mut deleted = std::mem::take(deleted);
    let mut inserted = std::mem::take(inserted);
    let mut suffix = Vec::new();

    if !deleted.is_empty() && !inserted.is_empty() {
        let prefix = common_prefix(&inserted, &deleted);
        if prefix > 0 {
            push_tokens(out, Operation::Equal, inserted.drain(..prefix));
            deleted.drain(..prefix);
        }
        let common = common_suffix(&inserted, &deleted);
        if common > 0 {
            suffix = inserted.split_off(inserted.len() - common);
            deleted.truncate(deleted.len() - common);
        }
    }

    push_tokens(out, Operation::Delete, deleted);
    push_tokens(out, Operation::Insert, inserted);

    match next_equal {
        Some(next) if !suffix.is_empty() => {
            suffix.append(next);
            *next = suffix;
        }
        _ => push_tokens(out, Operation::Equal, suffix),
    }
}

/// `E1 X E2` where X ends with E1 becomes `X' E1E2`; where X starts with E2
/// it becomes `E1E2 X'`. Returns whether anything moved.
fn shift_single_edits<T: Token>(script: &mut Script<T>) -> bool {
    let mut changed = false;
    let mut i = 1;
    while i + 1 < script.len() {
        if script[i - 1].op == Operation::Equal && script[i + 1].op == Operation::Equal {
            let prev_len = script[i - 1].len();
            let next_len = script[i + 1].len();
            if script[i].tokens.ends_with(&script[i - 1].tokens) {
                let prev = script.remove(i - 1).tokens;
                let edit = &mut script[i - 1].tokens;
                let head = edit[..edit.len() - prev_len].to_vec();
                *edit = prev.iter().cloned().chain(head).collect();
                let next = std::mem::take(&mut script[i].tokens);
                script[i].tokens = prev.into_iter().chain(next).collect();
                changed = true;
            } else if script[i].tokens.starts_with(&script[i + 1].tokens) {
                let next = script.remove(i + 1).tokens;
                script[i - 1].tokens.extend(next.iter().cloned());
                let edit = &mut script[i].tokens;
                let tail = edit.split_off(next_len);
                *edit = tail.into_iter().chain(next).collect();
                changed = true;
            }
        }
        i += 1;
    }
    changed
}

/// Eliminate equalities no longer than the edits on both sides of them
///
/// Such an equality is folded into the surrounding change as a deletion and
/// an insertion, and the search backtracks to re-examine the previous
/// equality. `threshold` caps the size of an equality that may be eliminated.
pub fn semantic<T: Token>(script: Script<T>, threshold: Option<usize>) -> Script<T> {
    let mut script: Script<T> = script.into_iter().filter(|run| !run.is_empty()).collect();
    let mut changed = false;
    let mut equalities: Vec<usize> = Vec::new();
    let mut last_equality: Option<usize> = None;
    // Edit lengths before and after the last equality.
    let (mut inserted_before, mut deleted_before) = (0usize, 0usize);
    let (mut inserted_after, mut deleted_after) = (0usize, 0usize);

    let mut pointer = 0;
    while pointer < script.len() {
        if script[pointer].op == Operation::Equal {
            equalities.push(pointer);
            inserted_before = inserted_after;
            deleted_before = deleted_after;
            inserted_after = 0;
            deleted_after = 0;
            last_equality = Some(script[pointer].len());
            pointer += 1;
            continue;
        }

        if script[pointer].op == Operation::Insert {
            inserted_after += script[pointer].len();
        } else {
            deleted_after += script[pointer].len();
        }

        let eliminate = last_equality.is_some_and(|len| {
            len <= inserted_before.max(deleted_before)
                && len <= inserted_after.max(deleted_after)
                && threshold.map_or(true, |limit| len <= limit)
        });
        if eliminate {
            if let Some(at) = equalities.pop() {
                let duplicate = script[at].tokens.clone();
                script.insert(at, Run::delete(duplicate));
                script[at + 1].op = Operation::Insert;
            }
            // The previous equality needs re-evaluating too.
            equalities.pop();
            pointer = equalities.last().map_or(0, |&at| at + 1);
            inserted_before = 0;
            deleted_before = 0;
            inserted_after = 0;
            deleted_after = 0;
            last_equality = None;
            changed = true;
            continue;
        }
        pointer += 1;
    }

    if changed {
        merge(script)
    } else {
        script
    }
}

/// Slide single edits surrounded by equalities to the best-scoring boundary
///
/// `score(before, after)` rates a boundary between two sequences. Among the
/// equally valid positions the highest score wins, the right-most on ties.
pub fn lossless<T, F>(script: Script<T>, score: F) -> Script<T>
where
    T: Token,
    F: Fn(&[T], &[T]) -> u8,
{
    let mut script = script;
    let mut i = 1;
    while i + 1 < script.len() {
        if script[i - 1].op != Operation::Equal || script[i + 1].op != Operation::Equal {
            i += 1;
            continue;
        }

        let eq1_len = script[i - 1].len();
        let edit_len = script[i].len();
        let joined: Vec<T> = script[i - 1]
            .tokens
            .iter()
            .chain(&script[i].tokens)
            .chain(&script[i + 1].tokens)
            .cloned()
            .collect();

        // Shift the edit as far left as it goes, then walk right.
        let mut start = eq1_len - common_suffix(&script[i - 1].tokens, &script[i].tokens);
        let rate = |start: usize| {
            let (before, rest) = joined.split_at(start);
            let (edit, after) = rest.split_at(edit_len);
            u16::from(score(before, edit)) + u16::from(score(edit, after))
        };
        let mut best = start;
        let mut best_score = rate(start);
        while start + edit_len < joined.len() && joined[start] == joined[start + edit_len] {
            start += 1;
            let candidate = rate(start);
            if candidate >= best_score {
                best = start;
                best_score = candidate;
            }
        }

        if best != eq1_len {
            script[i - 1].tokens = joined[..best].to_vec();
            script[i].tokens = joined[best..best + edit_len].to_vec();
            script[i + 1].tokens = joined[best + edit_len..].to_vec();
            if script[i - 1].is_empty() {
                script.remove(i - 1);
                i -= 1;
            }
            if script[i + 1].is_empty() {
                script.remove(i + 1);
                i = i.saturating_sub(1);
            }
        }
        i += 1;
    }
    group_clusters(script)
}

/// Turn a delete/insert pair whose texts overlap by at least half of either
/// into delete, equal, insert (or insert, equal, delete for a reverse overlap)
pub fn extract_overlaps<T: Token>(script: Script<T>) -> Script<T> {
    let mut script = script;
    let mut i = 1;
    while i < script.len() {
        if script[i - 1].op == Operation::Delete && script[i].op == Operation::Insert {
            let deletion = std::mem::take(&mut script[i - 1].tokens);
            let insertion = std::mem::take(&mut script[i].tokens);
            let forward = common_overlap(&deletion, &insertion);
            let reverse = common_overlap(&insertion, &deletion);

            if forward >= reverse
                && (forward * 2 >= deletion.len() || forward * 2 >= insertion.len())
                && forward > 0
            {
                script[i - 1] = Run::delete(deletion[..deletion.len() - forward].to_vec());
                script[i] = Run::insert(insertion[forward..].to_vec());
                script.insert(i, Run::equal(insertion[..forward].to_vec()));
                i += 1;
            } else if reverse > forward
                && (reverse * 2 >= deletion.len() || reverse * 2 >= insertion.len())
            {
                script[i - 1] = Run::insert(insertion[..insertion.len() - reverse].to_vec());
                script[i] = Run::delete(deletion[reverse..].to_vec());
                script.insert(i, Run::equal(deletion[..reverse].to_vec()));
                i += 1;
            } else {
                script[i - 1].tokens = deletion;
                script[i].tokens = insertion;
            }
            i += 1;
        }
        i += 1;
    }
    script.retain(|run| !run.is_empty());
    script
}

/// Upper bound on full cleanup rounds in [`tidy`]
const TIDY_ROUNDS: usize = 16;

/// The full readability pipeline: merge, semantic, lossless, overlaps
///
/// Boundary shifting can expose equalities that semantic cleanup would
/// remove, so the pipeline repeats until a round changes nothing.
pub fn tidy<T, F>(script: Script<T>, threshold: Option<usize>, score: F) -> Script<T>
where
    T: Token,
    F: Fn(&[T], &[T]) -> u8,
{
    let mut script = script;
    for _ in 0..TIDY_ROUNDS {
        let next = extract_overlaps(lossless(semantic(merge(script.clone()), threshold), &score));
        if next == script {
            break;
        }
        script = next;
    }
    script
}

/// Within every run of consecutive edits, gather the deletions into one run
/// followed by the insertions
pub fn group_clusters<T: Token>(script: Script<T>) -> Script<T> {
    let mut out = Vec::with_capacity(script.len());
    let mut deleted = Vec::new();
    let mut inserted = Vec::new();
    for run in script {
        match run.op {
            Operation::Delete => deleted.extend(run.tokens),
            Operation::Insert => inserted.extend(run.tokens),
            Operation::Equal => {
                push_tokens(&mut out, Operation::Delete, std::mem::take(&mut deleted));
                push_tokens(&mut out, Operation::Insert, std::mem::take(&mut inserted));
                push_tokens(&mut out, Operation::Equal, run.tokens);
            }
        }
    }
    push_tokens(&mut out, Operation::Delete, deleted);
    push_tokens(&mut out, Operation::Insert, inserted);
    out
}

/// Rate how natural a boundary between `one` and `two` is, 0 to 6
///
/// Only the last character of `one` and the first of `two` matter, plus
/// the line ending around them for the blank line case.
pub fn boundary_score(one: &str, two: &str) -> u8 {
    let (Some(char1), Some(char2)) = (one.chars().next_back(), two.chars().next()) else {
        return BOUNDARY_EDGE;
    };

    let non_alnum1 = !char1.is_alphanumeric();
    let non_alnum2 = !char2.is_alphanumeric();
    let whitespace1 = non_alnum1 && char1.is_whitespace();
    let whitespace2 = non_alnum2 && char2.is_whitespace();
    let line_break1 = whitespace1 && (char1 == '\n' || char1 == '\r');
    let line_break2 = whitespace2 && (char2 == '\n' || char2 == '\r');
    let blank_line1 = line_break1 && (one.ends_with("\n\n") || one.ends_with("\n\r\n"));
    let blank_line2 = line_break2
        && (two.starts_with("\n\n")
            || two.starts_with("\r\n\n")
            || two.starts_with("\n\r\n")
            || two.starts_with("\r\n\r\n"));

    if blank_line1 || blank_line2 {
        BOUNDARY_BLANK_LINE
    } else if line_break1 || line_break2 {
        BOUNDARY_LINE_BREAK
    } else if non_alnum1 && !whitespace1 && whitespace2 {
        BOUNDARY_END_OF_SENTENCE
    } else if whitespace1 || whitespace2 {
        BOUNDARY_WHITESPACE
    } else if non_alnum1 || non_alnum2 {
        BOUNDARY_NON_ALPHANUMERIC
    } else {
        0
    }
}

/// [`boundary_score`] over character tokens
pub fn char_boundary(one: &[char], two: &[char]) -> u8 {
    let tail: String = one[one.len().saturating_sub(3)..].iter().collect();
    let head: String = two[..two.len().min(4)].iter().collect();
    boundary_score(&tail, &head)
}

/// A stretch of text that is either equal or one consolidated change
enum Segment {
    Equal(String),
    Change { deleted: String, inserted: String },
}

/// Keep extended grapheme clusters whole across equal/edit boundaries
///
/// Character diffs work on `char`s, so a combining mark, a skin tone
/// modifier or a ZWJ sequence can end up split between an equality and the
/// change next to it. The split fragment is moved out of the equality into
/// both sides of the change, so each side still reproduces its input.
pub fn repair_graphemes(edits: Vec<Edit>) -> Vec<Edit> {
    let mut segments = into_segments(edits);

    for i in 0..segments.len() {
        if !matches!(segments[i], Segment::Change { .. }) {
            continue;
        }

        // Leading boundary: the equality's last grapheme continues into the change.
        if i > 0 {
            let fragment = match (&segments[i - 1], &segments[i]) {
                (Segment::Equal(before), Segment::Change { deleted, inserted }) => {
                    let following = following_text(&segments, i + 1);
                    last_grapheme(before)
                        .filter(|g| {
                            continues(g, first_non_empty(deleted, following))
                                || continues(g, first_non_empty(inserted, following))
                        })
                        .map(str::len)
                }
                _ => None,
            };
            if let Some(len) = fragment {
                if let Segment::Equal(before) = &mut segments[i - 1] {
                    let moved = before.split_off(before.len() - len);
                    if let Segment::Change { deleted, inserted } = &mut segments[i] {
                        deleted.insert_str(0, &moved);
                        inserted.insert_str(0, &moved);
                    }
                }
            }
        }

        // Trailing boundary: the next equality starts inside the change's last grapheme.
        if i + 1 < segments.len() {
            let preceding = preceding_text(&segments, i);
            let fragment = match (&segments[i], &segments[i + 1]) {
                (Segment::Change { deleted, inserted }, Segment::Equal(after)) => {
                    let left = extension(last_grapheme(first_non_empty(deleted, preceding)), after);
                    let right =
                        extension(last_grapheme(first_non_empty(inserted, preceding)), after);
                    Some(left.max(right)).filter(|&len| len > 0)
                }
                _ => None,
            };
            if let Some(len) = fragment {
                if let Segment::Equal(after) = &mut segments[i + 1] {
                    let rest = after.split_off(len);
                    let moved = std::mem::replace(after, rest);
                    if let Segment::Change { deleted, inserted } = &mut segments[i] {
                        deleted.push_str(&moved);
                        inserted.push_str(&moved);
                    }
                }
            }
        }
    }

    flatten(segments)
}

fn into_segments(edits: Vec<Edit>) -> Vec<Segment> {
    let mut segments = Vec::new();
    for edit in edits.into_iter().filter(|e| !e.text.is_empty()) {
        match (edit.op, segments.last_mut()) {
            (Operation::Equal, Some(Segment::Equal(text))) => text.push_str(&edit.text),
            (Operation::Equal, _) => segments.push(Segment::Equal(edit.text)),
            (Operation::Delete, Some(Segment::Change { deleted, .. })) => {
                deleted.push_str(&edit.text)
            }
            (Operation::Insert, Some(Segment::Change { inserted, .. })) => {
                inserted.push_str(&edit.text)
            }
            (Operation::Delete, _) => segments.push(Segment::Change {
                deleted: edit.text,
                inserted: String::new(),
            }),
            (Operation::Insert, _) => segments.push(Segment::Change {
                deleted: String::new(),
                inserted: edit.text,
            }),
        }
    }
    segments
}

fn flatten(segments: Vec<Segment>) -> Vec<Edit> {
    let mut edits: Vec<Edit> = Vec::new();
    let mut deleted = String::new();
    let mut inserted = String::new();

    for segment in segments {
        match segment {
            Segment::Equal(text) if text.is_empty() => {}
            Segment::Equal(text) => {
                emit_change(&mut edits, &mut deleted, &mut inserted);
                match edits.last_mut() {
                    Some(last) if last.op == Operation::Equal => last.text.push_str(&text),
                    _ => edits.push(Edit::equal(text)),
                }
            }
            Segment::Change {
                deleted: d,
                inserted: i,
            } => {
                deleted.push_str(&d);
                inserted.push_str(&i);
            }
        }
    }
    emit_change(&mut edits, &mut deleted, &mut inserted);
    edits
}

fn emit_change(edits: &mut Vec<Edit>, deleted: &mut String, inserted: &mut String) {
    if !deleted.is_empty() {
        edits.push(Edit::delete(std::mem::take(deleted)));
    }
    if !inserted.is_empty() {
        edits.push(Edit::insert(std::mem::take(inserted)));
    }
}

/// Text of the equality at `index`, if that segment is one
fn following_text(segments: &[Segment], index: usize) -> &str {
    match segments.get(index) {
        Some(Segment::Equal(text)) => text,
        _ => "",
    }
}

fn preceding_text(segments: &[Segment], index: usize) -> &str {
    match index.checked_sub(1).and_then(|i| segments.get(i)) {
        Some(Segment::Equal(text)) => text,
        _ => "",
    }
}

fn first_non_empty<'s>(text: &'s str, fallback: &'s str) -> &'s str {
    if text.is_empty() {
        fallback
    } else {
        text
    }
}

fn last_grapheme(text: &str) -> Option<&str> {
    text.graphemes(true).next_back()
}

/// Leading graphemes of `text`, enough to resolve any cluster that starts it
fn head(text: &str) -> &str {
    let end = text
        .grapheme_indices(true)
        .nth(8)
        .map_or(text.len(), |(at, _)| at);
    &text[..end]
}

/// Whether `grapheme` forms a larger cluster with the start of `next`
fn continues(grapheme: &str, next: &str) -> bool {
    extension(Some(grapheme), next) > 0
}

/// Bytes of `next` absorbed into the cluster that `context` ends with
fn extension(context: Option<&str>, next: &str) -> usize {
    let Some(context) = context else {
        return 0;
    };
    if next.is_empty() {
        return 0;
    }
    let joined = format!("{context}{}", head(next));
    joined
        .graphemes(true)
        .next()
        .map_or(0, |first| first.len().saturating_sub(context.len()))
}
