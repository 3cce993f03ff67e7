//! Main diff engine that orchestrates the entire diff process

use crate::algorithm::{DiffAlgorithm, Engine, Script};
use crate::cleanup;
use crate::clock::Deadline;
use crate::config::{DiffLevel, DiffOptions};
use crate::diff::{DiffResult, Edit, EnhancedEdit, Operation};
use crate::error::{DiffError, Result, Side};
use crate::layout::LayoutBuilder;
use crate::moves::MoveDetector;
use crate::tokenizers::{encode_pair, LineTokenizer, TokenTable, WordTokenizer};
use tracing::{debug, instrument};

/// The main diff engine
#[derive(Debug, Clone, Default)]
pub struct DiffEngine {
    options: DiffOptions,
}

impl DiffEngine {
    /// Create a new diff engine with the given options
    pub fn new(options: DiffOptions) -> Self {
        Self { options }
    }

    /// Create a diff engine with the default options
    pub fn default_config() -> Self {
        Self::new(DiffOptions::default())
    }

    pub fn options(&self) -> &DiffOptions {
        &self.options
    }

    /// Diff two possibly absent inputs
    ///
    /// Fails with [`DiffError::MissingInput`] naming the first absent side.
    pub fn try_diff(&self, original: Option<&str>, changed: Option<&str>) -> Result<DiffResult> {
        let original = original.ok_or(DiffError::MissingInput {
            side: Side::Original,
        })?;
        let changed = changed.ok_or(DiffError::MissingInput {
            side: Side::Changed,
        })?;
        self.diff(original, changed)
    }

    /// Compute the diff between two strings
    ///
    /// This is the main entry point that orchestrates the entire diff process:
    /// 1. Append a newline to both inputs so every line is terminated
    /// 2. Diff line ids with the engine the input size calls for
    /// 3. Slide edits onto natural boundaries and annotate line numbers
    /// 4. Detect moved blocks, if enabled
    /// 5. Remove the sentinel from the final line of each side
    /// 6. Re-diff changed blocks at word or character level
    /// 7. Lay out rows and blocks
    ///
    /// Internal failures are reported to the configured diagnostics sink
    /// before they are returned.
    #[instrument(skip_all, fields(level = ?self.options.level, original_len = original.len(), changed_len = changed.len()))]
    pub fn diff(&self, original: &str, changed: &str) -> Result<DiffResult> {
        self.compute(original, changed).inspect_err(|error| {
            if !error.is_invalid_input() {
                self.options.diagnostics.report(error);
            }
        })
    }

    fn compute(&self, original: &str, changed: &str) -> Result<DiffResult> {
        let edits = self.line_edits(original, changed)?;

        let moves = if self.options.compute_moves {
            let move_options = self.options.move_options();
            let deadline =
                Deadline::after(self.options.clock.as_ref(), Some(move_options.time_budget));
            MoveDetector::new(move_options, deadline).detect(&edits)
        } else {
            Default::default()
        };

        let mut builder = LayoutBuilder::new();
        for stretch in stretches(&edits) {
            match stretch {
                Stretch::Equal(text) => builder.push_equal(&text),
                Stretch::Change { deleted, inserted } => {
                    match (deleted.is_empty(), inserted.is_empty()) {
                        (false, false) => {
                            let inline = self.diff_inline(&deleted, &inserted)?;
                            builder.push_changed(
                                line_count(&deleted),
                                line_count(&inserted),
                                &inline,
                            )?;
                        }
                        (false, true) => builder.push_removed(&deleted),
                        (true, false) => builder.push_inserted(&inserted),
                        (true, true) => {}
                    }
                }
            }
        }

        let layout = builder.finish(self.options.level);
        debug!(
            rows = layout.rows.len(),
            blocks = layout.blocks.len(),
            added = layout.added,
            removed = layout.removed,
            moves = moves.len(),
            "diff complete"
        );
        Ok(DiffResult {
            rows: layout.rows,
            blocks: layout.blocks,
            added: layout.added,
            removed: layout.removed,
            moves,
        })
    }

    /// Line-level edits of both inputs, each with one newline appended
    ///
    /// Delete and Insert edits carry their 1-indexed line range on their
    /// own side.
    pub fn line_edits(&self, original: &str, changed: &str) -> Result<Vec<EnhancedEdit>> {
        let original = format!("{original}\n");
        let changed = format!("{changed}\n");
        let pair = encode_pair(&original, &changed, &LineTokenizer);

        let engine = Engine::select(
            pair.total_len(),
            self.options.dynamic_programming_max_lines,
            false,
        );
        debug!(engine = engine.name(), lines = pair.total_len(), "line level diff");

        let deadline = Deadline::after(self.options.clock.as_ref(), self.options.diff_timeout);
        let script = engine.compute(&pair.left, &pair.right, &deadline);
        let table = &pair.table;
        let script = cleanup::merge(script);
        let script = cleanup::lossless(script, |one, two| table.boundary(one, two));

        annotate_lines(script, table)
    }

    /// Sub-line edits between the deleted and inserted text of a changed block
    pub fn diff_inline(&self, deleted: &str, inserted: &str) -> Result<Vec<Edit>> {
        let threshold = self.options.semantic_threshold;
        let deadline = Deadline::after(self.options.clock.as_ref(), self.options.diff_timeout);

        let edits = match self.options.level {
            DiffLevel::Word => {
                let pair = encode_pair(deleted, inserted, &WordTokenizer);
                let engine = Engine::select(
                    pair.total_len(),
                    self.options.dynamic_programming_max_words,
                    false,
                );
                let table = &pair.table;
                let script = engine.compute(&pair.left, &pair.right, &deadline);
                let script = cleanup::tidy(script, threshold, |one, two| table.boundary(one, two));
                script
                    .into_iter()
                    .map(|run| Ok(Edit::new(run.op, table.decode_all(&run.tokens)?)))
                    .collect::<Result<Vec<_>>>()?
            }
            DiffLevel::Character => {
                let left: Vec<char> = deleted.chars().collect();
                let right: Vec<char> = inserted.chars().collect();
                let engine = Engine::select(
                    left.len() + right.len(),
                    self.options.dynamic_programming_max_chars,
                    true,
                );
                let script = engine.compute(&left, &right, &deadline);
                cleanup::tidy(script, threshold, cleanup::char_boundary)
                    .into_iter()
                    .map(|run| Edit::new(run.op, run.tokens.into_iter().collect::<String>()))
                    .collect()
            }
        };
        Ok(cleanup::repair_graphemes(edits))
    }
}

/// A run of unchanged lines, or the deleted and inserted text between two
/// such runs
#[derive(Debug, Clone, PartialEq, Eq)]
enum Stretch {
    Equal(String),
    Change { deleted: String, inserted: String },
}

impl Stretch {
    fn text(&self, side: Side) -> &str {
        match (self, side) {
            (Stretch::Equal(text), _) => text,
            (Stretch::Change { deleted, .. }, Side::Original) => deleted,
            (Stretch::Change { inserted, .. }, Side::Changed) => inserted,
        }
    }

    fn text_mut(&mut self, side: Side) -> &mut String {
        match (self, side) {
            (Stretch::Equal(text), _) => text,
            (Stretch::Change { deleted, .. }, Side::Original) => deleted,
            (Stretch::Change { inserted, .. }, Side::Changed) => inserted,
        }
    }
}

/// Group line-level edits into stretches with the sentinel newline removed
///
/// Each side's final line carries the sentinel. When only one side's final
/// line sits in an equal run, that line differs once the sentinel is gone,
/// so it moves into the following change on both sides first.
fn stretches(edits: &[EnhancedEdit]) -> Vec<Stretch> {
    let mut out: Vec<Stretch> = Vec::new();
    for edit in edits {
        let side = match edit.op {
            Operation::Equal => {
                out.push(Stretch::Equal(edit.text.clone()));
                continue;
            }
            Operation::Delete => Side::Original,
            Operation::Insert => Side::Changed,
        };
        if !matches!(out.last(), Some(Stretch::Change { .. })) {
            out.push(Stretch::Change {
                deleted: String::new(),
                inserted: String::new(),
            });
        }
        if let Some(stretch) = out.last_mut() {
            stretch.text_mut(side).push_str(&edit.text);
        }
    }

    if let (Some(left), Some(right)) = (last(&out, Side::Original), last(&out, Side::Changed)) {
        let at = left.min(right);
        if left != right {
            if let Stretch::Equal(text) = &mut out[at] {
                let keep = text.len() - text.split_inclusive('\n').last().map_or(0, str::len);
                let line = text.split_off(keep);
                if !matches!(out.get(at + 1), Some(Stretch::Change { .. })) {
                    out.insert(
                        at + 1,
                        Stretch::Change {
                            deleted: String::new(),
                            inserted: String::new(),
                        },
                    );
                }
                if let Some(Stretch::Change { deleted, inserted }) = out.get_mut(at + 1) {
                    deleted.insert_str(0, &line);
                    inserted.insert_str(0, &line);
                }
            }
        }
    }

    let left = last(&out, Side::Original);
    let right = last(&out, Side::Changed);
    if let Some(at) = left {
        pop_newline(out[at].text_mut(Side::Original));
    }
    if let Some(at) = right {
        // An equal run holding both final lines shares one text.
        if left != Some(at) || matches!(out[at], Stretch::Change { .. }) {
            pop_newline(out[at].text_mut(Side::Changed));
        }
    }
    out
}

/// Index of the last stretch with text on `side`
fn last(stretches: &[Stretch], side: Side) -> Option<usize> {
    stretches
        .iter()
        .rposition(|stretch| !stretch.text(side).is_empty())
}

fn pop_newline(text: &mut String) {
    if text.ends_with('\n') {
        text.pop();
    }
}

fn line_count(text: &str) -> usize {
    text.split_inclusive('\n').count()
}

/// Decode a line-id script, numbering the lines of each change
fn annotate_lines(script: Script<u32>, table: &TokenTable) -> Result<Vec<EnhancedEdit>> {
    let mut left_line: i64 = 1;
    let mut right_line: i64 = 1;
    script
        .into_iter()
        .map(|run| {
            let count = run.len() as i64;
            let text = table.decode_all(&run.tokens)?;
            let (line_start, line_end_exclusive) = match run.op {
                Operation::Equal => {
                    left_line += count;
                    right_line += count;
                    (EnhancedEdit::NO_LINE, EnhancedEdit::NO_LINE)
                }
                Operation::Delete => {
                    left_line += count;
                    (left_line - count, left_line)
                }
                Operation::Insert => {
                    right_line += count;
                    (right_line - count, right_line)
                }
            };
            Ok(EnhancedEdit {
                op: run.op,
                text,
                line_start,
                line_end_exclusive,
            })
        })
        .collect()
}
