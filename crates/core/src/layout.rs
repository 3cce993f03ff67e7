//! Row and block assembly
//!
//! Turns the line-level script, plus sub-line edits for changed blocks, into
//! the presentation model: one [`Row`] per aligned line pair and one
//! [`DiffBlock`] per maximal run of rows with the same change type.

use crate::config::DiffLevel;
use crate::diff::{BlockType, Chunk, ChunkKind, DiffBlock, Edit, Operation, Row, SideData};
use crate::error::{DiffError, Result};
use crate::tokenizers::{Tokenizer, WordTokenizer};

/// Rows sharing one block type, before block boundaries are final
#[derive(Debug)]
struct Section {
    kind: BlockType,
    rows: Vec<Row>,
}

/// Finished presentation model
#[derive(Debug, Default)]
pub struct Layout {
    pub rows: Vec<Row>,
    pub blocks: Vec<DiffBlock>,
    pub added: usize,
    pub removed: usize,
}

/// Accumulates rows section by section
///
/// Every pushed line becomes exactly one row, so the texts pushed for each
/// side concatenate back to that side's input.
#[derive(Debug)]
pub struct LayoutBuilder {
    sections: Vec<Section>,
    /// Next 1-indexed line number on each side
    left_line: usize,
    right_line: usize,
}

impl Default for LayoutBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutBuilder {
    pub fn new() -> Self {
        Self {
            sections: Vec::new(),
            left_line: 1,
            right_line: 1,
        }
    }

    /// Lines present unchanged on both sides
    pub fn push_equal(&mut self, text: &str) {
        let rows: Vec<Row> = text
            .split_inclusive('\n')
            .map(|line| {
                let row = Row {
                    left: Some(self.side(Side::Left, vec![Chunk::new(ChunkKind::Equal, line)])),
                    right: Some(self.side(Side::Right, vec![Chunk::new(ChunkKind::Equal, line)])),
                    ..Row::default()
                };
                self.left_line += 1;
                self.right_line += 1;
                row
            })
            .collect();
        self.push_section(BlockType::EQUAL, rows);
    }

    /// Lines present only in the original
    pub fn push_removed(&mut self, text: &str) {
        let rows: Vec<Row> = text
            .split_inclusive('\n')
            .map(|line| {
                let row = Row {
                    left: Some(self.side(Side::Left, vec![Chunk::new(ChunkKind::Remove, line)])),
                    ..Row::default()
                };
                self.left_line += 1;
                row
            })
            .collect();
        self.push_section(BlockType::REMOVED, rows);
    }

    /// Lines present only in the changed text
    pub fn push_inserted(&mut self, text: &str) {
        let rows: Vec<Row> = text
            .split_inclusive('\n')
            .map(|line| {
                let row = Row {
                    right: Some(self.side(Side::Right, vec![Chunk::new(ChunkKind::Insert, line)])),
                    ..Row::default()
                };
                self.right_line += 1;
                row
            })
            .collect();
        self.push_section(BlockType::INSERTED, rows);
    }

    /// A changed block: `deleted_lines` original lines replaced by
    /// `inserted_lines` lines, refined by the sub-line `edits`
    ///
    /// Left line *i* is paired with right line *i*; the longer side gets rows
    /// with the other side absent.
    pub fn push_changed(
        &mut self,
        deleted_lines: usize,
        inserted_lines: usize,
        edits: &[Edit],
    ) -> Result<()> {
        let left = split_lines(edits, Operation::Insert);
        let right = split_lines(edits, Operation::Delete);
        if left.len() != deleted_lines || right.len() != inserted_lines {
            return Err(DiffError::Layout(format!(
                "changed block spans {deleted_lines}/{inserted_lines} lines but its sub-line diff spans {}/{}",
                left.len(),
                right.len()
            )));
        }

        let mut left = left.into_iter();
        let mut right = right.into_iter();
        let mut rows = Vec::with_capacity(deleted_lines.max(inserted_lines));
        for _ in 0..deleted_lines.max(inserted_lines) {
            let mut row = Row {
                inside_changed: true,
                ..Row::default()
            };
            if let Some(chunks) = left.next() {
                row.left = Some(self.side(Side::Left, chunks));
                self.left_line += 1;
            }
            if let Some(chunks) = right.next() {
                row.right = Some(self.side(Side::Right, chunks));
                self.right_line += 1;
            }
            rows.push(row);
        }
        self.push_section(BlockType::CHANGED, rows);
        Ok(())
    }

    fn side(&self, side: Side, chunks: Vec<Chunk>) -> SideData {
        let line = match side {
            Side::Left => self.left_line,
            Side::Right => self.right_line,
        };
        SideData { chunks, line }
    }

    fn push_section(&mut self, kind: BlockType, rows: Vec<Row>) {
        if rows.is_empty() {
            return;
        }
        self.sections.push(Section { kind, rows });
    }

    /// Lay out blocks and count changed units
    pub fn finish(self, level: DiffLevel) -> Layout {
        let mut layout = Layout::default();
        for section in self.sections {
            let start = layout.rows.len();
            let end = start + section.rows.len() - 1;
            match layout.blocks.last_mut() {
                Some(block) if block.kind == section.kind => block.line_end = end,
                _ => layout.blocks.push(DiffBlock {
                    index: layout.blocks.len(),
                    line_start: start,
                    line_end: end,
                    kind: section.kind,
                }),
            }
            layout.rows.extend(section.rows);
        }

        for block in &layout.blocks {
            layout.rows[block.line_start].start = true;
            layout.rows[block.line_end].end = true;
        }

        for chunk in layout
            .rows
            .iter()
            .flat_map(|row| row.left.iter().chain(row.right.iter()))
            .flat_map(|side| side.chunks.iter())
        {
            match chunk.kind {
                ChunkKind::Equal => {}
                ChunkKind::Insert => layout.added += chunk_size(&chunk.value, level),
                ChunkKind::Remove => layout.removed += chunk_size(&chunk.value, level),
            }
        }
        layout
    }
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// Chunks of one side of `edits`, one list per line; `skip` is the
/// operation that belongs to the other side
fn split_lines(edits: &[Edit], skip: Operation) -> Vec<Vec<Chunk>> {
    let mut lines = Vec::new();
    let mut current: Vec<Chunk> = Vec::new();
    for edit in edits.iter().filter(|edit| edit.op != skip) {
        for piece in edit.text.split_inclusive('\n') {
            current.push(Chunk::new(ChunkKind::from(edit.op), piece));
            if piece.ends_with('\n') {
                lines.push(std::mem::take(&mut current));
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Weight of a changed chunk in the added/removed totals
fn chunk_size(value: &str, level: DiffLevel) -> usize {
    match level {
        DiffLevel::Character => value.chars().count(),
        DiffLevel::Word => {
            let words = WordTokenizer
                .split(value)
                .into_iter()
                .filter(|token| !token.trim().is_empty())
                .count();
            if words == 0 && !value.is_empty() {
                1
            } else {
                words
            }
        }
    }
}
