//! Diff result types and structures
//!
//! Everything here is plain data. A [`DiffResult`] is created fresh for each
//! diff, owned by the caller afterwards and serializable for transport.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Type of edit operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Content present only in the original
    Delete,
    /// Content present only in the changed text
    Insert,
    /// Content present in both
    Equal,
}

/// A contiguous run of text with one operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edit {
    pub op: Operation,
    pub text: String,
}

impl Edit {
    pub fn new(op: Operation, text: impl Into<String>) -> Self {
        Self {
            op,
            text: text.into(),
        }
    }

    pub fn equal(text: impl Into<String>) -> Self {
        Self::new(Operation::Equal, text)
    }

    pub fn delete(text: impl Into<String>) -> Self {
        Self::new(Operation::Delete, text)
    }

    pub fn insert(text: impl Into<String>) -> Self {
        Self::new(Operation::Insert, text)
    }
}

/// Rebuild the original text from an edit script
pub fn source_text(edits: &[Edit]) -> String {
    edits
        .iter()
        .filter(|e| e.op != Operation::Insert)
        .map(|e| e.text.as_str())
        .collect()
}

/// Rebuild the changed text from an edit script
pub fn target_text(edits: &[Edit]) -> String {
    edits
        .iter()
        .filter(|e| e.op != Operation::Delete)
        .map(|e| e.text.as_str())
        .collect()
}

/// A line-level edit annotated with the lines it covers on its own side
///
/// Line numbers are 1-indexed. Equal edits carry `(-1, -1)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedEdit {
    pub op: Operation,
    pub text: String,
    pub line_start: i64,
    pub line_end_exclusive: i64,
}

impl EnhancedEdit {
    /// Sentinel line value carried by Equal edits
    pub const NO_LINE: i64 = -1;

    /// Number of lines covered, zero for Equal edits
    pub fn line_count(&self) -> usize {
        usize::try_from(self.line_end_exclusive - self.line_start).unwrap_or(0)
    }

    /// The individual lines of this edit, newlines retained
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split_inclusive('\n')
    }
}

/// Rendering type of a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Equal,
    Insert,
    Remove,
}

impl From<Operation> for ChunkKind {
    fn from(op: Operation) -> Self {
        match op {
            Operation::Equal => Self::Equal,
            Operation::Insert => Self::Insert,
            Operation::Delete => Self::Remove,
        }
    }
}

/// The smallest rendered unit: a run of words or characters within one line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub value: String,
    #[serde(rename = "type")]
    pub kind: ChunkKind,
}

impl Chunk {
    pub fn new(kind: ChunkKind, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind,
        }
    }
}

/// One side of a presentation row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideData {
    pub chunks: Vec<Chunk>,
    /// 1-indexed line number on this side
    pub line: usize,
}

/// A single aligned line pair
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    /// First row of its block
    pub start: bool,
    /// Last row of its block
    pub end: bool,
    /// Row carries word or character level sub-diffs
    pub inside_changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<SideData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<SideData>,
}

/// Change type of one side of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Equal,
    Remove,
    Insert,
}

/// Change types of both sides of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockType {
    pub left: BlockKind,
    pub right: BlockKind,
}

impl BlockType {
    pub const EQUAL: Self = Self::new(BlockKind::Equal, BlockKind::Equal);
    pub const REMOVED: Self = Self::new(BlockKind::Remove, BlockKind::Equal);
    pub const INSERTED: Self = Self::new(BlockKind::Equal, BlockKind::Insert);
    pub const CHANGED: Self = Self::new(BlockKind::Remove, BlockKind::Insert);

    pub const fn new(left: BlockKind, right: BlockKind) -> Self {
        Self { left, right }
    }
}

/// A maximal run of rows sharing one change type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffBlock {
    pub index: usize,
    /// First row index (0-based)
    pub line_start: usize,
    /// Last row index, inclusive
    pub line_end: usize,
    #[serde(rename = "type")]
    pub kind: BlockType,
}

impl DiffBlock {
    /// Number of rows in this block
    pub fn len(&self) -> usize {
        self.line_end + 1 - self.line_start
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Where a moved range landed on the other side
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovedTo {
    pub moved_from_end_exclusive: usize,
    pub moved_to_start: usize,
    pub moved_to_end_exclusive: usize,
    /// Similarity of the two ranges, 0.0 to 1.0
    pub score: f64,
}

/// Detected relocations, keyed by starting line number on each side
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Moves {
    pub deletion_to_insertion_map: BTreeMap<usize, MovedTo>,
    pub insertion_to_deletion_map: BTreeMap<usize, MovedTo>,
}

impl Moves {
    /// Record a move in both directions
    pub fn record(
        &mut self,
        deletion: std::ops::Range<usize>,
        insertion: std::ops::Range<usize>,
        score: f64,
    ) {
        self.deletion_to_insertion_map.insert(
            deletion.start,
            MovedTo {
                moved_from_end_exclusive: deletion.end,
                moved_to_start: insertion.start,
                moved_to_end_exclusive: insertion.end,
                score,
            },
        );
        self.insertion_to_deletion_map.insert(
            insertion.start,
            MovedTo {
                moved_from_end_exclusive: insertion.end,
                moved_to_start: deletion.start,
                moved_to_end_exclusive: deletion.end,
                score,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.deletion_to_insertion_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deletion_to_insertion_map.is_empty()
    }
}

/// Complete diff result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    pub rows: Vec<Row>,
    pub blocks: Vec<DiffBlock>,
    /// Inserted words or characters, depending on level
    pub added: usize,
    /// Removed words or characters, depending on level
    pub removed: usize,
    pub moves: Moves,
}

impl DiffResult {
    /// Check if the diff is empty (no changes)
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0
    }

    /// The original text, rebuilt from the left side of every row
    pub fn original_text(&self) -> String {
        self.rows
            .iter()
            .filter_map(|row| row.left.as_ref())
            .flat_map(|side| side.chunks.iter())
            .map(|chunk| chunk.value.as_str())
            .collect()
    }

    /// The changed text, rebuilt from the right side of every row
    pub fn changed_text(&self) -> String {
        self.rows
            .iter()
            .filter_map(|row| row.right.as_ref())
            .flat_map(|side| side.chunks.iter())
            .map(|chunk| chunk.value.as_str())
            .collect()
    }

    /// Blocks that are not equal on both sides
    pub fn changed_blocks(&self) -> Vec<&DiffBlock> {
        self.blocks
            .iter()
            .filter(|block| block.kind != BlockType::EQUAL)
            .collect()
    }

    /// Get a summary of the diff
    pub fn summary(&self) -> String {
        format!(
            "Diff Summary: {} added, {} removed, {} changed blocks, {} moves",
            self.added,
            self.removed,
            self.changed_blocks().len(),
            self.moves.len()
        )
    }
}

impl fmt::Display for DiffResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Diff Result ===")?;
        writeln!(f, "{}", self.summary())?;

        for block in &self.blocks {
            writeln!(
                f,
                "  block {}: rows {}..={} {:?}/{:?}",
                block.index, block.line_start, block.line_end, block.kind.left, block.kind.right
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_and_target_text() {
        let edits = vec![
            Edit::equal("a"),
            Edit::delete("b"),
            Edit::insert("x"),
            Edit::equal("c"),
        ];
        assert_eq!(source_text(&edits), "abc");
        assert_eq!(target_text(&edits), "axc");
    }

    #[test]
    fn test_moves_record_is_symmetric() {
        let mut moves = Moves::default();
        moves.record(10..20, 50..60, 1.0);

        let forward = moves.deletion_to_insertion_map[&10];
        assert_eq!(forward.moved_from_end_exclusive, 20);
        assert_eq!(forward.moved_to_start, 50);
        assert_eq!(forward.moved_to_end_exclusive, 60);

        let backward = moves.insertion_to_deletion_map[&50];
        assert_eq!(backward.moved_from_end_exclusive, 60);
        assert_eq!(backward.moved_to_start, 10);
        assert_eq!(backward.moved_to_end_exclusive, 20);
        assert_eq!(moves.len(), 1);
    }

    #[test]
    fn test_enhanced_edit_lines() {
        let edit = EnhancedEdit {
            op: Operation::Delete,
            text: "a\nb\n".to_string(),
            line_start: 4,
            line_end_exclusive: 6,
        };
        assert_eq!(edit.line_count(), 2);
        assert_eq!(edit.lines().collect::<Vec<_>>(), vec!["a\n", "b\n"]);
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = DiffResult {
            rows: vec![Row {
                start: true,
                end: true,
                inside_changed: false,
                left: Some(SideData {
                    chunks: vec![Chunk::new(ChunkKind::Equal, "x")],
                    line: 1,
                }),
                right: None,
            }],
            ..DiffResult::default()
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["rows"][0]["insideChanged"], false);
        assert_eq!(json["rows"][0]["left"]["chunks"][0]["type"], "equal");
        assert!(json["rows"][0].get("right").is_none());
        assert!(json["moves"]["deletionToInsertionMap"].is_object());
    }
}
