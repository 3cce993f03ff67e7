//! End-to-end diffs through the public API

use blockdiff_core::algorithm::{BisectionEngine, DiffAlgorithm, DynamicProgrammingEngine, Run};
use blockdiff_core::cleanup;
use blockdiff_core::{
    compute_diff, BlockType, ChunkKind, Deadline, DiffEngine, DiffLevel, DiffOptions, ManualClock,
    MovedTo, Operation,
};
use std::sync::Arc;
use std::time::Duration;

fn lines(prefix: &str, count: usize) -> String {
    (0..count).map(|i| format!("{prefix} {i}\n")).collect()
}

fn block_kinds(result: &blockdiff_core::DiffResult) -> Vec<BlockType> {
    result.blocks.iter().map(|block| block.kind).collect()
}

#[test]
fn test_one_line_replaced() {
    let result = compute_diff("a\nb\nc\n", "a\nx\nc\n", DiffLevel::Word, None).unwrap();

    assert_eq!(
        block_kinds(&result),
        vec![BlockType::EQUAL, BlockType::CHANGED, BlockType::EQUAL]
    );
    assert_eq!(result.added, 1);
    assert_eq!(result.removed, 1);
    assert_eq!(result.original_text(), "a\nb\nc\n");
    assert_eq!(result.changed_text(), "a\nx\nc\n");

    let changed = &result.rows[1];
    assert!(changed.start && changed.end && changed.inside_changed);
    let left = changed.left.as_ref().unwrap();
    assert_eq!(left.line, 2);
    assert_eq!(left.chunks[0].kind, ChunkKind::Remove);
    assert_eq!(left.chunks[0].value, "b");
}

#[test]
fn test_identical_single_line() {
    let result = compute_diff("hello world", "hello world", DiffLevel::Word, None).unwrap();

    assert_eq!(result.added, 0);
    assert_eq!(result.removed, 0);
    assert_eq!(block_kinds(&result), vec![BlockType::EQUAL]);
    assert_eq!((result.blocks[0].line_start, result.blocks[0].line_end), (0, 0));
    assert!(result.moves.is_empty());
}

#[test]
fn test_kitten_sitting_clusters() {
    let a: Vec<char> = "kitten".chars().collect();
    let b: Vec<char> = "sitting".chars().collect();
    let script = cleanup::merge(DynamicProgrammingEngine::new().compute(
        &a,
        &b,
        &Deadline::unbounded(),
    ));

    // Two substitutions and one pure insertion.
    let clusters = script
        .split(|run: &Run<char>| run.op == Operation::Equal)
        .filter(|cluster| !cluster.is_empty())
        .count();
    assert_eq!(clusters, 3);
    let trailing = script.last().unwrap();
    assert_eq!(trailing.op, Operation::Insert);
    assert_eq!(trailing.tokens, vec!['g']);
}

#[test]
fn test_kitten_sitting_character_level() {
    let options = DiffOptions::minimal().with_semantic_threshold(Some(0));
    let result = compute_diff("kitten", "sitting", DiffLevel::Character, Some(options)).unwrap();

    assert_eq!(block_kinds(&result), vec![BlockType::CHANGED]);
    assert_eq!(result.removed, 2);
    assert_eq!(result.added, 3);

    let right = result.rows[0].right.as_ref().unwrap();
    let inserted: Vec<&str> = right
        .chunks
        .iter()
        .filter(|chunk| chunk.kind == ChunkKind::Insert)
        .map(|chunk| chunk.value.as_str())
        .collect();
    assert_eq!(inserted, vec!["s", "i", "g"]);
}

#[test]
fn test_moved_block() {
    let preamble = lines("preamble", 9);
    let block = lines("moved paragraph line", 10);
    let context = lines("context line", 40);
    let original = format!("{preamble}{block}{context}");
    let changed = format!("{preamble}{context}{block}");

    let result = compute_diff(&original, &changed, DiffLevel::Word, None).unwrap();

    assert_eq!(
        result.moves.deletion_to_insertion_map.get(&10),
        Some(&MovedTo {
            moved_from_end_exclusive: 20,
            moved_to_start: 50,
            moved_to_end_exclusive: 60,
            score: 1.0,
        })
    );
    assert_eq!(
        result.moves.insertion_to_deletion_map.get(&50),
        Some(&MovedTo {
            moved_from_end_exclusive: 60,
            moved_to_start: 10,
            moved_to_end_exclusive: 20,
            score: 1.0,
        })
    );
    assert_eq!(result.moves.len(), 1);
    assert_eq!(
        block_kinds(&result),
        vec![
            BlockType::EQUAL,
            BlockType::REMOVED,
            BlockType::EQUAL,
            BlockType::INSERTED
        ]
    );
}

#[test]
fn test_moves_disabled() {
    let block = lines("moved paragraph line", 10);
    let context = lines("context line", 40);
    let original = format!("{block}{context}");
    let changed = format!("{context}{block}");
    let options = DiffOptions::new().with_moves(false);

    let result = compute_diff(&original, &changed, DiffLevel::Word, Some(options)).unwrap();
    assert!(result.moves.is_empty());
    assert_eq!(result.removed, result.added);
}

#[test]
fn test_expired_deadline_replaces_everything() {
    let a: Vec<char> = "the quick brown fox".chars().collect();
    let b: Vec<char> = "a lazy sleeping dog".chars().collect();
    let clock = ManualClock::new().with_auto_advance(Duration::from_secs(2));
    let deadline = Deadline::after(&clock, Some(Duration::from_secs(1)));

    let script = BisectionEngine::new().compute(&a, &b, &deadline);
    assert_eq!(script, vec![Run::delete(a), Run::insert(b)]);
}

#[test]
fn test_expired_deadline_through_engine() {
    let clock = Arc::new(ManualClock::new().with_auto_advance(Duration::from_secs(2)));
    let options = DiffOptions::new()
        .with_max_lines(0)
        .with_timeout(Some(Duration::from_secs(1)))
        .with_clock(clock);
    let engine = DiffEngine::new(options);

    let original = "one\ntwo\nthree";
    let changed = "four\nfive\nsix";
    let edits = engine.line_edits(original, changed).unwrap();
    let ops: Vec<Operation> = edits.iter().map(|edit| edit.op).collect();
    assert_eq!(ops, vec![Operation::Delete, Operation::Insert]);
    assert_eq!(edits[0].text, "one\ntwo\nthree\n");
    assert_eq!(edits[1].text, "four\nfive\nsix\n");

    let result = engine.diff(original, changed).unwrap();
    assert_eq!(result.original_text(), original);
    assert_eq!(result.changed_text(), changed);
}

#[test]
fn test_large_input_uses_bisection() {
    let original = lines("row", 200);
    let changed = original.replace("row 120\n", "row one hundred twenty\n");
    let options = DiffOptions::minimal().with_max_lines(50);

    let result = compute_diff(&original, &changed, DiffLevel::Word, Some(options)).unwrap();
    assert_eq!(
        block_kinds(&result),
        vec![BlockType::EQUAL, BlockType::CHANGED, BlockType::EQUAL]
    );
    let changed_row = &result.rows[result.blocks[1].line_start];
    assert_eq!(changed_row.left.as_ref().unwrap().line, 121);
    assert_eq!(result.changed_text(), changed);
}

#[test]
fn test_combining_mark_stays_whole() {
    let options = DiffOptions::minimal();
    let result = compute_diff("cafe", "cafe\u{301}", DiffLevel::Character, Some(options)).unwrap();

    let right = result.rows[0].right.as_ref().unwrap();
    assert!(right
        .chunks
        .iter()
        .any(|chunk| chunk.kind == ChunkKind::Insert && chunk.value == "e\u{301}"));
    assert_eq!(result.changed_text(), "cafe\u{301}");
}

#[test]
fn test_result_serializes_to_camel_case() {
    let result = compute_diff("a\nb\n", "a\nc\n", DiffLevel::Word, None).unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["blocks"][1]["type"]["left"], "remove");
    assert_eq!(json["blocks"][1]["type"]["right"], "insert");
    assert_eq!(json["rows"][1]["insideChanged"], true);
    assert_eq!(json["rows"][1]["left"]["chunks"][0]["type"], "remove");
    assert!(json["moves"]["deletionToInsertionMap"].is_object());
    assert!(json["rows"][0].get("lineStart").is_none());
}
