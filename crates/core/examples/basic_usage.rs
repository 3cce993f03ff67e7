//! Basic usage example of the blockdiff library

use blockdiff_core::{compute_diff, ChunkKind, DiffEngine, DiffLevel, DiffOptions, DiffResult};

const LINE: &str = "----------------------------------------";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== BlockDiff Library Examples ===\n");

    // Example 1: Simple line diff with word refinement
    example_simple_diff()?;

    // Example 2: Character level
    example_character_level()?;

    // Example 3: Moved paragraphs
    example_moves()?;

    // Example 4: JSON output
    example_json()?;

    Ok(())
}

fn render(result: &DiffResult) {
    for row in &result.rows {
        let side = |data: Option<&blockdiff_core::SideData>| -> String {
            data.map(|side| {
                side.chunks
                    .iter()
                    .map(|chunk| match chunk.kind {
                        ChunkKind::Equal => chunk.value.trim_end_matches('\n').to_string(),
                        ChunkKind::Remove => format!("[-{}-]", chunk.value.trim_end_matches('\n')),
                        ChunkKind::Insert => format!("{{+{}+}}", chunk.value.trim_end_matches('\n')),
                    })
                    .collect()
            })
            .unwrap_or_default()
        };
        println!(
            "  {:<36} | {}",
            side(row.left.as_ref()),
            side(row.right.as_ref())
        );
    }
}

fn example_simple_diff() -> Result<(), Box<dyn std::error::Error>> {
    println!("Example 1: Simple Diff");
    println!("{}", LINE);

    let original = "The quick brown fox\njumps over\nthe lazy dog.";
    let changed = "The quick brown fox\nleaps over\nthe sleepy dog.";

    let result = compute_diff(original, changed, DiffLevel::Word, None)?;
    render(&result);
    println!("\n{}", result.summary());
    println!("\n");
    Ok(())
}

fn example_character_level() -> Result<(), Box<dyn std::error::Error>> {
    println!("Example 2: Character Level");
    println!("{}", LINE);

    let engine = DiffEngine::new(DiffOptions::new().with_level(DiffLevel::Character));
    let result = engine.diff("kitten sat", "sitting sat")?;
    render(&result);
    println!("\n  {} added, {} removed characters", result.added, result.removed);
    println!("\n");
    Ok(())
}

fn example_moves() -> Result<(), Box<dyn std::error::Error>> {
    println!("Example 3: Moved Blocks");
    println!("{}", LINE);

    let intro = "Intro line one\nIntro line two\n";
    let paragraph = "This paragraph\nwill be moved\nto the very end\n";
    let body: String = (1..=5).map(|i| format!("Body line {i}\n")).collect();

    let original = format!("{intro}{paragraph}{body}");
    let changed = format!("{intro}{body}{paragraph}");

    let result = compute_diff(&original, &changed, DiffLevel::Word, None)?;
    for (from, moved) in &result.moves.deletion_to_insertion_map {
        println!(
            "  lines {}..{} moved to {}..{} (score {:.2})",
            from,
            moved.moved_from_end_exclusive,
            moved.moved_to_start,
            moved.moved_to_end_exclusive,
            moved.score
        );
    }
    println!("\n");
    Ok(())
}

fn example_json() -> Result<(), Box<dyn std::error::Error>> {
    println!("Example 4: JSON Output");
    println!("{}", LINE);

    let options: DiffOptions = serde_json::from_str(r#"{"computeMoves": false, "diffTimeout": 500}"#)?;
    let result = DiffEngine::new(options).diff("a\nb\n", "a\nc\n")?;
    println!("{}", serde_json::to_string_pretty(&result.blocks)?);
    println!();
    Ok(())
}
