//! # BlockDiff Library
//!
//! A side-by-side text diffing library. Texts are diffed line by line first;
//! changed blocks are then refined at word or character level, and blocks
//! that moved elsewhere in the document are paired up.
//!
//! ## Core Concepts
//!
//! - **Tokenizers**: Split text into lines or words, interned as integer ids
//! - **Engines**: An exact weighted LCS for small inputs, deadline-bound
//!   Myers bisection for large ones
//! - **Cleanup**: Passes that make raw edit scripts readable
//! - **Move detection**: Pairs deleted blocks with their inserted copies
//! - **DiffEngine**: Orchestrates all of the above into rows and blocks
//!
//! ## Example
//!
//! ```rust
//! use blockdiff_core::{DiffEngine, DiffLevel, DiffOptions};
//!
//! let options = DiffOptions::new().with_level(DiffLevel::Character);
//! let engine = DiffEngine::new(options);
//! let diff = engine.diff("Hello World", "Hello Rust").unwrap();
//! assert_eq!(diff.changed_text(), "Hello Rust");
//! ```

pub mod algorithm;
pub mod cleanup;
pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod diff;
pub mod engine;
pub mod error;
pub mod layout;
pub mod moves;
pub mod tokenizers;

// Re-export main types
pub use clock::{Clock, Deadline, ManualClock, SystemClock};
pub use config::{DiffLevel, DiffOptions, MoveOptions};
pub use diagnostics::{DiagnosticsSink, NoopDiagnostics, TracingDiagnostics};
pub use diff::{
    BlockKind, BlockType, Chunk, ChunkKind, DiffBlock, DiffResult, Edit, EnhancedEdit, MovedTo,
    Moves, Operation, Row, SideData,
};
pub use engine::DiffEngine;
pub use error::{DiffError, Result, Side};

/// Main entry point for computing diffs between two strings
///
/// # Arguments
///
/// * `original` - The original text
/// * `changed` - The changed text
/// * `level` - Granularity of the refinement inside changed blocks
/// * `options` - Optional configuration (uses default if None); its level is
///   replaced by `level`
///
/// # Returns
///
/// Rows, blocks, change counts and detected moves
///
/// # Example
///
/// ```rust
/// use blockdiff_core::{compute_diff, DiffLevel};
///
/// let result = compute_diff("a\nb\nc\n", "a\nx\nc\n", DiffLevel::Word, None).unwrap();
/// println!("Changes: {}", result.summary());
/// ```
pub fn compute_diff(
    original: &str,
    changed: &str,
    level: DiffLevel,
    options: Option<DiffOptions>,
) -> Result<DiffResult> {
    let options = options.unwrap_or_default().with_level(level);
    let engine = DiffEngine::new(options);
    engine.diff(original, changed)
}
