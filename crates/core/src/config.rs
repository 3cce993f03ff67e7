//! Configuration for the diff engine
//!
//! [`DiffOptions`] is an immutable value passed by reference through every
//! stage of a diff, so concurrent diffs never share mutable settings.

use crate::clock::{Clock, SystemClock};
use crate::diagnostics::{DiagnosticsSink, TracingDiagnostics};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Granularity of the sub-line diff inside changed blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffLevel {
    /// Whole words, with every space and newline a token of its own
    #[default]
    Word,
    /// Individual characters
    Character,
}

/// Configuration for diff computation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiffOptions {
    /// Sub-line granularity
    pub level: DiffLevel,

    /// Largest total line count diffed with the dynamic programming engine
    pub dynamic_programming_max_lines: usize,

    /// Largest total word count diffed with the dynamic programming engine
    pub dynamic_programming_max_words: usize,

    /// Largest total character count diffed with the dynamic programming engine
    pub dynamic_programming_max_chars: usize,

    /// Whether to look for relocated blocks
    pub compute_moves: bool,

    /// Tune move detection for prose: shorter blocks, partial matches
    pub compute_for_rich_text: bool,

    /// Bisection deadline; `None` runs to completion
    #[serde(with = "optional_millis")]
    pub diff_timeout: Option<Duration>,

    /// Largest equality semantic cleanup may fold into a change
    pub semantic_threshold: Option<usize>,

    /// Shared wall-clock budget of both move detection phases
    #[serde(with = "millis")]
    pub move_time_budget: Duration,

    #[serde(skip, default = "default_clock")]
    pub clock: Arc<dyn Clock>,

    #[serde(skip, default = "default_diagnostics")]
    pub diagnostics: Arc<dyn DiagnosticsSink>,
}

fn default_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

fn default_diagnostics() -> Arc<dyn DiagnosticsSink> {
    Arc::new(TracingDiagnostics)
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffOptions {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self {
            level: DiffLevel::Word,
            dynamic_programming_max_lines: 1700,
            dynamic_programming_max_words: 500,
            dynamic_programming_max_chars: 500,
            compute_moves: true,
            compute_for_rich_text: false,
            diff_timeout: Some(Duration::from_secs(1)),
            semantic_threshold: None,
            move_time_budget: Duration::from_secs(5),
            clock: default_clock(),
            diagnostics: default_diagnostics(),
        }
    }

    /// Settings for prose documents
    pub fn rich_text() -> Self {
        Self::new().with_rich_text(true)
    }

    /// Exact diffs only: no moves, no deadline
    pub fn minimal() -> Self {
        Self::new().with_moves(false).with_timeout(None)
    }

    pub fn with_level(mut self, level: DiffLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_max_lines(mut self, lines: usize) -> Self {
        self.dynamic_programming_max_lines = lines;
        self
    }

    pub fn with_max_words(mut self, words: usize) -> Self {
        self.dynamic_programming_max_words = words;
        self
    }

    pub fn with_max_chars(mut self, chars: usize) -> Self {
        self.dynamic_programming_max_chars = chars;
        self
    }

    /// Enable or disable move detection
    pub fn with_moves(mut self, enable: bool) -> Self {
        self.compute_moves = enable;
        self
    }

    pub fn with_rich_text(mut self, enable: bool) -> Self {
        self.compute_for_rich_text = enable;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.diff_timeout = timeout;
        self
    }

    pub fn with_semantic_threshold(mut self, threshold: Option<usize>) -> Self {
        self.semantic_threshold = threshold;
        self
    }

    pub fn with_move_time_budget(mut self, budget: Duration) -> Self {
        self.move_time_budget = budget;
        self
    }

    /// Read time from `clock` instead of the system clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Move detection thresholds implied by these options
    pub fn move_options(&self) -> MoveOptions {
        let standard = MoveOptions {
            time_budget: self.move_time_budget,
            ..MoveOptions::default()
        };
        if self.compute_for_rich_text {
            MoveOptions {
                min_block_lines: 1,
                partial_matching: true,
                min_line_length: 10,
                ..standard
            }
        } else {
            standard
        }
    }
}

/// Thresholds for the move detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveOptions {
    /// Shortest delete or insert run considered as a whole block
    pub min_block_lines: usize,
    /// Furthest apart, in lines, a block and its counterpart may start
    pub max_line_distance: usize,
    /// Similarity a whole block pair must reach
    pub block_similarity: f64,
    /// Similarity a single line pair must reach
    pub line_similarity: f64,
    /// Similarity for extending a match when partial matching is on
    pub partial_similarity: f64,
    pub partial_matching: bool,
    /// Shortest trimmed line considered in line matching
    pub min_line_length: usize,
    pub time_budget: Duration,
}

impl Default for MoveOptions {
    fn default() -> Self {
        Self {
            min_block_lines: 3,
            max_line_distance: 1000,
            block_similarity: 0.9,
            line_similarity: 0.95,
            partial_similarity: 0.6,
            partial_matching: false,
            min_line_length: 3,
            time_budget: Duration::from_secs(5),
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod optional_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => super::millis::serialize(duration, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|ms| ms.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = DiffOptions::default();
        assert_eq!(options.level, DiffLevel::Word);
        assert_eq!(options.dynamic_programming_max_lines, 1700);
        assert_eq!(options.dynamic_programming_max_words, 500);
        assert_eq!(options.dynamic_programming_max_chars, 500);
        assert!(options.compute_moves);
        assert!(!options.compute_for_rich_text);
        assert_eq!(options.diff_timeout, Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_minimal_options() {
        let options = DiffOptions::minimal();
        assert!(!options.compute_moves);
        assert_eq!(options.diff_timeout, None);
    }

    #[test]
    fn test_builder_pattern() {
        let options = DiffOptions::new()
            .with_level(DiffLevel::Character)
            .with_max_chars(20)
            .with_semantic_threshold(Some(4));

        assert_eq!(options.level, DiffLevel::Character);
        assert_eq!(options.dynamic_programming_max_chars, 20);
        assert_eq!(options.semantic_threshold, Some(4));
    }

    #[test]
    fn test_move_options_follow_rich_text() {
        let standard = DiffOptions::new().move_options();
        assert_eq!(standard, MoveOptions::default());

        let rich = DiffOptions::rich_text()
            .with_move_time_budget(Duration::from_millis(250))
            .move_options();
        assert_eq!(rich.min_block_lines, 1);
        assert_eq!(rich.min_line_length, 10);
        assert!(rich.partial_matching);
        assert_eq!(rich.block_similarity, 0.9);
        assert_eq!(rich.time_budget, Duration::from_millis(250));
    }

    #[test]
    fn test_options_from_json() {
        let options: DiffOptions = serde_json::from_str(
            r#"{"dynamicProgrammingMaxLines": 100, "computeMoves": false, "level": "character", "diffTimeout": 250}"#,
        )
        .unwrap();
        assert_eq!(options.dynamic_programming_max_lines, 100);
        assert!(!options.compute_moves);
        assert_eq!(options.level, DiffLevel::Character);
        assert_eq!(options.diff_timeout, Some(Duration::from_millis(250)));
        // Unspecified fields keep their defaults.
        assert_eq!(options.dynamic_programming_max_words, 500);
        assert_eq!(options.move_time_budget, Duration::from_secs(5));
    }

    #[test]
    fn test_null_timeout_disables_deadline() {
        let options: DiffOptions = serde_json::from_str(r#"{"diffTimeout": null}"#).unwrap();
        assert_eq!(options.diff_timeout, None);
    }
}
