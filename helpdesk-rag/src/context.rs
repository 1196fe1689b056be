//! Assembly of retrieved matches into a bounded context block.

use std::collections::HashSet;

use crate::document::SearchResult;

const SEPARATOR: &str = "\n\n";

/// The context handed to the generative model, plus the matches it cites.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledContext {
    /// Numbered passages, `[1] ...`, separated by blank lines.
    pub block: String,
    /// The matches that made it into `block`, in the same order.
    pub sources: Vec<SearchResult>,
}

impl AssembledContext {
    /// Whether no passage made it into the context.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Builds context blocks limited to `max_chars` characters.
#[derive(Debug, Clone, Copy)]
pub struct ContextAssembler {
    max_chars: usize,
}

impl ContextAssembler {
    /// Create an assembler with the given character budget.
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Deduplicate, order, and number `matches` within the budget.
    ///
    /// Matches with identical text collapse into the highest-scoring one.
    /// Passages are added in descending score order until the next one would
    /// push the block past the budget; that passage and every later one are
    /// dropped whole and are not cited.
    pub fn assemble(&self, matches: &[SearchResult]) -> AssembledContext {
        let mut ordered: Vec<&SearchResult> = matches.iter().collect();
        ordered.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let mut seen = HashSet::new();
        let mut context = AssembledContext::default();
        let mut used = 0;

        for result in ordered {
            if !seen.insert(result.chunk.text.as_str()) {
                continue;
            }

            let entry = format!("[{}] {}", context.sources.len() + 1, result.chunk.text);
            let separator = if context.block.is_empty() { "" } else { SEPARATOR };
            let cost = separator.chars().count() + entry.chars().count();
            if used + cost > self.max_chars {
                break;
            }

            context.block.push_str(separator);
            context.block.push_str(&entry);
            context.sources.push(result.clone());
            used += cost;
        }

        context
    }
}

/// Assemble `matches` into a context block of at most `max_chars` characters.
///
/// See [`ContextAssembler::assemble`].
pub fn assemble(matches: &[SearchResult], max_chars: usize) -> AssembledContext {
    ContextAssembler::new(max_chars).assemble(matches)
}
