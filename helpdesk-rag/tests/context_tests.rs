//! Context assembly: budget, numbering, and deduplication.

mod common;

use common::chunk;
use helpdesk_rag::{SearchResult, assemble};
use proptest::prelude::*;

fn arb_matches() -> impl Strategy<Value = Vec<SearchResult>> {
    proptest::collection::vec(("[a-z ]{1,40}", 0.0f32..=1.0f32), 0..15).prop_map(|entries| {
        entries
            .into_iter()
            .enumerate()
            .map(|(i, (text, score))| chunk(&format!("c{i}"), &text, score))
            .collect()
    })
}

mod prop_context_budget {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn block_never_exceeds_the_budget(matches in arb_matches(), max_chars in 1usize..400) {
            let context = assemble(&matches, max_chars);
            prop_assert!(context.block.chars().count() <= max_chars);
        }

        #[test]
        fn every_cited_source_appears_numbered_in_order(matches in arb_matches(), max_chars in 1usize..400) {
            let context = assemble(&matches, max_chars);

            let expected: Vec<String> = context
                .sources
                .iter()
                .enumerate()
                .map(|(i, s)| format!("[{}] {}", i + 1, s.chunk.text))
                .collect();
            prop_assert_eq!(context.block, expected.join("\n\n"));

            for pair in context.sources.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
            }
        }
    }
}

#[test]
fn empty_matches_give_an_empty_context() {
    let context = assemble(&[], 4000);
    assert!(context.is_empty());
    assert_eq!(context.block, "");
}

#[test]
fn orders_by_score_and_numbers_from_one() {
    let matches = vec![chunk("a", "low", 0.2), chunk("b", "high", 0.9), chunk("c", "mid", 0.5)];
    let context = assemble(&matches, 4000);

    assert_eq!(context.block, "[1] high\n\n[2] mid\n\n[3] low");
    let ids: Vec<&str> = context.sources.iter().map(|s| s.chunk.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "c", "a"]);
}

#[test]
fn identical_text_is_cited_once_with_the_best_score() {
    let matches = vec![
        chunk("a", "We open at 9am.", 0.4),
        chunk("b", "We open at 9am.", 0.8),
        chunk("c", "Returns take 30 days.", 0.6),
    ];
    let context = assemble(&matches, 4000);

    assert_eq!(context.sources.len(), 2);
    assert_eq!(context.sources[0].chunk.id, "b");
    assert_eq!(context.block, "[1] We open at 9am.\n\n[2] Returns take 30 days.");
}

#[test]
fn a_match_that_does_not_fit_is_dropped_whole() {
    let matches = vec![chunk("a", "first", 0.9), chunk("b", "second passage", 0.8)];

    // "[1] first" is 9 characters; the second entry would need 2 + 18 more
    let context = assemble(&matches, 20);

    assert_eq!(context.block, "[1] first");
    assert_eq!(context.sources.len(), 1);
}

#[test]
fn nothing_fits_in_a_tiny_budget() {
    let context = assemble(&[chunk("a", "a long passage of text", 0.9)], 5);
    assert!(context.is_empty());
    assert_eq!(context.block, "");
}
