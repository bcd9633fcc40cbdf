// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fragment concatenation.

const SENTENCE_END: [char; 3] = ['.', '!', '?'];

/// Join fragments in arrival order into one readable text.
///
/// Fragments are trimmed and blank ones dropped. A `.` is added after every
/// fragment but the last that does not already end a sentence.
pub fn merge_fragments<S: AsRef<str>>(fragments: &[S]) -> String {
    let parts: Vec<&str> = fragments
        .iter()
        .map(|f| f.as_ref().trim())
        .filter(|f| !f.is_empty())
        .collect();

    let mut merged = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            merged.push(' ');
        }
        merged.push_str(part);
        let is_last = i + 1 == parts.len();
        if !is_last && !part.ends_with(SENTENCE_END) {
            merged.push('.');
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn inserts_missing_punctuation_only() {
        assert_eq!(
            merge_fragments(&["preciso de ajuda", "pode me ligar?"]),
            "preciso de ajuda. pode me ligar?"
        );
        assert_eq!(merge_fragments(&["oi!", "tudo bem?", "sim"]), "oi! tudo bem? sim");
    }

    #[test]
    fn last_fragment_is_left_alone() {
        assert_eq!(merge_fragments(&["um", "dois"]), "um. dois");
        assert_eq!(merge_fragments(&["sozinho"]), "sozinho");
    }

    #[test]
    fn blank_fragments_are_dropped() {
        assert_eq!(merge_fragments(&["  oi  ", "", "   ", "ok"]), "oi. ok");
        assert_eq!(merge_fragments::<&str>(&[]), "");
        assert_eq!(merge_fragments(&["  "]), "");
    }

    #[test]
    fn no_reordering_or_dedup() {
        assert_eq!(merge_fragments(&["b", "a", "a"]), "b. a. a");
    }

    proptest! {
        #[test]
        fn every_fragment_appears_in_order(frags in prop::collection::vec("[a-z]{1,8}[.!?]?", 1..8)) {
            let merged = merge_fragments(&frags);
            let mut cursor = 0;
            for f in &frags {
                let found = merged[cursor..].find(f.as_str());
                prop_assert!(found.is_some(), "{f:?} missing after {cursor} in {merged:?}");
                cursor += found.unwrap_or(0) + f.len();
            }
        }

        #[test]
        fn punctuation_is_never_doubled(frags in prop::collection::vec("[a-z ]{0,6}[.!?]?", 0..8)) {
            let merged = merge_fragments(&frags);
            prop_assert!(!merged.contains(".."));
            prop_assert!(!merged.contains("?."));
            prop_assert!(!merged.contains("!."));
        }
    }
}
