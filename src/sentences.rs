//! Sentence boundary segmentation for speech output.
//!
//! Segmentation always runs over the complete text assembled so far. It is a
//! pure function of its input, so rerunning it on every update is safe.

use unicode_segmentation::UnicodeSegmentation;

/// Split `text` into trimmed sentences following UAX #29 sentence bounds.
/// Whitespace-only pieces are dropped.
pub fn segment(text: &str) -> Vec<String> {
    text.split_sentence_bounds()
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_sentences() {
        assert_eq!(segment("Hello. World."), vec!["Hello.", "World."]);
    }

    #[test]
    fn test_trailing_whitespace_is_not_a_sentence() {
        assert_eq!(segment("Hello. "), vec!["Hello."]);
        assert!(segment("   ").is_empty());
        assert!(segment("").is_empty());
    }

    #[test]
    fn test_open_sentence_counts() {
        assert_eq!(segment("Hello. Wor"), vec!["Hello.", "Wor"]);
    }

    #[test]
    fn test_question_and_exclamation() {
        assert_eq!(
            segment("Is it raining? Yes! Take an umbrella."),
            vec!["Is it raining?", "Yes!", "Take an umbrella."]
        );
    }

    #[test]
    fn test_decimal_numbers_do_not_split() {
        assert_eq!(segment("Pi is about 3.14 today."), vec!["Pi is about 3.14 today."]);
    }

    #[test]
    fn test_deterministic() {
        let text = "One. Two? Three!";
        assert_eq!(segment(text), segment(text));
    }
}
