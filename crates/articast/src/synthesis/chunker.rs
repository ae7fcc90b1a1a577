/// A slice of article text sent to the speech backend as one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Position of this chunk in the article, starting at 0.
    pub index: usize,
    pub text: String,
}

/// Splits `text` into sentences on `". "` boundaries.
///
/// Surrounding whitespace is trimmed, empty segments are dropped and every
/// sentence ends with a period, including a final segment that had none.
fn sentences(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_inclusive(". ")
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .map(|sentence| {
            if sentence.ends_with('.') {
                sentence.to_string()
            } else {
                format!("{}.", sentence)
            }
        })
}

/// Greedily packs whole sentences into chunks of at most `max_chunk_size`
/// characters.
///
/// A sentence is never split: one that is longer than the budget on its own
/// becomes a chunk by itself. Empty input yields no chunks.
pub fn split_into_chunks(text: &str, max_chunk_size: usize) -> Vec<TextChunk> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in sentences(text) {
        let sentence_len = sentence.chars().count();
        let projected = if current.is_empty() {
            sentence_len
        } else {
            current_len + 1 + sentence_len
        };

        if projected > max_chunk_size && !current.is_empty() {
            chunks.push(TextChunk {
                index: chunks.len(),
                text: std::mem::take(&mut current),
            });
            current_len = 0;
        }

        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(&sentence);
        current_len += sentence_len;
    }

    if !current.is_empty() {
        chunks.push(TextChunk {
            index: chunks.len(),
            text: current,
        });
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(chunks: &[TextChunk]) -> String {
        chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn normalized_sentences(text: &str) -> String {
        sentences(text).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(split_into_chunks("", 100).is_empty());
        assert!(split_into_chunks("   \n\t ", 100).is_empty());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = split_into_chunks("Hello world. This is short.", 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].text, "Hello world. This is short.");
    }

    #[test]
    fn test_breaks_only_between_sentences() {
        let text = "One two three. Four five six. Seven eight nine. Ten eleven.";
        let chunks = split_into_chunks(text, 30);

        assert_eq!(
            chunks.iter().map(|c| c.text.as_str()).collect::<Vec<_>>(),
            vec!["One two three. Four five six.", "Seven eight nine. Ten eleven."]
        );
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 30);
        }
    }

    #[test]
    fn test_indices_are_sequential() {
        let text = "Alpha. Beta. Gamma. Delta. Epsilon. Zeta.";
        let chunks = split_into_chunks(text, 8);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }

    #[test]
    fn test_oversized_sentence_survives_intact() {
        let long = "This single sentence is far longer than the tiny budget allows.";
        let text = format!("Short. {} Tail.", long);
        let chunks = split_into_chunks(&text, 10);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "Short.");
        assert_eq!(chunks[1].text, long);
        assert_eq!(chunks[2].text, "Tail.");
    }

    #[test]
    fn test_reconstructs_sentence_sequence() {
        let inputs = [
            "First sentence. Second one here.   Third, with  spacing. Last without period",
            "A.\nB. C? D! E. ",
            "Only one sentence that runs on and on without a break",
            ". . Leading separators. Then words.",
        ];

        for input in inputs {
            for budget in [1, 5, 20, 1000] {
                let chunks = split_into_chunks(input, budget);
                assert_eq!(joined(&chunks), normalized_sentences(input), "input {:?}", input);
                assert!(chunks.iter().all(|c| !c.text.is_empty()));
            }
        }
    }

    #[test]
    fn test_final_segment_gets_a_period() {
        let chunks = split_into_chunks("First one. Last without period", 100);
        assert_eq!(chunks[0].text, "First one. Last without period.");

        let chunks = split_into_chunks("No period at all", 100);
        assert_eq!(chunks[0].text, "No period at all.");
    }

    #[test]
    fn test_budget_holds_unless_single_sentence() {
        let text = "Tiny. Medium sized sentence. A considerably longer sentence than the others. Ok.";
        let budget = 30;
        for chunk in split_into_chunks(text, budget) {
            let len = chunk.text.chars().count();
            if len > budget {
                assert_eq!(sentences(&chunk.text).count(), 1, "{:?}", chunk.text);
            }
        }
    }

    #[test]
    fn test_budget_counts_characters_not_bytes() {
        let text = "Größe ändern. Übermäßig.";
        let chunks = split_into_chunks(text, 24);
        assert_eq!(chunks.len(), 1);
    }
}
