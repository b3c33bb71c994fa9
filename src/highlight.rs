use crate::engine::Snapshot;
use crate::sample::Sample;

/// How a single character of the sample should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    /// Already typed and matching
    Typed,
    /// Typed and mismatching in the latest comparison
    Error,
    /// Next character to type
    Cursor,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedWord {
    pub chars: Vec<(char, Mark)>,
    /// The current word is fully typed and the cursor sits on the separator
    pub cursor_after: bool,
}

/// Mark every character of every word, word by word.
pub fn mark_words(sample: &Sample, snapshot: &Snapshot) -> Vec<MarkedWord> {
    let session = &snapshot.session;
    let typed_len = session.current_input.chars().count();

    sample
        .words()
        .iter()
        .enumerate()
        .map(|(word_idx, word)| {
            let offset = sample.word_offset(word_idx).unwrap_or_default();
            let is_current = word_idx == session.current_word_index;
            let is_past = word_idx < session.current_word_index;

            let chars = word
                .chars()
                .enumerate()
                .map(|(char_idx, c)| {
                    let is_typed = is_past || (is_current && char_idx < typed_len);
                    let mark = if is_current && char_idx == typed_len {
                        Mark::Cursor
                    } else if is_typed && session.error_positions.contains(&(offset + char_idx)) {
                        Mark::Error
                    } else if is_typed {
                        Mark::Typed
                    } else {
                        Mark::Pending
                    };
                    (c, mark)
                })
                .collect();

            MarkedWord {
                chars,
                cursor_after: is_current && typed_len == word.chars().count(),
            }
        })
        .collect()
}
