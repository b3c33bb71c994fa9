use itertools::Itertools;

pub const DEFAULT_SAMPLE_TEXT: &str = "The quick brown fox jumps over the lazy dog. This pangram contains every letter of the alphabet at least once. It is commonly used for typing practice because it includes a variety of common letter combinations and word patterns. Many typing tests use this sentence or similar ones to help people improve their typing speed and accuracy. Regular practice with diverse texts can significantly enhance your typing skills.";

pub const TEST_DURATION_SECS: u32 = 60;

/// The fixed words a test asks the user to type, in order.
///
/// Built once from a source string by splitting on single spaces. Words are
/// never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    words: Vec<String>,
    // char offset of each word in the space-joined text
    offsets: Vec<usize>,
}

impl Sample {
    pub fn new(source: &str) -> Self {
        let words: Vec<String> = source.split(' ').map(str::to_string).collect();

        let mut offsets = Vec::with_capacity(words.len());
        let mut next = 0;
        for word in &words {
            offsets.push(next);
            next += word.chars().count() + 1;
        }

        Self { words, offsets }
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Always false for a sample built by [`Sample::new`]: splitting yields
    /// at least one (possibly empty) word.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn word(&self, idx: usize) -> Option<&str> {
        self.words.get(idx).map(String::as_str)
    }

    /// The whole sample as one space-joined string.
    pub fn text(&self) -> String {
        self.words.iter().join(" ")
    }

    /// Words before `idx` joined with spaces, plus the separating space when
    /// `idx > 0`. This is the already-committed prefix of the test.
    pub fn committed_prefix(&self, idx: usize) -> String {
        let idx = idx.min(self.words.len());
        let mut prefix = self.words[..idx].iter().join(" ");
        if idx > 0 {
            prefix.push(' ');
        }
        prefix
    }

    /// Absolute char offset of word `idx` within [`Sample::text`].
    pub fn word_offset(&self, idx: usize) -> Option<usize> {
        self.offsets.get(idx).copied()
    }
}

impl Default for Sample {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_TEXT)
    }
}
