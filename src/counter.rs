//! Word frequency counting over incrementally decoded text

use serde::Serialize;
use std::collections::BTreeMap;

/// Normalized token -> occurrence count.
///
/// Keys are kept sorted so two tables built from the same words compare and
/// serialize identically regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FrequencyTable {
    counts: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordCount {
    pub word: String,
    pub count: u64,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, word: String) {
        *self.counts.entry(word).or_insert(0) += 1;
    }

    pub fn add(&mut self, word: &str, count: u64) {
        if count == 0 {
            return;
        }
        match self.counts.get_mut(word) {
            Some(n) => *n += count,
            None => {
                self.counts.insert(word.to_string(), count);
            }
        }
    }

    pub fn get(&self, word: &str) -> u64 {
        self.counts.get(word).copied().unwrap_or(0)
    }

    /// Distinct words
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Total word occurrences
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Per-key summation. Commutative and associative, so endpoint tables can
    /// be folded in any order.
    pub fn merge(&mut self, other: &FrequencyTable) {
        for (word, count) in &other.counts {
            self.add(word, *count);
        }
    }

    /// The `k` most frequent words: count descending, ties by word ascending.
    pub fn top_k(&self, k: usize) -> Vec<WordCount> {
        let mut entries: Vec<(&String, &u64)> = self.counts.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        entries
            .into_iter()
            .take(k)
            .map(|(word, count)| WordCount {
                word: word.clone(),
                count: *count,
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(w, c)| (w.as_str(), *c))
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for FrequencyTable {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut table = FrequencyTable::new();
        for (word, count) in iter {
            let word: String = word.into();
            table.add(&word, count);
        }
        table
    }
}

/// Split on non-alphanumeric boundaries and case-fold; empty tokens dropped.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

/// Count a complete text in one go
pub fn count_words(text: &str) -> FrequencyTable {
    let mut counter = WordCounter::new();
    counter.feed(text);
    counter.finish()
}

/// Streaming counter. A word split across two segments is held back as a
/// fragment and counted once, whole, when its end is seen.
#[derive(Debug, Default)]
pub struct WordCounter {
    partial: String,
    table: FrequencyTable,
}

impl WordCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, segment: &str) {
        // Only the new segment can end the held-back fragment
        let boundary = match segment
            .char_indices()
            .rev()
            .find(|(_, c)| !c.is_alphanumeric())
        {
            Some((i, c)) => i + c.len_utf8(),
            None => {
                self.partial.push_str(segment);
                return;
            }
        };

        let mut text = std::mem::take(&mut self.partial);
        text.push_str(&segment[..boundary]);
        for word in tokenize(&text) {
            self.table.record(word);
        }

        // Everything after the last separator may continue in the next segment
        text.clear();
        text.push_str(&segment[boundary..]);
        self.partial = text;
    }

    /// Fragment currently held back
    pub fn partial(&self) -> &str {
        &self.partial
    }

    /// Counts so far, excluding the held-back fragment
    pub fn table(&self) -> &FrequencyTable {
        &self.table
    }

    /// End of stream: the held-back fragment is a word of its own.
    pub fn finish(mut self) -> FrequencyTable {
        let partial = std::mem::take(&mut self.partial);
        for word in tokenize(&partial) {
            self.table.record(word);
        }
        self.table
    }
}
