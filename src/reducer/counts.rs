//! The word-count table and how it is written to disk.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fnv::FnvHashMap;
use itertools::Itertools;
use uuid::Uuid;

use crate::Word;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WordCounts {
    counts: FnvHashMap<Word, u64>,
}

impl WordCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one more occurrence of `word`.
    #[inline]
    pub fn add(&mut self, word: Word) {
        *self.counts.entry(word).or_insert(0) += 1;
    }

    pub fn get(&self, word: &str) -> u64 {
        self.counts.get(word).copied().unwrap_or(0)
    }

    /// Number of distinct words.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Entries in ascending byte order of the word.
    pub fn sorted(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts
            .iter()
            .sorted_unstable_by(|a, b| a.0.cmp(b.0))
            .map(|(word, count)| (word.as_str(), *count))
    }

    /// Writes one `word count` line per entry, sorted by word.
    pub fn write_to<W: Write>(&self, mut out: W) -> Result<()> {
        for (word, count) in self.sorted() {
            writeln!(out, "{word} {count}")?;
        }
        out.flush()?;
        Ok(())
    }

    /// Writes the table to a newly created file in `dir` and returns its path.
    ///
    /// The file name is random, so an existing file is never overwritten.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        tracing::info!("Sorting {} words", self.len());
        let path = dir.join(format!("wc-{}.txt", Uuid::new_v4()));
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .with_context(|| format!("Failed to create output file {}", path.display()))?;
        self.write_to(BufWriter::new(file))
            .with_context(|| format!("Failed to write output file {}", path.display()))?;
        tracing::info!("Saved to {}", path.display());
        Ok(path)
    }
}

impl FromIterator<Word> for WordCounts {
    fn from_iter<I: IntoIterator<Item = Word>>(words: I) -> Self {
        let mut counts = Self::new();
        for word in words {
            counts.add(word);
        }
        counts
    }
}
