//! Splits input files into words.
//!
//! Bytes that are not valid UTF-8 become U+FFFD, which is not a letter and
//! is stripped like any other punctuation.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::Word;

/// What to do with tokens that are empty once non-letters are stripped,
/// e.g. `"1984"` or `"--"`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EmptyTokens {
    /// Discard them.
    #[default]
    Drop,
    /// Count them as the empty word.
    Keep,
}

/// Removes every character that is not alphabetic.
pub fn strip_non_letters(raw: &str) -> Word {
    raw.chars().filter(|c| c.is_alphabetic()).collect()
}

/// Yields the stripped words of `text`, split on Unicode whitespace.
pub fn words(text: &str, empty: EmptyTokens) -> impl Iterator<Item = Word> + '_ {
    text.split_whitespace()
        .map(strip_non_letters)
        .filter(move |word| empty == EmptyTokens::Keep || !word.is_empty())
}

/// A lazy, single-pass sequence of the words in one file.
#[derive(Debug)]
pub struct Tokenizer {
    path: PathBuf,
    reader: BufReader<File>,
    line: Vec<u8>,
    pending: VecDeque<Word>,
    empty: EmptyTokens,
}

impl Tokenizer {
    pub async fn open(path: impl AsRef<Path>, empty: EmptyTokens) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        Ok(Self {
            path,
            reader: BufReader::new(file),
            line: Vec::new(),
            pending: VecDeque::new(),
            empty,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the next word, or `None` once the file is exhausted.
    ///
    /// I/O errors are returned as-is; the tokenizer must not be polled
    /// again afterwards.
    pub async fn next_word(&mut self) -> Result<Option<Word>> {
        loop {
            if let Some(word) = self.pending.pop_front() {
                return Ok(Some(word));
            }
            self.line.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut self.line)
                .await
                .with_context(|| format!("Failed to read {}", self.path.display()))?;
            if read == 0 {
                return Ok(None);
            }
            let text = String::from_utf8_lossy(&self.line);
            self.pending.extend(words(&text, self.empty));
        }
    }
}
