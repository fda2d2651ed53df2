//! A sharded, distributed word count.
//!
//! Mappers tokenize local files and route every word to one of several
//! reducers using a fixed partition function. Each reducer counts the words
//! it receives over persistent connections and writes its table to disk on
//! shutdown. No coordination happens beyond the partition function, so the
//! output files of different reducers never share a word.

pub mod cmd;
pub mod codec;
pub mod mapper;
pub mod reducer;
pub mod telemetry;
#[cfg(test)]
mod test_utils;
pub mod tokenizer;
pub mod utils;

/////////////////////////////////////////////////////////////////////////////
// Words
/////////////////////////////////////////////////////////////////////////////

/// A single token with all non-letter characters removed.
///
/// Kept as a plain [`String`]; the alias only documents intent.
pub type Word = String;

/////////////////////////////////////////////////////////////////////////////
// Partitioning
/////////////////////////////////////////////////////////////////////////////

const DJB2_SEED: u64 = 5381;

/// Hashes a word with the xor variant of DJB2.
///
/// The accumulator starts at 5381 and, for every Unicode scalar value `r`,
/// becomes `(acc * 33) ^ r` with wrapping 64-bit arithmetic. The value must
/// stay stable across releases: it decides which reducer owns a word.
pub fn djb2(word: &str) -> u64 {
    word.chars().fold(DJB2_SEED, |acc, c| {
        (acc << 5).wrapping_add(acc) ^ u64::from(c)
    })
}

/// Computes the endpoint index for `word` by calculating `djb2(word) % n`.
///
/// # Panics
///
/// Panics if `n` is zero. Callers guarantee a non-empty endpoint set before
/// any word is routed.
#[inline]
pub fn partition(word: &str, n: usize) -> usize {
    (djb2(word) % n as u64) as usize
}
