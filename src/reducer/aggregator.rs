//! The single task that owns the word-count table.
//!
//! Connection handlers never touch the table. They send words into the
//! aggregator's queue. The table leaves the task by value once every
//! sender is gone, so a caller holding it knows no more mutation can happen.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::reducer::counts::WordCounts;
use crate::Word;

/// Producer side of the aggregator's queue, one clone per connection.
pub type WordSender = mpsc::Sender<Word>;

pub struct Aggregator {
    words: mpsc::Receiver<Word>,
    counts: WordCounts,
}

impl Aggregator {
    /// Starts an aggregator whose queue holds up to `capacity` words.
    ///
    /// The handle resolves to the final table after the last [`WordSender`]
    /// is dropped and the queue is drained.
    pub fn spawn(capacity: usize) -> (WordSender, JoinHandle<WordCounts>) {
        let (tx, words) = mpsc::channel(capacity.max(1));
        let aggregator = Self {
            words,
            counts: WordCounts::new(),
        };
        (tx, tokio::spawn(aggregator.run()))
    }

    async fn run(mut self) -> WordCounts {
        while let Some(word) = self.words.recv().await {
            self.counts.add(word);
        }
        tracing::debug!(distinct = self.counts.len(), "Aggregator drained");
        self.counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_count_words_from_many_senders() {
        let (tx, handle) = Aggregator::spawn(2);
        let producers = (0..4)
            .map(|_| {
                let tx = tx.clone();
                tokio::spawn(async move {
                    for word in ["x", "y", "x"] {
                        tx.send(word.to_string()).await.unwrap();
                    }
                })
            })
            .collect::<Vec<_>>();
        drop(tx);
        for producer in producers {
            producer.await.unwrap();
        }

        let counts = handle.await.unwrap();

        assert_eq!(counts.get("x"), 8);
        assert_eq!(counts.get("y"), 4);
        assert_eq!(counts.total(), 12);
    }

    #[tokio::test]
    async fn should_finish_only_after_every_sender_is_dropped() {
        let (tx, handle) = Aggregator::spawn(4);
        let straggler = tx.clone();
        drop(tx);
        tokio::task::yield_now().await;
        assert!(!handle.is_finished());

        straggler.send("late".into()).await.unwrap();
        drop(straggler);
        let counts = handle.await.unwrap();
        assert_eq!(counts.get("late"), 1);
    }
}
