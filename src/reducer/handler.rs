//! Decodes one inbound connection and feeds its words to the aggregator.

use std::net::SocketAddr;

use anyhow::{anyhow, Context, Result};
use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;

use crate::codec::BatchCodec;
use crate::reducer::aggregator::WordSender;

/// What one connection delivered before it ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    pub batches: usize,
    pub words: usize,
}

/// Reads batches from `stream` until a clean end of stream, forwarding
/// every word to `words` in the order received.
///
/// A decode error ends this connection only. Words from batches decoded
/// before the error have already been forwarded.
#[tracing::instrument(name = "Handle connection", skip(stream, words))]
pub async fn handle_connection<R>(
    peer: SocketAddr,
    stream: R,
    words: WordSender,
) -> Result<ConnectionStats>
where
    R: AsyncRead + Unpin,
{
    let mut frames = FramedRead::new(stream, BatchCodec::new());
    let mut stats = ConnectionStats::default();
    while let Some(frame) = frames.next().await {
        let batch = frame.with_context(|| {
            format!("Failed to decode batch {} from {peer}", stats.batches + 1)
        })?;
        stats.batches += 1;
        stats.words += batch.len();
        for word in batch.words {
            words
                .send(word)
                .await
                .map_err(|_| anyhow!("Aggregator stopped while {peer} was sending"))?;
        }
    }
    tracing::info!(batches = stats.batches, words = stats.words, "EOF from {}", peer);
    Ok(stats)
}
