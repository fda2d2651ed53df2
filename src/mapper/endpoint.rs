//! The mapper's handle on one reducer.
//!
//! An [`EndpointClient`] owns a bounded queue of words and a background task
//! that drains the queue into batches and writes them to a single,
//! long-lived connection. A full queue blocks [`EndpointQueue::enqueue`],
//! which is how a slow reducer throttles the file readers feeding it.

use std::mem;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::SinkExt;
use tokio::io::AsyncWrite;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::codec::FramedWrite;

use crate::codec::{Batch, BatchCodec};
use crate::Word;

/// Something a batch can be written to.
///
/// A failed send is retried with the same batch on the same transport, and
/// the batch must still arrive exactly once.
#[async_trait]
pub trait Transport: Send + 'static {
    async fn send_batch(&mut self, batch: &Batch) -> Result<()>;
}

/// Writes batches as length-delimited frames to a byte stream.
///
/// A batch is encoded once. If writing it out fails, the retry only flushes
/// the bytes still buffered instead of encoding a second frame.
#[derive(Debug)]
pub struct FramedTransport<W> {
    frames: FramedWrite<W, BatchCodec>,
    in_flight: bool,
}

impl<W: AsyncWrite> FramedTransport<W> {
    pub fn new(inner: W) -> Self {
        Self {
            frames: FramedWrite::new(inner, BatchCodec::new()),
            in_flight: false,
        }
    }
}

#[async_trait]
impl<W> Transport for FramedTransport<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn send_batch(&mut self, batch: &Batch) -> Result<()> {
        if !self.in_flight {
            self.frames.feed(batch).await?;
            self.in_flight = true;
        }
        self.frames.flush().await?;
        self.in_flight = false;
        Ok(())
    }
}

/// Delivery totals of one endpoint, reported when it closes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EndpointStats {
    /// Batches transmitted, including the final flush.
    pub batches: usize,
    /// Words transmitted.
    pub words: usize,
}

/// A cloneable producer handle for an endpoint's queue.
#[derive(Clone, Debug)]
pub struct EndpointQueue {
    addr: Arc<str>,
    words: mpsc::Sender<Word>,
}

impl EndpointQueue {
    /// Queues `word` for delivery, waiting while the queue is full.
    ///
    /// Fails only if the endpoint's sender task is gone.
    pub async fn enqueue(&self, word: Word) -> Result<()> {
        self.words
            .send(word)
            .await
            .map_err(|_| anyhow!("Endpoint {} is no longer accepting words", self.addr))
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[derive(Debug)]
pub struct EndpointClient {
    queue: EndpointQueue,
    task: JoinHandle<EndpointStats>,
}

impl EndpointClient {
    /// Dials `addr` and starts the sender task.
    ///
    /// The connection is made exactly once. It is not retried here and it
    /// is reused for every later send and retry.
    #[tracing::instrument(name = "Connect endpoint", skip(batch_size, backoff))]
    pub async fn connect(addr: &str, batch_size: usize, backoff: Duration) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("Failed to connect to {addr}"))?;
        tracing::debug!("Connected to {}", addr);
        Ok(Self::spawn(addr, FramedTransport::new(stream), batch_size, backoff))
    }

    /// Starts the sender task over an already established transport.
    ///
    /// `batch_size` is both the queue capacity and the batch capacity; zero
    /// is treated as one. `backoff` is the linear backoff step.
    pub fn spawn<T: Transport>(
        addr: &str,
        transport: T,
        batch_size: usize,
        backoff: Duration,
    ) -> Self {
        let batch_size = batch_size.max(1);
        let (words, rx) = mpsc::channel(batch_size);
        let addr: Arc<str> = Arc::from(addr);
        let sender = BatchSender {
            addr: addr.clone(),
            transport,
            batch_size,
            backoff,
            stats: EndpointStats::default(),
        };
        Self {
            queue: EndpointQueue { addr, words },
            task: tokio::spawn(sender.run(rx)),
        }
    }

    pub fn addr(&self) -> &str {
        self.queue.addr()
    }

    /// Returns a new producer handle for this endpoint.
    pub fn queue(&self) -> EndpointQueue {
        self.queue.clone()
    }

    pub async fn enqueue(&self, word: Word) -> Result<()> {
        self.queue.enqueue(word).await
    }

    /// Closes the queue and waits until the final batch has been sent.
    ///
    /// The queue only closes once every [`EndpointQueue`] handed out by
    /// [`EndpointClient::queue`] has been dropped as well.
    pub async fn close(self) -> Result<EndpointStats> {
        let Self { queue, task } = self;
        let addr = queue.addr.clone();
        drop(queue);
        task.await
            .with_context(|| format!("Sender task for {addr} failed"))
    }
}

struct BatchSender<T> {
    addr: Arc<str>,
    transport: T,
    batch_size: usize,
    backoff: Duration,
    stats: EndpointStats,
}

impl<T: Transport> BatchSender<T> {
    async fn run(mut self, mut words: mpsc::Receiver<Word>) -> EndpointStats {
        let mut buffer = Vec::with_capacity(self.batch_size);
        loop {
            if buffer.len() == self.batch_size {
                // A full buffer waits for the next word, so that closing the
                // queue right after it does not produce a trailing empty batch.
                match words.recv().await {
                    Some(word) => {
                        let full = mem::replace(&mut buffer, Vec::with_capacity(self.batch_size));
                        self.transmit(Batch::new(full)).await;
                        buffer.push(word);
                    }
                    None => break,
                }
            } else {
                let limit = self.batch_size - buffer.len();
                if words.recv_many(&mut buffer, limit).await == 0 {
                    break;
                }
            }
        }
        // Always flushed, even when empty: the reducer sees the endpoint finish.
        self.transmit(Batch::new(buffer)).await;
        self.stats
    }

    /// Sends `batch`, retrying forever with a linearly growing delay.
    async fn transmit(&mut self, batch: Batch) {
        let mut delay = self.backoff;
        let mut attempt = 1u64;
        while let Err(err) = self.transport.send_batch(&batch).await {
            tracing::warn!(
                endpoint = %self.addr,
                words = batch.len(),
                attempt,
                "Failed to send batch: {err:#}"
            );
            tracing::info!(endpoint = %self.addr, "Retrying in {:?}", delay);
            sleep(delay).await;
            delay += self.backoff;
            attempt += 1;
        }
        self.stats.batches += 1;
        self.stats.words += batch.len();
    }
}
