//! Reads input files and routes their words to reducers.
//!
//! Every file gets its own task. Each word goes through [`partition`] to
//! pick an endpoint and is queued there. Once every file task has finished,
//! the endpoints are closed one by one. Each close waits for that
//! endpoint's final batch.

pub mod endpoint;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use futures::future::join_all;

use crate::tokenizer::{EmptyTokens, Tokenizer};
use crate::{partition, Word};
use endpoint::{EndpointClient, EndpointQueue, EndpointStats};

/// Default number of words per batch, which is also the queue capacity.
pub const DEFAULT_BATCH_SIZE: usize = 4096;

#[derive(Clone, Debug)]
pub struct MapperConfig {
    pub batch_size: usize,
    /// Step of the linear retry backoff.
    pub backoff: Duration,
    pub empty_tokens: EmptyTokens,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            backoff: Duration::from_secs(1),
            empty_tokens: EmptyTokens::Drop,
        }
    }
}

/// What a [`Mapper::run`] accomplished.
#[derive(Debug, Default)]
pub struct MapSummary {
    /// Number of input files given.
    pub files: usize,
    /// Files whose task failed. Words read before the failure were still sent.
    pub failed_files: Vec<PathBuf>,
    /// Words delivered across all endpoints.
    pub words: usize,
    /// Delivery totals per endpoint address, in endpoint order.
    pub endpoints: Vec<(String, EndpointStats)>,
}

/// Routes a word to its endpoint queue.
#[derive(Clone)]
struct Router {
    queues: Arc<[EndpointQueue]>,
}

impl Router {
    async fn route(&self, word: Word) -> Result<()> {
        let index = partition(&word, self.queues.len());
        self.queues[index].enqueue(word).await
    }
}

#[derive(Debug)]
pub struct Mapper {
    endpoints: Vec<EndpointClient>,
    config: MapperConfig,
}

impl Mapper {
    /// Connects to every host in `hosts`.
    ///
    /// Hosts that cannot be reached are logged and left out, so words are
    /// partitioned over the reachable ones only. Fails if none is reachable.
    #[tracing::instrument(name = "Connect mapper", skip_all, fields(hosts = hosts.len()))]
    pub async fn connect<S: AsRef<str>>(hosts: &[S], config: MapperConfig) -> Result<Self> {
        let mut endpoints = Vec::with_capacity(hosts.len());
        for host in hosts {
            let host = host.as_ref();
            match EndpointClient::connect(host, config.batch_size, config.backoff).await {
                Ok(endpoint) => endpoints.push(endpoint),
                Err(err) => {
                    tracing::error!(addr = host, "Excluding unreachable endpoint: {err:#}")
                }
            }
        }
        Self::with_endpoints(endpoints, config)
    }

    /// Builds a mapper over endpoints that are already running.
    ///
    /// The order of `endpoints` fixes the partition index of each one.
    pub fn with_endpoints(endpoints: Vec<EndpointClient>, config: MapperConfig) -> Result<Self> {
        if endpoints.is_empty() {
            bail!("No reachable endpoints");
        }
        Ok(Self { endpoints, config })
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    pub fn endpoint_addrs(&self) -> Vec<&str> {
        self.endpoints.iter().map(EndpointClient::addr).collect()
    }

    /// Maps `files` and waits until every endpoint has flushed.
    ///
    /// A file that cannot be read fails on its own; the rest still run.
    #[tracing::instrument(name = "Run mapper", skip_all, fields(files = files.len()))]
    pub async fn run(self, files: Vec<PathBuf>) -> Result<MapSummary> {
        tracing::info!("Mapping {} files", files.len());
        let router = Router {
            queues: self.endpoints.iter().map(EndpointClient::queue).collect(),
        };
        let tasks = files
            .iter()
            .cloned()
            .map(|path| tokio::spawn(map_file(path, router.clone(), self.config.empty_tokens)))
            .collect::<Vec<_>>();
        // The endpoint queues only close once no router is left.
        drop(router);

        let mut summary = MapSummary {
            files: files.len(),
            ..Default::default()
        };
        for (path, result) in files.into_iter().zip(join_all(tasks).await) {
            let err = match result {
                Ok(Ok(_)) => continue,
                Ok(Err(err)) => err,
                Err(join_err) => join_err.into(),
            };
            tracing::error!(file = %path.display(), "Failed to map file: {err:#}");
            summary.failed_files.push(path);
        }

        // Every endpoint is closed before the first failure is reported.
        let mut first_err = None;
        for endpoint in self.endpoints {
            let addr = endpoint.addr().to_string();
            match endpoint.close().await {
                Ok(stats) => {
                    tracing::info!(
                        endpoint = %addr,
                        batches = stats.batches,
                        words = stats.words,
                        "Endpoint flushed"
                    );
                    summary.words += stats.words;
                    summary.endpoints.push((addr, stats));
                }
                Err(err) => {
                    tracing::error!(endpoint = %addr, "Failed to close endpoint: {err:#}");
                    first_err.get_or_insert(err);
                }
            }
        }
        if let Some(err) = first_err {
            return Err(err);
        }
        tracing::info!(words = summary.words, "Transmitted all files");
        Ok(summary)
    }
}

async fn map_file(path: PathBuf, router: Router, empty: EmptyTokens) -> Result<usize> {
    tracing::info!(file = %path.display(), "Start reading");
    let mut tokenizer = Tokenizer::open(&path, empty).await?;
    let mut words = 0;
    while let Some(word) = tokenizer.next_word().await? {
        router.route(word).await?;
        words += 1;
    }
    tracing::info!(file = %path.display(), words, "Finished reading");
    Ok(words)
}
