use std::time::Duration;

use clap::Parser;

use crate::mapper::{MapperConfig, DEFAULT_BATCH_SIZE};
use crate::tokenizer::EmptyTokens;
use crate::utils::split_hosts;

/// Extract words from FILE(s) and send them to the reducer HOST(s).
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The host(s) to send words to. These can be comma-separated to send to multiple hosts.
    #[clap(short = 'H', long, env = "MRWC_HOSTS", default_value = "127.0.0.1:1831")]
    pub host: String,
    /// Number of words per batch, also the size of each endpoint queue
    #[clap(long, env = "MRWC_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
    /// Linear backoff step between send retries, in milliseconds
    #[clap(long, env = "MRWC_BACKOFF_MS", default_value_t = 1000)]
    pub backoff_ms: u64,
    /// Count tokens that are empty after stripping non-letters
    #[clap(long, env = "MRWC_KEEP_EMPTY")]
    pub keep_empty: bool,
    /// Input files or glob patterns
    #[clap(value_name = "FILE")]
    pub files: Vec<String>,
}

impl Args {
    pub fn hosts(&self) -> Vec<String> {
        split_hosts(&self.host)
    }

    pub fn config(&self) -> MapperConfig {
        MapperConfig {
            batch_size: self.batch_size,
            backoff: Duration::from_millis(self.backoff_ms),
            empty_tokens: if self.keep_empty {
                EmptyTokens::Keep
            } else {
                EmptyTokens::Drop
            },
        }
    }
}
