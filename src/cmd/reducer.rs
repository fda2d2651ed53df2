use std::path::PathBuf;

use clap::Parser;

use crate::reducer::{ReducerConfig, DEFAULT_QUEUE_CAPACITY};

/// Count the words sent by mappers; save them on SIGINT or SIGTERM.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The address to bind to
    #[clap(short, long, env = "MRWC_ADDR", default_value = "0.0.0.0:1831")]
    pub addr: String,
    /// [OPT] Directory for the output file (default: the system temp dir)
    #[clap(short, long, env = "MRWC_OUTPUT_DIR", default_value = None)]
    pub output_dir: Option<PathBuf>,
    /// Capacity of the queue between connections and the counter
    #[clap(long, env = "MRWC_QUEUE_CAPACITY", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,
}

impl Args {
    pub fn config(&self) -> ReducerConfig {
        let defaults = ReducerConfig::default();
        ReducerConfig {
            bind_addr: self.addr.clone(),
            output_dir: self.output_dir.clone().unwrap_or(defaults.output_dir),
            queue_capacity: self.queue_capacity,
        }
    }
}
