//! tests/api/helpers.rs
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use mrwc::reducer::{Reducer, ReducerConfig, ReducerMonitor};
use mrwc::telemetry::init_tracing;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub fn scratch_dir() -> PathBuf {
    let path = std::env::temp_dir()
        .join("mrwc-api")
        .join(Uuid::new_v4().to_string());
    std::fs::create_dir_all(&path).expect("Failed to create scratch directory");
    path
}

pub fn write_input(dir: &PathBuf, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("Failed to write input file");
    path
}

pub struct TestReducer {
    pub addr: SocketAddr,
    pub monitor: ReducerMonitor,
    shutdown: CancellationToken,
    handle: JoinHandle<anyhow::Result<PathBuf>>,
    output_dir: PathBuf,
}

impl TestReducer {
    pub async fn start() -> Self {
        init_tracing();
        let output_dir = scratch_dir();
        let config = ReducerConfig {
            bind_addr: "127.0.0.1:0".into(),
            output_dir: output_dir.clone(),
            ..Default::default()
        };
        let reducer = Reducer::bind(config).await.expect("Failed to bind reducer");
        let addr = reducer.local_addr().expect("No local address");
        let monitor = reducer.monitor();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(reducer.run_until(shutdown.clone()));
        Self {
            addr,
            monitor,
            shutdown,
            handle,
            output_dir,
        }
    }

    /// Waits for `connections` mapper connections to have been accepted,
    /// shuts the reducer down and returns the output file's contents.
    pub async fn finish(self, connections: usize) -> String {
        timeout(Duration::from_secs(10), async {
            while self.monitor.accepted() < connections {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("Mapper never connected");

        self.shutdown.cancel();
        let path = timeout(Duration::from_secs(10), self.handle)
            .await
            .expect("Reducer did not drain")
            .expect("Reducer task panicked")
            .expect("Reducer failed");
        let contents = std::fs::read_to_string(&path).expect("Failed to read output");
        std::fs::remove_dir_all(self.output_dir).expect("Failed to clean up");
        contents
    }
}

/// Parses `word count` lines back into pairs.
pub fn parse_output(contents: &str) -> Vec<(String, u64)> {
    contents
        .lines()
        .map(|line| {
            let (word, count) = line.rsplit_once(' ').expect("Malformed output line");
            (word.to_string(), count.parse().expect("Malformed count"))
        })
        .collect()
}
