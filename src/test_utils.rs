//! src/test_utils.rs
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use uuid::Uuid;

use crate::codec::Batch;
use crate::mapper::endpoint::Transport;
use crate::Word;

/// Creates a fresh, empty directory under the system temp dir.
pub fn scratch_dir() -> PathBuf {
    let path = std::env::temp_dir()
        .join("mrwc")
        .join(Uuid::new_v4().to_string());
    std::fs::create_dir_all(&path).expect("Failed to create scratch directory");
    path
}

/// An in-memory [`Transport`] that records every delivered batch and can
/// be told to fail its first few attempts.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    state: Arc<Mutex<Recording>>,
}

#[derive(Default)]
struct Recording {
    failures_left: usize,
    attempts: usize,
    batches: Vec<Batch>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(failures: usize) -> Self {
        let transport = Self::default();
        transport.state.lock().unwrap().failures_left = failures;
        transport
    }

    pub fn attempts(&self) -> usize {
        self.state.lock().unwrap().attempts
    }

    pub fn batches(&self) -> Vec<Batch> {
        self.state.lock().unwrap().batches.clone()
    }

    pub fn words(&self) -> Vec<Word> {
        self.batches().into_iter().flat_map(|b| b.words).collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_batch(&mut self, batch: &Batch) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.attempts += 1;
        if state.failures_left > 0 {
            state.failures_left -= 1;
            bail!("injected send failure");
        }
        state.batches.push(batch.clone());
        Ok(())
    }
}
