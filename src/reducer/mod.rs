//! Accepts mapper connections, counts their words and saves the table on
//! shutdown.
//!
//! A reducer moves through [`ReducerState`] in order:
//!
//! * `Listening`: accepting connections and spawning a handler for each.
//! * `Draining`: shutdown was requested. No new connections are accepted,
//!   and the reducer waits for every open handler to see its connection end.
//! * `Persisting`: the aggregator has drained and handed back the table,
//!   which is written to a new file.
//! * `Terminated`: [`Reducer::run_until`] returns.

pub mod aggregator;
pub mod counts;
pub mod handler;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use aggregator::Aggregator;
use handler::handle_connection;

/// Default capacity of the aggregator's input queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;

/// Pause after a failed accept, so a persistent error does not spin.
const ACCEPT_ERROR_PAUSE: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReducerState {
    Listening,
    Draining,
    Persisting,
    Terminated,
}

#[derive(Clone, Debug)]
pub struct ReducerConfig {
    pub bind_addr: String,
    /// Directory in which the output file is created.
    pub output_dir: PathBuf,
    pub queue_capacity: usize,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:1831".to_string(),
            output_dir: std::env::temp_dir(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// A read-only view of a running reducer.
#[derive(Clone, Debug)]
pub struct ReducerMonitor {
    state: watch::Receiver<ReducerState>,
    accepted: Arc<AtomicUsize>,
    connections: TaskTracker,
}

impl ReducerMonitor {
    pub fn state(&self) -> ReducerState {
        *self.state.borrow()
    }

    /// Connections accepted since the reducer started.
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Connection handlers that have not finished yet.
    pub fn active(&self) -> usize {
        self.connections.len()
    }

    /// Waits until the reducer has reached `target`.
    pub async fn wait_for(&mut self, target: ReducerState) -> Result<()> {
        self.state
            .wait_for(|state| *state == target)
            .await
            .with_context(|| format!("Reducer stopped before reaching {target:?}"))?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct Reducer {
    listener: TcpListener,
    config: ReducerConfig,
    state: watch::Sender<ReducerState>,
    accepted: Arc<AtomicUsize>,
    connections: TaskTracker,
}

impl Reducer {
    /// Binds the listening socket. The reducer starts out `Listening`.
    #[tracing::instrument(name = "Bind reducer", skip_all, fields(addr = %config.bind_addr))]
    pub async fn bind(config: ReducerConfig) -> Result<Self> {
        let listener = TcpListener::bind(&config.bind_addr)
            .await
            .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
        let (state, _) = watch::channel(ReducerState::Listening);
        Ok(Self {
            listener,
            config,
            state,
            accepted: Arc::new(AtomicUsize::new(0)),
            connections: TaskTracker::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn monitor(&self) -> ReducerMonitor {
        ReducerMonitor {
            state: self.state.subscribe(),
            accepted: self.accepted.clone(),
            connections: self.connections.clone(),
        }
    }

    /// Runs until SIGINT or SIGTERM, then drains and persists.
    pub async fn run(self) -> Result<PathBuf> {
        self.run_until(shutdown_on_signal()).await
    }

    /// Runs until `shutdown` is cancelled, then drains and persists.
    ///
    /// Returns the path of the output file.
    #[tracing::instrument(name = "Run reducer", skip_all)]
    pub async fn run_until(self, shutdown: CancellationToken) -> Result<PathBuf> {
        let Self {
            listener,
            config,
            state,
            accepted,
            connections,
        } = self;
        let (words, aggregator) = Aggregator::spawn(config.queue_capacity);

        tracing::info!("Listening on {}", listener.local_addr()?);
        tracing::info!("Press ^C (SIGINT) to save output file when done.");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                conn = listener.accept() => match conn {
                    Ok((stream, peer)) => {
                        accepted.fetch_add(1, Ordering::SeqCst);
                        let words = words.clone();
                        connections.spawn(async move {
                            if let Err(err) = handle_connection(peer, stream, words).await {
                                tracing::warn!(%peer, "Dropping connection: {err:#}");
                            }
                        });
                    }
                    Err(err) => {
                        tracing::warn!("Failed to accept connection: {err}");
                        sleep(ACCEPT_ERROR_PAUSE).await;
                    }
                },
            }
        }
        drop(listener);

        transition(&state, ReducerState::Draining);
        tracing::info!(active = connections.len(), "Waiting for queues to finish...");
        connections.close();
        connections.wait().await;
        // Every handler is gone; this was the last sender.
        drop(words);
        let counts = aggregator.await.context("Aggregator task failed")?;

        transition(&state, ReducerState::Persisting);
        let saved = counts.save(&config.output_dir);
        transition(&state, ReducerState::Terminated);
        saved
    }
}

fn transition(state: &watch::Sender<ReducerState>, next: ReducerState) {
    let previous = state.send_replace(next);
    tracing::info!("Reducer {:?} -> {:?}", previous, next);
}

/// Returns a token that is cancelled on the first SIGINT or SIGTERM.
pub fn shutdown_on_signal() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received");
                trigger.cancel();
            }
            Err(err) => tracing::error!("Cannot listen for shutdown signals: {err:#}"),
        }
    });
    token
}

#[cfg(unix)]
async fn wait_for_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
