//! Connection dispatcher: accept loop, admission control, shutdown.
//!
//! One dispatcher owns the listening socket and a semaphore bounding the
//! number of concurrently served connections. Each admitted socket runs
//! its own worker task; a socket that cannot be admitted is closed
//! immediately so the descriptor is never leaked. Shutdown stops
//! accepting, lets workers drain for a bounded grace period, then aborts
//! whatever is left (which closes their sockets).

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::server::connection::{serve, ConnectionSettings};
use crate::server::errors::DispatcherError;
use crate::store::GroupStore;

/// Accepts connections and hands each to a bounded pool of workers.
pub struct Dispatcher {
    listener: TcpListener,
    store: Arc<GroupStore>,
    config: Config,
    shutdown_tx: broadcast::Sender<()>,
    // Subscribed at bind time so a stop() issued before run() is not lost.
    shutdown_rx: broadcast::Receiver<()>,
}

/// Handle for stopping a running dispatcher from another task.
#[derive(Clone)]
pub struct DispatcherHandle {
    shutdown_tx: broadcast::Sender<()>,
}

impl DispatcherHandle {
    /// Signal the dispatcher to begin its orderly shutdown.
    pub fn stop(&self) {
        // Nothing to do if the dispatcher is already gone.
        let _ = self.shutdown_tx.send(());
    }
}

impl Dispatcher {
    /// Bind the listener and seed the store with the default group.
    pub async fn bind(config: Config) -> Result<Self, DispatcherError> {
        config.validate()?;

        let store = Arc::new(GroupStore::new(
            config.groups.message_cache_size,
            config.groups.max_messages_returned,
        ));
        store.create_group(&config.groups.default_group, &config.groups.default_password)?;

        let listener = TcpListener::bind(config.server.bind_address).await?;
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        Ok(Dispatcher {
            listener,
            store,
            config,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// The address actually bound (useful with an ephemeral port).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The shared group store, for startup provisioning.
    pub fn store(&self) -> Arc<GroupStore> {
        Arc::clone(&self.store)
    }

    /// A handle that can stop this dispatcher.
    pub fn handle(&self) -> DispatcherHandle {
        DispatcherHandle {
            shutdown_tx: self.shutdown_tx.clone(),
        }
    }

    /// Run the accept loop until [`DispatcherHandle::stop`] is called,
    /// then drain and cancel workers.
    pub async fn run(self) -> Result<(), DispatcherError> {
        let semaphore = Arc::new(Semaphore::new(self.config.server.max_connections));
        let settings = ConnectionSettings {
            inactivity_timeout: self.config.server.inactivity_timeout,
            default_topic: self.config.groups.default_topic.clone(),
        };
        let mut shutdown_rx = self.shutdown_rx;
        let mut workers = JoinSet::new();

        info!(
            addr = %self.listener.local_addr()?,
            capacity = self.config.server.max_connections,
            "dispatcher listening"
        );

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("shutdown requested, no longer accepting connections");
                    break;
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            error!(error = %e, "failed to accept connection");
                            continue;
                        }
                    };
                    match Arc::clone(&semaphore).try_acquire_owned() {
                        Ok(permit) => {
                            let store = Arc::clone(&self.store);
                            let settings = settings.clone();
                            workers.spawn(async move {
                                serve(stream, peer, store, settings).await;
                                drop(permit);
                            });
                        }
                        Err(_) => {
                            // At capacity: refuse, and make sure the
                            // descriptor is actually released.
                            warn!(%peer, "worker pool full, rejecting connection");
                            drop(stream);
                        }
                    }
                }
                // Reap finished workers so the set does not grow unbounded.
                Some(_) = workers.join_next(), if !workers.is_empty() => {}
            }
        }

        // Drain within the grace period, then force-cancel stragglers.
        let deadline = Instant::now() + self.config.server.shutdown_timeout;
        loop {
            if workers.is_empty() {
                break;
            }
            tokio::select! {
                _ = sleep_until(deadline) => {
                    warn!(
                        remaining = workers.len(),
                        "grace period elapsed, cancelling remaining workers"
                    );
                    workers.shutdown().await;
                    break;
                }
                _ = workers.join_next() => {}
            }
        }

        info!("dispatcher stopped");
        Ok(())
    }
}
