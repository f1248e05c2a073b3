//! Periodic staleness eviction.
//!
//! Walks the reassembly store on a fixed cadence and clears any slot whose
//! last accepted packet predates the staleness bound. Never touches the
//! persistence sink — a stale assembly is simply lost.

use std::sync::Arc;
use std::time::Duration;

use hes_core::{Environment, NodeMac, ProfileKind};
use tokio::sync::Notify;

use crate::dispatch::Dispatcher;

/// Runs `store.evict_stale` on a fixed cadence until told to stop.
///
/// Spawned as its own `tokio` task by the demo binary; stopped on shutdown
/// by calling [`EvictionTicker::stop`], which lets any in-flight pass finish
/// before the task exits rather than aborting it mid-pass.
pub struct EvictionTicker {
    stop: Arc<Notify>,
}

impl EvictionTicker {
    /// Spawns the ticker loop on the current `tokio` runtime, using
    /// `dispatcher`'s own clock and configured staleness bound.
    pub fn spawn<E: Environment>(dispatcher: Arc<Dispatcher<E>>, eviction_period: Duration) -> Self {
        let stop = Arc::new(Notify::new());
        let stop_signal = stop.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = stop_signal.notified() => {
                        tracing::info!("eviction ticker stopping");
                        break;
                    }
                    () = dispatcher.env().sleep(eviction_period) => {
                        run_pass(&dispatcher);
                    }
                }
            }
        });

        Self { stop }
    }

    /// Signals the running loop to stop after its current iteration.
    pub fn stop(&self) {
        self.stop.notify_one();
    }
}

/// One eviction pass: compute the cutoff instant and clear everything older.
fn run_pass<E: Environment>(dispatcher: &Dispatcher<E>) {
    let cutoff = dispatcher.env().now() - dispatcher.stale_bound();
    let evicted = dispatcher.store().evict_stale(cutoff);
    for (node, kind) in &evicted {
        log_eviction(*node, *kind);
    }
    if !evicted.is_empty() {
        tracing::info!(count = evicted.len(), "eviction pass cleared stale assemblies");
    }
}

fn log_eviction(node: NodeMac, kind: ProfileKind) {
    tracing::info!(node = ?node.as_bytes(), ?kind, "reassembly slot evicted: stale");
}
