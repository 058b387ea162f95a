// src/crawl/control.rs
// =============================================================================
// The control plane: lets the outside world steer a running crawl.
//
// Signals we listen for (unix):
// - SIGUSR1          -> raise the depth ceiling by 10
// - SIGINT / SIGTERM -> cancel the crawl (no new fetches start)
//
// Try it:  kill -USR1 <pid>   (the PID is logged at startup)
// =============================================================================

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::DepthCeiling;
use crate::config::DEPTH_STEP;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    RaiseDepth,
    /// Carries the signal name for the log line
    Shutdown(&'static str),
}

pub struct ControlPlane {
    depth: DepthCeiling,
    cancel: CancellationToken,
}

impl ControlPlane {
    pub fn new(depth: DepthCeiling, cancel: CancellationToken) -> Self {
        Self { depth, cancel }
    }

    pub fn apply(&self, signal: ControlSignal) {
        match signal {
            ControlSignal::RaiseDepth => {
                let max_depth = self.depth.raise(DEPTH_STEP);
                info!(
                    "got signal SIGUSR1, the max depth gets increased by {}, and now is: {}",
                    DEPTH_STEP, max_depth
                );
            }
            ControlSignal::Shutdown(name) => {
                if !self.cancel.is_cancelled() {
                    warn!("got signal {name}, stopping the crawl");
                    self.cancel.cancel();
                }
            }
        }
    }

    /// Listens for process signals until the process exits
    #[cfg(unix)]
    pub async fn run(self) -> Result<()> {
        use anyhow::Context;
        use tokio::signal::unix::{signal, SignalKind};

        let mut usr1 = signal(SignalKind::user_defined1()).context("Failed to listen for SIGUSR1")?;
        let mut int = signal(SignalKind::interrupt()).context("Failed to listen for SIGINT")?;
        let mut term = signal(SignalKind::terminate()).context("Failed to listen for SIGTERM")?;

        loop {
            let received = tokio::select! {
                _ = usr1.recv() => ControlSignal::RaiseDepth,
                _ = int.recv() => ControlSignal::Shutdown("SIGINT"),
                _ = term.recv() => ControlSignal::Shutdown("SIGTERM"),
            };
            self.apply(received);
        }
    }

    #[cfg(not(unix))]
    pub async fn run(self) -> Result<()> {
        loop {
            tokio::signal::ctrl_c().await?;
            self.apply(ControlSignal::Shutdown("Ctrl-C"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raise_depth_k_times() {
        let depth = DepthCeiling::new(3);
        let control = ControlPlane::new(depth.clone(), CancellationToken::new());

        for _ in 0..3 {
            control.apply(ControlSignal::RaiseDepth);
        }

        assert_eq!(depth.current(), 33);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let cancel = CancellationToken::new();
        let depth = DepthCeiling::new(3);
        let control = ControlPlane::new(depth.clone(), cancel.clone());

        control.apply(ControlSignal::Shutdown("SIGINT"));
        control.apply(ControlSignal::Shutdown("SIGTERM"));

        assert!(cancel.is_cancelled());
        // Shutdown leaves the depth alone
        assert_eq!(depth.current(), 3);
    }
}
