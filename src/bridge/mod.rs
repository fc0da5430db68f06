// Translation bridge lifecycle
//
// The bridge is a local HTTP server that performs the actual translation.
// This module owns its process:
// - health: readiness probe against GET /health
// - process: launcher and process handle abstractions (real + fakeable)
//
// Start strategy: `start()` spawns and returns immediately. The first
// translation request absorbs the warm-up through the client's one-time
// readiness wait; `wait_until_ready` exists for callers that want to block.

pub mod health;
pub mod process;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

pub use health::{HealthProbe, HttpHealthProbe};
pub use process::{ChildProcess, NodeBridgeLauncher, ProcessHandle, ProcessLauncher};

use crate::config::BridgeConfig;
use crate::error::{LingoError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    Stopped,
    Starting,
    Ready,
    Stopping,
}

impl fmt::Display for BackendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

/// Readiness polling schedule
#[derive(Debug, Clone, Copy)]
pub struct StartupPoll {
    pub interval: Duration,
    pub max_attempts: u32,
    /// Log progress every this many attempts
    pub report_every: u32,
}

impl Default for StartupPoll {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(250),
            max_attempts: 40,
            report_every: 8,
        }
    }
}

impl StartupPoll {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.startup_poll_ms),
            max_attempts: config.startup_max_attempts.max(1),
            ..Self::default()
        }
    }

    pub fn total(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }
}

/// Owns at most one bridge child process.
pub struct BackendSupervisor {
    launcher: Box<dyn ProcessLauncher>,
    probe: Arc<dyn HealthProbe>,
    process: tokio::sync::Mutex<Option<Box<dyn ProcessHandle>>>,
    state: Mutex<BackendState>,
    shutdown_grace: Duration,
}

impl BackendSupervisor {
    pub fn new(
        launcher: Box<dyn ProcessLauncher>,
        probe: Arc<dyn HealthProbe>,
        shutdown_grace: Duration,
    ) -> Self {
        Self {
            launcher,
            probe,
            process: tokio::sync::Mutex::new(None),
            state: Mutex::new(BackendState::Stopped),
            shutdown_grace,
        }
    }

    /// Supervisor for the Node.js bridge described by `config`.
    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        let probe = HttpHealthProbe::new(&config.base_url(), config.health_timeout())?;
        let launcher = NodeBridgeLauncher::new(config.directory.clone(), config.port);

        Ok(Self::new(
            Box::new(launcher),
            Arc::new(probe),
            config.shutdown_grace(),
        ))
    }

    /// Probe shared with the translation client's readiness gate.
    pub fn probe(&self) -> Arc<dyn HealthProbe> {
        Arc::clone(&self.probe)
    }

    pub fn state(&self) -> BackendState {
        *self.state.lock()
    }

    fn set_state(&self, state: BackendState) {
        let mut current = self.state.lock();
        if *current != state {
            debug!("Bridge state {} -> {}", *current, state);
            *current = state;
        }
    }

    /// Lightweight health probe. A bridge answering the probe is ready
    /// whether or not this supervisor spawned it; a bridge that stops
    /// answering is no longer reported as ready.
    pub async fn is_ready(&self) -> bool {
        if self.probe.is_ready().await {
            self.set_state(BackendState::Ready);
            return true;
        }

        if self.state() == BackendState::Ready {
            let mut slot = self.process.lock().await;
            self.demote(&mut slot);
        }
        false
    }

    /// Leave `Ready` after a failed health check: `Starting` while our child is
    /// still alive, `Stopped` otherwise.
    fn demote(&self, slot: &mut Option<Box<dyn ProcessHandle>>) {
        if self.state() != BackendState::Ready {
            return;
        }
        let alive = slot.as_mut().is_some_and(|p| p.is_alive());
        let next = if alive {
            BackendState::Starting
        } else {
            BackendState::Stopped
        };
        warn!("Bridge stopped answering /health, now {}", next);
        self.set_state(next);
    }

    /// Spawn the bridge unless it is already answering or already spawned.
    /// Returns as soon as the process exists; readiness is not awaited.
    pub async fn start(&self) -> Result<()> {
        let mut slot = self.process.lock().await;

        if self.probe.is_ready().await {
            self.set_state(BackendState::Ready);
            debug!("Bridge already running, nothing to start");
            return Ok(());
        }
        self.demote(&mut slot);

        if let Some(process) = slot.as_mut() {
            if process.is_alive() {
                debug!(pid = ?process.id(), "Bridge already spawned, waiting for it to become ready");
                self.set_state(BackendState::Starting);
                return Ok(());
            }
            warn!("Previously spawned bridge has exited, spawning again");
            let _ = process.wait().await;
            *slot = None;
        }

        self.set_state(BackendState::Starting);
        match self.launcher.launch().await {
            Ok(process) => {
                info!(pid = ?process.id(), "Bridge server starting");
                *slot = Some(process);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to start bridge server: {}", e);
                self.set_state(BackendState::Stopped);
                Err(e)
            }
        }
    }

    /// Poll the health probe until ready or the schedule is exhausted.
    pub async fn wait_until_ready(&self, poll: StartupPoll) -> Result<()> {
        for attempt in 1..=poll.max_attempts {
            if self.is_ready().await {
                info!("Bridge server ready after {} probe(s)", attempt);
                return Ok(());
            }

            if poll.report_every > 0 && attempt % poll.report_every == 0 {
                info!("Waiting for bridge server... ({}/{})", attempt, poll.max_attempts);
            }

            tokio::time::sleep(poll.interval).await;
        }

        Err(LingoError::BackendNotReady(poll.total().as_millis() as u64))
    }

    /// Interrupt, wait up to the grace period, then force-kill. Always reaps.
    pub async fn stop(&self) -> Result<()> {
        let mut slot = self.process.lock().await;

        let Some(mut process) = slot.take() else {
            debug!("Bridge not spawned by this supervisor, nothing to stop");
            self.set_state(BackendState::Stopped);
            return Ok(());
        };

        self.set_state(BackendState::Stopping);
        info!(pid = ?process.id(), "Stopping bridge server");

        let graceful = match process.interrupt().await {
            Ok(()) => tokio::time::timeout(self.shutdown_grace, process.wait())
                .await
                .is_ok(),
            Err(e) => {
                debug!("Graceful interrupt unavailable: {}", e);
                false
            }
        };

        let result = if graceful {
            info!("Bridge server stopped gracefully");
            Ok(())
        } else {
            warn!(
                grace_ms = self.shutdown_grace.as_millis() as u64,
                "Bridge did not exit in time, killing"
            );
            let killed = process.kill();
            process.wait().await?;
            killed
        };

        self.set_state(BackendState::Stopped);
        result
    }
}
