//! OS process seam for the bridge supervisor.
//! `ProcessLauncher` prepares and spawns the bridge; `ProcessHandle` is the
//! running child. The real implementations drive `pnpm`/`npm`/`node` through
//! `tokio::process`; tests substitute fakes.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::config::BRIDGE_PORT_ENV;
use crate::error::{LingoError, Result};

/// A spawned bridge process
#[async_trait]
pub trait ProcessHandle: Send {
    /// OS process id, if still known
    fn id(&self) -> Option<u32>;

    /// True while the process has not exited.
    fn is_alive(&mut self) -> bool;

    /// Ask the process to shut down gracefully.
    async fn interrupt(&mut self) -> Result<()>;

    /// Force termination without waiting.
    fn kill(&mut self) -> Result<()>;

    /// Wait for the process to exit and reap it.
    async fn wait(&mut self) -> Result<()>;
}

/// Starts bridge processes
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn ProcessHandle>>;
}

/// A program invocation with its working directory
#[derive(Debug, Clone)]
pub struct BridgeCommand {
    pub program: String,
    pub args: Vec<String>,
    pub description: String,
}

impl BridgeCommand {
    pub fn new<S1: Into<String>, S2: Into<String>>(program: S1, description: S2) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    fn build(&self, dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }

    /// Run to completion; succeeds only on a zero exit status.
    pub async fn run(&self, dir: &Path) -> Result<()> {
        debug!("Running {} {:?} in {}", self.program, self.args, dir.display());

        let status = self
            .build(dir)
            .status()
            .await
            .map_err(|e| LingoError::Process(format!("{}: {}", self.description, e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(LingoError::Process(format!("{} exited with {}", self.description, status)))
        }
    }

    /// Spawn detached from the caller's standard streams. On Unix the child
    /// leads its own process group, so wrappers like `pnpm start` can be
    /// signalled together with the server they launch.
    pub fn spawn(&self, dir: &Path, port: u16) -> Result<Child> {
        debug!("Spawning {} {:?} in {}", self.program, self.args, dir.display());

        let mut cmd = self.build(dir);
        cmd.env(BRIDGE_PORT_ENV, port.to_string()).kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        cmd.spawn()
            .map_err(|e| LingoError::Spawn(format!("{}: {}", self.description, e)))
    }
}

/// `kill -<signal> -- -<pgid>`: signal every process in the group.
#[cfg(unix)]
fn group_signal(pgid: u32, signal: &str) -> Command {
    let mut cmd = Command::new("kill");
    cmd.arg(format!("-{}", signal))
        .arg("--")
        .arg(format!("-{}", pgid))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    cmd
}

/// A bridge child process owned through `tokio::process`
pub struct ChildProcess {
    child: Child,
}

impl ChildProcess {
    pub fn new(child: Child) -> Self {
        Self { child }
    }
}

#[async_trait]
impl ProcessHandle for ChildProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    #[cfg(unix)]
    async fn interrupt(&mut self) -> Result<()> {
        let pid = self
            .id()
            .ok_or_else(|| LingoError::Process("process already exited".to_string()))?;

        let status = group_signal(pid, "INT").status().await?;

        if status.success() {
            Ok(())
        } else {
            Err(LingoError::Process(format!("kill -INT -{} exited with {}", pid, status)))
        }
    }

    #[cfg(not(unix))]
    async fn interrupt(&mut self) -> Result<()> {
        Err(LingoError::Process("graceful interrupt is not supported on this platform".to_string()))
    }

    fn kill(&mut self) -> Result<()> {
        #[cfg(unix)]
        if let Some(pid) = self.id() {
            // grandchildren first; the leader is killed directly below
            if let Err(e) = group_signal(pid, "KILL").spawn() {
                debug!("Group kill for {} failed: {}", pid, e);
            }
        }

        self.child
            .start_kill()
            .map_err(|e| LingoError::Process(format!("failed to kill bridge: {}", e)))
    }

    async fn wait(&mut self) -> Result<()> {
        let status = self.child.wait().await?;
        debug!("Bridge process exited with {}", status);
        Ok(())
    }
}

/// Launches the Node.js bridge from its directory, installing its
/// dependencies on first use.
pub struct NodeBridgeLauncher {
    directory: PathBuf,
    port: u16,
}

impl NodeBridgeLauncher {
    pub fn new<P: Into<PathBuf>>(directory: P, port: u16) -> Self {
        Self {
            directory: directory.into(),
            port,
        }
    }

    /// Resolve the bridge directory against the working directory.
    pub fn locate(&self) -> Result<PathBuf> {
        let path = if self.directory.is_absolute() {
            self.directory.clone()
        } else {
            std::env::current_dir()?.join(&self.directory)
        };

        if path.is_dir() {
            Ok(path)
        } else {
            Err(LingoError::BackendNotFound(path.display().to_string()))
        }
    }

    pub fn needs_install(dir: &Path) -> bool {
        !dir.join("node_modules").exists()
    }

    /// `pnpm install`, falling back to `npm install`.
    async fn install_dependencies(dir: &Path) -> Result<()> {
        info!("Installing bridge dependencies in {}", dir.display());

        let pnpm = BridgeCommand::new("pnpm", "pnpm install").arg("install");
        match pnpm.run(dir).await {
            Ok(()) => return Ok(()),
            Err(e) => warn!("{}; falling back to npm", e),
        }

        BridgeCommand::new("npm", "npm install")
            .arg("install")
            .run(dir)
            .await
            .map_err(|e| LingoError::DependencyInstall(e.to_string()))
    }

    /// `pnpm start`, falling back to `node server.js`.
    fn spawn_server(&self, dir: &Path) -> Result<Child> {
        let pnpm = BridgeCommand::new("pnpm", "pnpm start").arg("start");
        match pnpm.spawn(dir, self.port) {
            Ok(child) => return Ok(child),
            Err(e) => warn!("{}; falling back to node", e),
        }

        BridgeCommand::new("node", "node server.js")
            .arg("server.js")
            .spawn(dir, self.port)
    }
}

#[async_trait]
impl ProcessLauncher for NodeBridgeLauncher {
    async fn launch(&self) -> Result<Box<dyn ProcessHandle>> {
        let dir = self.locate()?;

        if Self::needs_install(&dir) {
            Self::install_dependencies(&dir).await?;
        }

        let child = self.spawn_server(&dir)?;
        info!(pid = ?child.id(), port = self.port, "Bridge server process spawned");
        Ok(Box::new(ChildProcess::new(child)))
    }
}
