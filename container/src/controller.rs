use crate::error::ContainerError;
use crate::idmap::setup_user_passthru;
use crate::install::run_install_script;
use crate::launcher::Launchers;
use crate::pulse::setup_pulse_audio;
use crate::spec::{ContainerSpec, Readiness};
use crate::types::{App, ContainerState};
use lxcify_shim::{APPARMOR_PROFILE_KEY, AttachStdio, ConfigItem, Runtime, RuntimeState};
use std::time::Duration;
use tokio::time::Instant;

/// Bound on the wait for the runtime to report RUNNING.
pub const START_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_APPARMOR_PROFILE: &str = "lxc-container-default";

/// Items applied to every container ahead of its mounts.
pub fn default_config() -> Vec<ConfigItem> {
    vec![ConfigItem::new(
        APPARMOR_PROFILE_KEY,
        DEFAULT_APPARMOR_PROFILE,
    )]
}

/// Drives one container through its provisioning lifecycle.
pub struct Container<R: Runtime> {
    spec: ContainerSpec,
    runtime: R,
    state: ContainerState,
}

impl<R: Runtime> Container<R> {
    pub fn new(spec: ContainerSpec, runtime: R) -> Self {
        Self {
            spec,
            runtime,
            state: ContainerState::Uninitialized,
        }
    }

    pub fn name(&self) -> &str {
        self.runtime.name()
    }

    pub fn spec(&self) -> &ContainerSpec {
        &self.spec
    }

    pub fn state(&self) -> ContainerState {
        self.state
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    fn require(&self, allowed: &[ContainerState]) -> Result<(), ContainerError> {
        if allowed.contains(&self.state) {
            return Ok(());
        }
        let expected = allowed
            .iter()
            .map(ContainerState::to_string)
            .collect::<Vec<_>>()
            .join(" or ");
        Err(ContainerError::InvalidState {
            expected,
            actual: self.state.to_string(),
        })
    }

    /// Creates the container from its template and persists its config.
    ///
    /// The state only advances once the config file is written. A failure
    /// after the template step leaves the container on disk.
    pub async fn create(&mut self) -> Result<(), ContainerError> {
        self.require(&[ContainerState::Uninitialized])?;

        self.runtime
            .create_as_user(&self.spec.target)
            .await
            .map_err(|source| ContainerError::CreateFailed {
                name: self.name().to_string(),
                source,
            })?;

        if let Err(e) = self.configure().await {
            tracing::warn!(
                container = %self.name(),
                error = %e,
                "Container was created but not configured, remove it with lxc-destroy before retrying"
            );
            return Err(e);
        }

        self.state = ContainerState::Created;
        tracing::info!(container = %self.name(), "Container created");
        Ok(())
    }

    async fn configure(&self) -> Result<(), ContainerError> {
        setup_user_passthru(&self.runtime).await?;

        let items = default_config()
            .into_iter()
            .chain(self.spec.mounts.iter().map(|mount| mount.to_config_item()));
        for item in items {
            self.runtime
                .set_config_item(&item.key, &item.value)
                .await
                .map_err(ContainerError::runtime(format!("set config {}", item)))?;
        }

        if self.spec.pulse_audio {
            setup_pulse_audio(&self.runtime).await?;
        }

        let path = self.runtime.config_file_name();
        self.runtime
            .save_config_file(&path)
            .await
            .map_err(ContainerError::runtime(format!("save config {:?}", path)))
    }

    pub async fn start(&mut self) -> Result<(), ContainerError> {
        self.require(&[ContainerState::Created, ContainerState::Stopped])?;

        tracing::info!(container = %self.name(), "Starting container");
        self.runtime
            .start()
            .await
            .map_err(ContainerError::runtime("start"))?;

        let running = self
            .runtime
            .wait_for_state(RuntimeState::Running, START_TIMEOUT)
            .await
            .map_err(ContainerError::runtime("wait for RUNNING"))?;
        if !running {
            return Err(ContainerError::StartTimeout {
                name: self.name().to_string(),
                timeout: START_TIMEOUT,
            });
        }

        self.state = ContainerState::Running;
        self.wait_ready().await
    }

    async fn wait_ready(&self) -> Result<(), ContainerError> {
        match &self.spec.readiness {
            Readiness::Settle(delay) => {
                tracing::debug!(container = %self.name(), delay = ?delay, "Waiting for network to settle");
                tokio::time::sleep(*delay).await;
                Ok(())
            }
            Readiness::Probe {
                argv,
                timeout,
                interval,
            } => {
                let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
                let deadline = Instant::now() + *timeout;
                let expired = || ContainerError::ReadinessTimeout {
                    name: self.name().to_string(),
                    timeout: *timeout,
                };
                loop {
                    let stdio = AttachStdio::null().map_err(ContainerError::Stdio)?;
                    // A hung attempt is cut off at the deadline.
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    match tokio::time::timeout(remaining, self.runtime.run_command(stdio, &argv)).await {
                        Ok(Ok(())) => {
                            tracing::debug!(container = %self.name(), "Readiness probe succeeded");
                            return Ok(());
                        }
                        Ok(Err(e)) => {
                            tracing::debug!(container = %self.name(), error = %e, "Readiness probe failed")
                        }
                        Err(_) => return Err(expired()),
                    }

                    if Instant::now() + *interval > deadline {
                        return Err(expired());
                    }
                    tokio::time::sleep(*interval).await;
                }
            }
        }
    }

    /// Runs the app's install script and writes its launchers, starting the
    /// container first if needed.
    pub async fn install(&mut self, app: &App, launchers: &Launchers) -> Result<(), ContainerError> {
        match self.state {
            ContainerState::Created | ContainerState::Stopped => self.start().await?,
            ContainerState::Running => {
                let running = self
                    .runtime
                    .is_running()
                    .await
                    .map_err(ContainerError::runtime("query state"))?;
                if !running {
                    tracing::warn!(container = %self.name(), "Container stopped unexpectedly, restarting");
                    self.state = ContainerState::Stopped;
                    self.start().await?;
                }
            }
            _ => self.require(&[
                ContainerState::Created,
                ContainerState::Running,
                ContainerState::Stopped,
            ])?,
        }

        run_install_script(&self.runtime, &app.install_script).await?;
        launchers.materialize(&self.runtime, app).await?;

        self.state = ContainerState::Installed;
        tracing::info!(container = %self.name(), "App installed");
        Ok(())
    }

    /// Stopping a container that is stopped or has never run is a no-op.
    pub async fn stop(&mut self) -> Result<(), ContainerError> {
        if matches!(self.state, ContainerState::Stopped | ContainerState::Created) {
            return Ok(());
        }
        self.require(&[ContainerState::Running, ContainerState::Installed])?;

        let running = self
            .runtime
            .is_running()
            .await
            .map_err(ContainerError::runtime("query state"))?;
        if running {
            tracing::info!(container = %self.name(), "Stopping container");
            self.runtime
                .stop()
                .await
                .map_err(ContainerError::runtime("stop"))?;
        }

        self.state = ContainerState::Stopped;
        Ok(())
    }
}
