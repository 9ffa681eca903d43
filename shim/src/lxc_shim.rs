use crate::config::{parse_config, render_config};
use crate::error::ShimError;
use crate::shim::Runtime;
use crate::types::*;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::fs;
use tokio::process::Command;
use tokio::sync::RwLock;

/// Container handle backed by the LXC command line tools.
///
/// The configuration is held in memory, mirroring liblxc: `lxc-*` tools only
/// ever see what `save_config_file` wrote to disk.
pub struct LxcShim {
    name: String,
    lxcpath: PathBuf,
    config: RwLock<Vec<ConfigItem>>,
}

impl LxcShim {
    /// Opens the handle for `name` under `lxcpath`, loading its config file
    /// if the container already exists.
    pub async fn new(name: &str, lxcpath: &Path) -> Result<Self, ShimError> {
        fs::create_dir_all(lxcpath).await?;

        let shim = Self {
            name: name.to_string(),
            lxcpath: lxcpath.to_path_buf(),
            config: RwLock::new(Vec::new()),
        };

        let config_file = shim.config_file_name();
        if fs::try_exists(&config_file).await? {
            shim.load_config_file(&config_file).await?;
        }

        Ok(shim)
    }

    fn command(&self, program: &str) -> Command {
        let mut cmd = Command::new(program);
        cmd.arg("-n")
            .arg(&self.name)
            .arg("-P")
            .arg(&self.lxcpath)
            .kill_on_drop(true);
        cmd
    }

    async fn output(&self, program: &str, mut cmd: Command) -> Result<Output, ShimError> {
        tracing::debug!(container = %self.name, command = ?cmd.as_std(), "Running {}", program);

        cmd.stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ShimError::Spawn {
                command: program.to_string(),
                source,
            })
    }

    async fn run_checked(&self, program: &str, cmd: Command) -> Result<Output, ShimError> {
        let output = self.output(program, cmd).await?;
        if !output.status.success() {
            return Err(ShimError::CommandFailed {
                command: program.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

#[async_trait]
impl Runtime for LxcShim {
    fn name(&self) -> &str {
        &self.name
    }

    fn config_path(&self) -> &Path {
        &self.lxcpath
    }

    async fn create_as_user(&self, target: &TemplateTarget) -> Result<(), ShimError> {
        let mut cmd = self.command("lxc-create");
        cmd.arg("-t")
            .arg(&target.template)
            .arg("--")
            .arg("--dist")
            .arg(&target.distro)
            .arg("--release")
            .arg(&target.release)
            .arg("--arch")
            .arg(&target.arch);

        tracing::info!(
            container = %self.name,
            template = %target.template,
            distro = %target.distro,
            release = %target.release,
            arch = %target.arch,
            "Creating container"
        );
        self.run_checked("lxc-create", cmd).await?;

        // lxc-create wrote a fresh config file; pick it up.
        self.config.write().await.clear();
        self.load_config_file(&self.config_file_name()).await
    }

    async fn set_config_item(&self, key: &str, value: &str) -> Result<(), ShimError> {
        tracing::debug!(container = %self.name, key = %key, value = %value, "Setting config item");
        self.config.write().await.push(ConfigItem::new(key, value));
        Ok(())
    }

    async fn clear_config(&self) -> Result<(), ShimError> {
        self.config.write().await.clear();
        Ok(())
    }

    async fn save_config_file(&self, path: &Path) -> Result<(), ShimError> {
        let content = render_config(&self.config.read().await);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, content).await?;
        tracing::debug!(container = %self.name, path = ?path, "Saved config file");
        Ok(())
    }

    async fn load_config_file(&self, path: &Path) -> Result<(), ShimError> {
        let content = fs::read_to_string(path).await?;
        let items = parse_config(path, &content)?;
        self.config.write().await.extend(items);
        Ok(())
    }

    async fn start(&self) -> Result<(), ShimError> {
        let mut cmd = self.command("lxc-start");
        cmd.arg("-d");
        self.run_checked("lxc-start", cmd).await?;
        tracing::info!(container = %self.name, "Container start requested");
        Ok(())
    }

    async fn stop(&self) -> Result<(), ShimError> {
        self.run_checked("lxc-stop", self.command("lxc-stop")).await?;
        tracing::info!(container = %self.name, "Container stopped");
        Ok(())
    }

    async fn wait_for_state(
        &self,
        state: RuntimeState,
        timeout: Duration,
    ) -> Result<bool, ShimError> {
        let mut cmd = self.command("lxc-wait");
        cmd.arg("-s")
            .arg(state.as_str())
            .arg("-t")
            .arg(timeout.as_secs().max(1).to_string());

        // lxc-wait exits non-zero when the timeout expires
        let output = self.output("lxc-wait", cmd).await?;
        Ok(output.status.success())
    }

    async fn is_running(&self) -> Result<bool, ShimError> {
        let mut cmd = self.command("lxc-info");
        cmd.arg("-s").arg("-H");
        let output = self.output("lxc-info", cmd).await?;
        running_from_info(&output)
    }

    async fn run_command(&self, stdio: AttachStdio, argv: &[&str]) -> Result<(), ShimError> {
        if argv.is_empty() {
            return Err(ShimError::EmptyCommand);
        }

        let mut cmd = self.command("lxc-attach");
        cmd.arg("--clear-env")
            .arg("--")
            .args(argv)
            .stdin(Stdio::from(stdio.stdin))
            .stdout(Stdio::from(stdio.stdout))
            .stderr(Stdio::from(stdio.stderr));

        tracing::info!(container = %self.name, argv = ?argv, "Running command in container");

        let status = cmd
            .spawn()
            .map_err(|source| ShimError::Spawn {
                command: "lxc-attach".to_string(),
                source,
            })?
            .wait()
            .await?;

        if !status.success() {
            return Err(ShimError::CommandFailed {
                command: argv.join(" "),
                status: status.to_string(),
                stderr: String::new(),
            });
        }
        Ok(())
    }
}

/// Interprets `lxc-info -s -H`. A container that does not exist is not
/// running; any other failure is an error.
fn running_from_info(output: &Output) -> Result<bool, ShimError> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("doesn't exist") || stderr.contains("does not exist") {
            return Ok(false);
        }
        return Err(ShimError::CommandFailed {
            command: "lxc-info".to_string(),
            status: output.status.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }
    let state = String::from_utf8_lossy(&output.stdout);
    Ok(state.trim() == RuntimeState::Running.as_str())
}
