use crate::error::ShimError;
use crate::types::*;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Handle to a single container owned by the external container runtime.
///
/// Configuration calls mutate the handle's in-memory configuration; only
/// `save_config_file` persists it.
#[async_trait]
pub trait Runtime: Send + Sync {
    fn name(&self) -> &str;

    /// Directory holding every container of this runtime instance.
    fn config_path(&self) -> &Path;

    /// The container's own config file.
    fn config_file_name(&self) -> PathBuf {
        self.container_dir().join("config")
    }

    /// `<config_path>/<name>`: config file, rootfs and per-instance scripts.
    fn container_dir(&self) -> PathBuf {
        self.config_path().join(self.name())
    }

    async fn create_as_user(&self, target: &TemplateTarget) -> Result<(), ShimError>;

    async fn set_config_item(&self, key: &str, value: &str) -> Result<(), ShimError>;

    async fn clear_config(&self) -> Result<(), ShimError>;

    async fn save_config_file(&self, path: &Path) -> Result<(), ShimError>;

    async fn load_config_file(&self, path: &Path) -> Result<(), ShimError>;

    async fn start(&self) -> Result<(), ShimError>;

    async fn stop(&self) -> Result<(), ShimError>;

    /// Returns `false` if `state` was not reached within `timeout`.
    async fn wait_for_state(&self, state: RuntimeState, timeout: Duration)
    -> Result<bool, ShimError>;

    async fn is_running(&self) -> Result<bool, ShimError>;

    /// Runs `argv` inside the container; a non-zero exit status is an error.
    async fn run_command(&self, stdio: AttachStdio, argv: &[&str]) -> Result<(), ShimError>;
}
