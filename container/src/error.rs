use crate::config::ConfigError;
use lxcify_shim::ShimError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to create container {name}: {source}")]
    CreateFailed {
        name: String,
        #[source]
        source: ShimError,
    },

    #[error("{op} failed: {source}")]
    Runtime {
        op: String,
        #[source]
        source: ShimError,
    },

    #[error("timeout waiting for container {name} to start after {timeout:?}")]
    StartTimeout { name: String, timeout: Duration },

    #[error("container {name} not ready after {timeout:?}")]
    ReadinessTimeout { name: String, timeout: Duration },

    #[error("invalid container state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    #[error("uid/gid {id} is outside the remappable range of {range} ids")]
    IdOutOfRange { id: u32, range: u32 },

    #[error("stdio setup failed: {0}")]
    Stdio(#[source] std::io::Error),

    #[error("io error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ContainerError {
    pub(crate) fn runtime(op: impl Into<String>) -> impl FnOnce(ShimError) -> Self {
        let op = op.into();
        move |source| ContainerError::Runtime { op, source }
    }

    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| ContainerError::Io { path, source }
    }

    /// True for the bounded waits: start and readiness.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ContainerError::StartTimeout { .. } | ContainerError::ReadinessTimeout { .. }
        )
    }
}
