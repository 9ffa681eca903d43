//! Host to container bind mounts.
//!
//! A [`Mount`] is rendered into an `lxc.mount.entry` item. Container paths are
//! kept relative because the runtime resolves them under the container rootfs.

mod error;

pub use error::MountError;

use lxcify_shim::{ConfigItem, MOUNT_ENTRY_KEY};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    host: String,
    container: String,
    is_directory: bool,
}

impl Mount {
    /// Mounts `path` at the same location inside the container.
    pub fn passthru(path: &str, is_directory: bool) -> Self {
        Self {
            host: path.to_string(),
            container: relative(path).to_string(),
            is_directory,
        }
    }

    /// Mounts `host` at `container`; both paths must be non-empty.
    pub fn explicit(host: &str, container: &str, is_directory: bool) -> Result<Self, MountError> {
        if host.is_empty() || container.is_empty() {
            return Err(MountError::EmptyPath(format!(
                "host {:?} and container {:?} must both be set",
                host, container
            )));
        }
        Ok(Self {
            host: host.to_string(),
            container: relative(container).to_string(),
            is_directory,
        })
    }

    /// Builds a mount from the fields of a config entry: either `passthru`
    /// alone, or both `host` and `container`.
    pub fn from_fields(
        passthru: Option<&str>,
        host: Option<&str>,
        container: Option<&str>,
        is_directory: bool,
    ) -> Result<Self, MountError> {
        fn set(field: Option<&str>) -> Option<&str> {
            field.filter(|s| !s.is_empty())
        }

        match (set(passthru), set(host), set(container)) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(MountError::MutuallyExclusive),
            (Some(path), None, None) => Ok(Self::passthru(path, is_directory)),
            (None, Some(host), Some(container)) => Self::explicit(host, container, is_directory),
            _ => Err(MountError::MissingFields),
        }
    }

    pub fn host_path(&self) -> &str {
        &self.host
    }

    /// Container-side path, relative to the container rootfs.
    pub fn container_path(&self) -> &str {
        &self.container
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    /// `optional` keeps the container bootable when the host source is absent,
    /// e.g. device nodes on a headless host.
    pub fn to_config_item(&self) -> ConfigItem {
        let create = if self.is_directory { "dir" } else { "file" };
        ConfigItem::new(
            MOUNT_ENTRY_KEY,
            format!(
                "{} {} none bind,optional,create={}",
                self.host, self.container, create
            ),
        )
    }
}

fn relative(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// A `mounts` entry as it appears in an app config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    pub passthru: Option<String>,
    pub host: Option<String>,
    pub container: Option<String>,
    pub directory: bool,
}

impl MountConfig {
    pub fn to_mount(&self) -> Result<Mount, MountError> {
        Mount::from_fields(
            self.passthru.as_deref(),
            self.host.as_deref(),
            self.container.as_deref(),
            self.directory,
        )
    }
}

pub fn mount_dri() -> Mount {
    Mount::passthru("/dev/dri", true)
}

pub fn mount_snd() -> Mount {
    Mount::passthru("/dev/snd", true)
}

pub fn mount_x11() -> Mount {
    Mount::passthru("/tmp/.X11-unix", true)
}

pub fn mount_video0() -> Mount {
    Mount::passthru("/dev/video0", false)
}

/// GPU, sound, X11 socket and first video device.
pub fn default_mounts() -> Vec<Mount> {
    vec![mount_dri(), mount_snd(), mount_x11(), mount_video0()]
}
