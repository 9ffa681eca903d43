use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::os::fd::{AsFd, OwnedFd};

/// Key of a uid/gid remapping entry.
pub const IDMAP_KEY: &str = "lxc.idmap";
/// Key of the AppArmor profile entry.
pub const APPARMOR_PROFILE_KEY: &str = "lxc.apparmor.profile";
/// Key of a bind-mount entry.
pub const MOUNT_ENTRY_KEY: &str = "lxc.mount.entry";
/// Key of a hook executed on the host right before the container starts.
pub const PRE_START_HOOK_KEY: &str = "lxc.hook.pre-start";

/// One `key = value` entry of the runtime configuration language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigItem {
    pub key: String,
    pub value: String,
}

impl ConfigItem {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl std::fmt::Display for ConfigItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.key, self.value)
    }
}

/// Image the container rootfs is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateTarget {
    pub template: String,
    pub distro: String,
    pub release: String,
    pub arch: String,
}

impl Default for TemplateTarget {
    fn default() -> Self {
        Self {
            template: "download".to_string(),
            distro: "ubuntu".to_string(),
            release: "trusty".to_string(),
            arch: host_arch().to_string(),
        }
    }
}

/// Maps the host architecture onto the distribution naming used by images.
pub fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "i386",
        "aarch64" => "arm64",
        "arm" => "armhf",
        other => other,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuntimeState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl RuntimeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeState::Stopped => "STOPPED",
            RuntimeState::Starting => "STARTING",
            RuntimeState::Running => "RUNNING",
            RuntimeState::Stopping => "STOPPING",
        }
    }
}

impl std::fmt::Display for RuntimeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptors wired to a command executed inside the container.
#[derive(Debug)]
pub struct AttachStdio {
    pub stdin: OwnedFd,
    pub stdout: OwnedFd,
    pub stderr: OwnedFd,
}

impl AttachStdio {
    pub fn new(stdin: OwnedFd, stdout: OwnedFd, stderr: OwnedFd) -> Self {
        Self {
            stdin,
            stdout,
            stderr,
        }
    }

    /// Duplicates of this process's stdin, stdout and stderr.
    pub fn inherit() -> std::io::Result<Self> {
        Ok(Self {
            stdin: std::io::stdin().as_fd().try_clone_to_owned()?,
            stdout: std::io::stdout().as_fd().try_clone_to_owned()?,
            stderr: std::io::stderr().as_fd().try_clone_to_owned()?,
        })
    }

    /// Host stdout/stderr with the given descriptor as stdin.
    pub fn with_stdin(stdin: OwnedFd) -> std::io::Result<Self> {
        Ok(Self {
            stdin,
            stdout: std::io::stdout().as_fd().try_clone_to_owned()?,
            stderr: std::io::stderr().as_fd().try_clone_to_owned()?,
        })
    }

    /// All three streams on `/dev/null`.
    pub fn null() -> std::io::Result<Self> {
        let null = OpenOptions::new().read(true).write(true).open("/dev/null")?;
        Ok(Self {
            stdin: dup(&null)?,
            stdout: dup(&null)?,
            stderr: OwnedFd::from(null),
        })
    }
}

fn dup(file: &File) -> std::io::Result<OwnedFd> {
    file.as_fd().try_clone_to_owned()
}
