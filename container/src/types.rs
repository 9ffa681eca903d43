use lxcify_mount::Mount;

/// The application to install into a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct App {
    /// Shell script run as root inside the container. Expected to be idempotent.
    pub install_script: String,
    pub launch_command: String,
    pub share_pulse_audio: bool,
    pub mounts: Vec<Mount>,
    pub desktop_launcher: Option<DesktopLauncher>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopLauncher {
    pub name: String,
    pub comment: String,
    /// Path inside the container rootfs.
    pub icon_path: String,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Uninitialized,
    Created,
    Running,
    Installed,
    Stopped,
}

impl std::fmt::Display for ContainerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerState::Uninitialized => write!(f, "uninitialized"),
            ContainerState::Created => write!(f, "created"),
            ContainerState::Running => write!(f, "running"),
            ContainerState::Installed => write!(f, "installed"),
            ContainerState::Stopped => write!(f, "stopped"),
        }
    }
}
