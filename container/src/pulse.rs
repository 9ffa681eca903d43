//! Host PulseAudio socket shared into the container.

use crate::error::ContainerError;
use lxcify_shim::{PRE_START_HOOK_KEY, Runtime};
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

/// Socket path inside the container.
pub const PULSE_SOCKET: &str = "/home/ubuntu/.pulse_socket";

pub const SETUP_PULSE_SCRIPT_NAME: &str = "setup-pulse.sh";

/// Runs on the host before every container start: loads an anonymous unix
/// socket module at the container's socket path unless one is already live.
pub const SETUP_PULSE_SCRIPT: &str = r#"#!/bin/sh
PULSE_PATH=$LXC_ROOTFS_PATH/home/ubuntu/.pulse_socket

if [ ! -e "$PULSE_PATH" ] || [ -z "$(lsof -n $PULSE_PATH 2>&1)" ]; then
    pactl load-module module-native-protocol-unix auth-anonymous=1 \
        socket=$PULSE_PATH
fi
"#;

/// Writes the hook script next to the container config and registers it as
/// a pre-start hook.
pub async fn setup_pulse_audio<R: Runtime + ?Sized>(runtime: &R) -> Result<PathBuf, ContainerError> {
    let path = runtime.container_dir().join(SETUP_PULSE_SCRIPT_NAME);

    tokio::fs::write(&path, SETUP_PULSE_SCRIPT)
        .await
        .map_err(ContainerError::io(&path))?;
    tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o700))
        .await
        .map_err(ContainerError::io(&path))?;

    let value = path.to_string_lossy();
    runtime
        .set_config_item(PRE_START_HOOK_KEY, &value)
        .await
        .map_err(ContainerError::runtime("set pre-start hook"))?;

    tracing::info!(container = %runtime.name(), hook = ?path, "Installed PulseAudio pre-start hook");
    Ok(path)
}
