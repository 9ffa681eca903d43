use crate::error::ContainerError;
use lxcify_shim::{AttachStdio, Runtime};
use nix::fcntl::OFlag;
use std::fs::File;
use std::io::Write;

/// Where the install script is materialized inside the container.
pub const INSTALL_SCRIPT_PATH: &str = "/tmp/install.sh";

/// Copies `script` into the container over a pipe, then runs it as root with
/// the host's terminal attached.
pub async fn run_install_script<R: Runtime + ?Sized>(
    runtime: &R,
    script: &str,
) -> Result<(), ContainerError> {
    upload_script(runtime, script).await?;

    tracing::info!(container = %runtime.name(), "Running install script");
    let stdio = AttachStdio::inherit().map_err(ContainerError::Stdio)?;
    runtime
        .run_command(stdio, &["/bin/bash", INSTALL_SCRIPT_PATH])
        .await
        .map_err(ContainerError::runtime("run install script"))
}

async fn upload_script<R: Runtime + ?Sized>(
    runtime: &R,
    script: &str,
) -> Result<(), ContainerError> {
    // Close-on-exec keeps the write end out of lxc-attach, which would
    // otherwise hold the pipe open and `cat` would never see EOF.
    let (read_end, write_end) = nix::unistd::pipe2(OFlag::O_CLOEXEC)
        .map_err(|errno| ContainerError::Stdio(errno.into()))?;

    let bytes = script.as_bytes().to_vec();
    let writer = tokio::task::spawn_blocking(move || {
        let mut pipe = File::from(write_end);
        pipe.write_all(&bytes)
    });

    let copy = format!("cat >{}", INSTALL_SCRIPT_PATH);
    let result = match AttachStdio::with_stdin(read_end) {
        Ok(stdio) => runtime
            .run_command(stdio, &["/bin/sh", "-c", &copy])
            .await
            .map_err(ContainerError::runtime("copy install script")),
        Err(e) => Err(ContainerError::Stdio(e)),
    };

    // A short write shows up as a failing script, not here.
    match writer.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::error!(container = %runtime.name(), error = %e, "Failed to write install script to pipe")
        }
        Err(e) => {
            tracing::error!(container = %runtime.name(), error = %e, "Install script writer task failed")
        }
    }

    result
}
