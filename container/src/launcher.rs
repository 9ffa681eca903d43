//! Host-side artifacts that re-enter an installed container.

use crate::error::ContainerError;
use crate::pulse::PULSE_SOCKET;
use crate::types::{App, DesktopLauncher};
use lxcify_shim::Runtime;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

pub const LAUNCH_SCRIPT_NAME: &str = "launch.sh";

/// How the `Categories=` value of a desktop entry is joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryStyle {
    /// `Network;WebBrowser;`
    #[default]
    Delimited,
    /// `NetworkWebBrowser`, as older releases wrote it.
    Concatenated,
}

#[derive(Debug, Clone)]
pub struct Launchers {
    pub applications_dir: PathBuf,
    pub category_style: CategoryStyle,
}

impl Default for Launchers {
    fn default() -> Self {
        Self::new(default_applications_dir())
    }
}

pub fn default_applications_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("applications"))
        .unwrap_or_else(|| PathBuf::from(".local/share/applications"))
}

impl Launchers {
    pub fn new(applications_dir: impl Into<PathBuf>) -> Self {
        Self {
            applications_dir: applications_dir.into(),
            category_style: CategoryStyle::default(),
        }
    }

    pub fn with_category_style(mut self, style: CategoryStyle) -> Self {
        self.category_style = style;
        self
    }

    /// Writes `launch.sh` and, when the app has one, its desktop entry.
    /// Returns the paths written.
    pub async fn materialize<R: Runtime + ?Sized>(
        &self,
        runtime: &R,
        app: &App,
    ) -> Result<Vec<PathBuf>, ContainerError> {
        let container_dir = runtime.container_dir();
        let mut written = Vec::new();

        let script = container_dir.join(LAUNCH_SCRIPT_NAME);
        let contents = render_launch_script(runtime.name(), runtime.config_path(), &app.launch_command);
        write_file(&script, &contents, 0o700).await?;
        tracing::info!(container = %runtime.name(), path = ?script, "Wrote launch script");
        written.push(script);

        if let Some(launcher) = &app.desktop_launcher {
            tokio::fs::create_dir_all(&self.applications_dir)
                .await
                .map_err(ContainerError::io(&self.applications_dir))?;

            let entry = self
                .applications_dir
                .join(format!("{}.desktop", launcher.name));
            let contents = render_desktop_entry(launcher, &container_dir, self.category_style);
            write_file(&entry, &contents, 0o600).await?;
            tracing::info!(container = %runtime.name(), path = ?entry, "Wrote desktop entry");
            written.push(entry);
        }

        Ok(written)
    }
}

/// Starts the container when needed, runs the command as the container user
/// with the display and audio socket forwarded, and stops the container
/// again only if this invocation started it.
pub fn render_launch_script(name: &str, lxcpath: &Path, launch_command: &str) -> String {
    format!(
        r#"#!/bin/sh
CONTAINER="{name}"
LXCPATH="{lxcpath}"
CMD_LINE="{launch_command}"

STARTED=false

if ! lxc-wait -n "$CONTAINER" -P "$LXCPATH" -s RUNNING -t 0; then
    lxc-start -n "$CONTAINER" -P "$LXCPATH" -d
    lxc-wait -n "$CONTAINER" -P "$LXCPATH" -s RUNNING
    STARTED=true
fi

lxc-attach --clear-env -n "$CONTAINER" -P "$LXCPATH" -- \
    sudo -u ubuntu -i env DISPLAY=$DISPLAY PULSE_SERVER={pulse} $CMD_LINE

if [ "$STARTED" = "true" ]; then
    lxc-stop -n "$CONTAINER" -P "$LXCPATH" -t 10
fi
"#,
        name = name,
        lxcpath = lxcpath.display(),
        launch_command = launch_command,
        pulse = PULSE_SOCKET,
    )
}

pub fn render_desktop_entry(
    launcher: &DesktopLauncher,
    container_dir: &Path,
    style: CategoryStyle,
) -> String {
    let mut entry = format!(
        "[Desktop Entry]\n\
         Version=1.0\n\
         Name={}\n\
         Comment={}\n\
         Exec={} %U\n\
         Icon={}\n\
         Type=Application\n",
        launcher.name,
        launcher.comment,
        container_dir.join(LAUNCH_SCRIPT_NAME).display(),
        container_dir
            .join("rootfs")
            .join(launcher.icon_path.trim_start_matches('/'))
            .display(),
    );

    if !launcher.categories.is_empty() {
        let categories = match style {
            CategoryStyle::Delimited => launcher
                .categories
                .iter()
                .map(|category| format!("{};", category))
                .collect::<String>(),
            CategoryStyle::Concatenated => launcher.categories.concat(),
        };
        entry.push_str(&format!("Categories={}\n", categories));
    }
    entry
}

async fn write_file(path: &Path, contents: &str, mode: u32) -> Result<(), ContainerError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(ContainerError::io(path))?;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .map_err(ContainerError::io(path))
}
