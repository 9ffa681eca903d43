//! App config files.
//!
//! ```yaml
//! container:
//!   distro: ubuntu
//!   release: trusty
//! mounts:
//!   - passthru: /dev/dri
//!     directory: true
//!   - host: /var/run/custom-video-source.sock
//!     container: /dev/video0
//! share-pulse-audio: true
//! install-script: |
//!   apt-get install -y --no-install-recommends my-app
//! launch-command: my-app $*
//! desktop-launcher:
//!   name: My App
//!   icon-path: /usr/share/pixmaps/my-app.png
//!   categories: [Network]
//! ```

use crate::spec::{ContainerOption, ContainerSpec, Readiness};
use crate::types::{App, DesktopLauncher};
use lxcify_mount::{Mount, MountConfig, MountError};
use lxcify_shim::TemplateTarget;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config format error: {0}")]
    Format(#[from] serde_yaml::Error),

    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("invalid mount #{index}: {source}")]
    Mount {
        index: usize,
        #[source]
        source: MountError,
    },

    #[error("invalid desktop-launcher name {0:?}")]
    InvalidLauncherName(String),

    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top level of an app config file. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AppConfig {
    pub container: Option<ContainerConfig>,
    pub mounts: Vec<MountConfig>,
    pub share_pulse_audio: bool,
    pub install_script: Option<String>,
    pub launch_command: Option<String>,
    pub desktop_launcher: Option<DesktopLauncherConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ContainerConfig {
    #[serde(flatten)]
    pub target: TemplateTarget,
    /// Command polled inside the container after start instead of the
    /// fixed settle delay.
    pub ready_probe: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DesktopLauncherConfig {
    pub name: String,
    pub comment: String,
    pub icon_path: String,
    pub categories: Vec<String>,
}

impl AppConfig {
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(&content)
    }

    /// Validates the app half of the config.
    pub fn app(&self) -> Result<App, ConfigError> {
        let install_script = required(&self.install_script, "install-script")?;
        let launch_command = required(&self.launch_command, "launch-command")?;

        let desktop_launcher = self
            .desktop_launcher
            .as_ref()
            .map(DesktopLauncherConfig::desktop_launcher)
            .transpose()?;

        Ok(App {
            install_script,
            launch_command,
            share_pulse_audio: self.share_pulse_audio,
            mounts: self.mounts()?,
            desktop_launcher,
        })
    }

    pub fn mounts(&self) -> Result<Vec<Mount>, ConfigError> {
        self.mounts
            .iter()
            .enumerate()
            .map(|(index, mount)| {
                mount
                    .to_mount()
                    .map_err(|source| ConfigError::Mount { index, source })
            })
            .collect()
    }

    /// Options describing the container half of the config, in apply order.
    pub fn container_options(&self, lxcpath: &Path) -> Result<Vec<ContainerOption>, ConfigError> {
        let container = self.container.clone().unwrap_or_default();

        let mut options = vec![
            ContainerOption::LxcPath(lxcpath.to_path_buf()),
            ContainerOption::Template(container.target.template),
            ContainerOption::Target {
                distro: container.target.distro,
                release: container.target.release,
                arch: container.target.arch,
            },
            ContainerOption::Mounts(self.mounts()?),
        ];
        if self.share_pulse_audio {
            options.push(ContainerOption::PulseAudio(true));
        }
        if !container.ready_probe.is_empty() {
            options.push(ContainerOption::Readiness(Readiness::probe(
                container.ready_probe,
            )));
        }
        Ok(options)
    }

    pub fn container_spec(&self, name: &str, lxcpath: &Path) -> Result<ContainerSpec, ConfigError> {
        Ok(ContainerSpec::with_options(
            name,
            self.container_options(lxcpath)?,
        ))
    }
}

impl DesktopLauncherConfig {
    fn desktop_launcher(&self) -> Result<DesktopLauncher, ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::MissingField("desktop-launcher name"));
        }
        if self.icon_path.is_empty() {
            return Err(ConfigError::MissingField("desktop-launcher icon-path"));
        }
        // The name doubles as the .desktop file name.
        if self.name.contains('/') {
            return Err(ConfigError::InvalidLauncherName(self.name.clone()));
        }

        Ok(DesktopLauncher {
            name: self.name.clone(),
            comment: self.comment.clone(),
            icon_path: self.icon_path.clone(),
            categories: self.categories.clone(),
        })
    }
}

fn required(field: &Option<String>, name: &'static str) -> Result<String, ConfigError> {
    match field {
        Some(value) if !value.is_empty() => Ok(value.clone()),
        _ => Err(ConfigError::MissingField(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::DEFAULT_SETTLE_DELAY;

    const TEST_YAML: &str = r#"
container:
  template: download
  release: noble

mounts:
  - passthru: /dev/dri
    directory: true
  - host: /dev/video1
    container: /dev/video0
share-pulse-audio: true
install-script: |
   apt-get update -y
   apt-get dist-upgrade -y
   apt-get install -y --no-install-recommends beef

launch-command: /bin/beef
desktop-launcher:
  name: beef
  comment: beefy beef
  icon-path: /usr/share/pixmaps/big-juicy-ribeye.png
  categories:
    - mmm
    - beef
"#;

    #[test]
    fn test_content() {
        let config = AppConfig::parse(TEST_YAML).unwrap();
        let app = config.app().unwrap();

        assert_eq!(app.mounts.len(), 2);
        assert_eq!(app.mounts[0], Mount::passthru("/dev/dri", true));
        assert_eq!(app.mounts[1].host_path(), "/dev/video1");
        assert_eq!(app.mounts[1].container_path(), "dev/video0");
        assert!(!app.mounts[1].is_directory());
        assert!(app.share_pulse_audio);
        assert!(app.install_script.contains("apt-get update -y\n"));
        assert_eq!(app.launch_command, "/bin/beef");

        let launcher = app.desktop_launcher.unwrap();
        assert_eq!(launcher.name, "beef");
        assert_eq!(launcher.comment, "beefy beef");
        assert!(launcher.icon_path.ends_with("ribeye.png"));
        assert_eq!(launcher.categories, ["mmm", "beef"]);
    }

    #[test]
    fn test_format_error() {
        assert!(matches!(
            AppConfig::parse("}{"),
            Err(ConfigError::Format(_))
        ));
    }

    #[test]
    fn test_required_fields() {
        let cases = [
            ("nope: nope", Some("missing install-script")),
            ("install-script: a", Some("missing launch-command")),
            ("{install-script: a, launch-command: ''}", Some("missing launch-command")),
            ("{install-script: a, launch-command: b}", None),
        ];

        for (yaml, expected) in cases {
            let result = AppConfig::parse(yaml).unwrap().app();
            match expected {
                Some(message) => assert_eq!(result.unwrap_err().to_string(), message),
                None => {
                    let app = result.unwrap();
                    assert_eq!(app.install_script, "a");
                    assert_eq!(app.launch_command, "b");
                    assert!(app.desktop_launcher.is_none());
                }
            }
        }
    }

    #[test]
    fn test_invalid_mount() {
        let yaml = "install-script: a\nlaunch-command: b\nmounts:\n  - passthru: /dev/dri\n    host: /dev/dri\n";
        let err = AppConfig::parse(yaml).unwrap().app().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Mount {
                index: 0,
                source: MountError::MutuallyExclusive
            }
        ));
    }

    #[test]
    fn test_desktop_launcher_requires_name_and_icon() {
        let yaml = "install-script: a\nlaunch-command: b\ndesktop-launcher:\n  name: beef\n";
        let err = AppConfig::parse(yaml).unwrap().app().unwrap_err();
        assert_eq!(err.to_string(), "missing desktop-launcher icon-path");

        let yaml = "install-script: a\nlaunch-command: b\ndesktop-launcher:\n  name: a/b\n  icon-path: /x.png\n";
        let err = AppConfig::parse(yaml).unwrap().app().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLauncherName(_)));
    }

    #[test]
    fn test_container_spec() {
        let config = AppConfig::parse(TEST_YAML).unwrap();
        let spec = config
            .container_spec("foo", Path::new("/tmp/lxc"))
            .unwrap();

        assert_eq!(spec.name, "foo");
        assert_eq!(spec.lxcpath, Path::new("/tmp/lxc"));
        assert_eq!(spec.target.template, "download");
        assert_eq!(spec.target.distro, "ubuntu");
        assert_eq!(spec.target.release, "noble");
        assert_eq!(spec.mounts.len(), 2);
        assert!(spec.pulse_audio);
        assert_eq!(spec.readiness, Readiness::Settle(DEFAULT_SETTLE_DELAY));
    }

    #[test]
    fn test_container_spec_without_pulse_or_defaults() {
        let config = AppConfig::parse("install-script: a\nlaunch-command: b\n").unwrap();
        let spec = config
            .container_spec("foo", Path::new("/tmp/lxc"))
            .unwrap();

        assert!(spec.mounts.is_empty());
        assert!(!spec.pulse_audio);
        assert_eq!(spec.target, TemplateTarget::default());
    }

    #[test]
    fn test_ready_probe() {
        let yaml = "container:\n  ready-probe: [getent, hosts, archive.ubuntu.com]\n";
        let spec = AppConfig::parse(yaml)
            .unwrap()
            .container_spec("foo", Path::new("/tmp/lxc"))
            .unwrap();

        match spec.readiness {
            Readiness::Probe { argv, timeout, .. } => {
                assert_eq!(argv, ["getent", "hosts", "archive.ubuntu.com"]);
                assert_eq!(timeout, DEFAULT_SETTLE_DELAY);
            }
            other => panic!("unexpected readiness {:?}", other),
        }
    }
}
