use crate::config::AppConfig;
use crate::controller::Container;
use crate::error::ContainerError;
use crate::launcher::Launchers;
use crate::types::App;
use lxcify_shim::{LxcShim, Runtime};
use std::path::Path;
use tracing::Instrument;

/// Create, start, install, stop. Stops at the first failure and leaves the
/// container as it is.
pub async fn provision<R: Runtime>(
    container: &mut Container<R>,
    app: &App,
    launchers: &Launchers,
) -> Result<(), ContainerError> {
    let span = tracing::info_span!("provision", container = %container.name());
    async {
        container.create().await?;
        container.start().await?;
        container.install(app, launchers).await?;
        container.stop().await
    }
    .instrument(span)
    .await
}

/// Provisions container `name` under `lxcpath` from the app config at
/// `config_path`. The config is fully validated before LXC is touched.
pub async fn provision_from_config(
    config_path: &Path,
    name: &str,
    lxcpath: &Path,
    launchers: &Launchers,
) -> Result<(), ContainerError> {
    let config = AppConfig::load(config_path).await?;
    let app = config.app()?;
    let spec = config.container_spec(name, lxcpath)?;

    tracing::info!(container = %name, lxcpath = ?spec.lxcpath, config = ?config_path, "Loaded app config");

    let runtime = LxcShim::new(&spec.name, &spec.lxcpath)
        .await
        .map_err(ContainerError::runtime("open container"))?;
    let mut container = Container::new(spec, runtime);
    provision(&mut container, &app, launchers).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::spec::ContainerSpec;
    use crate::testing::{Call, FakeRuntime};
    use crate::types::ContainerState;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
container:
  release: noble
mounts:
  - passthru: /dev/dri
    directory: true
  - host: /dev/video1
    container: /dev/video0
install-script: |
  echo hi
launch-command: app $*
desktop-launcher:
  name: App
  icon-path: /usr/share/pixmaps/app.png
  categories: [Utility]
"#;

    #[tokio::test]
    async fn test_provision() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::parse(CONFIG).unwrap();
        let app = config.app().unwrap();
        let mut spec: ContainerSpec = config.container_spec("app", temp_dir.path()).unwrap();
        spec.readiness = crate::spec::Readiness::Settle(std::time::Duration::ZERO);
        let runtime = FakeRuntime::new("app", temp_dir.path());
        let launchers = Launchers::new(temp_dir.path().join("applications"));
        let mut container = Container::new(spec, runtime);

        provision(&mut container, &app, &launchers).await.unwrap();

        assert_eq!(container.state(), ContainerState::Stopped);
        let calls = container.runtime().calls();
        assert!(matches!(&calls[0], Call::CreateAsUser(target) if target.release == "noble"));
        assert_eq!(calls.last(), Some(&Call::Stop));
        assert_eq!(container.runtime().written_files(), vec!["echo hi\n".to_string()]);
        assert!(temp_dir.path().join("applications/App.desktop").exists());
    }

    #[tokio::test]
    async fn test_provision_stops_at_first_failure() {
        let temp_dir = TempDir::new().unwrap();
        let mut runtime = FakeRuntime::new("app", temp_dir.path());
        runtime.reaches_running = false;
        let config = AppConfig::parse(CONFIG).unwrap();
        let app = config.app().unwrap();
        let spec = config.container_spec("app", temp_dir.path()).unwrap();
        let launchers = Launchers::new(temp_dir.path().join("applications"));
        let mut container = Container::new(spec, runtime);

        let err = provision(&mut container, &app, &launchers).await.unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(container.state(), ContainerState::Created);
        assert!(container.runtime().commands().is_empty());
        assert!(!container.runtime().calls().contains(&Call::Stop));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_before_lxc() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("app.yaml");
        std::fs::write(&config_path, "install-script: echo hi\n").unwrap();
        let lxcpath = temp_dir.path().join("lxc");

        let err = provision_from_config(
            &config_path,
            "app",
            &lxcpath,
            &Launchers::new(temp_dir.path().join("applications")),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            ContainerError::Config(ConfigError::MissingField("launch-command"))
        ));
        assert!(!lxcpath.exists());
    }
}
