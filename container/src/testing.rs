//! Recording in-memory runtime for controller tests.

use async_trait::async_trait;
use lxcify_shim::{
    AttachStdio, ConfigItem, Runtime, RuntimeState, ShimError, TemplateTarget, parse_config,
    render_config,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateAsUser(TemplateTarget),
    SetConfigItem(ConfigItem),
    ClearConfig,
    SaveConfigFile(PathBuf),
    LoadConfigFile(PathBuf),
    Start,
    Stop,
    WaitForState(RuntimeState, Duration),
    RunCommand(Vec<String>),
}

#[derive(Default)]
struct FakeState {
    calls: Vec<Call>,
    config: Vec<ConfigItem>,
    running: bool,
    /// Data read from stdin by `/bin/sh -c cat >...` commands.
    written_files: Vec<String>,
    failing_commands: usize,
    command_delay: Option<Duration>,
}

pub struct FakeRuntime {
    name: String,
    lxcpath: PathBuf,
    pub reaches_running: bool,
    pub fail_create: bool,
    pub fail_state_query: bool,
    state: Mutex<FakeState>,
}

impl FakeRuntime {
    pub fn new(name: &str, lxcpath: &Path) -> Self {
        Self {
            name: name.to_string(),
            lxcpath: lxcpath.to_path_buf(),
            reaches_running: true,
            fail_create: false,
            fail_state_query: false,
            state: Mutex::new(FakeState::default()),
        }
    }

    pub fn write_config_file(&self, contents: &str) {
        let path = self.config_file_name();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    pub fn read_config_file(&self) -> String {
        std::fs::read_to_string(self.config_file_name()).unwrap()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn config_items(&self) -> Vec<ConfigItem> {
        self.state.lock().unwrap().config.clone()
    }

    pub fn written_files(&self) -> Vec<String> {
        self.state.lock().unwrap().written_files.clone()
    }

    pub fn set_running(&self, running: bool) {
        self.state.lock().unwrap().running = running;
    }

    /// The next `count` commands exit non-zero.
    pub fn fail_next_commands(&self, count: usize) {
        self.state.lock().unwrap().failing_commands = count;
    }

    /// Every later command sleeps for `delay` before completing.
    pub fn set_command_delay(&self, delay: Duration) {
        self.state.lock().unwrap().command_delay = Some(delay);
    }

    /// Commands issued through `run_command`, in order.
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::RunCommand(argv) => Some(argv),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl Runtime for FakeRuntime {
    fn name(&self) -> &str {
        &self.name
    }

    fn config_path(&self) -> &Path {
        &self.lxcpath
    }

    async fn create_as_user(&self, target: &TemplateTarget) -> Result<(), ShimError> {
        self.record(Call::CreateAsUser(target.clone()));
        if self.fail_create {
            return Err(ShimError::CommandFailed {
                command: "lxc-create".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "template failed".to_string(),
            });
        }
        self.write_config_file(
            "lxc.include = /usr/share/lxc/config/common.conf\nlxc.idmap = u 0 100000 65536\nlxc.idmap = g 0 100000 65536\n",
        );
        let items = parse_config(&self.config_file_name(), &self.read_config_file())?;
        self.state.lock().unwrap().config = items;
        Ok(())
    }

    async fn set_config_item(&self, key: &str, value: &str) -> Result<(), ShimError> {
        let item = ConfigItem::new(key, value);
        self.record(Call::SetConfigItem(item.clone()));
        self.state.lock().unwrap().config.push(item);
        Ok(())
    }

    async fn clear_config(&self) -> Result<(), ShimError> {
        self.record(Call::ClearConfig);
        self.state.lock().unwrap().config.clear();
        Ok(())
    }

    async fn save_config_file(&self, path: &Path) -> Result<(), ShimError> {
        self.record(Call::SaveConfigFile(path.to_path_buf()));
        let content = render_config(&self.config_items());
        std::fs::write(path, content)?;
        Ok(())
    }

    async fn load_config_file(&self, path: &Path) -> Result<(), ShimError> {
        self.record(Call::LoadConfigFile(path.to_path_buf()));
        let items = parse_config(path, &std::fs::read_to_string(path)?)?;
        self.state.lock().unwrap().config.extend(items);
        Ok(())
    }

    async fn start(&self) -> Result<(), ShimError> {
        self.record(Call::Start);
        if self.reaches_running {
            self.set_running(true);
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), ShimError> {
        self.record(Call::Stop);
        self.set_running(false);
        Ok(())
    }

    async fn wait_for_state(
        &self,
        state: RuntimeState,
        timeout: Duration,
    ) -> Result<bool, ShimError> {
        self.record(Call::WaitForState(state, timeout));
        let running = self.state.lock().unwrap().running;
        Ok(match state {
            RuntimeState::Running => running,
            RuntimeState::Stopped => !running,
            _ => false,
        })
    }

    async fn is_running(&self) -> Result<bool, ShimError> {
        if self.fail_state_query {
            return Err(ShimError::CommandFailed {
                command: "lxc-info".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "Permission denied".to_string(),
            });
        }
        Ok(self.state.lock().unwrap().running)
    }

    async fn run_command(&self, stdio: AttachStdio, argv: &[&str]) -> Result<(), ShimError> {
        self.record(Call::RunCommand(
            argv.iter().map(|arg| arg.to_string()).collect(),
        ));

        // Only the script upload consumes stdin; everything else would block
        // on the test harness's stdin.
        if argv.first() == Some(&"/bin/sh") {
            let mut data = String::new();
            std::fs::File::from(stdio.stdin).read_to_string(&mut data)?;
            self.state.lock().unwrap().written_files.push(data);
        }

        let delay = self.state.lock().unwrap().command_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if state.failing_commands > 0 {
            state.failing_commands -= 1;
            return Err(ShimError::CommandFailed {
                command: argv.join(" "),
                status: "exit status: 1".to_string(),
                stderr: String::new(),
            });
        }
        Ok(())
    }
}
