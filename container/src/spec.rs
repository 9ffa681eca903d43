use lxcify_mount::{Mount, default_mounts};
use lxcify_shim::TemplateTarget;
use std::path::PathBuf;
use std::time::Duration;

/// Post-start wait used when no readiness probe is configured.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);

const PROBE_INTERVAL: Duration = Duration::from_millis(500);

/// How the controller decides a freshly started container is usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Sleep unconditionally.
    Settle(Duration),
    /// Run `argv` inside the container until it exits 0, for at most `timeout`.
    Probe {
        argv: Vec<String>,
        timeout: Duration,
        interval: Duration,
    },
}

impl Readiness {
    pub fn probe(argv: Vec<String>) -> Self {
        Readiness::Probe {
            argv,
            timeout: DEFAULT_SETTLE_DELAY,
            interval: PROBE_INTERVAL,
        }
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Readiness::Settle(DEFAULT_SETTLE_DELAY)
    }
}

#[derive(Debug, Clone)]
pub enum ContainerOption {
    LxcPath(PathBuf),
    Template(String),
    Target {
        distro: String,
        release: String,
        arch: String,
    },
    /// Appended to the mounts accumulated so far.
    Mounts(Vec<Mount>),
    PulseAudio(bool),
    Readiness(Readiness),
}

/// Everything needed to create and run one container.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub name: String,
    pub lxcpath: PathBuf,
    pub target: TemplateTarget,
    pub mounts: Vec<Mount>,
    pub pulse_audio: bool,
    pub readiness: Readiness,
}

impl ContainerSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            lxcpath: default_lxcpath(),
            target: TemplateTarget::default(),
            mounts: Vec::new(),
            pulse_audio: false,
            readiness: Readiness::default(),
        }
    }

    /// Applies `options` in order, so later options override earlier ones.
    /// An empty list selects [`default_options`].
    pub fn with_options<I>(name: &str, options: I) -> Self
    where
        I: IntoIterator<Item = ContainerOption>,
    {
        let mut options: Vec<_> = options.into_iter().collect();
        if options.is_empty() {
            options = default_options();
        }

        let mut spec = Self::new(name);
        for option in options {
            spec.apply(option);
        }
        spec
    }

    pub fn apply(&mut self, option: ContainerOption) {
        match option {
            ContainerOption::LxcPath(path) => self.lxcpath = path,
            ContainerOption::Template(template) => self.target.template = template,
            ContainerOption::Target {
                distro,
                release,
                arch,
            } => {
                self.target.distro = distro;
                self.target.release = release;
                self.target.arch = arch;
            }
            ContainerOption::Mounts(mounts) => self.mounts.extend(mounts),
            ContainerOption::PulseAudio(enable) => self.pulse_audio = enable,
            ContainerOption::Readiness(readiness) => self.readiness = readiness,
        }
    }
}

pub fn default_options() -> Vec<ContainerOption> {
    let target = TemplateTarget::default();
    vec![
        ContainerOption::LxcPath(default_lxcpath()),
        ContainerOption::Template(target.template),
        ContainerOption::Target {
            distro: target.distro,
            release: target.release,
            arch: target.arch,
        },
        ContainerOption::Mounts(default_mounts()),
        ContainerOption::PulseAudio(true),
    ]
}

/// Unprivileged containers live under the user's data directory.
pub fn default_lxcpath() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("lxc"))
        .unwrap_or_else(|| PathBuf::from("/var/lib/lxc"))
}
