mod config;
mod controller;
mod error;
mod idmap;
mod install;
mod launcher;
mod pipeline;
mod pulse;
mod spec;
mod types;

#[cfg(test)]
mod testing;

pub use config::{AppConfig, ConfigError, ContainerConfig, DesktopLauncherConfig};
pub use controller::{Container, DEFAULT_APPARMOR_PROFILE, START_TIMEOUT, default_config};
pub use error::ContainerError;
pub use idmap::{
    CONTAINER_USER, ID_MAP_RANGE, ID_MAP_START, clear_id_map, id_map_entries, setup_user_passthru,
    strip_config_key,
};
pub use install::{INSTALL_SCRIPT_PATH, run_install_script};
pub use launcher::{
    CategoryStyle, LAUNCH_SCRIPT_NAME, Launchers, default_applications_dir, render_desktop_entry,
    render_launch_script,
};
pub use pipeline::{provision, provision_from_config};
pub use pulse::{PULSE_SOCKET, SETUP_PULSE_SCRIPT, setup_pulse_audio};
pub use spec::{
    ContainerOption, ContainerSpec, DEFAULT_SETTLE_DELAY, Readiness, default_lxcpath,
    default_options,
};
pub use types::*;
