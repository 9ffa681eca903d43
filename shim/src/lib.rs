mod config;
mod error;
mod lxc_shim;
mod shim;
mod types;

pub use config::{parse_config, render_config};
pub use error::ShimError;
pub use lxc_shim::LxcShim;
pub use shim::Runtime;
pub use types::*;
