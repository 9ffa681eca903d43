use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShimError {
    #[error("{command} exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config line {line} in {path:?}: {content:?}")]
    MalformedConfig {
        path: PathBuf,
        line: usize,
        content: String,
    },

    #[error("empty command")]
    EmptyCommand,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
