use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MountError {
    #[error("{{passthru}} is mutually exclusive with {{host,container}}")]
    MutuallyExclusive,

    #[error("missing required fields: {{passthru}} or {{host,container}}")]
    MissingFields,

    #[error("invalid mount: {0}")]
    EmptyPath(String),
}
