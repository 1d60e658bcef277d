use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("device {0} does not exist")]
    NotFound(PathBuf),

    #[error("{0} is not a block device")]
    NotABlockDevice(PathBuf),

    /// The kernel driver table could not be understood
    #[error("{path} not processed: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DeviceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DeviceError::Io { path: path.into(), source }
    }
}
