use device::DeviceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("dataset does not match network: {0}")]
    DatasetMismatch(String),

    #[error(transparent)]
    Device(#[from] DeviceError),
}

pub type Result<T> = std::result::Result<T, Error>;
