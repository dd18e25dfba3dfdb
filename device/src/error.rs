use std::fmt;
use std::panic::Location;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    HostToDevice,
    DeviceToHost,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::HostToDevice => write!(f, "host-to-device"),
            Direction::DeviceToHost => write!(f, "device-to-host"),
        }
    }
}

/// Failures of the compute device. All of them are fatal for a training run.
///
/// `location` is the source position of the operation that failed, captured
/// through `#[track_caller]`.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to build compute pool: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),

    #[error("allocation of {bytes} bytes for `{label}` failed at {location}")]
    Allocation {
        label: &'static str,
        bytes: usize,
        location: &'static Location<'static>,
    },

    #[error("launch of `{kernel}` failed at {location}: {reason}")]
    Launch {
        kernel: &'static str,
        reason: String,
        location: &'static Location<'static>,
    },

    #[error("{direction} transfer of `{label}` failed at {location}: expected {expected} elements, got {actual}")]
    Transfer {
        label: &'static str,
        direction: Direction,
        expected: usize,
        actual: usize,
        location: &'static Location<'static>,
    },
}

impl DeviceError {
    #[track_caller]
    pub fn launch(kernel: &'static str, reason: impl Into<String>) -> Self {
        DeviceError::Launch {
            kernel,
            reason: reason.into(),
            location: Location::caller(),
        }
    }

    /// Name of the operation that failed.
    pub fn operation(&self) -> &'static str {
        match self {
            DeviceError::PoolBuild(_) => "pool_build",
            DeviceError::Allocation { label, .. } => label,
            DeviceError::Launch { kernel, .. } => kernel,
            DeviceError::Transfer { label, .. } => label,
        }
    }
}

/// Fails the launch of `kernel` unless `actual >= required`.
#[track_caller]
pub fn ensure_len(
    kernel: &'static str,
    what: &str,
    actual: usize,
    required: usize,
) -> Result<(), DeviceError> {
    if actual < required {
        return Err(DeviceError::launch(
            kernel,
            format!("`{what}` holds {actual} elements, {required} required"),
        ));
    }
    Ok(())
}
