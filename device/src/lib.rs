mod buffer;
mod device;
mod error;
mod info;

pub use buffer::{DeviceBuffer, Element};
pub use device::{Device, DeviceConfig, DEFAULT_WORK_GROUP_SIZE};
pub use error::{ensure_len, DeviceError, Direction};
pub use info::DeviceInfo;
