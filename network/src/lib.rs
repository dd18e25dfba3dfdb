pub mod buffers;
pub mod config;
pub mod data;
pub mod error;
pub mod init;
pub mod kernels;
pub mod layout;
pub mod params;
pub mod topology;
pub mod trainer;

pub use config::TrainConfig;
pub use data::{BatchView, Batches, Split};
pub use error::{Error, Result};
pub use init::Initializer;
pub use layout::{LayerDescriptor, Layout};
pub use params::{ParamBuffers, ParameterStore};
pub use topology::{Activation, Topology};
pub use trainer::{BackwardComplete, EpochReport, EvalReport, Trainer, TrainingObserver};
