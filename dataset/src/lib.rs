mod csv;
mod error;
mod samples;

pub use csv::LoadOptions;
pub use error::{DatasetError, Result};
pub use samples::Dataset;
