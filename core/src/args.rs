use std::path::PathBuf;

use clap::Parser;
use dataset::LoadOptions;
use device::{DeviceConfig, DEFAULT_WORK_GROUP_SIZE};
use network::topology::{HIDDEN1_DIM, HIDDEN2_DIM, INPUT_DIM, OUTPUT_DIM};
use network::TrainConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "fcnet")]
#[command(author = "Jørgen Hanssen <jorgen@hanssen.io>")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Training data as `label,f1,f2,...` CSV.
    #[arg(long)]
    pub data: PathBuf,

    /// Separate evaluation data. Without it the first `--eval-samples` rows of
    /// `--data` are held out.
    #[arg(long)]
    pub eval_data: Option<PathBuf>,

    /// Features per sample.
    #[arg(long, default_value_t = INPUT_DIM)]
    pub input_dim: usize,

    /// Units in the first hidden layer.
    #[arg(long, default_value_t = HIDDEN1_DIM)]
    pub hidden1: usize,

    /// Units in the second hidden layer.
    #[arg(long, default_value_t = HIDDEN2_DIM)]
    pub hidden2: usize,

    /// Number of classes (output units).
    #[arg(long, default_value_t = OUTPUT_DIM)]
    pub classes: usize,

    #[arg(long, default_value_t = 100)]
    pub epochs: usize,

    /// Samples per training batch.
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 0.001)]
    pub learning_rate: f32,

    /// L2 regularization coefficient.
    #[arg(long, default_value_t = 0.7)]
    pub l2_lambda: f32,

    /// Maximum number of samples read from `--data`.
    #[arg(long, default_value_t = 60_000)]
    pub samples: usize,

    /// Size of the evaluation set.
    #[arg(long, default_value_t = 96)]
    pub eval_samples: usize,

    /// Raw feature values are divided by this.
    #[arg(long, default_value_t = 255.0)]
    pub feature_scale: f32,

    /// Seed for weight initialization. Random when omitted.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Compute units. Defaults to every logical core.
    #[arg(long)]
    pub threads: Option<usize>,

    /// Work items per reduction group.
    #[arg(long, default_value_t = DEFAULT_WORK_GROUP_SIZE)]
    pub work_group_size: usize,

    /// Also write the log to a file.
    #[arg(short, long)]
    pub log_file: Option<PathBuf>,

    /// Log debug output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn load_options(&self, max_samples: usize) -> LoadOptions {
        LoadOptions {
            input_dim: self.input_dim,
            num_classes: self.classes,
            max_samples: Some(max_samples),
            feature_scale: self.feature_scale,
        }
    }

    pub fn device_config(&self) -> DeviceConfig {
        DeviceConfig {
            threads: self.threads,
            work_group_size: self.work_group_size,
        }
    }

    pub fn train_config(&self) -> TrainConfig {
        TrainConfig {
            epochs: self.epochs,
            batch_size: self.batch_size,
            learning_rate: self.learning_rate,
            l2_lambda: self.l2_lambda,
        }
    }
}
