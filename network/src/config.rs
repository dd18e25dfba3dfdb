use crate::error::{Error, Result};

/// Training hyperparameters. Defaults are the reference values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    /// L2 regularization coefficient.
    pub l2_lambda: f32,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            batch_size: 32,
            learning_rate: 0.001,
            l2_lambda: 0.7,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch size must be positive".into()));
        }
        if !self.learning_rate.is_finite() || self.learning_rate < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "learning rate {} must be finite and non-negative",
                self.learning_rate
            )));
        }
        if !self.l2_lambda.is_finite() || self.l2_lambda < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "l2 lambda {} must be finite and non-negative",
                self.l2_lambda
            )));
        }
        Ok(())
    }

    pub fn log(&self) {
        log::info!("Epochs:        {}", self.epochs);
        log::info!("Batch size:    {}", self.batch_size);
        log::info!("Learning rate: {}", self.learning_rate);
        log::info!("L2 lambda:     {}", self.l2_lambda);
    }
}
