use std::time::{Duration, Instant};

use dataset::Dataset;
use device::Device;

use crate::buffers::BatchBuffers;
use crate::config::TrainConfig;
use crate::data::{BatchView, Batches, DeviceDataset, Split};
use crate::error::{Error, Result};
use crate::kernels::{self, UpdateParams};
use crate::layout::{LayerDescriptor, Layout};
use crate::params::{ParamBuffers, ParameterStore};

/// Proof that the backward pass of a batch has finished reading the
/// parameters. Only [`Trainer::backward`] creates one and only
/// [`Trainer::update`] consumes it.
#[must_use = "gradients are only applied by passing the fence to `Trainer::update`"]
#[derive(Debug)]
pub struct BackwardComplete {
    rows: usize,
}

impl BackwardComplete {
    pub fn rows(&self) -> usize {
        self.rows
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalReport {
    pub hits: u32,
    pub evaluated: usize,
    /// Mean cross-entropy per sample.
    pub loss: f32,
}

impl EvalReport {
    pub fn accuracy(&self) -> f32 {
        if self.evaluated == 0 {
            return 0.0;
        }
        self.hits as f32 / self.evaluated as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    pub epoch: usize,
    pub eval: EvalReport,
    pub elapsed: Duration,
}

impl EpochReport {
    pub fn accuracy(&self) -> f32 {
        self.eval.accuracy()
    }
}

/// Hooks for reporting training progress. All methods default to no-ops.
pub trait TrainingObserver {
    fn epoch_started(&mut self, _epoch: usize, _batches: usize) {}
    fn batch_finished(&mut self, _batch: &BatchView) {}
    fn epoch_finished(&mut self, _report: &EpochReport) {}
}

impl TrainingObserver for () {}

/// Runs mini-batch SGD on a [`Device`].
///
/// All buffers are allocated in [`Trainer::new`]. Each step launches the
/// forward kernels layer by layer, the output error, the backward kernels from
/// the output layer down, the gradient reductions and finally the updates.
pub struct Trainer<'d> {
    device: &'d Device,
    config: TrainConfig,
    layers: Vec<LayerDescriptor>,
    params: ParameterStore,
    grads: ParamBuffers,
    buffers: BatchBuffers,
    train: DeviceDataset,
    eval: DeviceDataset,
}

impl<'d> Trainer<'d> {
    pub fn new(
        device: &'d Device,
        config: TrainConfig,
        params: ParameterStore,
        train: &Dataset,
        eval: &Dataset,
    ) -> Result<Self> {
        config.validate()?;
        let layout = params.layout();
        check_dataset("training", train, layout)?;
        check_dataset("evaluation", eval, layout)?;

        if train.len() < config.batch_size {
            return Err(Error::InvalidConfig(format!(
                "training set has {} samples, fewer than the batch size {}",
                train.len(),
                config.batch_size
            )));
        }
        if eval.is_empty() {
            return Err(Error::DatasetMismatch("evaluation set is empty".into()));
        }

        let skipped = train.len() % config.batch_size;
        if skipped > 0 {
            log::info!(
                "Skipping {} trailing training samples that do not fill a batch",
                skipped
            );
        }

        Ok(Self {
            device,
            config,
            layers: layout.layers().to_vec(),
            grads: ParamBuffers::new(device, layout, ("weight_gradients", "bias_gradients"))?,
            buffers: BatchBuffers::new(device, layout, config.batch_size)?,
            train: DeviceDataset::upload(device, train, ("train_inputs", "train_labels"))?,
            eval: DeviceDataset::upload(device, eval, ("eval_inputs", "eval_labels"))?,
            params,
        })
    }

    pub fn device(&self) -> &'d Device {
        self.device
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn layout(&self) -> &Layout {
        self.params.layout()
    }

    pub fn params(&self) -> &ParameterStore {
        &self.params
    }

    /// Copies the device parameters into the host mirror and returns it.
    pub fn download_params(&mut self) -> Result<&ParameterStore> {
        self.params.download()?;
        Ok(&self.params)
    }

    /// Gradients summed over the last batch, before averaging.
    pub fn gradients(&self) -> &ParamBuffers {
        &self.grads
    }

    /// Forward output of layer `index` for the last batch.
    pub fn activations(&self, index: usize) -> &[f32] {
        self.buffers.activations(index)
    }

    pub fn errors(&self, index: usize) -> &[f32] {
        self.buffers.errors(index)
    }

    pub fn predictions(&self) -> &[f32] {
        self.buffers.activations(self.layers.len() - 1)
    }

    pub fn train_batches(&self) -> Batches {
        Batches::full(self.train.rows(), self.config.batch_size)
    }

    pub fn eval_batches(&self) -> Batches {
        Batches::covering(self.eval.rows(), self.config.batch_size)
    }

    pub fn log_summary(&self) {
        let layout = self.layout();
        log::info!("Network:       {:?}", layout.topology().sizes());
        log::info!(
            "Parameters:    {} weights, {} biases ({} bytes)",
            layout.weights_len(),
            layout.biases_len(),
            self.params.size_bytes()
        );
        log::info!("Gradients:     {} bytes", self.grads.size_bytes());
        log::info!("Batch buffers: {} bytes", self.buffers.size_bytes());
        log::info!(
            "Training set:  {} samples, {} batches ({} bytes)",
            self.train.rows(),
            self.train_batches().len(),
            self.train.size_bytes()
        );
        log::info!(
            "Eval set:      {} samples, {} batches ({} bytes)",
            self.eval.rows(),
            self.eval_batches().len(),
            self.eval.size_bytes()
        );
        self.config.log();
    }

    /// Runs every layer on `batch`, leaving the outputs in the activation
    /// buffers.
    pub fn forward(&mut self, split: Split, batch: &BatchView) -> Result<()> {
        let data = match split {
            Split::Train => &self.train,
            Split::Eval => &self.eval,
        };
        let params = self.params.buffers();

        for layer in &self.layers {
            let (before, rest) = self.buffers.activations.split_at_mut(layer.index);
            let input = match before.last() {
                Some(previous) => previous.as_slice(),
                None => data.inputs(batch)?,
            };
            kernels::forward(
                self.device,
                layer,
                params,
                input,
                rest[0].as_mut_slice(),
                batch.rows,
            )?;
        }
        Ok(())
    }

    /// Computes error signals and gradients of the training batch last passed
    /// to [`Trainer::forward`]. Parameters are only read.
    pub fn backward(&mut self, batch: &BatchView) -> Result<BackwardComplete> {
        let last = self.layers.len() - 1;
        kernels::output_error(
            self.device,
            self.buffers.activations[last].as_slice(),
            self.train.labels(batch)?,
            self.buffers.errors[last].as_mut_slice(),
            self.layers[last].out_dim,
            batch.rows,
        )?;

        for k in (0..last).rev() {
            let (lower, upper) = self.buffers.errors.split_at_mut(k + 1);
            kernels::propagate_error(
                self.device,
                &self.layers[k],
                &self.layers[k + 1],
                self.params.buffers(),
                upper[0].as_slice(),
                self.buffers.activations[k].as_slice(),
                lower[k].as_mut_slice(),
                batch.rows,
            )?;
        }

        for layer in &self.layers {
            let errors = self.buffers.errors[layer.index].as_slice();
            let input = match layer.index {
                0 => self.train.inputs(batch)?,
                k => self.buffers.activations[k - 1].as_slice(),
            };
            kernels::accumulate_bias_gradient(
                self.device,
                layer,
                errors,
                &mut self.grads,
                batch.rows,
            )?;
            kernels::accumulate_weight_gradient(
                self.device,
                layer,
                input,
                errors,
                &mut self.grads,
                batch.rows,
            )?;
        }

        Ok(BackwardComplete { rows: batch.rows })
    }

    /// Applies the gradients: biases of every layer, then weights from the
    /// output layer inward.
    pub fn update(&mut self, fence: BackwardComplete) -> Result<()> {
        let update = UpdateParams {
            learning_rate: self.config.learning_rate,
            l2_lambda: self.config.l2_lambda,
            rows: fence.rows,
        };
        let params = self.params.buffers_mut();

        for layer in &self.layers {
            kernels::update_biases(self.device, layer, params, &self.grads, &update)?;
        }
        for layer in self.layers.iter().rev() {
            kernels::update_weights(self.device, layer, params, &self.grads, &update)?;
        }
        Ok(())
    }

    pub fn step(&mut self, batch: &BatchView) -> Result<()> {
        self.forward(Split::Train, batch)?;
        let fence = self.backward(batch)?;
        self.update(fence)
    }

    pub fn train_epoch(&mut self, observer: &mut dyn TrainingObserver) -> Result<()> {
        for batch in self.train_batches() {
            self.step(&batch)?;
            observer.batch_finished(&batch);
        }
        Ok(())
    }

    /// Classifies the whole evaluation set. The hit and loss accumulators are
    /// reset first and read back once at the end.
    pub fn evaluate(&mut self) -> Result<EvalReport> {
        self.buffers.hits.fill(0);
        self.buffers.loss.fill(0.0);
        let last = self.layers.len() - 1;
        let width = self.layers[last].out_dim;

        for batch in self.eval_batches() {
            self.forward(Split::Eval, &batch)?;

            let predictions = self.buffers.activations[last].as_slice();
            let labels = self.eval.labels(&batch)?;
            kernels::count_hits(
                self.device,
                predictions,
                labels,
                width,
                batch.rows,
                self.buffers.hit_partials.as_mut_slice(),
                self.buffers.hits.as_mut_slice(),
            )?;
            kernels::sum_loss(
                self.device,
                predictions,
                labels,
                width,
                batch.rows,
                self.buffers.loss_partials.as_mut_slice(),
                self.buffers.loss.as_mut_slice(),
            )?;
        }

        let mut hits = [0u32];
        let mut loss = [0.0f32];
        self.buffers.hits.copy_to_host(&mut hits)?;
        self.buffers.loss.copy_to_host(&mut loss)?;

        let evaluated = self.eval.rows();
        Ok(EvalReport {
            hits: hits[0],
            evaluated,
            loss: loss[0] / evaluated as f32,
        })
    }

    /// Trains for the configured number of epochs, evaluating after each.
    pub fn fit(&mut self, observer: &mut dyn TrainingObserver) -> Result<Vec<EpochReport>> {
        let batches = self.train_batches().len();
        let mut history = Vec::with_capacity(self.config.epochs);

        for epoch in 1..=self.config.epochs {
            let start = Instant::now();
            observer.epoch_started(epoch, batches);

            self.train_epoch(observer)?;
            let eval = self.evaluate()?;

            let report = EpochReport {
                epoch,
                eval,
                elapsed: start.elapsed(),
            };
            observer.epoch_finished(&report);
            log::info!(
                "Epoch {:>3}: {}/{} correct, accuracy {:.4}, loss {:.5} ({:.2?})",
                epoch,
                eval.hits,
                eval.evaluated,
                report.accuracy(),
                eval.loss,
                report.elapsed
            );
            history.push(report);
        }

        log::debug!("{} kernel launches", self.device.launches());
        Ok(history)
    }
}

fn check_dataset(name: &str, data: &Dataset, layout: &Layout) -> Result<()> {
    if data.input_dim() != layout.input_dim() {
        return Err(Error::DatasetMismatch(format!(
            "{} samples have {} features, network expects {}",
            name,
            data.input_dim(),
            layout.input_dim()
        )));
    }
    if data.num_classes() != layout.output_dim() {
        return Err(Error::DatasetMismatch(format!(
            "{} labels have {} classes, network has {} outputs",
            name,
            data.num_classes(),
            layout.output_dim()
        )));
    }
    Ok(())
}
