use device::{Device, DeviceError};
use rayon::prelude::*;

use super::ensure_rows;
use crate::layout::LayerDescriptor;
use crate::params::ParamBuffers;

#[derive(Debug, Clone, Copy)]
pub struct UpdateParams {
    pub learning_rate: f32,
    pub l2_lambda: f32,
    /// Samples the gradients were summed over.
    pub rows: usize,
}

/// `bias += lr * grad / rows`
pub fn update_biases(
    device: &Device,
    layer: &LayerDescriptor,
    params: &mut ParamBuffers,
    grads: &ParamBuffers,
    update: &UpdateParams,
) -> Result<(), DeviceError> {
    const KERNEL: &str = "update_biases";
    ensure_rows(KERNEL, update.rows)?;

    let scale = update.learning_rate / update.rows as f32;
    let grad = grads.biases(layer);
    let biases = params.biases_mut(layer);

    device.launch(KERNEL, biases.len(), || {
        biases
            .par_iter_mut()
            .zip(grad.par_iter())
            .for_each(|(b, &g)| *b += scale * g);
    });

    Ok(())
}

/// `weight += lr * (grad - lambda * weight) / rows`, reading the pre-update
/// weight of each element for the decay term.
pub fn update_weights(
    device: &Device,
    layer: &LayerDescriptor,
    params: &mut ParamBuffers,
    grads: &ParamBuffers,
    update: &UpdateParams,
) -> Result<(), DeviceError> {
    const KERNEL: &str = "update_weights";
    ensure_rows(KERNEL, update.rows)?;

    let scale = update.learning_rate / update.rows as f32;
    let lambda = update.l2_lambda;
    let grad = grads.weights(layer);
    let weights = params.weights_mut(layer);

    device.launch(KERNEL, weights.len(), || {
        weights
            .par_iter_mut()
            .zip(grad.par_iter())
            .for_each(|(w, &g)| *w += scale * (g - lambda * *w));
    });

    Ok(())
}
