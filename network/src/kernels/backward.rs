use device::{ensure_len, Device, DeviceError};
use rayon::prelude::*;

use super::ensure_rows;
use crate::layout::LayerDescriptor;
use crate::params::ParamBuffers;

/// Propagates the error signal of `next` back through its weights into
/// `layer`, gated by the derivative of `layer`'s activation evaluated on its
/// stored forward output.
#[allow(clippy::too_many_arguments)]
pub fn propagate_error(
    device: &Device,
    layer: &LayerDescriptor,
    next: &LayerDescriptor,
    params: &ParamBuffers,
    next_errors: &[f32],
    activations: &[f32],
    errors: &mut [f32],
    rows: usize,
) -> Result<(), DeviceError> {
    const KERNEL: &str = "propagate_error";
    ensure_rows(KERNEL, rows)?;
    if next.in_dim != layer.out_dim {
        return Err(DeviceError::launch(
            KERNEL,
            format!(
                "layer {} has {} units but layer {} expects {}",
                layer.index, layer.out_dim, next.index, next.in_dim
            ),
        ));
    }
    let width = layer.out_dim;
    let next_width = next.out_dim;
    ensure_len(KERNEL, "next_errors", next_errors.len(), rows * next_width)?;
    ensure_len(KERNEL, "activations", activations.len(), rows * width)?;
    ensure_len(KERNEL, "errors", errors.len(), rows * width)?;

    let weights = params.weights(next);
    let activation = layer.activation;
    let errors = &mut errors[..rows * width];

    device.launch(KERNEL, errors.len(), || {
        errors.par_iter_mut().enumerate().for_each(|(idx, e)| {
            let (sample, unit) = (idx / width, idx % width);
            let delta = &next_errors[sample * next_width..(sample + 1) * next_width];
            let dz: f32 = delta
                .iter()
                .enumerate()
                .map(|(j, d)| weights[j * width + unit] * d)
                .sum();
            *e = activation.backward(activations[idx], dz);
        });
    });

    Ok(())
}

/// Sums the error signal over the batch into the layer's bias gradient,
/// overwriting it.
pub fn accumulate_bias_gradient(
    device: &Device,
    layer: &LayerDescriptor,
    errors: &[f32],
    grads: &mut ParamBuffers,
    rows: usize,
) -> Result<(), DeviceError> {
    const KERNEL: &str = "bias_gradient";
    ensure_rows(KERNEL, rows)?;
    let width = layer.out_dim;
    ensure_len(KERNEL, "errors", errors.len(), rows * width)?;

    let grad = grads.biases_mut(layer);
    device.launch(KERNEL, width, || {
        grad.par_iter_mut().enumerate().for_each(|(unit, g)| {
            *g = (0..rows).map(|i| errors[i * width + unit]).sum();
        });
    });

    Ok(())
}

/// Sums `input[i, k] * error[i, o]` over the batch into the layer's weight
/// gradient, overwriting it. `input` holds the previous layer's activations.
pub fn accumulate_weight_gradient(
    device: &Device,
    layer: &LayerDescriptor,
    input: &[f32],
    errors: &[f32],
    grads: &mut ParamBuffers,
    rows: usize,
) -> Result<(), DeviceError> {
    const KERNEL: &str = "weight_gradient";
    ensure_rows(KERNEL, rows)?;
    let (in_dim, out_dim) = (layer.in_dim, layer.out_dim);
    ensure_len(KERNEL, "input", input.len(), rows * in_dim)?;
    ensure_len(KERNEL, "errors", errors.len(), rows * out_dim)?;

    let grad = grads.weights_mut(layer);
    device.launch(KERNEL, grad.len(), || {
        grad.par_iter_mut().enumerate().for_each(|(idx, g)| {
            let (unit, k) = (idx / in_dim, idx % in_dim);
            *g = (0..rows)
                .map(|i| input[i * in_dim + k] * errors[i * out_dim + unit])
                .sum();
        });
    });

    Ok(())
}
