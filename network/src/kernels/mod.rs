//! Data-parallel kernels of the training step.
//!
//! Every kernel validates its buffers, then runs as a single
//! [`Device::launch`](device::Device::launch) in which each work item writes
//! exactly one output element.

mod accuracy;
mod backward;
mod forward;
mod loss;
mod update;

pub use accuracy::{argmax, count_hits, sum_loss};
pub use backward::{accumulate_bias_gradient, accumulate_weight_gradient, propagate_error};
pub use forward::forward;
pub use loss::{binary_cross_entropy, output_error, output_error_value, CLAMP_EPSILON};
pub use update::{update_biases, update_weights, UpdateParams};

use device::DeviceError;

const LANES: usize = 8;

/// Dot product accumulated in `LANES` independent partial sums.
#[inline(always)]
pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    let (a, b) = (&a[..len], &b[..len]);

    let mut lanes = [0.0f32; LANES];
    let mut a_chunks = a.chunks_exact(LANES);
    let mut b_chunks = b.chunks_exact(LANES);

    for (x, y) in (&mut a_chunks).zip(&mut b_chunks) {
        for i in 0..LANES {
            lanes[i] += x[i] * y[i];
        }
    }

    let mut sum: f32 = lanes.iter().sum();
    for (x, y) in a_chunks.remainder().iter().zip(b_chunks.remainder()) {
        sum += x * y;
    }
    sum
}

#[track_caller]
pub(crate) fn ensure_rows(kernel: &'static str, rows: usize) -> Result<(), DeviceError> {
    if rows == 0 {
        return Err(DeviceError::launch(kernel, "batch has no rows"));
    }
    Ok(())
}
