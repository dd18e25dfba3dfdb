use std::iter::Sum;
use std::ops::AddAssign;

use device::{ensure_len, Device, DeviceError, Element};
use rayon::prelude::*;

use super::{binary_cross_entropy, ensure_rows};

/// Index of the largest value. Ties resolve to the lowest index.
#[inline]
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Adds the number of correctly classified samples among `rows` to `hits[0]`.
///
/// A sample is a hit when its one-hot label is set at the argmax of its
/// predictions. Work groups first count into `partials`, then a single work
/// item folds the partials into the accumulator.
pub fn count_hits(
    device: &Device,
    predictions: &[f32],
    labels: &[u8],
    width: usize,
    rows: usize,
    partials: &mut [u32],
    hits: &mut [u32],
) -> Result<(), DeviceError> {
    ensure_len("count_hits", "predictions", predictions.len(), rows * width)?;
    ensure_len("count_hits", "labels", labels.len(), rows * width)?;

    reduce_into(
        device,
        ("count_hits", "count_hits_reduce"),
        rows,
        partials,
        hits,
        |sample| {
            let row = sample * width;
            let best = argmax(&predictions[row..row + width]);
            u32::from(labels[row + best] == 1)
        },
    )
}

/// Adds the summed cross-entropy of `rows` samples to `loss[0]`, using the
/// same two-phase reduction as [`count_hits`].
pub fn sum_loss(
    device: &Device,
    predictions: &[f32],
    labels: &[u8],
    width: usize,
    rows: usize,
    partials: &mut [f32],
    loss: &mut [f32],
) -> Result<(), DeviceError> {
    ensure_len("sum_loss", "predictions", predictions.len(), rows * width)?;
    ensure_len("sum_loss", "labels", labels.len(), rows * width)?;

    reduce_into(
        device,
        ("sum_loss", "sum_loss_reduce"),
        rows,
        partials,
        loss,
        |sample| {
            let row = sample * width..(sample + 1) * width;
            predictions[row.clone()]
                .iter()
                .zip(&labels[row])
                .map(|(&p, &y)| binary_cross_entropy(p, y as f32))
                .sum::<f32>()
        },
    )
}

fn reduce_into<T, F>(
    device: &Device,
    kernels: (&'static str, &'static str),
    rows: usize,
    partials: &mut [T],
    accumulator: &mut [T],
    map: F,
) -> Result<(), DeviceError>
where
    T: Element + Sum + AddAssign,
    F: Fn(usize) -> T + Sync,
{
    let (map_kernel, reduce_kernel) = kernels;
    ensure_rows(map_kernel, rows)?;
    let groups = device.work_groups(rows);
    let group_size = device.work_group_size();
    ensure_len(map_kernel, "partials", partials.len(), groups)?;
    ensure_len(reduce_kernel, "accumulator", accumulator.len(), 1)?;

    let partials = &mut partials[..groups];
    device.launch(map_kernel, rows, || {
        partials.par_iter_mut().enumerate().for_each(|(group, partial)| {
            let start = group * group_size;
            let end = (start + group_size).min(rows);
            *partial = (start..end).map(&map).sum();
        });
    });

    let partials = &*partials;
    device.launch(reduce_kernel, 1, || {
        accumulator[0] += partials.iter().copied().sum::<T>();
    });

    Ok(())
}
