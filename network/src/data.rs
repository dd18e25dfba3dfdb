use dataset::Dataset;
use device::{ensure_len, Device, DeviceBuffer, DeviceError};

/// Which device-resident dataset a batch is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Eval,
}

/// A window of `rows` samples starting at sample `offset`. Owns no memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchView {
    pub index: usize,
    pub offset: usize,
    pub rows: usize,
}

/// Consecutive batch windows over `total` samples.
#[derive(Debug, Clone)]
pub struct Batches {
    next: usize,
    count: usize,
    batch_size: usize,
    total: usize,
}

impl Batches {
    /// Only full batches; a trailing remainder is left out.
    pub fn full(total: usize, batch_size: usize) -> Self {
        Self {
            next: 0,
            count: total.checked_div(batch_size).unwrap_or(0),
            batch_size,
            total,
        }
    }

    /// Every sample; the last batch may be partial.
    pub fn covering(total: usize, batch_size: usize) -> Self {
        Self {
            next: 0,
            count: if batch_size == 0 {
                0
            } else {
                total.div_ceil(batch_size)
            },
            batch_size,
            total,
        }
    }
}

impl Iterator for Batches {
    type Item = BatchView;

    fn next(&mut self) -> Option<BatchView> {
        if self.next >= self.count {
            return None;
        }
        let index = self.next;
        self.next += 1;
        let offset = index * self.batch_size;

        Some(BatchView {
            index,
            offset,
            rows: self.batch_size.min(self.total - offset),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.count - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Batches {}

/// Inputs and one-hot labels of a dataset, copied to the device once.
pub struct DeviceDataset {
    inputs: DeviceBuffer<f32>,
    labels: DeviceBuffer<u8>,
    rows: usize,
    input_dim: usize,
    num_classes: usize,
}

impl DeviceDataset {
    #[track_caller]
    pub fn upload(
        device: &Device,
        data: &Dataset,
        labels: (&'static str, &'static str),
    ) -> Result<Self, DeviceError> {
        Ok(Self {
            inputs: device.upload(labels.0, data.features())?,
            labels: device.upload(labels.1, data.labels())?,
            rows: data.len(),
            input_dim: data.input_dim(),
            num_classes: data.num_classes(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn inputs(&self, batch: &BatchView) -> Result<&[f32], DeviceError> {
        self.check_window("batch_inputs", batch)?;
        let start = batch.offset * self.input_dim;
        Ok(self.inputs.range(start..start + batch.rows * self.input_dim))
    }

    pub fn labels(&self, batch: &BatchView) -> Result<&[u8], DeviceError> {
        self.check_window("batch_labels", batch)?;
        let start = batch.offset * self.num_classes;
        Ok(self.labels.range(start..start + batch.rows * self.num_classes))
    }

    fn check_window(&self, kernel: &'static str, batch: &BatchView) -> Result<(), DeviceError> {
        let end = batch.offset.checked_add(batch.rows).unwrap_or(usize::MAX);
        ensure_len(kernel, "samples", self.rows, end)
    }

    pub fn size_bytes(&self) -> usize {
        self.inputs.size_bytes() + self.labels.size_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use device::DeviceConfig;

    #[test]
    fn test_full_batches_drop_remainder() {
        let batches: Vec<_> = Batches::full(10, 3).collect();

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2], BatchView { index: 2, offset: 6, rows: 3 });
        assert_eq!(Batches::full(2, 3).count(), 0);
    }

    #[test]
    fn test_covering_batches_end_partial() {
        let batches: Vec<_> = Batches::covering(10, 4).collect();

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2], BatchView { index: 2, offset: 8, rows: 2 });
        assert_eq!(batches.iter().map(|b| b.rows).sum::<usize>(), 10);
        assert_eq!(Batches::covering(8, 4).len(), 2);
        assert_eq!(Batches::covering(5, 0).len(), 0);
    }

    #[test]
    fn test_batch_windows() {
        let device = Device::new(DeviceConfig::default()).unwrap();
        let features: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let data = Dataset::from_classes(features, &[0, 1, 2, 1], 3, 3).unwrap();
        let dataset = DeviceDataset::upload(&device, &data, ("x", "y")).unwrap();

        let batch = Batches::covering(dataset.rows(), 3).nth(1).unwrap();
        assert_eq!(dataset.inputs(&batch).unwrap(), &[9.0, 10.0, 11.0]);
        assert_eq!(dataset.labels(&batch).unwrap(), &[0, 1, 0]);
        assert_eq!(dataset.size_bytes(), 12 * 4 + 12);
    }

    #[test]
    fn test_window_past_end_is_rejected() {
        let device = Device::new(DeviceConfig::default()).unwrap();
        let data = Dataset::from_classes(vec![0.0; 8], &[0, 1, 0, 1], 2, 2).unwrap();
        let dataset = DeviceDataset::upload(&device, &data, ("x", "y")).unwrap();

        let tail = BatchView { index: 0, offset: 3, rows: 1 };
        assert_eq!(dataset.inputs(&tail).unwrap().len(), 2);

        let past = BatchView { index: 0, offset: 3, rows: 2 };
        let err = dataset.inputs(&past).unwrap_err();
        assert!(matches!(err, DeviceError::Launch { kernel: "batch_inputs", .. }));

        let huge = BatchView { index: 0, offset: usize::MAX, rows: 1 };
        let err = dataset.labels(&huge).unwrap_err();
        assert!(matches!(err, DeviceError::Launch { kernel: "batch_labels", .. }));
    }
}
