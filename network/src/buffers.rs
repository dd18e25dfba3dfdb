use device::{Device, DeviceBuffer, DeviceError};

use crate::layout::Layout;

/// Per-batch working memory, sized for `batch_size` rows and reused by
/// every batch.
pub struct BatchBuffers {
    pub(crate) activations: Vec<DeviceBuffer<f32>>,
    pub(crate) errors: Vec<DeviceBuffer<f32>>,
    pub(crate) hit_partials: DeviceBuffer<u32>,
    pub(crate) loss_partials: DeviceBuffer<f32>,
    pub(crate) hits: DeviceBuffer<u32>,
    pub(crate) loss: DeviceBuffer<f32>,
    batch_size: usize,
}

impl BatchBuffers {
    pub fn new(device: &Device, layout: &Layout, batch_size: usize) -> Result<Self, DeviceError> {
        let mut activations = Vec::with_capacity(layout.num_layers());
        let mut errors = Vec::with_capacity(layout.num_layers());
        for layer in layout.layers() {
            activations.push(device.alloc("activations", layer.out_dim * batch_size)?);
            errors.push(device.alloc("errors", layer.out_dim * batch_size)?);
        }

        let groups = device.work_groups(batch_size);

        Ok(Self {
            activations,
            errors,
            hit_partials: device.alloc("hit_partials", groups)?,
            loss_partials: device.alloc("loss_partials", groups)?,
            hits: device.alloc("hits", 1)?,
            loss: device.alloc("loss", 1)?,
            batch_size,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Forward output of layer `index`.
    pub fn activations(&self, index: usize) -> &[f32] {
        self.activations[index].as_slice()
    }

    /// Error signal of layer `index`.
    pub fn errors(&self, index: usize) -> &[f32] {
        self.errors[index].as_slice()
    }

    pub fn size_bytes(&self) -> usize {
        let layers: usize = self
            .activations
            .iter()
            .chain(&self.errors)
            .map(DeviceBuffer::size_bytes)
            .sum();
        layers
            + self.hit_partials.size_bytes()
            + self.loss_partials.size_bytes()
            + self.hits.size_bytes()
            + self.loss.size_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::Topology;
    use device::DeviceConfig;

    #[test]
    fn test_sized_for_batch() {
        let device = Device::new(DeviceConfig {
            threads: Some(1),
            work_group_size: 4,
        })
        .unwrap();
        let layout = Layout::new(&Topology::classifier(6, 5, 3, 2).unwrap());
        let buffers = BatchBuffers::new(&device, &layout, 10).unwrap();

        assert_eq!(buffers.activations(0).len(), 50);
        assert_eq!(buffers.errors(2).len(), 20);
        assert_eq!(buffers.hit_partials.len(), 3);
        assert_eq!(buffers.batch_size(), 10);
        assert_eq!(buffers.size_bytes(), (2 * (50 + 30 + 20) + 3 + 3 + 1 + 1) * 4);
    }
}
