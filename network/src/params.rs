use device::{Device, DeviceBuffer, DeviceError};

use crate::layout::{LayerDescriptor, Layout};

/// Flat weight and bias buffers in device memory, addressed per layer through
/// [`LayerDescriptor`]s. Used for the parameters and for their gradients.
pub struct ParamBuffers {
    weights: DeviceBuffer<f32>,
    biases: DeviceBuffer<f32>,
}

impl ParamBuffers {
    #[track_caller]
    pub fn new(
        device: &Device,
        layout: &Layout,
        labels: (&'static str, &'static str),
    ) -> Result<Self, DeviceError> {
        Ok(Self {
            weights: device.alloc(labels.0, layout.weights_len())?,
            biases: device.alloc(labels.1, layout.biases_len())?,
        })
    }

    pub fn weights(&self, layer: &LayerDescriptor) -> &[f32] {
        self.weights.range(layer.weights())
    }

    pub fn weights_mut(&mut self, layer: &LayerDescriptor) -> &mut [f32] {
        self.weights.range_mut(layer.weights())
    }

    pub fn biases(&self, layer: &LayerDescriptor) -> &[f32] {
        self.biases.range(layer.biases())
    }

    pub fn biases_mut(&mut self, layer: &LayerDescriptor) -> &mut [f32] {
        self.biases.range_mut(layer.biases())
    }

    pub fn size_bytes(&self) -> usize {
        self.weights.size_bytes() + self.biases.size_bytes()
    }
}

/// Network parameters with a host mirror.
///
/// The host mirror is written during initialization and read after
/// [`ParameterStore::download`]; training only touches the device buffers.
pub struct ParameterStore {
    layout: Layout,
    host_weights: Vec<f32>,
    host_biases: Vec<f32>,
    device: ParamBuffers,
}

impl ParameterStore {
    pub fn new(device: &Device, layout: Layout) -> Result<Self, DeviceError> {
        let buffers = ParamBuffers::new(device, &layout, ("weights", "biases"))?;

        Ok(Self {
            host_weights: vec![0.0; layout.weights_len()],
            host_biases: vec![0.0; layout.biases_len()],
            layout,
            device: buffers,
        })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn host_weights(&self, layer: &LayerDescriptor) -> &[f32] {
        &self.host_weights[layer.weights()]
    }

    pub fn host_weights_mut(&mut self, layer: &LayerDescriptor) -> &mut [f32] {
        &mut self.host_weights[layer.weights()]
    }

    pub fn host_biases(&self, layer: &LayerDescriptor) -> &[f32] {
        &self.host_biases[layer.biases()]
    }

    pub fn host_biases_mut(&mut self, layer: &LayerDescriptor) -> &mut [f32] {
        &mut self.host_biases[layer.biases()]
    }

    /// Host weights and biases of every layer, for whole-buffer fills.
    pub(crate) fn host_mut(&mut self) -> (&Layout, &mut [f32], &mut [f32]) {
        (&self.layout, &mut self.host_weights, &mut self.host_biases)
    }

    /// Device-resident parameters, as read by the kernels.
    pub fn buffers(&self) -> &ParamBuffers {
        &self.device
    }

    pub fn buffers_mut(&mut self) -> &mut ParamBuffers {
        &mut self.device
    }

    pub fn weights(&self, layer: &LayerDescriptor) -> &[f32] {
        self.device.weights(layer)
    }

    pub fn biases(&self, layer: &LayerDescriptor) -> &[f32] {
        self.device.biases(layer)
    }

    /// Device weight and bias slices of one layer.
    pub fn layer_mut(&mut self, layer: &LayerDescriptor) -> (&mut [f32], &mut [f32]) {
        let ParamBuffers { weights, biases } = &mut self.device;
        (
            weights.range_mut(layer.weights()),
            biases.range_mut(layer.biases()),
        )
    }

    /// Copies the host mirror to the device.
    pub fn upload(&mut self) -> Result<(), DeviceError> {
        self.device.weights.copy_from_host(&self.host_weights)?;
        self.device.biases.copy_from_host(&self.host_biases)?;
        Ok(())
    }

    /// Copies the device parameters back into the host mirror.
    pub fn download(&mut self) -> Result<(), DeviceError> {
        self.device.weights.copy_to_host(&mut self.host_weights)?;
        self.device.biases.copy_to_host(&mut self.host_biases)?;
        Ok(())
    }

    pub fn size_bytes(&self) -> usize {
        self.device.size_bytes()
    }
}
