use std::ops::Range;

use crate::topology::{Activation, Topology};

/// Location of one layer's parameters inside the flat weight and bias buffers.
///
/// Descriptors are produced once by [`Layout::new`] and handed to kernels;
/// nothing else computes offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerDescriptor {
    pub index: usize,
    pub in_dim: usize,
    pub out_dim: usize,
    pub weight_offset: usize,
    pub bias_offset: usize,
    pub activation: Activation,
}

impl LayerDescriptor {
    /// Row-major `(out_dim, in_dim)` weight matrix.
    pub fn weights(&self) -> Range<usize> {
        self.weight_offset..self.weight_offset + self.weight_len()
    }

    pub fn biases(&self) -> Range<usize> {
        self.bias_offset..self.bias_offset + self.out_dim
    }

    pub fn weight_len(&self) -> usize {
        self.in_dim * self.out_dim
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    topology: Topology,
    layers: Vec<LayerDescriptor>,
    weights_len: usize,
    biases_len: usize,
}

impl Layout {
    pub fn new(topology: &Topology) -> Self {
        let mut layers = Vec::with_capacity(topology.num_layers());
        let mut weight_offset = 0;
        let mut bias_offset = 0;
        let mut in_dim = topology.input_dim();

        for (index, &(out_dim, activation)) in topology.layers().iter().enumerate() {
            let layer = LayerDescriptor {
                index,
                in_dim,
                out_dim,
                weight_offset,
                bias_offset,
                activation,
            };
            weight_offset += layer.weight_len();
            bias_offset += out_dim;
            in_dim = out_dim;
            layers.push(layer);
        }

        Self {
            topology: topology.clone(),
            layers,
            weights_len: weight_offset,
            biases_len: bias_offset,
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn layers(&self) -> &[LayerDescriptor] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> &LayerDescriptor {
        &self.layers[index]
    }

    pub fn output(&self) -> &LayerDescriptor {
        &self.layers[self.layers.len() - 1]
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn input_dim(&self) -> usize {
        self.topology.input_dim()
    }

    pub fn output_dim(&self) -> usize {
        self.topology.output_dim()
    }

    pub fn weights_len(&self) -> usize {
        self.weights_len
    }

    pub fn biases_len(&self) -> usize {
        self.biases_len
    }
}
