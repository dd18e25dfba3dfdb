use crate::error::{Error, Result};

/// Reference layer sizes.
pub const INPUT_DIM: usize = 784;
pub const HIDDEN1_DIM: usize = 256;
pub const HIDDEN2_DIM: usize = 64;
pub const OUTPUT_DIM: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Relu,
    Sigmoid,
}

impl Activation {
    #[inline(always)]
    pub fn apply(self, z: f32) -> f32 {
        match self {
            Activation::Relu => z.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-z).exp()),
        }
    }

    /// Scales `upstream` by the derivative of the activation, evaluated from the
    /// stored forward output `a`. ReLU gates to exactly zero for dead units.
    #[inline(always)]
    pub fn backward(self, a: f32, upstream: f32) -> f32 {
        match self {
            Activation::Relu => {
                if a > 0.0 {
                    upstream
                } else {
                    0.0
                }
            }
            Activation::Sigmoid => upstream * a * (1.0 - a),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Activation::Relu => "relu",
            Activation::Sigmoid => "sigmoid",
        }
    }
}

/// Sequence of dense layers. Layer 0 is the first hidden layer, the last layer
/// is the sigmoid output layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    input_dim: usize,
    layers: Vec<(usize, Activation)>,
}

impl Topology {
    pub fn new(input_dim: usize, layers: &[(usize, Activation)]) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::InvalidTopology("input layer has no units".into()));
        }
        if layers.is_empty() {
            return Err(Error::InvalidTopology("network has no layers".into()));
        }
        if let Some(i) = layers.iter().position(|&(units, _)| units == 0) {
            return Err(Error::InvalidTopology(format!("layer {} has no units", i)));
        }
        if let Some(&(_, activation)) = layers.last() {
            if activation != Activation::Sigmoid {
                return Err(Error::InvalidTopology(format!(
                    "output layer must be sigmoid, got {}",
                    activation.name()
                )));
            }
        }

        Ok(Self {
            input_dim,
            layers: layers.to_vec(),
        })
    }

    /// Two ReLU hidden layers followed by a sigmoid output layer.
    pub fn classifier(
        input_dim: usize,
        hidden1_dim: usize,
        hidden2_dim: usize,
        output_dim: usize,
    ) -> Result<Self> {
        Self::new(
            input_dim,
            &[
                (hidden1_dim, Activation::Relu),
                (hidden2_dim, Activation::Relu),
                (output_dim, Activation::Sigmoid),
            ],
        )
    }

    /// The 784-256-64-10 reference network.
    pub fn reference() -> Self {
        Self {
            input_dim: INPUT_DIM,
            layers: vec![
                (HIDDEN1_DIM, Activation::Relu),
                (HIDDEN2_DIM, Activation::Relu),
                (OUTPUT_DIM, Activation::Sigmoid),
            ],
        }
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn output_dim(&self) -> usize {
        self.layers.last().map_or(self.input_dim, |&(units, _)| units)
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn layers(&self) -> &[(usize, Activation)] {
        &self.layers
    }

    /// Unit counts including the input layer.
    pub fn sizes(&self) -> Vec<usize> {
        std::iter::once(self.input_dim)
            .chain(self.layers.iter().map(|&(units, _)| units))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_topology() {
        let topology = Topology::reference();

        assert_eq!(topology.sizes(), vec![784, 256, 64, 10]);
        assert_eq!(topology.output_dim(), 10);
        assert_eq!(topology.num_layers(), 3);
        assert_eq!(
            topology,
            Topology::classifier(784, 256, 64, 10).unwrap()
        );
    }

    #[test]
    fn test_rejects_invalid_topologies() {
        assert!(Topology::new(0, &[(2, Activation::Sigmoid)]).is_err());
        assert!(Topology::new(2, &[]).is_err());
        assert!(Topology::classifier(2, 0, 2, 2).is_err());
        assert!(Topology::new(2, &[(3, Activation::Sigmoid), (2, Activation::Relu)]).is_err());
    }

    #[test]
    fn test_activation_values() {
        assert_eq!(Activation::Relu.apply(-1.5), 0.0);
        assert_eq!(Activation::Relu.apply(2.5), 2.5);
        assert!((Activation::Sigmoid.apply(0.0) - 0.5).abs() < 1e-7);

        for z in [-20.0f32, -3.0, -0.1, 0.0, 0.1, 3.0, 15.0] {
            let a = Activation::Sigmoid.apply(z);
            assert!(a > 0.0 && a < 1.0, "sigmoid({}) = {}", z, a);
        }
    }

    #[test]
    fn test_activation_backward() {
        assert_eq!(Activation::Relu.backward(0.0, 3.0), 0.0);
        assert_eq!(Activation::Relu.backward(0.5, 3.0), 3.0);
        assert!((Activation::Sigmoid.backward(0.5, 2.0) - 0.5).abs() < 1e-7);
    }
}
