use device::{ensure_len, Device, DeviceError};
use rayon::prelude::*;

use super::{dot, ensure_rows};
use crate::layout::LayerDescriptor;
use crate::params::ParamBuffers;
use crate::topology::Activation;

/// Computes `activation(bias + W · input)` for the first `rows` samples of
/// `input` into `output`. Both are batch-major; `output` is written for
/// `rows * out_dim` elements.
pub fn forward(
    device: &Device,
    layer: &LayerDescriptor,
    params: &ParamBuffers,
    input: &[f32],
    output: &mut [f32],
    rows: usize,
) -> Result<(), DeviceError> {
    let kernel = match layer.activation {
        Activation::Relu => "forward_relu",
        Activation::Sigmoid => "forward_sigmoid",
    };
    ensure_rows(kernel, rows)?;
    ensure_len(kernel, "input", input.len(), rows * layer.in_dim)?;
    ensure_len(kernel, "output", output.len(), rows * layer.out_dim)?;

    let weights = params.weights(layer);
    let biases = params.biases(layer);
    let (in_dim, out_dim, activation) = (layer.in_dim, layer.out_dim, layer.activation);
    let output = &mut output[..rows * out_dim];

    device.launch(kernel, output.len(), || {
        output.par_iter_mut().enumerate().for_each(|(idx, out)| {
            let (sample, unit) = (idx / out_dim, idx % out_dim);
            let x = &input[sample * in_dim..(sample + 1) * in_dim];
            let w = &weights[unit * in_dim..(unit + 1) * in_dim];
            *out = activation.apply(biases[unit] + dot(x, w));
        });
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Layout;
    use crate::topology::Topology;
    use device::DeviceConfig;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn setup(
        in_dim: usize,
        out_dim: usize,
        activation: Activation,
    ) -> (Device, Layout, ParamBuffers) {
        let device = Device::new(DeviceConfig::default()).unwrap();
        let mut layers = vec![(out_dim, activation)];
        if activation == Activation::Relu {
            layers.push((1, Activation::Sigmoid));
        }
        let layout = Layout::new(&Topology::new(in_dim, &layers).unwrap());
        let mut params = ParamBuffers::new(&device, &layout, ("w", "b")).unwrap();

        let mut rng = StdRng::seed_from_u64(5);
        let layer = *layout.layer(0);
        for w in params.weights_mut(&layer) {
            *w = rng.gen_range(-0.5..0.5);
        }
        for b in params.biases_mut(&layer) {
            *b = rng.gen_range(-1.0..1.0);
        }
        (device, layout, params)
    }

    fn random_input(len: usize) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(9);
        (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect()
    }

    #[test]
    fn test_relu_output_non_negative() {
        let (device, layout, params) = setup(13, 7, Activation::Relu);
        let layer = *layout.layer(0);
        let rows = 5;
        let input = random_input(rows * 13);
        let mut output = vec![f32::NAN; rows * 7];

        forward(&device, &layer, &params, &input, &mut output, rows).unwrap();

        assert!(output.iter().all(|&a| a >= 0.0));
        assert!(output.iter().any(|&a| a > 0.0));
    }

    #[test]
    fn test_sigmoid_output_in_open_unit_interval() {
        let (device, layout, params) = setup(9, 4, Activation::Sigmoid);
        let layer = *layout.layer(0);
        let rows = 6;
        let input = random_input(rows * 9);
        let mut output = vec![f32::NAN; rows * 4];

        forward(&device, &layer, &params, &input, &mut output, rows).unwrap();

        assert!(output.iter().all(|&p| p > 0.0 && p < 1.0));
    }

    #[test]
    fn test_matches_naive_and_leaves_tail() {
        let (device, layout, params) = setup(5, 3, Activation::Sigmoid);
        let layer = *layout.layer(0);
        let input = random_input(4 * 5);
        let mut output = vec![-1.0; 4 * 3];

        forward(&device, &layer, &params, &input, &mut output, 2).unwrap();

        let w = params.weights(&layer);
        let b = params.biases(&layer);
        for sample in 0..2 {
            for unit in 0..3 {
                let z: f32 = b[unit]
                    + (0..5)
                        .map(|k| input[sample * 5 + k] * w[unit * 5 + k])
                        .sum::<f32>();
                let expected = 1.0 / (1.0 + (-z).exp());
                assert!((output[sample * 3 + unit] - expected).abs() < 1e-6);
            }
        }
        assert!(output[6..].iter().all(|&v| v == -1.0));
    }

    #[test]
    fn test_rejects_short_buffers() {
        let (device, layout, params) = setup(4, 3, Activation::Relu);
        let layer = *layout.layer(0);
        let input = vec![0.0; 2 * 4];
        let mut output = vec![0.0; 5];

        let err = forward(&device, &layer, &params, &input, &mut output, 2).unwrap_err();
        assert!(matches!(err, DeviceError::Launch { kernel: "forward_relu", .. }));

        let mut output = vec![0.0; 6];
        let err = forward(&device, &layer, &params, &input[..7], &mut output, 2).unwrap_err();
        assert!(matches!(err, DeviceError::Launch { .. }));
        assert_eq!(device.launches(), 0);
    }
}
