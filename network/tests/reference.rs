//! Cross-checks the kernels against candle's matmul and autograd.

use candle_core::{Device as CandleDevice, Result as CandleResult, Tensor, Var};
use candle_nn::{Linear, Module};
use dataset::Dataset;
use device::{Device, DeviceConfig};
use network::{
    Activation, Initializer, Layout, ParameterStore, Split, Topology, TrainConfig, Trainer,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ROWS: usize = 6;
const CLASSES: usize = 3;

struct Reference {
    activations: Vec<Vec<f32>>,
    weight_grads: Vec<Vec<f32>>,
    bias_grads: Vec<Vec<f32>>,
}

fn random_dataset(input_dim: usize) -> Dataset {
    let mut rng = StdRng::seed_from_u64(17);
    let features = (0..ROWS * input_dim).map(|_| rng.gen_range(0.0..1.0)).collect();
    let classes: Vec<usize> = (0..ROWS).map(|_| rng.gen_range(0..CLASSES)).collect();
    Dataset::from_classes(features, &classes, input_dim, CLASSES).unwrap()
}

/// Forward pass and summed cross-entropy gradients of the same network.
fn candle_reference(params: &ParameterStore, data: &Dataset) -> CandleResult<Reference> {
    let cpu = CandleDevice::Cpu;
    let layout = params.layout();
    let x = Tensor::from_vec(
        data.features().to_vec(),
        (data.len(), data.input_dim()),
        &cpu,
    )?;
    let labels: Vec<f32> = data.labels().iter().map(|&y| y as f32).collect();
    let y = Tensor::from_vec(labels, (data.len(), data.num_classes()), &cpu)?;

    let mut vars = Vec::new();
    let mut activations = Vec::new();
    let mut a = x;
    for layer in layout.layers() {
        let w = Var::from_tensor(&Tensor::from_vec(
            params.host_weights(layer).to_vec(),
            (layer.out_dim, layer.in_dim),
            &cpu,
        )?)?;
        let b = Var::from_tensor(&Tensor::from_vec(
            params.host_biases(layer).to_vec(),
            layer.out_dim,
            &cpu,
        )?)?;

        let linear = Linear::new(w.as_tensor().clone(), Some(b.as_tensor().clone()));
        let z = linear.forward(&a)?;
        a = match layer.activation {
            Activation::Relu => z.relu()?,
            Activation::Sigmoid => z.neg()?.exp()?.affine(1.0, 1.0)?.recip()?,
        };
        activations.push(a.flatten_all()?.to_vec1::<f32>()?);
        vars.push((w, b));
    }

    let p = a;
    let positive = y.mul(&p.log()?)?;
    let negative = y.affine(-1.0, 1.0)?.mul(&p.affine(-1.0, 1.0)?.log()?)?;
    let loss = positive.add(&negative)?.sum_all()?.neg()?;
    let grads = loss.backward()?;

    let mut weight_grads = Vec::new();
    let mut bias_grads = Vec::new();
    for (w, b) in &vars {
        let gw = grads.get(w.as_tensor()).expect("weight gradient");
        let gb = grads.get(b.as_tensor()).expect("bias gradient");
        weight_grads.push(gw.flatten_all()?.to_vec1::<f32>()?);
        bias_grads.push(gb.to_vec1::<f32>()?);
    }

    Ok(Reference {
        activations,
        weight_grads,
        bias_grads,
    })
}

fn assert_close(actual: &[f32], expected: &[f32], tolerance: f32) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        let scale = e.abs().max(1.0);
        assert!(
            (a - e).abs() <= tolerance * scale,
            "index {}: got {}, expected {}",
            i,
            a,
            e
        );
    }
}

fn trainer_for<'d>(
    device: &'d Device,
    topology: &Topology,
    data: &Dataset,
    seed: u64,
) -> Trainer<'d> {
    let mut params = ParameterStore::new(device, Layout::new(topology)).unwrap();
    Initializer::new(seed).initialize(&mut params).unwrap();

    let config = TrainConfig {
        epochs: 1,
        batch_size: ROWS,
        learning_rate: 0.01,
        l2_lambda: 0.7,
    };
    Trainer::new(device, config, params, data, data).unwrap()
}

#[test]
fn test_forward_matches_candle() {
    let device = Device::new(DeviceConfig::default()).unwrap();
    let topology = Topology::classifier(12, 9, 5, CLASSES).unwrap();
    let data = random_dataset(12);
    let mut trainer = trainer_for(&device, &topology, &data, 3);

    let expected = candle_reference(trainer.params(), &data).unwrap();
    let batch = trainer.train_batches().next().unwrap();
    trainer.forward(Split::Train, &batch).unwrap();

    for (k, reference) in expected.activations.iter().enumerate() {
        assert_close(trainer.activations(k), reference, 1e-5);
    }
}

#[test]
fn test_gradients_match_candle() {
    let device = Device::new(DeviceConfig {
        threads: Some(3),
        work_group_size: 2,
    })
    .unwrap();
    let topology = Topology::new(
        7,
        &[
            (6, Activation::Relu),
            (5, Activation::Relu),
            (4, Activation::Relu),
            (CLASSES, Activation::Sigmoid),
        ],
    )
    .unwrap();
    let data = random_dataset(7);
    let mut trainer = trainer_for(&device, &topology, &data, 8);

    let expected = candle_reference(trainer.params(), &data).unwrap();
    let batch = trainer.train_batches().next().unwrap();
    trainer.forward(Split::Train, &batch).unwrap();
    let _fence = trainer.backward(&batch).unwrap();

    // The error signal is the negative loss gradient.
    let layout = trainer.layout().clone();
    for layer in layout.layers() {
        let k = layer.index;
        let weight_grad: Vec<f32> = expected.weight_grads[k].iter().map(|g| -g).collect();
        let bias_grad: Vec<f32> = expected.bias_grads[k].iter().map(|g| -g).collect();

        assert_close(trainer.gradients().weights(layer), &weight_grad, 1e-4);
        assert_close(trainer.gradients().biases(layer), &bias_grad, 1e-4);
    }
}
