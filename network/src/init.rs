use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use device::DeviceError;

use crate::params::ParameterStore;

/// Weights drawn per chunk share one generator.
const CHUNK_SIZE: usize = 4096;

/// Half-width of the Glorot-uniform range. `U(-a, a)` has variance
/// `a² / 3 = 2 / (fan_in + fan_out)`.
pub fn glorot_limit(fan_in: usize, fan_out: usize) -> f32 {
    (6.0 / (fan_in + fan_out) as f32).sqrt()
}

/// Variance-scaled (Glorot) weight initialization with zero biases.
///
/// Each chunk of a weight matrix gets its own generator seeded from
/// `(seed, layer, chunk)`, so the result depends only on the seed and not on
/// how the chunks are scheduled.
pub struct Initializer {
    seed: u64,
}

impl Initializer {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Fills the host mirror and uploads it.
    pub fn initialize(&self, params: &mut ParameterStore) -> Result<(), DeviceError> {
        let (layout, weights, biases) = params.host_mut();

        for layer in layout.layers() {
            let limit = glorot_limit(layer.in_dim, layer.out_dim);
            let dist = Uniform::new_inclusive(-limit, limit);
            let seed = self.seed;
            let index = layer.index as u64;

            weights[layer.weights()]
                .par_chunks_mut(CHUNK_SIZE)
                .enumerate()
                .for_each(|(chunk, values)| {
                    let mut rng = StdRng::seed_from_u64(chunk_seed(seed, index, chunk as u64));
                    for value in values.iter_mut() {
                        *value = dist.sample(&mut rng);
                    }
                });

            log::debug!(
                "Layer {}: {}x{} weights in [-{:.4}, {:.4}]",
                layer.index,
                layer.out_dim,
                layer.in_dim,
                limit,
                limit
            );
        }
        biases.fill(0.0);

        params.upload()
    }
}

fn chunk_seed(seed: u64, layer: u64, chunk: u64) -> u64 {
    seed ^ (layer << 48) ^ chunk.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
