use ndarray::Array2;
use rand::Rng;

/// Glorot (Xavier) uniform initialization for a `[fan_in, fan_out]` kernel.
pub fn glorot_uniform<R: Rng>(rng: &mut R, fan_in: usize, fan_out: usize) -> Array2<f64> {
    let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
    Array2::from_shape_fn((fan_in, fan_out), |_| rng.random_range(-limit..limit))
}
