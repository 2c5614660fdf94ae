use nalgebra::DVector;
use rand::Rng;
use std::f32::consts::PI;

/// Box–Muller draw of `size` values from N(mean, std_dev), consuming the
/// caller's RNG so a seeded fit is bit-reproducible.
pub fn normal<R: Rng>(rng: &mut R, size: usize, mean: f32, std_dev: f32) -> Vec<f32> {
    (0..size)
        .map(|_| {
            // 1 - u keeps the argument of ln strictly positive
            let u1: f32 = 1.0 - rng.gen::<f32>();
            let u2: f32 = rng.gen();
            let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
            z0 * std_dev + mean
        })
        .collect()
}

/// Dense factor matrix of `rows` latent vectors drawn from N(0, std_dev).
pub fn factor_rows<R: Rng>(rng: &mut R, rows: usize, cols: usize, std_dev: f32) -> Vec<DVector<f32>> {
    (0..rows)
        .map(|_| DVector::from_vec(normal(rng, cols, 0.0, std_dev)))
        .collect()
}
